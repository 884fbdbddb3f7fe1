//! Core types for the ICMP engine and ping controller

use core::net::Ipv4Addr;

/// Default number of echo requests per blocking ping
pub const PING_DEFAULT_COUNT: u32 = 4;
/// Default per-echo timeout (ms)
pub const PING_DEFAULT_TIMEOUT_MS: u32 = 1000;
/// Default interval between echo requests (ms)
pub const PING_DEFAULT_INTERVAL_MS: u32 = 1000;
/// Capacity of the pending-echo table
pub const PING_MAX_OUTSTANDING: usize = 16;
/// Granularity of the blocking wait loop (ms)
pub const PING_POLL_INTERVAL_MS: u32 = 1;

/// Ping configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingConfig {
    /// Number of echo requests in blocking mode (0 selects the default)
    pub count: u32,
    /// Timeout per echo in milliseconds (0 selects the default)
    pub timeout_ms: u32,
    /// Interval between echo requests (ms)
    pub interval_ms: u32,
    /// Payload size (bytes, excluding the ICMP header)
    pub payload_size: u16,
    /// How long the blocking wait sleeps between table checks (ms)
    pub poll_interval_ms: u32,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            count: PING_DEFAULT_COUNT,
            timeout_ms: PING_DEFAULT_TIMEOUT_MS,
            interval_ms: PING_DEFAULT_INTERVAL_MS,
            payload_size: crate::packet::ICMP_DEFAULT_PAYLOAD as u16,
            poll_interval_ms: PING_POLL_INTERVAL_MS,
        }
    }
}

impl PingConfig {
    /// Single short echo for a connectivity check
    pub const fn quick() -> Self {
        Self {
            count: 1,
            timeout_ms: 2000,
            interval_ms: 0,
            payload_size: 32,
            poll_interval_ms: PING_POLL_INTERVAL_MS,
        }
    }

    /// Longer run for diagnosing a flaky link
    pub const fn thorough() -> Self {
        Self {
            count: 10,
            timeout_ms: 5000,
            interval_ms: 1000,
            payload_size: 56,
            poll_interval_ms: PING_POLL_INTERVAL_MS,
        }
    }

    /// Replace zero count/timeout with the defaults.
    pub(crate) fn normalized(mut self) -> Self {
        if self.count == 0 {
            self.count = PING_DEFAULT_COUNT;
        }
        if self.timeout_ms == 0 {
            self.timeout_ms = PING_DEFAULT_TIMEOUT_MS;
        }
        if self.poll_interval_ms == 0 {
            self.poll_interval_ms = PING_POLL_INTERVAL_MS;
        }
        self
    }
}

/// Statistics for the current (or most recent) ping session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingStats {
    /// Echo requests handed to the IP layer
    pub packets_sent: u32,
    /// Matching echo replies
    pub packets_received: u32,
    /// Echoes that timed out
    pub packets_lost: u32,
    /// Send failures and ICMP error reports for our echoes
    pub errors: u32,
    /// Minimum RTT (ms)
    pub rtt_min: u32,
    /// Maximum RTT (ms)
    pub rtt_max: u32,
    /// Sum of all RTTs (ms)
    pub rtt_sum: u64,
    /// Average RTT (ms), set when the session finishes
    pub rtt_avg: u32,
    /// Session start (clock ms)
    pub start_time: u64,
    /// Session end (clock ms), zero while running
    pub end_time: u64,
    /// Ping target
    pub dest: Ipv4Addr,
    /// Whether the session is still running
    pub active: bool,
}

impl Default for PingStats {
    fn default() -> Self {
        Self::new()
    }
}

impl PingStats {
    pub const fn new() -> Self {
        Self {
            packets_sent: 0,
            packets_received: 0,
            packets_lost: 0,
            errors: 0,
            rtt_min: 0,
            rtt_max: 0,
            rtt_sum: 0,
            rtt_avg: 0,
            start_time: 0,
            end_time: 0,
            dest: Ipv4Addr::UNSPECIFIED,
            active: false,
        }
    }

    /// Fresh stats for a session towards `dest` starting at `now`.
    pub(crate) fn begin(dest: Ipv4Addr, now: u64) -> Self {
        Self {
            start_time: now,
            dest,
            active: true,
            ..Self::new()
        }
    }

    pub fn record_sent(&mut self) {
        self.packets_sent = self.packets_sent.saturating_add(1);
    }

    pub fn record_reply(&mut self, rtt_ms: u32) {
        if self.packets_received == 0 || rtt_ms < self.rtt_min {
            self.rtt_min = rtt_ms;
        }
        if rtt_ms > self.rtt_max {
            self.rtt_max = rtt_ms;
        }
        self.packets_received = self.packets_received.saturating_add(1);
        self.rtt_sum = self.rtt_sum.saturating_add(u64::from(rtt_ms));
    }

    pub fn record_lost(&mut self) {
        self.packets_lost = self.packets_lost.saturating_add(1);
    }

    pub fn record_error(&mut self) {
        self.errors = self.errors.saturating_add(1);
    }

    /// Close the session: stamp the end time and compute the average.
    pub(crate) fn finish(&mut self, now: u64) {
        self.end_time = now;
        self.rtt_avg = self.avg_rtt_ms();
        self.active = false;
    }

    /// Average RTT over received replies, 0 if none
    pub const fn avg_rtt_ms(&self) -> u32 {
        if self.packets_received == 0 {
            0
        } else {
            (self.rtt_sum / self.packets_received as u64) as u32
        }
    }

    /// Percentage of sent echoes that timed out
    pub const fn loss_percent(&self) -> u32 {
        if self.packets_sent == 0 {
            0
        } else {
            ((self.packets_lost as u64 * 100) / self.packets_sent as u64) as u32
        }
    }

    pub const fn has_connectivity(&self) -> bool {
        self.packets_received > 0
    }

    /// Wall time covered by the session (ms)
    pub const fn elapsed_ms(&self) -> u64 {
        self.end_time.saturating_sub(self.start_time)
    }
}

/// Per-stack traffic counters, kept for `IcmpStack::debug_stats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IcmpCounters {
    pub rx_packets: u32,
    pub rx_echo_requests: u32,
    pub rx_echo_replies: u32,
    pub rx_dest_unreachable: u32,
    pub rx_time_exceeded: u32,
    pub rx_unknown: u32,
    pub rx_checksum_errors: u32,
    pub rx_truncated: u32,
    /// Replies and error reports that matched no pending echo
    pub rx_unmatched: u32,
    pub tx_echo_requests: u32,
    pub tx_echo_replies: u32,
    pub tx_dest_unreachable: u32,
    pub tx_time_exceeded: u32,
    pub tx_failures: u32,
    /// Pending echoes reclaimed by the expiry sweep
    pub timeouts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_presets() {
        let config = PingConfig::default();
        assert_eq!(config.count, 4);
        assert_eq!(config.timeout_ms, 1000);
        assert_eq!(config.payload_size, 56);

        assert_eq!(PingConfig::quick().count, 1);
    }

    #[test]
    fn test_normalized_fills_zeroes() {
        let config = PingConfig {
            count: 0,
            timeout_ms: 0,
            ..PingConfig::default()
        }
        .normalized();

        assert_eq!(config.count, PING_DEFAULT_COUNT);
        assert_eq!(config.timeout_ms, PING_DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn test_stats_accumulate() {
        let mut stats = PingStats::begin(Ipv4Addr::new(10, 0, 0, 1), 100);

        stats.record_sent();
        stats.record_reply(20);
        stats.record_sent();
        stats.record_reply(10);
        stats.record_sent();
        stats.record_lost();
        stats.finish(400);

        assert_eq!(stats.packets_sent, 3);
        assert_eq!(stats.packets_received, 2);
        assert_eq!(stats.packets_lost, 1);
        assert_eq!(stats.rtt_min, 10);
        assert_eq!(stats.rtt_max, 20);
        assert_eq!(stats.rtt_avg, 15);
        assert_eq!(stats.loss_percent(), 33);
        assert_eq!(stats.elapsed_ms(), 300);
        assert!(stats.has_connectivity());
        assert!(!stats.active);
    }

    #[test]
    fn test_no_replies_leaves_rtt_zero() {
        let mut stats = PingStats::begin(Ipv4Addr::LOCALHOST, 0);
        stats.record_sent();
        stats.record_lost();
        stats.finish(1000);

        assert_eq!(stats.rtt_min, 0);
        assert_eq!(stats.rtt_avg, 0);
        assert_eq!(stats.loss_percent(), 100);
        assert!(!stats.has_connectivity());
    }
}
