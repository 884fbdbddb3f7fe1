//! Ping controller - blocking and continuous echo sessions
//!
//! ```text
//!            ping / ping_start
//!   Idle ─────────────────────────► Running(Blocking | Continuous)
//!    ▲                                        │
//!    └────────────────────────────────────────┘
//!        count reached / ping_stop
//! ```
//!
//! A session owns one echo identifier. Replies and error reports are matched
//! through the pending table by `IcmpStack::input`; timeouts are reclaimed
//! by the expiry sweep that runs from `poll` and from the blocking wait loop.

use alloc::vec::Vec;
use core::net::Ipv4Addr;
use core::sync::atomic::Ordering;

use crate::error::{IcmpError, Result};
use crate::packet::{self, IcmpType, ICMP_MAX_ECHO_DATA, ICMP_PROTOCOL};
use crate::platform::{Clock, IpLayer};
use crate::stack::{alloc_buffer, encode_echo_message, IcmpStack};
use crate::types::{PingConfig, PingStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingMode {
    /// `ping`: fixed count, caller blocked until done
    Blocking,
    /// `ping_start`: one echo per interval from `poll` until `ping_stop`
    Continuous,
}

/// The running session. Its presence in the state is what "active" means.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PingSession {
    pub(crate) mode: PingMode,
    pub(crate) dest: Ipv4Addr,
    pub(crate) identifier: u16,
    pub(crate) next_sequence: u16,
    pub(crate) config: PingConfig,
    /// Continuous mode: clock ms at which the next echo is due
    pub(crate) next_send_at: u64,
}

impl<L: IpLayer, C: Clock> IcmpStack<L, C> {
    /// Send `count` echo requests to `dest` and wait for each in turn.
    ///
    /// Zero `count` or `timeout_ms` select the defaults. Interval and payload
    /// size come from the stack's `PingConfig`.
    pub fn ping(&self, dest: Ipv4Addr, count: u32, timeout_ms: u32) -> Result<PingStats> {
        let config = PingConfig {
            count,
            timeout_ms,
            ..self.config
        };
        self.ping_with(dest, config)
    }

    /// Blocking ping with a full configuration.
    ///
    /// Unanswered echoes count as lost and the session carries on; a send
    /// failure counts as an error. Only a full pending table aborts.
    pub fn ping_with(&self, dest: Ipv4Addr, config: PingConfig) -> Result<PingStats> {
        let config = config.normalized();
        let payload = echo_payload(config.payload_size)?;
        let identifier = self.begin_session(dest, PingMode::Blocking, config)?;

        log::info!(
            "PING {}: {} data bytes, count={} timeout={} ms",
            dest,
            payload.len(),
            config.count,
            config.timeout_ms
        );

        for i in 0..config.count {
            let sequence = i as u16;
            match self.send_tracked(dest, identifier, sequence, &payload, config.timeout_ms) {
                Ok(true) => self.await_echo(dest, identifier, sequence, config.poll_interval_ms),
                Ok(false) => {}
                Err(err) => {
                    self.end_session(identifier);
                    return Err(err);
                }
            }

            if i + 1 < config.count && config.interval_ms > 0 {
                self.clock.sleep_ms(config.interval_ms);
            }
        }

        let stats = self.end_session(identifier);
        log_summary(&stats);
        Ok(stats)
    }

    /// Start a continuous session with the stack's configuration.
    pub fn ping_start(&self, dest: Ipv4Addr) -> Result<()> {
        self.ping_start_with(dest, self.config)
    }

    /// Start a continuous session. The first echo goes out immediately,
    /// the rest from `poll` every `interval_ms`.
    pub fn ping_start_with(&self, dest: Ipv4Addr, config: PingConfig) -> Result<()> {
        let config = config.normalized();
        echo_payload(config.payload_size)?;
        self.begin_session(dest, PingMode::Continuous, config)?;

        log::info!(
            "PING {}: continuous, interval={} ms timeout={} ms",
            dest,
            config.interval_ms,
            config.timeout_ms
        );
        self.poll();
        Ok(())
    }

    /// Stop the continuous session and return its final stats.
    ///
    /// Echoes still in flight count as lost. Invalid when no continuous
    /// session is running.
    pub fn ping_stop(&self) -> Result<PingStats> {
        let now = self.clock.now_ms();
        let stats = {
            let mut state = self.state.lock();
            match state.session {
                Some(session) if session.mode == PingMode::Continuous => {}
                _ => return Err(IcmpError::Invalid),
            }
            let stats = state.finish_session(now);
            self.active.store(false, Ordering::Release);
            stats
        };
        log_summary(&stats);
        Ok(stats)
    }

    /// Snapshot of the current or most recent session's stats.
    pub fn stats(&self) -> PingStats {
        self.state.lock().stats
    }

    /// Whether a session is running. Does not take the state lock.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Timer hook: reclaim expired echoes and send the next continuous echo
    /// when it is due.
    pub fn poll(&self) {
        let now = self.clock.now_ms();

        let due = {
            let mut state = self.state.lock();
            if !state.initialized {
                return;
            }
            state.sweep_expired(now);

            match state.session.as_mut() {
                Some(session)
                    if session.mode == PingMode::Continuous && now >= session.next_send_at =>
                {
                    let sequence = session.next_sequence;
                    session.next_sequence = session.next_sequence.wrapping_add(1);

                    let interval = u64::from(session.config.interval_ms);
                    let next = session.next_send_at.saturating_add(interval);
                    // Fell behind: restart the schedule from now instead of bursting
                    session.next_send_at = if next <= now { now + interval } else { next };

                    Some((*session, sequence))
                }
                _ => None,
            }
        };

        let Some((session, sequence)) = due else {
            return;
        };

        let sent = echo_payload(session.config.payload_size).and_then(|payload| {
            self.send_tracked(
                session.dest,
                session.identifier,
                sequence,
                &payload,
                session.config.timeout_ms,
            )
        });

        if let Err(err) = sent {
            log::warn!("ping {}: seq={} not sent: {}", session.dest, sequence, err);
            let mut state = self.state.lock();
            if state.owns(session.identifier) {
                state.stats.record_error();
            }
        }
    }

    fn begin_session(&self, dest: Ipv4Addr, mode: PingMode, config: PingConfig) -> Result<u16> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();

        if !state.initialized {
            return Err(IcmpError::NotInitialized);
        }
        if state.session.is_some() {
            log::warn!("ping {}: a session is already running", dest);
            return Err(IcmpError::Busy);
        }

        let identifier = state.allocate_identifier();
        state.session = Some(PingSession {
            mode,
            dest,
            identifier,
            next_sequence: 0,
            config,
            next_send_at: now,
        });
        state.stats = PingStats::begin(dest, now);
        self.active.store(true, Ordering::Release);

        Ok(identifier)
    }

    fn end_session(&self, identifier: u16) -> PingStats {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        if !state.owns(identifier) {
            return state.stats;
        }
        let stats = state.finish_session(now);
        self.active.store(false, Ordering::Release);
        stats
    }

    /// Register the echo in the pending table, then send it.
    ///
    /// Ok(true) when the echo is on the wire, Ok(false) when it was not sent
    /// (send failure, already counted, or the session ended meanwhile).
    /// Busy when the pending table is full.
    fn send_tracked(
        &self,
        dest: Ipv4Addr,
        identifier: u16,
        sequence: u16,
        payload: &[u8],
        timeout_ms: u32,
    ) -> Result<bool> {
        let message = encode_echo_message(IcmpType::EchoRequest, identifier, sequence, payload)?;

        {
            let now = self.clock.now_ms();
            let mut state = self.state.lock();
            if !state.owns(identifier) {
                return Ok(false);
            }
            state
                .pending
                .allocate(dest, identifier, sequence, now, timeout_ms)?;
            state.stats.record_sent();
        }

        match self.ip.send(dest, ICMP_PROTOCOL, &message) {
            Ok(()) => {
                self.state.lock().counters.tx_echo_requests += 1;
                Ok(true)
            }
            Err(err) => {
                let mut state = self.state.lock();
                state.counters.tx_failures += 1;
                if state.pending.take(dest, identifier, sequence).is_some() && state.owns(identifier) {
                    state.stats.record_error();
                }
                log::warn!("ping {}: seq={} send failed: {}", dest, sequence, err);
                Ok(false)
            }
        }
    }

    /// Wait until the echo is answered, reported or expired.
    fn await_echo(&self, dest: Ipv4Addr, identifier: u16, sequence: u16, poll_interval_ms: u32) {
        loop {
            {
                let now = self.clock.now_ms();
                let mut state = self.state.lock();
                state.sweep_expired(now);
                if !state.pending.contains(dest, identifier, sequence) {
                    return;
                }
            }
            self.clock.sleep_ms(poll_interval_ms);
        }
    }
}

fn echo_payload(size: u16) -> Result<Vec<u8>> {
    let size = usize::from(size);
    if size > ICMP_MAX_ECHO_DATA {
        return Err(IcmpError::Invalid);
    }
    let mut payload = alloc_buffer(size)?;
    packet::fill_payload(&mut payload);
    Ok(payload)
}

fn log_summary(stats: &PingStats) {
    log::info!(
        "--- {} ping statistics --- {} transmitted, {} received, {} errors, {}% loss, time {} ms",
        stats.dest,
        stats.packets_sent,
        stats.packets_received,
        stats.errors,
        stats.loss_percent(),
        stats.elapsed_ms()
    );
    if stats.packets_received > 0 {
        log::info!(
            "rtt min/avg/max = {}/{}/{} ms",
            stats.rtt_min,
            stats.rtt_avg,
            stats.rtt_max
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct StepClock(Cell<u64>);

    impl Clock for StepClock {
        fn now_ms(&self) -> u64 {
            self.0.get()
        }

        fn sleep_ms(&self, ms: u32) {
            self.0.set(self.0.get() + u64::from(ms));
        }
    }

    /// Sends into the void.
    struct Blackhole;

    impl IpLayer for Blackhole {
        fn send(&self, _dest: Ipv4Addr, _protocol: u8, _payload: &[u8]) -> Result<()> {
            Ok(())
        }
    }

    const TARGET: Ipv4Addr = Ipv4Addr::new(1, 1, 1, 1);

    fn stack() -> IcmpStack<Blackhole, StepClock> {
        let stack = IcmpStack::new(Blackhole, StepClock(Cell::new(0)));
        stack.init();
        stack
    }

    #[test]
    fn test_unanswered_blocking_ping_loses_everything() {
        let stack = stack();
        let stats = stack.ping(TARGET, 3, 100).unwrap();

        assert_eq!(stats.packets_sent, 3);
        assert_eq!(stats.packets_received, 0);
        assert_eq!(stats.packets_lost, 3);
        assert_eq!(stats.rtt_avg, 0);
        assert!(!stats.active);
        assert!(!stack.is_active());
    }

    #[test]
    fn test_ping_before_init() {
        let stack = IcmpStack::new(Blackhole, StepClock(Cell::new(0)));
        assert_eq!(stack.ping(TARGET, 1, 10), Err(IcmpError::NotInitialized));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let stack = stack();
        let config = PingConfig {
            payload_size: (ICMP_MAX_ECHO_DATA + 1) as u16,
            ..PingConfig::quick()
        };
        assert_eq!(stack.ping_with(TARGET, config), Err(IcmpError::Invalid));
        assert!(!stack.is_active());
    }

    #[test]
    fn test_stop_without_session() {
        let stack = stack();
        assert_eq!(stack.ping_stop(), Err(IcmpError::Invalid));
    }

    #[test]
    fn test_start_sends_first_echo_immediately() {
        let stack = stack();
        stack.ping_start(TARGET).unwrap();

        assert!(stack.is_active());
        assert_eq!(stack.stats().packets_sent, 1);
        assert_eq!(stack.stats().dest, TARGET);

        let stats = stack.ping_stop().unwrap();
        assert_eq!(stats.packets_lost, 1);
        assert!(!stack.is_active());
    }
}
