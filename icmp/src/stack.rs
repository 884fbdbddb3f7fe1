//! ICMP engine: outbound messages, inbound dispatch, shared state
//!
//! All mutable state lives in one [`IcmpState`] behind a `spin::Mutex`.
//! The lock is released before calling into the IP layer or the clock, so a
//! loopback IP layer may feed packets straight back into [`IcmpStack::input`].

use alloc::vec::Vec;
use core::net::Ipv4Addr;
use core::sync::atomic::{AtomicBool, Ordering};

use spin::Mutex;

use crate::error::{DecodeError, IcmpError, Result};
use crate::packet::{
    self, ErrorMessage, IcmpMessage, IcmpType, UnreachableCode, ICMP_MAX_ECHO_DATA,
    ICMP_MAX_PAYLOAD, ICMP_PROTOCOL,
};
use crate::pending::PendingTable;
use crate::pinger::PingSession;
use crate::platform::{Clock, IpLayer};
use crate::types::{IcmpCounters, PingConfig, PingStats};

pub(crate) struct IcmpState {
    pub(crate) initialized: bool,
    pub(crate) pending: PendingTable,
    /// The running ping session, if any
    pub(crate) session: Option<PingSession>,
    pub(crate) stats: PingStats,
    pub(crate) counters: IcmpCounters,
    next_identifier: u16,
}

impl IcmpState {
    const fn new() -> Self {
        Self {
            initialized: false,
            pending: PendingTable::new(),
            session: None,
            stats: PingStats::new(),
            counters: IcmpCounters {
                rx_packets: 0,
                rx_echo_requests: 0,
                rx_echo_replies: 0,
                rx_dest_unreachable: 0,
                rx_time_exceeded: 0,
                rx_unknown: 0,
                rx_checksum_errors: 0,
                rx_truncated: 0,
                rx_unmatched: 0,
                tx_echo_requests: 0,
                tx_echo_replies: 0,
                tx_dest_unreachable: 0,
                tx_time_exceeded: 0,
                tx_failures: 0,
                timeouts: 0,
            },
            next_identifier: 0,
        }
    }

    /// True when `identifier` belongs to the running session.
    pub(crate) fn owns(&self, identifier: u16) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.identifier == identifier)
    }

    /// Identifier for a new session, mixed so consecutive sessions differ
    /// in more than the low bit.
    pub(crate) fn allocate_identifier(&mut self) -> u16 {
        self.next_identifier = self.next_identifier.wrapping_add(1);
        self.next_identifier.wrapping_mul(31421).wrapping_add(6927)
    }

    /// Reclaim expired echoes, counting the session's own as lost.
    pub(crate) fn sweep_expired(&mut self, now: u64) -> usize {
        let session = self.session.as_ref().map(|session| session.identifier);
        let stats = &mut self.stats;
        let reclaimed = self.pending.sweep_expired(now, |entry| {
            if Some(entry.identifier) == session {
                log::debug!(
                    "ping {}: seq={} timed out after {} ms",
                    entry.dest,
                    entry.sequence,
                    entry.timeout_ms
                );
                stats.record_lost();
            }
        });
        self.counters.timeouts = self.counters.timeouts.saturating_add(reclaimed as u32);
        reclaimed
    }

    /// End the running session: in-flight echoes count as lost, stats are
    /// finalised. Returns the final snapshot.
    pub(crate) fn finish_session(&mut self, now: u64) -> PingStats {
        if let Some(session) = self.session.take() {
            let in_flight = self.pending.remove_identifier(session.identifier);
            for _ in 0..in_flight {
                self.stats.record_lost();
            }
            self.stats.finish(now);
        }
        self.stats
    }

    fn record_drop(&mut self, src: Ipv4Addr, err: DecodeError) {
        match err {
            DecodeError::Truncated => self.counters.rx_truncated += 1,
            DecodeError::ChecksumMismatch => self.counters.rx_checksum_errors += 1,
        }
        log::debug!("icmp: dropped packet from {}: {}", src, err);
    }

    fn handle_echo_reply(&mut self, src: Ipv4Addr, identifier: u16, sequence: u16, now: u64) {
        // Anything already past its timeout is lost, not late
        self.sweep_expired(now);

        let Some(entry) = self.pending.take(src, identifier, sequence) else {
            self.counters.rx_unmatched += 1;
            log::debug!("icmp: unsolicited echo reply from {} id={} seq={}", src, identifier, sequence);
            return;
        };

        let rtt = now.saturating_sub(entry.send_time).min(u64::from(u32::MAX)) as u32;
        if self.owns(identifier) {
            self.stats.record_reply(rtt);
        }
        log::debug!("icmp: reply from {} seq={} time={} ms", src, sequence, rtt);
    }

    fn handle_error_report(&mut self, src: Ipv4Addr, kind: IcmpType, report: &ErrorMessage<'_>) {
        let entry = report
            .quoted_echo()
            .and_then(|quoted| self.pending.take(quoted.dest, quoted.identifier, quoted.sequence));

        let Some(entry) = entry else {
            self.counters.rx_unmatched += 1;
            log::debug!("icmp: {} from {} matches no pending echo", kind.as_str(), src);
            return;
        };

        if self.owns(entry.identifier) {
            self.stats.record_error();
        }
        let reason = match kind {
            IcmpType::DestUnreachable => packet::unreachable_code_to_string(report.code),
            _ => packet::time_exceeded_code_to_string(report.code),
        };
        log::warn!(
            "icmp: {} reported by {} for echo to {} seq={} ({})",
            kind.as_str(),
            src,
            entry.dest,
            entry.sequence,
            reason
        );
    }
}

/// ICMP engine bound to an IP layer and a clock.
///
/// Shared by reference between the receive path (`input`), the timer
/// (`poll`) and whoever runs pings; every method takes `&self`.
pub struct IcmpStack<L, C> {
    pub(crate) ip: L,
    pub(crate) clock: C,
    pub(crate) config: PingConfig,
    /// Mirrors `state.session.is_some()` for lock-free `is_active`
    pub(crate) active: AtomicBool,
    pub(crate) state: Mutex<IcmpState>,
}

impl<L: IpLayer, C: Clock> IcmpStack<L, C> {
    pub fn new(ip: L, clock: C) -> Self {
        Self::with_config(ip, clock, PingConfig::default())
    }

    /// `config` supplies the interval, payload size and timeout used by
    /// `ping` and `ping_start`.
    pub fn with_config(ip: L, clock: C, config: PingConfig) -> Self {
        Self {
            ip,
            clock,
            config: config.normalized(),
            active: AtomicBool::new(false),
            state: Mutex::new(IcmpState::new()),
        }
    }

    /// Reset all state and start accepting traffic.
    ///
    /// Any running session is dropped without finalising its stats.
    pub fn init(&self) {
        let mut state = self.state.lock();
        *state = IcmpState {
            initialized: true,
            next_identifier: state.next_identifier,
            ..IcmpState::new()
        };
        self.active.store(false, Ordering::Release);
        log::info!("icmp: initialized ({} pending slots)", crate::PING_MAX_OUTSTANDING);
    }

    pub fn config(&self) -> &PingConfig {
        &self.config
    }

    pub fn ip_layer(&self) -> &L {
        &self.ip
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub(crate) fn ensure_initialized(&self) -> Result<()> {
        if self.state.lock().initialized {
            Ok(())
        } else {
            Err(IcmpError::NotInitialized)
        }
    }

    /// Send an untracked echo request.
    pub fn send_echo_request(
        &self,
        dest: Ipv4Addr,
        identifier: u16,
        sequence: u16,
        payload: &[u8],
    ) -> Result<()> {
        self.ensure_initialized()?;
        let message = encode_echo_message(IcmpType::EchoRequest, identifier, sequence, payload)?;
        self.transmit(dest, &message)?;
        self.state.lock().counters.tx_echo_requests += 1;
        Ok(())
    }

    /// Answer an echo request, mirroring its identifier, sequence and data.
    pub fn send_echo_reply(
        &self,
        dest: Ipv4Addr,
        identifier: u16,
        sequence: u16,
        payload: &[u8],
    ) -> Result<()> {
        self.ensure_initialized()?;
        let message = encode_echo_message(IcmpType::EchoReply, identifier, sequence, payload)?;
        self.transmit(dest, &message)?;
        self.state.lock().counters.tx_echo_replies += 1;
        Ok(())
    }

    /// Report an undeliverable datagram back to `dest`.
    ///
    /// `original` is the offending IP datagram starting at its header.
    pub fn send_dest_unreachable(&self, dest: Ipv4Addr, code: u8, original: &[u8]) -> Result<()> {
        self.ensure_initialized()?;
        if UnreachableCode::from_u8(code).is_none() || original.is_empty() {
            return Err(IcmpError::Invalid);
        }
        let message = encode_error_message(IcmpType::DestUnreachable, code, original)?;
        self.transmit(dest, &message)?;
        self.state.lock().counters.tx_dest_unreachable += 1;
        Ok(())
    }

    /// Report an expired TTL (code 0) or reassembly timeout (code 1).
    pub fn send_time_exceeded(&self, dest: Ipv4Addr, code: u8, original: &[u8]) -> Result<()> {
        self.ensure_initialized()?;
        if packet::TimeExceededCode::from_u8(code).is_none() || original.is_empty() {
            return Err(IcmpError::Invalid);
        }
        let message = encode_error_message(IcmpType::TimeExceeded, code, original)?;
        self.transmit(dest, &message)?;
        self.state.lock().counters.tx_time_exceeded += 1;
        Ok(())
    }

    /// Entry point for ICMP packets delivered by the IP layer.
    ///
    /// `packet` is the ICMP message without its IP header. Packets that are
    /// truncated or fail the checksum are counted and dropped with
    /// `Invalid`; unknown types are ignored.
    pub fn input(&self, src: Ipv4Addr, packet: &[u8]) -> Result<()> {
        let now = self.clock.now_ms();

        let echo_request = {
            let mut state = self.state.lock();
            if !state.initialized {
                return Err(IcmpError::NotInitialized);
            }
            state.counters.rx_packets += 1;

            let message = match packet::decode(packet) {
                Ok(message) => message,
                Err(err) => {
                    state.record_drop(src, err);
                    return Err(err.into());
                }
            };

            match message {
                IcmpMessage::EchoRequest(echo) => {
                    state.counters.rx_echo_requests += 1;
                    Some(echo)
                }
                IcmpMessage::EchoReply(echo) => {
                    state.counters.rx_echo_replies += 1;
                    state.handle_echo_reply(src, echo.identifier, echo.sequence, now);
                    None
                }
                IcmpMessage::DestUnreachable(report) => {
                    state.counters.rx_dest_unreachable += 1;
                    state.handle_error_report(src, IcmpType::DestUnreachable, &report);
                    None
                }
                IcmpMessage::TimeExceeded(report) => {
                    state.counters.rx_time_exceeded += 1;
                    state.handle_error_report(src, IcmpType::TimeExceeded, &report);
                    None
                }
                IcmpMessage::Other { icmp_type, code } => {
                    state.counters.rx_unknown += 1;
                    log::debug!(
                        "icmp: ignoring {} (type={} code={}) from {}",
                        packet::type_to_string(icmp_type),
                        icmp_type,
                        code,
                        src
                    );
                    None
                }
            }
        };

        match echo_request {
            Some(echo) => self.send_echo_reply(src, echo.identifier, echo.sequence, echo.payload),
            None => Ok(()),
        }
    }

    /// Snapshot of the traffic counters.
    pub fn counters(&self) -> IcmpCounters {
        self.state.lock().counters
    }

    /// Log counters, pending table usage and the current session.
    pub fn debug_stats(&self) {
        let (counters, stats, pending, session) = {
            let state = self.state.lock();
            (
                state.counters,
                state.stats,
                state.pending.active_count(),
                state.session.map(|session| (session.mode, session.dest, session.identifier)),
            )
        };

        log::info!(
            "icmp rx: {} packets ({} echo req, {} echo reply, {} unreachable, {} time exceeded, {} unknown)",
            counters.rx_packets,
            counters.rx_echo_requests,
            counters.rx_echo_replies,
            counters.rx_dest_unreachable,
            counters.rx_time_exceeded,
            counters.rx_unknown
        );
        log::info!(
            "icmp rx drops: {} checksum, {} truncated, {} unmatched",
            counters.rx_checksum_errors,
            counters.rx_truncated,
            counters.rx_unmatched
        );
        log::info!(
            "icmp tx: {} echo req, {} echo reply, {} unreachable, {} time exceeded, {} failed",
            counters.tx_echo_requests,
            counters.tx_echo_replies,
            counters.tx_dest_unreachable,
            counters.tx_time_exceeded,
            counters.tx_failures
        );
        log::info!(
            "icmp pending: {}/{} slots, {} timeouts",
            pending,
            crate::PING_MAX_OUTSTANDING,
            counters.timeouts
        );
        match session {
            Some((mode, dest, identifier)) => log::info!(
                "ping {:?} to {} (id={:#06x}): sent={} recv={} lost={} errors={}",
                mode,
                dest,
                identifier,
                stats.packets_sent,
                stats.packets_received,
                stats.packets_lost,
                stats.errors
            ),
            None => log::info!("ping: idle"),
        }
    }

    /// Hand a sealed ICMP message to the IP layer, counting failures.
    pub(crate) fn transmit(&self, dest: Ipv4Addr, message: &[u8]) -> Result<()> {
        self.ip.send(dest, ICMP_PROTOCOL, message).map_err(|err| {
            self.state.lock().counters.tx_failures += 1;
            log::warn!("icmp: send to {} failed: {}", dest, err);
            err
        })
    }
}

/// Zeroed buffer of `len` bytes, NoMemory if the allocator refuses.
pub(crate) fn alloc_buffer(len: usize) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| IcmpError::NoMemory)?;
    buffer.resize(len, 0);
    Ok(buffer)
}

pub(crate) fn encode_echo_message(
    icmp_type: IcmpType,
    identifier: u16,
    sequence: u16,
    payload: &[u8],
) -> Result<Vec<u8>> {
    // Replies mirror whatever a verified request carried; only echoes we
    // originate are held to a single unfragmented frame.
    let limit = match icmp_type {
        IcmpType::EchoReply => ICMP_MAX_PAYLOAD,
        _ => ICMP_MAX_ECHO_DATA,
    };
    if payload.len() > limit {
        return Err(IcmpError::Invalid);
    }
    let mut buffer = alloc_buffer(packet::echo_len(payload.len()))?;
    packet::encode_echo(&mut buffer, icmp_type, identifier, sequence, payload)?;
    Ok(buffer)
}

fn encode_error_message(icmp_type: IcmpType, code: u8, original: &[u8]) -> Result<Vec<u8>> {
    let mut buffer = alloc_buffer(packet::error_len(original))?;
    packet::encode_error(&mut buffer, icmp_type, code, original)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::{Cell, RefCell};

    struct FixedClock(Cell<u64>);

    impl Clock for FixedClock {
        fn now_ms(&self) -> u64 {
            self.0.get()
        }

        fn sleep_ms(&self, ms: u32) {
            self.0.set(self.0.get() + u64::from(ms));
        }
    }

    #[derive(Default)]
    struct Capture {
        sent: RefCell<Vec<(Ipv4Addr, Vec<u8>)>>,
        fail: Cell<bool>,
    }

    impl IpLayer for Capture {
        fn send(&self, dest: Ipv4Addr, protocol: u8, payload: &[u8]) -> Result<()> {
            assert_eq!(protocol, ICMP_PROTOCOL);
            if self.fail.get() {
                return Err(IcmpError::NoRoute);
            }
            self.sent.borrow_mut().push((dest, payload.to_vec()));
            Ok(())
        }
    }

    const PEER: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 1);

    fn stack() -> IcmpStack<Capture, FixedClock> {
        let stack = IcmpStack::new(Capture::default(), FixedClock(Cell::new(0)));
        stack.init();
        stack
    }

    #[test]
    fn test_not_initialized() {
        let stack = IcmpStack::new(Capture::default(), FixedClock(Cell::new(0)));
        assert_eq!(
            stack.send_echo_request(PEER, 1, 1, b""),
            Err(IcmpError::NotInitialized)
        );
        assert_eq!(stack.input(PEER, &[0u8; 8]), Err(IcmpError::NotInitialized));
    }

    #[test]
    fn test_echo_payload_limit() {
        let stack = stack();
        let big = alloc::vec![0u8; ICMP_MAX_ECHO_DATA + 1];
        assert_eq!(stack.send_echo_request(PEER, 1, 1, &big), Err(IcmpError::Invalid));
        assert!(stack.send_echo_request(PEER, 1, 1, &big[..ICMP_MAX_ECHO_DATA]).is_ok());
        assert_eq!(stack.counters().tx_echo_requests, 1);

        // Replies are bounded by the IP payload, not the ping frame size
        assert!(stack.send_echo_reply(PEER, 1, 1, &big).is_ok());
        let huge = alloc::vec![0u8; ICMP_MAX_PAYLOAD + 1];
        assert_eq!(stack.send_echo_reply(PEER, 1, 1, &huge), Err(IcmpError::Invalid));
    }

    #[test]
    fn test_send_failure_is_counted() {
        let stack = stack();
        stack.ip_layer().fail.set(true);

        assert_eq!(stack.send_echo_reply(PEER, 1, 1, b"x"), Err(IcmpError::NoRoute));
        assert_eq!(stack.counters().tx_failures, 1);
        assert_eq!(stack.counters().tx_echo_replies, 0);
    }

    #[test]
    fn test_error_message_argument_checks() {
        let stack = stack();
        let original = [0x45u8; 28];

        assert_eq!(stack.send_dest_unreachable(PEER, 16, &original), Err(IcmpError::Invalid));
        assert!(stack.send_dest_unreachable(PEER, 14, &original).is_ok());
        assert_eq!(stack.send_dest_unreachable(PEER, 3, &[]), Err(IcmpError::Invalid));
        assert_eq!(stack.send_time_exceeded(PEER, 2, &original), Err(IcmpError::Invalid));

        assert!(stack.send_dest_unreachable(PEER, 3, &original).is_ok());
        assert!(stack.send_time_exceeded(PEER, 0, &original).is_ok());

        let sent = stack.ip_layer().sent.borrow();
        assert_eq!(sent[0].1[..2], [IcmpType::DestUnreachable as u8, 14]);
        assert_eq!(sent[1].1[..2], [IcmpType::DestUnreachable as u8, 3]);
        assert_eq!(sent[2].1[0], IcmpType::TimeExceeded as u8);
    }

    #[test]
    fn test_truncated_input_dropped() {
        let stack = stack();
        assert_eq!(stack.input(PEER, &[8, 0, 0]), Err(IcmpError::Invalid));
        assert_eq!(stack.counters().rx_truncated, 1);
        assert!(stack.ip_layer().sent.borrow().is_empty());
    }

    #[test]
    fn test_identifiers_differ() {
        let mut state = IcmpState::new();
        let a = state.allocate_identifier();
        let b = state.allocate_identifier();
        assert_ne!(a, b);
    }

    #[test]
    fn test_init_resets_counters() {
        let stack = stack();
        stack.send_echo_request(PEER, 1, 1, b"").unwrap();
        stack.init();
        assert_eq!(stack.counters(), IcmpCounters::default());
    }
}
