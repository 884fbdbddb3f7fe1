//! Kestrel ICMP engine
//!
//! A no_std ICMPv4 implementation for an operating system network stack:
//! message codec, echo responder, error reporting, and a ping controller
//! with RTT statistics. It sits directly on top of the IP layer and owns no
//! hardware or timers of its own.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          IcmpStack                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌────────────┐  ┌────────────┐  ┌────────────┐  ┌───────────┐  │
//! │  │  Checksum  │  │   Packet   │  │  Pending   │  │  Pinger   │  │
//! │  │            │  │   Codec    │  │   Table    │  │           │  │
//! │  │ RFC 1071   │  │ echo 0/8   │  │ 16 slots   │  │ blocking  │  │
//! │  │ partial    │  │ errors 3/11│  │ expiry     │  │ continuous│  │
//! │  └────────────┘  └────────────┘  └────────────┘  └───────────┘  │
//! │                                                                 │
//! ├────────────────────────── collaborators ────────────────────────┤
//! │        IpLayer::send  ◄── outbound     inbound ──► input        │
//! │        Clock::now_ms / sleep_ms        timer ──► poll           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use kestrel_icmp::{IcmpStack, targets};
//!
//! let stack = IcmpStack::new(ip_layer, clock);
//! stack.init();
//!
//! // IP receive path, for every protocol-1 datagram:
//! stack.input(src, icmp_bytes)?;
//!
//! let stats = stack.ping(targets::CLOUDFLARE, 4, 1000)?;
//! if stats.has_connectivity() {
//!     log::info!("avg rtt {} ms", stats.rtt_avg);
//! }
//! ```

#![no_std]
#![forbid(unsafe_code)]

extern crate alloc;

mod checksum;
mod error;
mod packet;
mod pending;
mod pinger;
mod platform;
mod stack;
mod types;

pub use checksum::{checksum, finalize_checksum, partial_checksum, verify_checksum};
pub use error::{DecodeError, IcmpError, Result};
pub use packet::{
    decode, echo_len, encode_echo, encode_error, error_len, fill_payload, parse_ip_header,
    quoted_len, time_exceeded_code_to_string, type_to_string, unreachable_code_to_string,
    EchoMessage, ErrorMessage, IcmpHeader, IcmpMessage, IcmpType, Ipv4HeaderView, QuotedEcho,
    TimeExceededCode, UnreachableCode, ICMP_DEFAULT_PAYLOAD, ICMP_HEADER_LEN,
    ICMP_MAX_ECHO_DATA, ICMP_MAX_PAYLOAD, ICMP_PROTOCOL, IP_HEADER_MIN_LEN,
};
pub use pending::{PendingEcho, PendingTable};
pub use pinger::PingMode;
pub use platform::{Clock, IpLayer};
pub use stack::IcmpStack;
pub use types::{
    IcmpCounters, PingConfig, PingStats, PING_DEFAULT_COUNT, PING_DEFAULT_INTERVAL_MS,
    PING_DEFAULT_TIMEOUT_MS, PING_MAX_OUTSTANDING, PING_POLL_INTERVAL_MS,
};

/// Well-known ping targets
pub mod targets {
    use core::net::Ipv4Addr;

    /// Cloudflare DNS
    pub const CLOUDFLARE: Ipv4Addr = Ipv4Addr::new(1, 1, 1, 1);

    /// Google DNS
    pub const GOOGLE: Ipv4Addr = Ipv4Addr::new(8, 8, 8, 8);

    /// Quad9 DNS
    pub const QUAD9: Ipv4Addr = Ipv4Addr::new(9, 9, 9, 9);
}
