//! Collaborators the engine is driven by
//!
//! The ICMP engine never owns a NIC, a timer or an IP stack. The embedding
//! system hands it an [`IpLayer`] for outbound packets and a [`Clock`] for
//! timestamps and waits; inbound packets arrive through
//! [`IcmpStack::input`](crate::IcmpStack::input).

use core::net::Ipv4Addr;

use crate::error::Result;

/// Monotonic millisecond time source.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed point.
    fn now_ms(&self) -> u64;

    /// Yield for roughly `ms` milliseconds.
    ///
    /// On a single-threaded system this is where the network stack gets a
    /// chance to deliver packets to `input`.
    fn sleep_ms(&self, ms: u32);
}

/// Outbound IP datagram path.
pub trait IpLayer {
    /// Wrap `payload` in an IPv4 header with the given protocol and send it.
    fn send(&self, dest: Ipv4Addr, protocol: u8, payload: &[u8]) -> Result<()>;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }

    fn sleep_ms(&self, ms: u32) {
        (**self).sleep_ms(ms)
    }
}

impl<T: IpLayer + ?Sized> IpLayer for &T {
    fn send(&self, dest: Ipv4Addr, protocol: u8, payload: &[u8]) -> Result<()> {
        (**self).send(dest, protocol, payload)
    }
}
