//! Pending-echo table
//!
//! Fixed array of slots, one per echo request still waiting for its reply.
//! A slot is keyed by (destination, identifier, sequence) and carries the
//! timeout of the request that created it, so the expiry sweep does not need
//! to know which session owns it.

use core::net::Ipv4Addr;

use crate::error::{IcmpError, Result};
use crate::types::PING_MAX_OUTSTANDING;

/// One outstanding echo request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEcho {
    pub dest: Ipv4Addr,
    pub identifier: u16,
    pub sequence: u16,
    /// Clock ms when the request was handed to the IP layer
    pub send_time: u64,
    pub timeout_ms: u32,
    pub active: bool,
}

impl PendingEcho {
    const EMPTY: Self = Self {
        dest: Ipv4Addr::UNSPECIFIED,
        identifier: 0,
        sequence: 0,
        send_time: 0,
        timeout_ms: 0,
        active: false,
    };

    fn matches(&self, dest: Ipv4Addr, identifier: u16, sequence: u16) -> bool {
        self.active
            && self.dest == dest
            && self.identifier == identifier
            && self.sequence == sequence
    }

    /// Strictly older than its timeout at `now`.
    pub fn is_expired(&self, now: u64) -> bool {
        self.active && now.saturating_sub(self.send_time) > u64::from(self.timeout_ms)
    }
}

#[derive(Debug, Clone)]
pub struct PendingTable {
    slots: [PendingEcho; PING_MAX_OUTSTANDING],
}

impl Default for PendingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingTable {
    pub const fn new() -> Self {
        Self {
            slots: [PendingEcho::EMPTY; PING_MAX_OUTSTANDING],
        }
    }

    /// Claim a free slot. Busy when every slot is in use.
    pub fn allocate(
        &mut self,
        dest: Ipv4Addr,
        identifier: u16,
        sequence: u16,
        send_time: u64,
        timeout_ms: u32,
    ) -> Result<()> {
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| !slot.active)
            .ok_or(IcmpError::Busy)?;

        *slot = PendingEcho {
            dest,
            identifier,
            sequence,
            send_time,
            timeout_ms,
            active: true,
        };
        Ok(())
    }

    /// Release the slot matching the key and return what it held.
    pub fn take(&mut self, dest: Ipv4Addr, identifier: u16, sequence: u16) -> Option<PendingEcho> {
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.matches(dest, identifier, sequence))?;
        let entry = *slot;
        slot.active = false;
        Some(entry)
    }

    pub fn contains(&self, dest: Ipv4Addr, identifier: u16, sequence: u16) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.matches(dest, identifier, sequence))
    }

    /// Free every slot older than its timeout, calling `on_expired` for each.
    ///
    /// Returns the number of slots reclaimed.
    pub fn sweep_expired<F>(&mut self, now: u64, mut on_expired: F) -> usize
    where
        F: FnMut(&PendingEcho),
    {
        let mut reclaimed = 0;
        for slot in self.slots.iter_mut().filter(|slot| slot.is_expired(now)) {
            slot.active = false;
            on_expired(slot);
            reclaimed += 1;
        }
        reclaimed
    }

    /// Free every slot belonging to `identifier`, returning how many there were.
    pub fn remove_identifier(&mut self, identifier: u16) -> usize {
        let mut removed = 0;
        for slot in self
            .slots
            .iter_mut()
            .filter(|slot| slot.active && slot.identifier == identifier)
        {
            slot.active = false;
            removed += 1;
        }
        removed
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.active).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEST: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

    #[test]
    fn test_allocate_and_take() {
        let mut table = PendingTable::new();
        table.allocate(DEST, 7, 0, 100, 1000).unwrap();

        assert!(table.contains(DEST, 7, 0));
        assert!(!table.contains(DEST, 7, 1));
        assert!(!table.contains(Ipv4Addr::new(10, 0, 0, 2), 7, 0));

        let entry = table.take(DEST, 7, 0).unwrap();
        assert_eq!(entry.send_time, 100);
        assert_eq!(table.active_count(), 0);
        assert!(table.take(DEST, 7, 0).is_none());
    }

    #[test]
    fn test_full_table_is_busy() {
        let mut table = PendingTable::new();
        for seq in 0..PING_MAX_OUTSTANDING as u16 {
            table.allocate(DEST, 1, seq, 0, 1000).unwrap();
        }

        assert_eq!(table.active_count(), PING_MAX_OUTSTANDING);
        assert_eq!(table.allocate(DEST, 1, 99, 0, 1000), Err(IcmpError::Busy));

        table.take(DEST, 1, 3).unwrap();
        assert!(table.allocate(DEST, 1, 99, 0, 1000).is_ok());
    }

    #[test]
    fn test_sweep_reclaims_every_unanswered_slot() {
        let mut table = PendingTable::new();
        for seq in 0..5 {
            table.allocate(DEST, 1, seq, 0, 100).unwrap();
        }

        // Exactly at the timeout is not yet expired
        assert_eq!(table.sweep_expired(100, |_| {}), 0);

        let mut seen = 0u32;
        assert_eq!(table.sweep_expired(101, |_| seen += 1), 5);
        assert_eq!(seen, 5);
        assert_eq!(table.active_count(), 0);
    }

    #[test]
    fn test_sweep_uses_each_slot_timeout() {
        let mut table = PendingTable::new();
        table.allocate(DEST, 1, 0, 0, 50).unwrap();
        table.allocate(DEST, 1, 1, 0, 500).unwrap();

        assert_eq!(table.sweep_expired(60, |e| assert_eq!(e.sequence, 0)), 1);
        assert!(table.contains(DEST, 1, 1));
    }

    #[test]
    fn test_remove_identifier() {
        let mut table = PendingTable::new();
        table.allocate(DEST, 1, 0, 0, 100).unwrap();
        table.allocate(DEST, 1, 1, 0, 100).unwrap();
        table.allocate(DEST, 2, 0, 0, 100).unwrap();

        assert_eq!(table.remove_identifier(1), 2);
        assert_eq!(table.active_count(), 1);
        assert!(table.contains(DEST, 2, 0));
    }
}
