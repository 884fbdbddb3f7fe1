//! Monotonic time for request deadlines.
//!
//! The client never reads hardware timers itself; the embedder supplies a
//! millisecond clock. A plain `fn() -> u64` works, so firmware can hand
//! over its existing timer function.

/// Monotonic millisecond clock.
pub trait Clock {
    fn now_ms(&self) -> u64;

    /// Wait roughly `ms` before the client polls a transport that would
    /// block again. The default returns at once.
    fn sleep_ms(&self, _ms: u32) {}
}

impl<F: Fn() -> u64> Clock for F {
    fn now_ms(&self) -> u64 {
        self()
    }
}

/// A point in time after which an operation has timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    expires_at: u64,
}

impl Deadline {
    pub fn after(now: u64, timeout_ms: u32) -> Self {
        Self {
            expires_at: now.saturating_add(u64::from(timeout_ms)),
        }
    }

    /// Milliseconds left, saturating at zero. Fits in `u32` by construction.
    pub fn remaining_ms(&self, now: u64) -> u32 {
        self.expires_at.saturating_sub(now).min(u64::from(u32::MAX)) as u32
    }

    pub fn expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}
