//! ICMP error types

use core::fmt;

pub type Result<T> = core::result::Result<T, IcmpError>;

/// Errors surfaced by the ICMP engine and the ping controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcmpError {
    /// Could not allocate a packet buffer
    NoMemory,
    /// Invalid argument, or a malformed/unverified packet was dropped
    Invalid,
    /// Request timed out
    Timeout,
    /// Destination unreachable
    Unreachable,
    /// No route to destination
    NoRoute,
    /// A ping session is already running, or the pending table is full
    Busy,
    /// `IcmpStack::init` has not been called
    NotInitialized,
}

impl IcmpError {
    /// Negative status code in the `ICMP_ERR_*` numbering.
    pub const fn code(&self) -> i32 {
        match self {
            Self::NoMemory => -1,
            Self::Invalid => -2,
            Self::Timeout => -3,
            Self::Unreachable => -4,
            Self::NoRoute => -5,
            Self::Busy => -6,
            Self::NotInitialized => -7,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoMemory => "out of memory",
            Self::Invalid => "invalid argument",
            Self::Timeout => "request timed out",
            Self::Unreachable => "destination unreachable",
            Self::NoRoute => "no route to destination",
            Self::Busy => "too many outstanding requests",
            Self::NotInitialized => "ICMP not initialized",
        }
    }
}

impl fmt::Display for IcmpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an inbound packet was rejected before interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Shorter than the 8-byte ICMP header
    Truncated,
    /// Checksum over the received bytes did not verify
    ChecksumMismatch,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "truncated ICMP packet"),
            Self::ChecksumMismatch => write!(f, "ICMP checksum mismatch"),
        }
    }
}

impl From<DecodeError> for IcmpError {
    fn from(_: DecodeError) -> Self {
        IcmpError::Invalid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct_and_negative() {
        let all = [
            IcmpError::NoMemory,
            IcmpError::Invalid,
            IcmpError::Timeout,
            IcmpError::Unreachable,
            IcmpError::NoRoute,
            IcmpError::Busy,
            IcmpError::NotInitialized,
        ];
        for (i, a) in all.iter().enumerate() {
            assert!(a.code() < 0);
            for b in &all[i + 1..] {
                assert_ne!(a.code(), b.code());
            }
        }
    }

    #[test]
    fn test_decode_error_maps_to_invalid() {
        assert_eq!(IcmpError::from(DecodeError::ChecksumMismatch), IcmpError::Invalid);
    }
}
