//! HTTP client error types

use core::fmt;

pub type Result<T> = core::result::Result<T, HttpError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    InvalidUrl,
    DnsFailed,
    ConnectFailed,
    SendFailed,
    RecvFailed,
    Timeout,
    NoMemory,
    /// Malformed status line, header line or chunk size
    ParseFailed,
    /// A fixed limit (buffer, header count, body cap) would be exceeded
    BufferOverflow,
    /// Connection ended before the response was complete
    InvalidResponse,
    NotInitialized,
    /// CR or LF inside a request header name or value
    InvalidHeader,
}

impl HttpError {
    /// Negative status code in the `HTTP_ERR_*` numbering.
    pub const fn code(&self) -> i32 {
        match self {
            Self::InvalidUrl => -1,
            Self::DnsFailed => -2,
            Self::ConnectFailed => -3,
            Self::SendFailed => -4,
            Self::RecvFailed => -5,
            Self::Timeout => -6,
            Self::NoMemory => -7,
            Self::ParseFailed => -8,
            Self::BufferOverflow => -9,
            Self::InvalidResponse => -10,
            Self::NotInitialized => -11,
            Self::InvalidHeader => -12,
        }
    }

    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::InvalidUrl),
            -2 => Some(Self::DnsFailed),
            -3 => Some(Self::ConnectFailed),
            -4 => Some(Self::SendFailed),
            -5 => Some(Self::RecvFailed),
            -6 => Some(Self::Timeout),
            -7 => Some(Self::NoMemory),
            -8 => Some(Self::ParseFailed),
            -9 => Some(Self::BufferOverflow),
            -10 => Some(Self::InvalidResponse),
            -11 => Some(Self::NotInitialized),
            -12 => Some(Self::InvalidHeader),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "Invalid URL",
            Self::DnsFailed => "DNS resolution failed",
            Self::ConnectFailed => "Connection failed",
            Self::SendFailed => "Send failed",
            Self::RecvFailed => "Receive failed",
            Self::Timeout => "Request timed out",
            Self::NoMemory => "Out of memory",
            Self::ParseFailed => "Failed to parse response",
            Self::BufferOverflow => "Buffer overflow",
            Self::InvalidResponse => "Invalid response from server",
            Self::NotInitialized => "HTTP client not initialized",
            Self::InvalidHeader => "Invalid header",
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Describe a raw status code; 0 is success.
pub const fn http_error_string(code: i32) -> &'static str {
    if code == 0 {
        return "Success";
    }
    match HttpError::from_code(code) {
        Some(err) => err.as_str(),
        None => "Unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for code in -12..=-1 {
            let err = HttpError::from_code(code).unwrap();
            assert_eq!(err.code(), code);
        }
        assert_eq!(HttpError::from_code(-13), None);
    }

    #[test]
    fn test_error_strings() {
        assert_eq!(http_error_string(0), "Success");
        assert_eq!(http_error_string(-6), "Request timed out");
        assert_eq!(http_error_string(42), "Unknown error");
    }
}
