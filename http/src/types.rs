//! Shared HTTP types and limits

// ═══════════════════════════════════════════════════════════════════════════
// Limits
// ═══════════════════════════════════════════════════════════════════════════

pub const HTTP_DEFAULT_PORT: u16 = 80;
pub const HTTP_MAX_HEADERS: usize = 32;
pub const HTTP_MAX_HEADER_NAME: usize = 64;
pub const HTTP_MAX_HEADER_VALUE: usize = 256;
pub const HTTP_MAX_URL_LEN: usize = 2048;
pub const HTTP_MAX_HOST_LEN: usize = 256;
pub const HTTP_MAX_PATH_LEN: usize = 1024;
pub const HTTP_MAX_STATUS_TEXT: usize = 64;
/// Receive buffer size; also the longest header line accepted
pub const HTTP_BUFFER_SIZE: usize = 8192;
pub const HTTP_MAX_BODY_SIZE: usize = 1024 * 1024;
pub const HTTP_TIMEOUT_MS: u32 = 30_000;
pub const HTTP_POLL_INTERVAL_MS: u32 = 10;

pub const HTTP_VERSION: &str = "HTTP/1.1";
pub const DEFAULT_USER_AGENT: &str = "Kestrel/1.0";

// ═══════════════════════════════════════════════════════════════════════════
// HTTP Types
// ═══════════════════════════════════════════════════════════════════════════

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Head,
    Put,
    Delete,
}

impl HttpMethod {
    /// Get the method name as a string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Head => "HEAD",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether responses to this method carry a body; false only for HEAD.
    pub const fn expects_body(&self) -> bool {
        !matches!(self, HttpMethod::Head)
    }
}

impl core::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    /// Default per-request timeout (ms), covering connect through last byte
    pub timeout_ms: u32,
    /// Largest response body accepted
    pub max_body_size: usize,
    /// Size of the receive buffer handed to the transport
    pub buffer_size: usize,
    /// Sent by the `get`/`post`/`head` helpers
    pub user_agent: &'static str,
    /// Pause between receive attempts while the transport would block
    pub poll_interval_ms: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: HTTP_TIMEOUT_MS,
            max_body_size: HTTP_MAX_BODY_SIZE,
            buffer_size: HTTP_BUFFER_SIZE,
            user_agent: DEFAULT_USER_AGENT,
            poll_interval_ms: HTTP_POLL_INTERVAL_MS,
        }
    }
}

impl HttpConfig {
    /// Small buffers and a short deadline, for health checks on a LAN.
    pub fn constrained() -> Self {
        Self {
            timeout_ms: 5_000,
            max_body_size: 64 * 1024,
            buffer_size: 1024,
            user_agent: DEFAULT_USER_AGENT,
            poll_interval_ms: HTTP_POLL_INTERVAL_MS,
        }
    }
}
