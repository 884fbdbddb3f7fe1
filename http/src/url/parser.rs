//! URL parser for HTTP URLs.
//!
//! Parses URLs in the format: `http://host[:port][/path]`
//!
//! # Examples
//!
//! ```ignore
//! use kestrel_http::url::parse_url;
//!
//! let url = parse_url("http://example.com:8080/path?query=value").unwrap();
//! assert_eq!(url.host, "example.com");
//! assert_eq!(url.port, 8080);
//! assert_eq!(url.path, "/path?query=value");
//! ```

use alloc::string::{String, ToString};

use crate::error::{HttpError, Result};
use crate::types::{HTTP_DEFAULT_PORT, HTTP_MAX_HOST_LEN, HTTP_MAX_PATH_LEN, HTTP_MAX_URL_LEN};
use crate::utils::{eq_ignore_case, parse_decimal};

const SCHEME_PREFIX: &str = "http://";

/// Components of an `http://` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    /// Host name or dotted IPv4 address.
    pub host: String,
    /// Port number (80 when absent).
    pub port: u16,
    /// Path plus any query string (default "/").
    pub path: String,
}

impl ParsedUrl {
    /// Value for the Host header: the port is left out when it is 80.
    pub fn host_header(&self) -> String {
        if self.port == HTTP_DEFAULT_PORT {
            self.host.clone()
        } else {
            alloc::format!("{}:{}", self.host, self.port)
        }
    }
}

impl core::fmt::Display for ParsedUrl {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}{}", SCHEME_PREFIX, self.host_header())?;
        f.write_str(&self.path)
    }
}

/// Parse a URL string.
///
/// Supports formats:
/// - `http://host`
/// - `http://host:port`
/// - `http://host/path`
/// - `http://host:port/path`
///
/// A missing or non-numeric port falls back to 80.
///
/// # Errors
///
/// Returns `HttpError::InvalidUrl` if:
/// - The URL is empty or too long
/// - The scheme is missing or not `http`
/// - The host is empty or too long
/// - The host or path contains a space, control byte or DEL
/// - A numeric port is outside 1..=65535
/// - The path is too long
pub fn parse_url(url: &str) -> Result<ParsedUrl> {
    if url.is_empty() || url.len() >= HTTP_MAX_URL_LEN {
        return Err(HttpError::InvalidUrl);
    }

    let scheme = url.get(..SCHEME_PREFIX.len()).ok_or(HttpError::InvalidUrl)?;
    if !eq_ignore_case(scheme, SCHEME_PREFIX) {
        return Err(HttpError::InvalidUrl);
    }
    let rest = &url[SCHEME_PREFIX.len()..];

    // Host runs up to ':' or '/'
    let host_end = rest.find(|c: char| c == ':' || c == '/').unwrap_or(rest.len());
    let host = &rest[..host_end];
    if host.is_empty() || host.len() >= HTTP_MAX_HOST_LEN || !is_wire_safe(host) {
        return Err(HttpError::InvalidUrl);
    }

    let after_host = &rest[host_end..];
    let (port, path) = match after_host.strip_prefix(':') {
        Some(port_and_path) => {
            let port_end = port_and_path.find('/').unwrap_or(port_and_path.len());
            let port = parse_port(&port_and_path[..port_end])?;
            (port, &port_and_path[port_end..])
        }
        None => (HTTP_DEFAULT_PORT, after_host),
    };

    let path = if path.is_empty() { "/" } else { path };
    if path.len() >= HTTP_MAX_PATH_LEN || !is_wire_safe(path) {
        return Err(HttpError::InvalidUrl);
    }

    Ok(ParsedUrl {
        host: host.to_string(),
        port,
        path: path.to_string(),
    })
}

/// Host and path go verbatim into the request line and `Host` header.
fn is_wire_safe(text: &str) -> bool {
    text.bytes().all(|b| b > 0x20 && b != 0x7F)
}

/// Digits give a port that must be 1..=65535; anything else means "default".
fn parse_port(text: &str) -> Result<u16> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(HTTP_DEFAULT_PORT);
    }
    match parse_decimal(text) {
        Some(port @ 1..=65535) => Ok(port as u16),
        _ => Err(HttpError::InvalidUrl),
    }
}
