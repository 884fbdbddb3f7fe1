//! HTTP request building and serialization.
//!
//! Build HTTP/1.1 requests and serialize them to wire format.
//!
//! # Examples
//!
//! ```ignore
//! use kestrel_http::{HttpMethod, HttpRequest};
//!
//! let mut request = HttpRequest::new(HttpMethod::Post, "http://example.com/api")?;
//! request.set_header("Content-Type", "application/json")?;
//! request.set_body(br#"{"id":1}"#);
//!
//! let mut buffer = [0u8; 512];
//! let len = request.build_request(&mut buffer)?;
//! ```

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use super::headers::Headers;
use crate::error::{HttpError, Result};
use crate::types::{HttpMethod, HTTP_DEFAULT_PORT, HTTP_TIMEOUT_MS, HTTP_VERSION};
use crate::url::parse_url;

/// HTTP request.
///
/// The body is borrowed from the caller and must outlive the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest<'a> {
    /// HTTP method (GET, POST, etc.).
    pub method: HttpMethod,
    /// URL as given.
    pub url: String,
    /// Host taken from the URL; empty until the URL has been parsed.
    pub host: String,
    pub port: u16,
    /// Path taken from the URL, query string included.
    pub path: String,
    /// Headers in the order they were set.
    pub headers: Headers,
    pub body: Option<&'a [u8]>,
    /// Deadline for the whole exchange (ms).
    pub timeout_ms: u32,
}

impl<'a> HttpRequest<'a> {
    /// Create a request for `url`, with no headers and no body.
    pub fn new(method: HttpMethod, url: &str) -> Result<Self> {
        let parsed = parse_url(url)?;
        Ok(Self {
            method,
            url: url.to_string(),
            host: parsed.host,
            port: parsed.port,
            path: parsed.path,
            headers: Headers::new(),
            body: None,
            timeout_ms: HTTP_TIMEOUT_MS,
        })
    }

    /// Create a GET request.
    pub fn get(url: &str) -> Result<Self> {
        Self::new(HttpMethod::Get, url)
    }

    /// Create a HEAD request.
    pub fn head(url: &str) -> Result<Self> {
        Self::new(HttpMethod::Head, url)
    }

    /// Create a POST request carrying `body`.
    pub fn post(url: &str, body: &'a [u8]) -> Result<Self> {
        let mut request = Self::new(HttpMethod::Post, url)?;
        request.set_body(body);
        Ok(request)
    }

    /// Fill host, port and path from `url` if they have not been set yet.
    pub fn resolve(&mut self) -> Result<()> {
        if !self.host.is_empty() {
            return Ok(());
        }
        let parsed = parse_url(&self.url)?;
        self.host = parsed.host;
        self.port = parsed.port;
        self.path = parsed.path;
        Ok(())
    }

    /// Append a header. Setting the same name twice sends it twice.
    ///
    /// InvalidHeader if the name or value contains CR or LF, or the name is
    /// empty or contains ':'. BufferOverflow when a header limit is reached.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let breaks_line = |s: &str| s.bytes().any(|b| b == b'\r' || b == b'\n');
        if name.is_empty() || name.contains(':') || breaks_line(name) || breaks_line(value) {
            return Err(HttpError::InvalidHeader);
        }
        self.headers.push(name, value)
    }

    /// Set a header, builder style.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        self.set_header(name, value)?;
        Ok(self)
    }

    /// Attach a borrowed body.
    pub fn set_body(&mut self, body: &'a [u8]) {
        self.body = Some(body);
    }

    pub fn set_timeout(&mut self, timeout_ms: u32) {
        self.timeout_ms = timeout_ms;
    }

    /// `host[:port]`, with the port left out when it is 80.
    pub fn host_header(&self) -> String {
        if self.port == HTTP_DEFAULT_PORT {
            self.host.clone()
        } else {
            alloc::format!("{}:{}", self.host, self.port)
        }
    }

    /// Exact number of bytes `build_request` writes.
    pub fn wire_size(&self) -> usize {
        let mut size = 0;
        self.emit(|part| size += part.len());
        size
    }

    /// Serialize the request into `buffer`, returning the length written.
    ///
    /// The size is computed first; on BufferOverflow nothing is written.
    pub fn build_request(&self, buffer: &mut [u8]) -> Result<usize> {
        let size = self.wire_size();
        if size > buffer.len() {
            return Err(HttpError::BufferOverflow);
        }

        let mut written = 0;
        self.emit(|part| {
            buffer[written..written + part.len()].copy_from_slice(part);
            written += part.len();
        });
        Ok(written)
    }

    /// Serialize the request to HTTP/1.1 wire format.
    ///
    /// Format:
    /// ```text
    /// METHOD /path HTTP/1.1\r\n
    /// Host: host[:port]\r\n
    /// Header: Value\r\n
    /// ...
    /// Content-Length: n\r\n      (when a body is present)
    /// \r\n
    /// [body]
    /// ```
    pub fn to_wire_format(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.wire_size());
        self.emit(|part| bytes.extend_from_slice(part));
        bytes
    }

    /// Walk the serialized request piece by piece.
    fn emit<F: FnMut(&[u8])>(&self, mut out: F) {
        // Request line
        out(self.method.as_str().as_bytes());
        out(b" ");
        out(self.path.as_bytes());
        out(b" ");
        out(HTTP_VERSION.as_bytes());
        out(b"\r\n");

        // Host, unless the caller set one
        if !self.headers.contains("Host") {
            out(b"Host: ");
            out(self.host_header().as_bytes());
            out(b"\r\n");
        }

        for header in self.headers.iter() {
            out(header.name.as_bytes());
            out(b": ");
            out(header.value.as_bytes());
            out(b"\r\n");
        }

        if let Some(body) = self.body {
            if !self.headers.contains("Content-Length") {
                out(b"Content-Length: ");
                out(body.len().to_string().as_bytes());
                out(b"\r\n");
            }
        }

        // Empty line to end headers
        out(b"\r\n");

        if let Some(body) = self.body {
            out(body);
        }
    }
}
