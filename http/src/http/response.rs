//! HTTP response.
//!
//! Produced by [`ResponseParser`](super::parser::ResponseParser); the body
//! is owned by the caller once a request completes.
//!
//! # Examples
//!
//! ```ignore
//! use kestrel_http::parse_response;
//!
//! let data = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nHello";
//! let response = parse_response(data).unwrap();
//! assert_eq!(response.status_code, 200);
//! assert_eq!(response.body, b"Hello");
//! ```

use alloc::string::String;
use alloc::vec::Vec;

use super::headers::Headers;

/// HTTP response.
///
/// `Default` is the empty state every failed parse leaves behind: no
/// status, no headers, and a body with zero length and zero capacity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code (e.g., 200, 404).
    pub status_code: u16,
    /// Reason phrase as sent by the server.
    pub status_text: String,
    /// Response headers, in arrival order.
    pub headers: Headers,
    /// Response body.
    pub body: Vec<u8>,
    /// Body arrived with chunked transfer encoding.
    pub chunked: bool,
    /// Content-Length header value; None when absent.
    pub content_length: Option<usize>,
}

impl HttpResponse {
    /// Release the body and reset every field.
    pub fn free(&mut self) {
        *self = Self::default();
    }

    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Bytes allocated for the body; never less than `body_len`.
    pub fn body_capacity(&self) -> usize {
        self.body.capacity()
    }

    /// Body as UTF-8 text, if it is valid.
    pub fn body_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.body).ok()
    }

    /// First header value whose name matches, ignoring case.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Check if response indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Check if response indicates redirect (3xx).
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status_code)
    }

    /// Check if response indicates client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code)
    }

    /// Check if response indicates server error (5xx).
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status_code)
    }

    /// Get default reason phrase for status code.
    pub fn default_reason(status_code: u16) -> &'static str {
        match status_code {
            100 => "Continue",
            101 => "Switching Protocols",
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            204 => "No Content",
            206 => "Partial Content",
            301 => "Moved Permanently",
            302 => "Found",
            303 => "See Other",
            304 => "Not Modified",
            307 => "Temporary Redirect",
            308 => "Permanent Redirect",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            408 => "Request Timeout",
            413 => "Content Too Large",
            416 => "Range Not Satisfiable",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            504 => "Gateway Timeout",
            _ => "Unknown",
        }
    }

    /// Status text, or the standard phrase when the server sent none.
    pub fn reason(&self) -> &str {
        if self.status_text.is_empty() {
            Self::default_reason(self.status_code)
        } else {
            &self.status_text
        }
    }
}
