//! Kestrel HTTP client
//!
//! Minimal HTTP/1.1 client for a bare-metal network stack: URL parsing,
//! request building, an incremental response parser with chunked and
//! Content-Length framing, and a request orchestrator over a pluggable
//! transport.
//!
//! ```text
//! HttpClient ─► HttpRequest::build_request ─► Transport::send
//!     │
//!     └──────► ResponseParser::feed ◄──────── Transport::recv
//!                    │
//!                    └─► ChunkedDecoder (Transfer-Encoding: chunked)
//! ```

#![no_std]
#![forbid(unsafe_code)]

extern crate alloc;

pub mod client;
pub mod error;
pub mod http;
pub mod time;
pub mod transfer;
pub mod types;
pub mod url;
pub mod utils;

pub use client::{HttpClient, Transport, TransportError};
pub use error::{http_error_string, HttpError, Result};
pub use http::{parse_response, Header, Headers, HttpRequest, HttpResponse, ParseStatus, ResponseParser};
pub use time::{Clock, Deadline};
pub use types::{HttpConfig, HttpMethod};
pub use url::{parse_url, ParsedUrl};
