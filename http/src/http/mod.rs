//! HTTP/1.1 message handling.
//!
//! - `headers` - bounded, order-preserving header list
//! - `request` - request building and serialization
//! - `response` - parsed response
//! - `parser` - incremental response parser

pub mod headers;
pub mod parser;
pub mod request;
pub mod response;

pub use headers::{Header, Headers};
pub use parser::{parse_response, ParseStatus, ResponseParser};
pub use request::HttpRequest;
pub use response::HttpResponse;
