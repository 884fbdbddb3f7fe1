//! URL parsing
//!
//! Only plain `http://` URLs are understood; the path is kept verbatim
//! (no percent-decoding), query string included.

pub mod parser;

pub use parser::{parse_url, ParsedUrl};
