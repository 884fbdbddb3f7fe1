//! Shared utilities for HTTP parsing and building.
//!
//! Provides:
//! - Hex/decimal parsing
//! - Case-insensitive comparison and trimming
//! - URL encoding/decoding

pub mod string;

pub use string::{eq_ignore_case, parse_decimal, parse_hex, trim_ascii, url_decode, url_encode};
