//! Body transfer decoding.
//!
//! Provides the chunked transfer encoding decoder used by the response
//! parser.

pub mod chunked;

pub use chunked::{ChunkedDecoder, DecoderState};
