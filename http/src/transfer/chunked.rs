//! Chunked transfer encoding decoder.
//!
//! Decodes HTTP chunked transfer encoding as defined in RFC 7230.
//!
//! # Format
//!
//! ```text
//! chunk-size (hex)[;extension]\r\n
//! chunk-data\r\n
//! ...
//! 0\r\n
//! [trailer-field\r\n]*
//! \r\n
//! ```
//!
//! # Examples
//!
//! ```ignore
//! use kestrel_http::transfer::ChunkedDecoder;
//!
//! let data = b"5\r\nHello\r\n0\r\n\r\n";
//! let result = ChunkedDecoder::decode(data, 1024).unwrap();
//! assert_eq!(result, b"Hello");
//! ```

use alloc::vec::Vec;

use crate::error::{HttpError, Result};
use crate::types::HTTP_BUFFER_SIZE;
use crate::utils::{parse_hex, trim_ascii};

/// State of the chunked decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Waiting for chunk size line.
    ReadingSize,
    /// Reading chunk data.
    ReadingData,
    /// Expecting \r after chunk data.
    ExpectingCR,
    /// Expecting \n after chunk data.
    ExpectingLF,
    /// Skipping trailer fields after the last chunk.
    ReadingTrailer,
    /// Finished reading all chunks.
    Done,
}

/// Chunked transfer encoding decoder.
///
/// Handles incremental decoding for streaming scenarios. The decoded
/// output never grows past `max_output` bytes.
#[derive(Debug)]
pub struct ChunkedDecoder {
    state: DecoderState,
    /// Incomplete size or trailer line.
    line: Vec<u8>,
    /// Bytes left in the current chunk.
    chunk_remaining: usize,
    max_output: usize,
    output: Vec<u8>,
}

impl ChunkedDecoder {
    /// Create a decoder whose output is capped at `max_output` bytes.
    pub fn new(max_output: usize) -> Self {
        Self {
            state: DecoderState::ReadingSize,
            line: Vec::new(),
            chunk_remaining: 0,
            max_output,
            output: Vec::new(),
        }
    }

    /// Get current decoder state.
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Check if decoding is complete.
    pub fn is_done(&self) -> bool {
        self.state == DecoderState::Done
    }

    /// Decoded bytes so far.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Take ownership of the decoded output.
    pub fn take_output(self) -> Vec<u8> {
        self.output
    }

    /// Decode a complete chunked body in one go.
    ///
    /// InvalidResponse if the data ends before the terminating chunk.
    pub fn decode(data: &[u8], max_output: usize) -> Result<Vec<u8>> {
        let mut decoder = ChunkedDecoder::new(max_output);
        decoder.feed(data)?;

        if !decoder.is_done() {
            return Err(HttpError::InvalidResponse);
        }

        Ok(decoder.take_output())
    }

    /// Feed data to the decoder incrementally.
    ///
    /// Returns the number of bytes consumed; anything past the end of the
    /// encoding is left unconsumed.
    pub fn feed(&mut self, data: &[u8]) -> Result<usize> {
        let mut consumed = 0;

        while consumed < data.len() && self.state != DecoderState::Done {
            match self.state {
                DecoderState::ReadingData => {
                    let take = self.chunk_remaining.min(data.len() - consumed);
                    self.output
                        .try_reserve(take)
                        .map_err(|_| HttpError::NoMemory)?;
                    self.output
                        .extend_from_slice(&data[consumed..consumed + take]);
                    consumed += take;
                    self.chunk_remaining -= take;

                    if self.chunk_remaining == 0 {
                        // Finished this chunk, expect trailing CRLF
                        self.state = DecoderState::ExpectingCR;
                    }
                }
                DecoderState::ExpectingCR => {
                    let byte = data[consumed];
                    consumed += 1;
                    self.state = match byte {
                        b'\r' => DecoderState::ExpectingLF,
                        b'\n' => DecoderState::ReadingSize,
                        _ => return Err(HttpError::ParseFailed),
                    };
                }
                DecoderState::ExpectingLF => {
                    let byte = data[consumed];
                    consumed += 1;
                    if byte != b'\n' {
                        return Err(HttpError::ParseFailed);
                    }
                    self.state = DecoderState::ReadingSize;
                }
                DecoderState::ReadingSize | DecoderState::ReadingTrailer => {
                    let byte = data[consumed];
                    consumed += 1;
                    if byte == b'\n' {
                        self.end_line()?;
                    } else if self.line.len() >= HTTP_BUFFER_SIZE {
                        return Err(HttpError::ParseFailed);
                    } else {
                        self.line.push(byte);
                    }
                }
                DecoderState::Done => break,
            }
        }

        Ok(consumed)
    }

    /// Handle a complete size or trailer line.
    fn end_line(&mut self) -> Result<()> {
        if self.line.last() == Some(&b'\r') {
            self.line.pop();
        }

        if self.state == DecoderState::ReadingTrailer {
            if self.line.is_empty() {
                self.state = DecoderState::Done;
            }
            self.line.clear();
            return Ok(());
        }

        let size = self.parse_chunk_size()?;
        self.line.clear();

        if size == 0 {
            // Last chunk
            self.state = DecoderState::ReadingTrailer;
        } else if size > self.max_output - self.output.len() {
            return Err(HttpError::BufferOverflow);
        } else {
            self.chunk_remaining = size;
            self.state = DecoderState::ReadingData;
        }
        Ok(())
    }

    /// Parse the chunk size from the line buffer.
    fn parse_chunk_size(&self) -> Result<usize> {
        let line = core::str::from_utf8(&self.line).map_err(|_| HttpError::ParseFailed)?;

        // Handle chunk extensions (ignore everything after ;)
        let size_part = trim_ascii(line.split(';').next().unwrap_or(""));

        parse_hex(size_part).ok_or(HttpError::ParseFailed)
    }
}
