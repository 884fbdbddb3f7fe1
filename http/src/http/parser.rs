//! Incremental HTTP/1.1 response parser.
//!
//! Bytes arrive in whatever pieces the transport hands over; the parser
//! keeps its own line buffer and body state between calls.
//!
//! ```text
//! StatusLine -> Headers -> ContentLength | Chunked | UntilClose -> Done
//! ```
//!
//! Any error is terminal: the response is reset to its empty state and
//! every later call reports the same error.

use alloc::vec::Vec;

use super::response::HttpResponse;
use crate::error::{HttpError, Result};
use crate::transfer::ChunkedDecoder;
use crate::types::{HTTP_BUFFER_SIZE, HTTP_MAX_BODY_SIZE, HTTP_MAX_STATUS_TEXT};
use crate::utils::{eq_ignore_case, parse_decimal, trim_ascii};

/// Outcome of feeding bytes to the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// Input so far is a valid prefix; keep reading.
    NeedMore,
    /// The response is complete.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    StatusLine,
    Headers,
    ContentLength,
    Chunked,
    UntilClose,
    Done,
    Failed(HttpError),
}

/// Response parser state machine.
#[derive(Debug)]
pub struct ResponseParser {
    state: State,
    /// Incomplete status or header line.
    line: Vec<u8>,
    response: HttpResponse,
    /// False for HEAD: the response ends after its headers.
    expect_body: bool,
    max_body: usize,
    /// Body bytes still owed under Content-Length.
    remaining: usize,
    decoder: Option<ChunkedDecoder>,
}

impl ResponseParser {
    /// Create a parser. `expect_body` is false for HEAD requests.
    pub fn new(expect_body: bool, max_body: usize) -> Self {
        Self {
            state: State::StatusLine,
            line: Vec::new(),
            response: HttpResponse::default(),
            expect_body,
            max_body,
            remaining: 0,
            decoder: None,
        }
    }

    /// Feed the next bytes from the connection.
    ///
    /// Bytes after the end of a complete response are ignored.
    pub fn feed(&mut self, data: &[u8]) -> Result<ParseStatus> {
        if let State::Failed(err) = self.state {
            return Err(err);
        }
        self.step(data).map_err(|err| self.fail(err))
    }

    /// The connection was closed by the peer.
    ///
    /// Completes an until-close body; anything else short of Done is
    /// InvalidResponse.
    pub fn finish(&mut self) -> Result<()> {
        match self.state {
            State::Done => Ok(()),
            State::UntilClose => {
                self.state = State::Done;
                Ok(())
            }
            State::Failed(err) => Err(err),
            _ => Err(self.fail(HttpError::InvalidResponse)),
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    pub fn response(&self) -> &HttpResponse {
        &self.response
    }

    pub fn into_response(self) -> HttpResponse {
        self.response
    }

    fn fail(&mut self, err: HttpError) -> HttpError {
        log::debug!("http: response rejected: {}", err);
        self.response.free();
        self.line = Vec::new();
        self.decoder = None;
        self.remaining = 0;
        self.state = State::Failed(err);
        err
    }

    fn step(&mut self, data: &[u8]) -> Result<ParseStatus> {
        let mut pos = 0;

        loop {
            match self.state {
                State::Done => return Ok(ParseStatus::Done),
                State::Failed(err) => return Err(err),
                State::StatusLine | State::Headers => {
                    let rest = &data[pos..];
                    let Some(end) = rest.iter().position(|&b| b == b'\n') else {
                        self.buffer_line(rest)?;
                        return Ok(ParseStatus::NeedMore);
                    };
                    self.buffer_line(&rest[..end])?;
                    pos += end + 1;

                    let mut line = core::mem::take(&mut self.line);
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                    self.handle_line(&line)?;
                }
                State::ContentLength => {
                    let take = self.remaining.min(data.len() - pos);
                    self.response
                        .body
                        .extend_from_slice(&data[pos..pos + take]);
                    pos += take;
                    self.remaining -= take;
                    if self.remaining == 0 {
                        self.state = State::Done;
                    } else {
                        return Ok(ParseStatus::NeedMore);
                    }
                }
                State::Chunked => {
                    let Some(decoder) = self.decoder.as_mut() else {
                        return Err(HttpError::InvalidResponse);
                    };
                    pos += decoder.feed(&data[pos..])?;
                    if !decoder.is_done() {
                        return Ok(ParseStatus::NeedMore);
                    }
                    if let Some(decoder) = self.decoder.take() {
                        self.response.body = decoder.take_output();
                    }
                    self.state = State::Done;
                }
                State::UntilClose => {
                    let rest = &data[pos..];
                    if rest.len() > self.max_body - self.response.body.len() {
                        return Err(HttpError::BufferOverflow);
                    }
                    self.response
                        .body
                        .try_reserve(rest.len())
                        .map_err(|_| HttpError::NoMemory)?;
                    self.response.body.extend_from_slice(rest);
                    return Ok(ParseStatus::NeedMore);
                }
            }
        }
    }

    fn buffer_line(&mut self, bytes: &[u8]) -> Result<()> {
        if self.line.len() + bytes.len() > HTTP_BUFFER_SIZE {
            return Err(HttpError::ParseFailed);
        }
        self.line.extend_from_slice(bytes);
        Ok(())
    }

    fn handle_line(&mut self, line: &[u8]) -> Result<()> {
        let line = core::str::from_utf8(line).map_err(|_| HttpError::ParseFailed)?;

        match self.state {
            State::StatusLine => {
                self.parse_status_line(line)?;
                self.state = State::Headers;
                Ok(())
            }
            _ if line.is_empty() => self.end_of_headers(),
            _ => self.parse_header(line),
        }
    }

    /// `HTTP/1.x SP code [SP text]`
    fn parse_status_line(&mut self, line: &str) -> Result<()> {
        let mut parts = line.splitn(3, ' ');

        let version = parts.next().unwrap_or("");
        if !version.starts_with("HTTP/") {
            return Err(HttpError::ParseFailed);
        }

        let code = parts
            .next()
            .and_then(parse_decimal)
            .filter(|code| (100..=599).contains(code))
            .ok_or(HttpError::ParseFailed)?;

        let text = trim_ascii(parts.next().unwrap_or(""));
        if text.len() >= HTTP_MAX_STATUS_TEXT {
            return Err(HttpError::BufferOverflow);
        }

        self.response.status_code = code as u16;
        self.response.status_text = text.into();
        Ok(())
    }

    fn parse_header(&mut self, line: &str) -> Result<()> {
        let colon = line.find(':').ok_or(HttpError::ParseFailed)?;
        let name = trim_ascii(&line[..colon]);
        let value = trim_ascii(&line[colon + 1..]);
        if name.is_empty() {
            return Err(HttpError::ParseFailed);
        }

        self.response.headers.push(name, value)?;

        if eq_ignore_case(name, "Content-Length") {
            let length = parse_decimal(value).ok_or(HttpError::ParseFailed)?;
            self.response.content_length = Some(length);
        } else if eq_ignore_case(name, "Transfer-Encoding")
            && value
                .split(',')
                .any(|coding| eq_ignore_case(trim_ascii(coding), "chunked"))
        {
            self.response.chunked = true;
        }
        Ok(())
    }

    fn end_of_headers(&mut self) -> Result<()> {
        let code = self.response.status_code;
        let bodyless = !self.expect_body || (100..200).contains(&code) || code == 204 || code == 304;

        self.state = if bodyless {
            State::Done
        } else if self.response.chunked {
            self.decoder = Some(ChunkedDecoder::new(self.max_body));
            State::Chunked
        } else if let Some(length) = self.response.content_length {
            if length > self.max_body {
                return Err(HttpError::BufferOverflow);
            }
            if length == 0 {
                State::Done
            } else {
                self.response
                    .body
                    .try_reserve_exact(length)
                    .map_err(|_| HttpError::NoMemory)?;
                self.remaining = length;
                State::ContentLength
            }
        } else {
            State::UntilClose
        };
        Ok(())
    }
}

/// Parse a complete response held in one buffer.
///
/// The end of `data` is treated as the connection closing.
pub fn parse_response(data: &[u8]) -> Result<HttpResponse> {
    let mut parser = ResponseParser::new(true, HTTP_MAX_BODY_SIZE);
    if parser.feed(data)? == ParseStatus::NeedMore {
        parser.finish()?;
    }
    Ok(parser.into_response())
}
