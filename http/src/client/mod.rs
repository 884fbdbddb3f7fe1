//! HTTP client over a pluggable byte-stream transport.
//!
//! The client owns no sockets. The embedder supplies a [`Transport`]
//! (TCP connections, name resolution) and a [`Clock`]; the client builds the
//! request, drives the exchange and parses the response.
//!
//! # Example
//!
//! ```ignore
//! use kestrel_http::HttpClient;
//!
//! let mut client = HttpClient::new(tcp, get_time_ms);
//! client.init();
//!
//! let response = client.get("http://10.0.2.2:8080/status")?;
//! if response.is_success() {
//!     log::info!("{} bytes", response.body_len());
//! }
//! ```

use alloc::vec::Vec;
use core::fmt;

use crate::error::{HttpError, Result};
use crate::http::{HttpRequest, HttpResponse, ParseStatus, ResponseParser};
use crate::time::{Clock, Deadline};
use crate::types::HttpConfig;

/// Failure reported by a [`Transport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Host name could not be resolved.
    DnsFailed,
    /// Connection refused, reset or otherwise not established.
    ConnectFailed,
    SendFailed,
    RecvFailed,
    /// The transport gave up waiting.
    Timeout,
    /// Nothing available yet; the client sleeps on its clock and polls
    /// again until its deadline.
    WouldBlock,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DnsFailed => write!(f, "DNS resolution failed"),
            Self::ConnectFailed => write!(f, "Connection failed"),
            Self::SendFailed => write!(f, "Send failed"),
            Self::RecvFailed => write!(f, "Receive failed"),
            Self::Timeout => write!(f, "Transport timed out"),
            Self::WouldBlock => write!(f, "Operation would block"),
        }
    }
}

impl From<TransportError> for HttpError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::DnsFailed => HttpError::DnsFailed,
            TransportError::ConnectFailed => HttpError::ConnectFailed,
            TransportError::SendFailed => HttpError::SendFailed,
            TransportError::RecvFailed => HttpError::RecvFailed,
            TransportError::Timeout | TransportError::WouldBlock => HttpError::Timeout,
        }
    }
}

/// Byte-stream transport the client runs on.
pub trait Transport {
    /// An open connection.
    type Connection;

    /// Resolve `host` and open a connection to it.
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout_ms: u32,
    ) -> core::result::Result<Self::Connection, TransportError>;

    /// Send bytes, returning how many were accepted.
    fn send(
        &mut self,
        conn: &mut Self::Connection,
        data: &[u8],
    ) -> core::result::Result<usize, TransportError>;

    /// Receive into `buffer`. `Ok(0)` means the peer closed the connection.
    ///
    /// May block for up to `timeout_ms`. A non-blocking transport returns
    /// `WouldBlock` instead and is polled every `poll_interval_ms`.
    fn recv(
        &mut self,
        conn: &mut Self::Connection,
        buffer: &mut [u8],
        timeout_ms: u32,
    ) -> core::result::Result<usize, TransportError>;

    fn close(&mut self, conn: Self::Connection);
}

/// HTTP/1.1 client.
pub struct HttpClient<T, C> {
    transport: T,
    clock: C,
    config: HttpConfig,
    initialized: bool,
}

impl<T: Transport, C: Clock> HttpClient<T, C> {
    /// Create a client with the default configuration.
    pub fn new(transport: T, clock: C) -> Self {
        Self::with_config(transport, clock, HttpConfig::default())
    }

    pub fn with_config(transport: T, clock: C, config: HttpConfig) -> Self {
        Self {
            transport,
            clock,
            config,
            initialized: false,
        }
    }

    /// Mark the client ready. Requests before this fail with NotInitialized.
    pub fn init(&mut self) {
        self.initialized = true;
        log::info!(
            "http: client ready (timeout {} ms, body cap {} bytes)",
            self.config.timeout_ms,
            self.config.max_body_size
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Simple GET request.
    pub fn get(&mut self, url: &str) -> Result<HttpResponse> {
        let mut request = HttpRequest::get(url)?;
        self.add_default_headers(&mut request)?;
        self.request(&mut request)
    }

    /// POST `body` to `url`.
    pub fn post(&mut self, url: &str, body: &[u8]) -> Result<HttpResponse> {
        let mut request = HttpRequest::post(url, body)?;
        self.add_default_headers(&mut request)?;
        self.request(&mut request)
    }

    /// HEAD request; the response never has a body.
    pub fn head(&mut self, url: &str) -> Result<HttpResponse> {
        let mut request = HttpRequest::head(url)?;
        self.add_default_headers(&mut request)?;
        self.request(&mut request)
    }

    /// Execute an HTTP request.
    ///
    /// One connection per request. The connection is closed on every path
    /// once it has been opened. A request timeout of 0 uses the configured
    /// default.
    pub fn request(&mut self, request: &mut HttpRequest<'_>) -> Result<HttpResponse> {
        if !self.initialized {
            return Err(HttpError::NotInitialized);
        }
        request.resolve()?;

        let timeout_ms = match request.timeout_ms {
            0 => self.config.timeout_ms,
            ms => ms,
        };
        let now = self.clock.now_ms();
        let deadline = Deadline::after(now, timeout_ms);

        let size = request.wire_size();
        let mut wire = Vec::new();
        wire.try_reserve_exact(size)
            .map_err(|_| HttpError::NoMemory)?;
        wire.resize(size, 0);
        request.build_request(&mut wire)?;

        log::debug!(
            "http: {} {}:{}{}",
            request.method,
            request.host,
            request.port,
            request.path
        );

        let mut conn = self
            .transport
            .connect(&request.host, request.port, deadline.remaining_ms(now))
            .map_err(|err| {
                log::warn!("http: connect to {}:{} failed: {}", request.host, request.port, err);
                HttpError::from(err)
            })?;

        let result = self.exchange(&mut conn, &wire, request.method.expects_body(), deadline);
        self.transport.close(conn);

        match &result {
            Ok(response) => log::debug!(
                "http: {} {} ({} bytes)",
                response.status_code,
                response.reason(),
                response.body_len()
            ),
            Err(err) => log::warn!("http: {} {} failed: {}", request.method, request.url, err),
        }
        result
    }

    /// Send the request bytes and read the response off an open connection.
    fn exchange(
        &mut self,
        conn: &mut T::Connection,
        wire: &[u8],
        expect_body: bool,
        deadline: Deadline,
    ) -> Result<HttpResponse> {
        let sent = self.transport.send(conn, wire)?;
        if sent != wire.len() {
            return Err(HttpError::SendFailed);
        }

        let mut parser = ResponseParser::new(expect_body, self.config.max_body_size);
        let buffer_size = self.config.buffer_size.max(1);
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(buffer_size)
            .map_err(|_| HttpError::NoMemory)?;
        buffer.resize(buffer_size, 0u8);

        loop {
            let now = self.clock.now_ms();
            if deadline.expired(now) {
                return Err(HttpError::Timeout);
            }

            match self
                .transport
                .recv(conn, &mut buffer, deadline.remaining_ms(now))
            {
                Ok(0) => {
                    parser.finish()?;
                    break;
                }
                Ok(n) => {
                    if parser.feed(&buffer[..n])? == ParseStatus::Done {
                        break;
                    }
                }
                Err(TransportError::WouldBlock) => {
                    let remaining = deadline.remaining_ms(self.clock.now_ms());
                    self.clock.sleep_ms(self.config.poll_interval_ms.min(remaining));
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(parser.into_response())
    }

    fn add_default_headers(&self, request: &mut HttpRequest<'_>) -> Result<()> {
        if !request.headers.contains("User-Agent") {
            request.set_header("User-Agent", self.config.user_agent)?;
        }
        if !request.headers.contains("Connection") {
            request.set_header("Connection", "close")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_mapping() {
        assert_eq!(HttpError::from(TransportError::DnsFailed), HttpError::DnsFailed);
        assert_eq!(
            HttpError::from(TransportError::ConnectFailed),
            HttpError::ConnectFailed
        );
        assert_eq!(HttpError::from(TransportError::WouldBlock), HttpError::Timeout);
        assert_eq!(HttpError::from(TransportError::RecvFailed), HttpError::RecvFailed);
    }
}
