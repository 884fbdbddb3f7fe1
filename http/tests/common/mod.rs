//! Common test utilities: a scripted transport and a virtual clock

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use kestrel_http::{Clock, HttpClient, HttpConfig, Transport, TransportError};

pub type TestClient = HttpClient<MockTransport, MockClock>;

/// What the next `recv` call sees
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Bytes from the server; split across reads if the buffer is smaller
    Data(Vec<u8>),
    /// Nothing yet: the clock moves on by the given ms and the read would block
    Stall(u64),
    /// Nothing yet, and no time passes until the client sleeps
    Idle,
    /// Receive error
    Fail(TransportError),
    /// Server closes the connection
    Close,
}

/// Shared state behind the mock transport and clock.
#[derive(Default)]
pub struct Wire {
    now: Cell<u64>,
    script: RefCell<VecDeque<Step>>,
    sent: RefCell<Vec<u8>>,
    connects: RefCell<Vec<(String, u16, u32)>>,
    closed: Cell<u32>,
    sleeps: RefCell<Vec<u32>>,
    connect_error: Cell<Option<TransportError>>,
    send_limit: Cell<Option<usize>>,
}

impl Wire {
    pub fn now(&self) -> u64 {
        self.now.get()
    }

    pub fn script(&self, steps: impl IntoIterator<Item = Step>) {
        self.script.borrow_mut().extend(steps);
    }

    /// Queue a full response followed by a close.
    pub fn respond(&self, raw: &[u8]) {
        self.script([Step::Data(raw.to_vec()), Step::Close]);
    }

    pub fn fail_connect(&self, err: TransportError) {
        self.connect_error.set(Some(err));
    }

    /// Accept at most `limit` bytes per send.
    pub fn limit_send(&self, limit: usize) {
        self.send_limit.set(Some(limit));
    }

    /// Everything the client sent, as text
    pub fn sent_text(&self) -> String {
        String::from_utf8_lossy(&self.sent.borrow()).into_owned()
    }

    pub fn connects(&self) -> Vec<(String, u16, u32)> {
        self.connects.borrow().clone()
    }

    pub fn closed(&self) -> u32 {
        self.closed.get()
    }

    /// Every pause the client asked the clock for
    pub fn sleeps(&self) -> Vec<u32> {
        self.sleeps.borrow().clone()
    }
}

/// An open mock connection
#[derive(Debug)]
pub struct MockConn;

pub struct MockTransport(Rc<Wire>);

impl Transport for MockTransport {
    type Connection = MockConn;

    fn connect(&mut self, host: &str, port: u16, timeout_ms: u32) -> Result<MockConn, TransportError> {
        self.0
            .connects
            .borrow_mut()
            .push((host.to_string(), port, timeout_ms));
        match self.0.connect_error.get() {
            Some(err) => Err(err),
            None => Ok(MockConn),
        }
    }

    fn send(&mut self, _conn: &mut MockConn, data: &[u8]) -> Result<usize, TransportError> {
        let n = self.0.send_limit.get().map_or(data.len(), |limit| limit.min(data.len()));
        self.0.sent.borrow_mut().extend_from_slice(&data[..n]);
        Ok(n)
    }

    fn recv(
        &mut self,
        _conn: &mut MockConn,
        buffer: &mut [u8],
        _timeout_ms: u32,
    ) -> Result<usize, TransportError> {
        let mut script = self.0.script.borrow_mut();
        match script.pop_front() {
            Some(Step::Data(mut bytes)) => {
                let n = bytes.len().min(buffer.len());
                buffer[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    script.push_front(Step::Data(bytes.split_off(n)));
                }
                Ok(n)
            }
            Some(Step::Stall(ms)) => {
                self.0.now.set(self.0.now.get() + ms);
                Err(TransportError::WouldBlock)
            }
            Some(Step::Idle) => Err(TransportError::WouldBlock),
            Some(Step::Fail(err)) => Err(err),
            Some(Step::Close) | None => Ok(0),
        }
    }

    fn close(&mut self, _conn: MockConn) {
        self.0.closed.set(self.0.closed.get() + 1);
    }
}

pub struct MockClock(Rc<Wire>);

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.0.now.get()
    }

    fn sleep_ms(&self, ms: u32) {
        self.0.sleeps.borrow_mut().push(ms);
        self.0.now.set(self.0.now.get() + u64::from(ms));
    }
}

/// Build an initialised client wired to a fresh scripted transport.
pub fn setup(config: HttpConfig) -> (TestClient, Rc<Wire>) {
    let wire = Rc::new(Wire::default());
    let mut client = HttpClient::with_config(
        MockTransport(wire.clone()),
        MockClock(wire.clone()),
        config,
    );
    client.init();
    (client, wire)
}

/// A second transport/clock pair on an existing wire.
pub fn fresh_pair(wire: &Rc<Wire>) -> (MockTransport, MockClock) {
    (MockTransport(wire.clone()), MockClock(wire.clone()))
}
