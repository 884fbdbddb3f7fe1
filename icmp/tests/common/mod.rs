//! Common test utilities: a simulated network with a virtual clock

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::rc::{Rc, Weak};

use kestrel_icmp::{
    checksum, encode_echo, encode_error, Clock, IcmpError, IcmpStack, IcmpType, IpLayer,
    PingConfig, ICMP_PROTOCOL,
};

pub type TestStack = IcmpStack<MockIp, MockClock>;

/// Address the mock IP layer sends from
pub const LOCAL: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 100);
/// Router that reports errors for unreachable targets
pub const ROUTER: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 1);

/// How the simulated network answers the next echo request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    /// Echo reply from the target after the given delay (ms)
    Reply(u64),
    /// Destination Unreachable from the router after the given delay
    Unreachable(u64, u8),
    /// Time Exceeded from the router after the given delay
    TimeExceeded(u64),
    /// No answer
    Drop,
}

/// A packet handed to the mock IP layer
#[derive(Debug, Clone)]
pub struct SentPacket {
    pub dest: Ipv4Addr,
    pub time: u64,
    pub payload: Vec<u8>,
}

struct Delivery {
    at: u64,
    src: Ipv4Addr,
    packet: Vec<u8>,
}

/// Shared simulation state behind both collaborators.
pub struct Network {
    now: Cell<u64>,
    sent: RefCell<Vec<SentPacket>>,
    inbox: RefCell<Vec<Delivery>>,
    answers: RefCell<VecDeque<Answer>>,
    fail_sends: Cell<bool>,
    stack: RefCell<Weak<TestStack>>,
}

impl Network {
    pub fn now(&self) -> u64 {
        self.now.get()
    }

    /// Queue answers for the next echo requests, in send order.
    pub fn script(&self, answers: &[Answer]) {
        self.answers.borrow_mut().extend(answers.iter().copied());
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.set(fail);
    }

    pub fn sent(&self) -> Vec<SentPacket> {
        self.sent.borrow().clone()
    }

    /// Echo requests sent so far, as (identifier, sequence)
    pub fn echo_requests(&self) -> Vec<(u16, u16)> {
        self.sent
            .borrow()
            .iter()
            .filter(|p| p.payload[0] == IcmpType::EchoRequest as u8)
            .map(|p| echo_ids(&p.payload))
            .collect()
    }

    /// Move the clock forward one millisecond at a time, delivering packets
    /// as they fall due.
    pub fn advance_to(&self, target: u64) {
        while self.now.get() < target {
            self.now.set(self.now.get() + 1);
            self.deliver_due();
        }
    }

    pub fn schedule(&self, delay: u64, src: Ipv4Addr, packet: Vec<u8>) {
        self.inbox.borrow_mut().push(Delivery {
            at: self.now.get() + delay,
            src,
            packet,
        });
    }

    fn deliver_due(&self) {
        let now = self.now.get();
        let due: Vec<Delivery> = {
            let mut inbox = self.inbox.borrow_mut();
            let (due, later): (Vec<Delivery>, Vec<Delivery>) =
                inbox.drain(..).partition(|d| d.at <= now);
            *inbox = later;
            due
        };

        let Some(stack) = self.stack.borrow().upgrade() else {
            return;
        };
        for delivery in due {
            // Drops are part of several scenarios
            let _ = stack.input(delivery.src, &delivery.packet);
        }
    }

    fn on_send(&self, dest: Ipv4Addr, payload: &[u8]) {
        if payload[0] != IcmpType::EchoRequest as u8 {
            return;
        }
        let answer = self.answers.borrow_mut().pop_front().unwrap_or(Answer::Drop);
        let (identifier, sequence) = echo_ids(payload);

        match answer {
            Answer::Reply(delay) => {
                let reply = echo_reply(identifier, sequence, &payload[8..]);
                self.schedule(delay, dest, reply);
            }
            Answer::Unreachable(delay, code) => {
                let report = error_report(IcmpType::DestUnreachable, code, &ipv4_wrap(LOCAL, dest, payload));
                self.schedule(delay, ROUTER, report);
            }
            Answer::TimeExceeded(delay) => {
                let report = error_report(IcmpType::TimeExceeded, 0, &ipv4_wrap(LOCAL, dest, payload));
                self.schedule(delay, ROUTER, report);
            }
            Answer::Drop => {}
        }
    }
}

#[derive(Clone)]
pub struct MockIp(Rc<Network>);

impl IpLayer for MockIp {
    fn send(&self, dest: Ipv4Addr, protocol: u8, payload: &[u8]) -> Result<(), IcmpError> {
        assert_eq!(protocol, ICMP_PROTOCOL);
        if self.0.fail_sends.get() {
            return Err(IcmpError::NoRoute);
        }
        self.0.sent.borrow_mut().push(SentPacket {
            dest,
            time: self.0.now.get(),
            payload: payload.to_vec(),
        });
        self.0.on_send(dest, payload);
        Ok(())
    }
}

#[derive(Clone)]
pub struct MockClock(Rc<Network>);

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.0.now.get()
    }

    fn sleep_ms(&self, ms: u32) {
        let target = self.0.now.get() + u64::from(ms);
        self.0.advance_to(target);
    }
}

/// Build an initialised stack wired to a fresh simulated network.
pub fn setup(config: PingConfig) -> (Rc<TestStack>, Rc<Network>) {
    let net = Rc::new(Network {
        now: Cell::new(0),
        sent: RefCell::new(Vec::new()),
        inbox: RefCell::new(Vec::new()),
        answers: RefCell::new(VecDeque::new()),
        fail_sends: Cell::new(false),
        stack: RefCell::new(Weak::new()),
    });
    let stack = Rc::new(IcmpStack::with_config(
        MockIp(net.clone()),
        MockClock(net.clone()),
        config,
    ));
    *net.stack.borrow_mut() = Rc::downgrade(&stack);
    stack.init();
    (stack, net)
}

pub fn echo_ids(icmp: &[u8]) -> (u16, u16) {
    (
        u16::from_be_bytes([icmp[4], icmp[5]]),
        u16::from_be_bytes([icmp[6], icmp[7]]),
    )
}

pub fn echo_request(identifier: u16, sequence: u16, payload: &[u8]) -> Vec<u8> {
    let mut buffer = vec![0u8; 8 + payload.len()];
    encode_echo(&mut buffer, IcmpType::EchoRequest, identifier, sequence, payload)
        .expect("echo request encodes");
    buffer
}

pub fn echo_reply(identifier: u16, sequence: u16, payload: &[u8]) -> Vec<u8> {
    let mut buffer = vec![0u8; 8 + payload.len()];
    encode_echo(&mut buffer, IcmpType::EchoReply, identifier, sequence, payload)
        .expect("echo reply encodes");
    buffer
}

pub fn error_report(icmp_type: IcmpType, code: u8, original: &[u8]) -> Vec<u8> {
    let mut buffer = vec![0u8; 8 + original.len()];
    let len = encode_error(&mut buffer, icmp_type, code, original).expect("error encodes");
    buffer.truncate(len);
    buffer
}

/// Wrap an ICMP message in a 20-byte IPv4 header, as it left this host.
pub fn ipv4_wrap(src: Ipv4Addr, dst: Ipv4Addr, icmp: &[u8]) -> Vec<u8> {
    let mut packet = vec![0u8; 20];
    packet[0] = 0x45;
    packet[2..4].copy_from_slice(&((20 + icmp.len()) as u16).to_be_bytes());
    packet[8] = 64;
    packet[9] = ICMP_PROTOCOL;
    packet[12..16].copy_from_slice(&src.octets());
    packet[16..20].copy_from_slice(&dst.octets());
    let sum = checksum(&packet);
    packet[10..12].copy_from_slice(&sum.to_be_bytes());
    packet.extend_from_slice(icmp);
    packet
}
