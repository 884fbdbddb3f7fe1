//! ICMP message encoding and decoding (RFC 792, types 0/3/8/11)
//!
//! Every message starts with the same 8-byte header:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     Type      |     Code      |          Checksum             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     Rest of Header                            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! For echo messages the rest of the header is identifier + sequence; for
//! error messages it is unused and the body quotes the offending IP header
//! plus the first 8 bytes of its payload. Fields are read and written byte by
//! byte in network order, never through an in-memory struct layout.

use core::net::Ipv4Addr;

use crate::checksum::{checksum, verify_checksum};
use crate::error::{DecodeError, IcmpError, Result};

/// ICMP protocol number in the IP header
pub const ICMP_PROTOCOL: u8 = 1;

/// ICMP header size
pub const ICMP_HEADER_LEN: usize = 8;

/// Minimum IPv4 header size
pub const IP_HEADER_MIN_LEN: usize = 20;

/// Maximum ICMP payload (65535 - IP header - ICMP header)
pub const ICMP_MAX_PAYLOAD: usize = 65507;

/// Default echo payload size
pub const ICMP_DEFAULT_PAYLOAD: usize = 56;

/// Largest echo payload that fits one Ethernet MTU
pub const ICMP_MAX_ECHO_DATA: usize = 1472;

/// Bytes of the original datagram quoted after its IP header
pub const ERROR_QUOTE_DATA_LEN: usize = 8;

/// ICMP message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IcmpType {
    EchoReply = 0,
    DestUnreachable = 3,
    SourceQuench = 4,
    Redirect = 5,
    EchoRequest = 8,
    TimeExceeded = 11,
    ParamProblem = 12,
    Timestamp = 13,
    TimestampReply = 14,
    InfoRequest = 15,
    InfoReply = 16,
}

impl IcmpType {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::EchoReply),
            3 => Some(Self::DestUnreachable),
            4 => Some(Self::SourceQuench),
            5 => Some(Self::Redirect),
            8 => Some(Self::EchoRequest),
            11 => Some(Self::TimeExceeded),
            12 => Some(Self::ParamProblem),
            13 => Some(Self::Timestamp),
            14 => Some(Self::TimestampReply),
            15 => Some(Self::InfoRequest),
            16 => Some(Self::InfoReply),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EchoReply => "Echo Reply",
            Self::DestUnreachable => "Destination Unreachable",
            Self::SourceQuench => "Source Quench",
            Self::Redirect => "Redirect",
            Self::EchoRequest => "Echo Request",
            Self::TimeExceeded => "Time Exceeded",
            Self::ParamProblem => "Parameter Problem",
            Self::Timestamp => "Timestamp",
            Self::TimestampReply => "Timestamp Reply",
            Self::InfoRequest => "Information Request",
            Self::InfoReply => "Information Reply",
        }
    }
}

/// Describe a raw ICMP type byte.
pub const fn type_to_string(icmp_type: u8) -> &'static str {
    match IcmpType::from_u8(icmp_type) {
        Some(t) => t.as_str(),
        None => "Unknown",
    }
}

/// Destination Unreachable codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UnreachableCode {
    Network = 0,
    Host = 1,
    Protocol = 2,
    Port = 3,
    FragNeeded = 4,
    SourceRouteFailed = 5,
    NetworkUnknown = 6,
    HostUnknown = 7,
    SourceIsolated = 8,
    NetworkProhibited = 9,
    HostProhibited = 10,
    NetworkTos = 11,
    HostTos = 12,
    CommProhibited = 13,
    HostPrecedence = 14,
    PrecedenceCutoff = 15,
}

impl UnreachableCode {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Network),
            1 => Some(Self::Host),
            2 => Some(Self::Protocol),
            3 => Some(Self::Port),
            4 => Some(Self::FragNeeded),
            5 => Some(Self::SourceRouteFailed),
            6 => Some(Self::NetworkUnknown),
            7 => Some(Self::HostUnknown),
            8 => Some(Self::SourceIsolated),
            9 => Some(Self::NetworkProhibited),
            10 => Some(Self::HostProhibited),
            11 => Some(Self::NetworkTos),
            12 => Some(Self::HostTos),
            13 => Some(Self::CommProhibited),
            14 => Some(Self::HostPrecedence),
            15 => Some(Self::PrecedenceCutoff),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "Network Unreachable",
            Self::Host => "Host Unreachable",
            Self::Protocol => "Protocol Unreachable",
            Self::Port => "Port Unreachable",
            Self::FragNeeded => "Fragmentation Needed",
            Self::SourceRouteFailed => "Source Route Failed",
            Self::NetworkUnknown => "Destination Network Unknown",
            Self::HostUnknown => "Destination Host Unknown",
            Self::SourceIsolated => "Source Host Isolated",
            Self::NetworkProhibited => "Network Administratively Prohibited",
            Self::HostProhibited => "Host Administratively Prohibited",
            Self::NetworkTos => "Network Unreachable for ToS",
            Self::HostTos => "Host Unreachable for ToS",
            Self::CommProhibited => "Communication Administratively Prohibited",
            Self::HostPrecedence => "Host Precedence Violation",
            Self::PrecedenceCutoff => "Precedence Cutoff in Effect",
        }
    }
}

/// Describe a raw Destination Unreachable code byte.
pub const fn unreachable_code_to_string(code: u8) -> &'static str {
    match UnreachableCode::from_u8(code) {
        Some(c) => c.as_str(),
        None => "Unknown",
    }
}

/// Time Exceeded codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TimeExceededCode {
    /// TTL exceeded in transit
    TtlExceeded = 0,
    /// Fragment reassembly time exceeded
    FragmentReassembly = 1,
}

impl TimeExceededCode {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::TtlExceeded),
            1 => Some(Self::FragmentReassembly),
            _ => None,
        }
    }
}

/// Describe a raw Time Exceeded code byte.
pub const fn time_exceeded_code_to_string(code: u8) -> &'static str {
    match TimeExceededCode::from_u8(code) {
        Some(TimeExceededCode::TtlExceeded) => "TTL Exceeded in Transit",
        Some(TimeExceededCode::FragmentReassembly) => "Fragment Reassembly Time Exceeded",
        None => "Unknown",
    }
}

/// The fixed 8-byte ICMP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpHeader {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    /// Type-specific word (identifier + sequence for echo, zero for errors)
    pub rest: [u8; 4],
}

impl IcmpHeader {
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < ICMP_HEADER_LEN {
            return None;
        }
        Some(Self {
            icmp_type: data[0],
            code: data[1],
            checksum: u16::from_be_bytes([data[2], data[3]]),
            rest: [data[4], data[5], data[6], data[7]],
        })
    }

    /// Write the header into the first 8 bytes of `out`.
    fn write(&self, out: &mut [u8]) {
        out[0] = self.icmp_type;
        out[1] = self.code;
        out[2..4].copy_from_slice(&self.checksum.to_be_bytes());
        out[4..8].copy_from_slice(&self.rest);
    }

    fn echo(icmp_type: IcmpType, identifier: u16, sequence: u16) -> Self {
        let id = identifier.to_be_bytes();
        let seq = sequence.to_be_bytes();
        Self {
            icmp_type: icmp_type as u8,
            code: 0,
            checksum: 0,
            rest: [id[0], id[1], seq[0], seq[1]],
        }
    }

    pub const fn identifier(&self) -> u16 {
        u16::from_be_bytes([self.rest[0], self.rest[1]])
    }

    pub const fn sequence(&self) -> u16 {
        u16::from_be_bytes([self.rest[2], self.rest[3]])
    }
}

/// Echo request or reply body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoMessage<'a> {
    pub identifier: u16,
    pub sequence: u16,
    pub payload: &'a [u8],
}

/// Destination Unreachable / Time Exceeded body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorMessage<'a> {
    pub code: u8,
    /// Quoted IP header + leading payload bytes of the offending datagram
    pub original: &'a [u8],
}

/// What an error message says about one of our own echo requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotedEcho {
    /// Destination of the original datagram
    pub dest: Ipv4Addr,
    pub identifier: u16,
    pub sequence: u16,
}

impl<'a> ErrorMessage<'a> {
    /// Recover the echo request this error refers to, if it quotes one.
    pub fn quoted_echo(&self) -> Option<QuotedEcho> {
        let ip = parse_ip_header(self.original)?;
        if ip.protocol != ICMP_PROTOCOL {
            return None;
        }
        let quoted = self.original.get(ip.header_len..)?;
        let header = IcmpHeader::parse(quoted)?;
        if header.icmp_type != IcmpType::EchoRequest as u8 {
            return None;
        }
        Some(QuotedEcho {
            dest: ip.dst,
            identifier: header.identifier(),
            sequence: header.sequence(),
        })
    }
}

/// A verified inbound ICMP message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcmpMessage<'a> {
    EchoRequest(EchoMessage<'a>),
    EchoReply(EchoMessage<'a>),
    DestUnreachable(ErrorMessage<'a>),
    TimeExceeded(ErrorMessage<'a>),
    /// Anything else; ignored by the engine
    Other { icmp_type: u8, code: u8 },
}

/// Verify and classify a raw ICMP packet.
///
/// The checksum is checked over the whole buffer before any type-specific
/// field is looked at.
pub fn decode(data: &[u8]) -> core::result::Result<IcmpMessage<'_>, DecodeError> {
    let header = IcmpHeader::parse(data).ok_or(DecodeError::Truncated)?;
    if !verify_checksum(data) {
        return Err(DecodeError::ChecksumMismatch);
    }

    let body = &data[ICMP_HEADER_LEN..];
    let echo = || EchoMessage {
        identifier: header.identifier(),
        sequence: header.sequence(),
        payload: body,
    };
    let error = || ErrorMessage {
        code: header.code,
        original: body,
    };

    Ok(match IcmpType::from_u8(header.icmp_type) {
        Some(IcmpType::EchoRequest) => IcmpMessage::EchoRequest(echo()),
        Some(IcmpType::EchoReply) => IcmpMessage::EchoReply(echo()),
        Some(IcmpType::DestUnreachable) => IcmpMessage::DestUnreachable(error()),
        Some(IcmpType::TimeExceeded) => IcmpMessage::TimeExceeded(error()),
        _ => IcmpMessage::Other {
            icmp_type: header.icmp_type,
            code: header.code,
        },
    })
}

/// Size of an echo message carrying `payload_len` bytes.
pub const fn echo_len(payload_len: usize) -> usize {
    ICMP_HEADER_LEN + payload_len
}

/// Encode an echo request or reply into `buffer`.
///
/// Returns the number of bytes written.
pub fn encode_echo(
    buffer: &mut [u8],
    icmp_type: IcmpType,
    identifier: u16,
    sequence: u16,
    payload: &[u8],
) -> Result<usize> {
    if !matches!(icmp_type, IcmpType::EchoRequest | IcmpType::EchoReply) {
        return Err(IcmpError::Invalid);
    }
    if payload.len() > ICMP_MAX_PAYLOAD {
        return Err(IcmpError::Invalid);
    }
    let total = echo_len(payload.len());
    let out = buffer.get_mut(..total).ok_or(IcmpError::Invalid)?;

    IcmpHeader::echo(icmp_type, identifier, sequence).write(out);
    out[ICMP_HEADER_LEN..].copy_from_slice(payload);
    seal(out);

    Ok(total)
}

/// How much of `original` an error message quotes: its IP header plus the
/// first 8 payload bytes, or all of it when shorter.
pub fn quoted_len(original: &[u8]) -> usize {
    let header_len = match parse_ip_header(original) {
        Some(ip) => ip.header_len,
        None => IP_HEADER_MIN_LEN,
    };
    original.len().min(header_len + ERROR_QUOTE_DATA_LEN)
}

/// Size of an error message quoting `original`.
pub fn error_len(original: &[u8]) -> usize {
    ICMP_HEADER_LEN + quoted_len(original)
}

/// Encode a Destination Unreachable or Time Exceeded message.
pub fn encode_error(
    buffer: &mut [u8],
    icmp_type: IcmpType,
    code: u8,
    original: &[u8],
) -> Result<usize> {
    if !matches!(icmp_type, IcmpType::DestUnreachable | IcmpType::TimeExceeded) {
        return Err(IcmpError::Invalid);
    }
    let quote = &original[..quoted_len(original)];
    let total = ICMP_HEADER_LEN + quote.len();
    let out = buffer.get_mut(..total).ok_or(IcmpError::Invalid)?;

    IcmpHeader {
        icmp_type: icmp_type as u8,
        code,
        checksum: 0,
        rest: [0; 4],
    }
    .write(out);
    out[ICMP_HEADER_LEN..].copy_from_slice(quote);
    seal(out);

    Ok(total)
}

/// Zero the checksum field, then fill it with the checksum of the message.
fn seal(message: &mut [u8]) {
    message[2] = 0;
    message[3] = 0;
    let sum = checksum(message);
    message[2..4].copy_from_slice(&sum.to_be_bytes());
}

/// Fill an echo payload with the conventional incrementing byte pattern.
pub fn fill_payload(payload: &mut [u8]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte = (i & 0xFF) as u8;
    }
}

/// Fields of an IPv4 header needed to correlate quoted datagrams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4HeaderView {
    pub header_len: usize,
    pub protocol: u8,
    pub ttl: u8,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
}

/// Parse the fixed part of an IPv4 header.
///
/// Returns None unless the version is 4 and the buffer holds the full
/// header as given by IHL.
pub fn parse_ip_header(data: &[u8]) -> Option<Ipv4HeaderView> {
    if data.len() < IP_HEADER_MIN_LEN {
        return None;
    }

    let version = data[0] >> 4;
    let header_len = (data[0] & 0x0F) as usize * 4;
    if version != 4 || header_len < IP_HEADER_MIN_LEN || data.len() < header_len {
        return None;
    }

    Some(Ipv4HeaderView {
        header_len,
        protocol: data[9],
        ttl: data[8],
        src: Ipv4Addr::new(data[12], data[13], data[14], data[15]),
        dst: Ipv4Addr::new(data[16], data[17], data[18], data[19]),
    })
}
