//! Internet Checksum (RFC 1071)
//!
//! One's-complement sum over 16-bit big-endian words. The ICMP codec uses it
//! for every message it seals or verifies; the helpers are public so the rest
//! of the stack (IPv4 headers, pseudo-headers) can share one implementation.

/// Fold carries out of the upper half until the sum fits in 16 bits.
fn fold(sum: u32) -> u16 {
    let mut folded = sum;
    while folded >> 16 != 0 {
        folded = (folded & 0xFFFF) + (folded >> 16);
    }
    folded as u16
}

/// Add `data` to a running one's-complement sum.
///
/// The returned value is already folded, so calls can be chained across
/// non-contiguous buffers as long as every buffer but the last has even
/// length.
pub fn partial_checksum(data: &[u8], initial: u32) -> u32 {
    let mut sum = u32::from(fold(initial));
    let mut words = data.chunks_exact(2);

    for word in words.by_ref() {
        sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    // Odd trailing byte is the high half of a zero-padded word
    if let [last] = words.remainder() {
        sum += u32::from(*last) << 8;
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    sum
}

/// Complement a partial sum into the final checksum value.
pub fn finalize_checksum(sum: u32) -> u16 {
    !fold(sum)
}

/// Compute the Internet checksum of `data`.
///
/// An empty buffer yields `0xFFFF`.
pub fn checksum(data: &[u8]) -> u16 {
    finalize_checksum(partial_checksum(data, 0))
}

/// True when `data`, checksum field included, sums to zero.
pub fn verify_checksum(data: &[u8]) -> bool {
    checksum(data) == 0
}
