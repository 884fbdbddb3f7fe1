//! String helpers for the wire format.
//!
//! HTTP/1.1 framing is ASCII, so everything here works on bytes and never
//! allocates except the URL encode/decode pair.
//!
//! # Examples
//!
//! ```ignore
//! use kestrel_http::utils::{parse_hex, url_encode};
//!
//! assert_eq!(parse_hex("1a"), Some(26));
//! assert_eq!(url_encode("a b&c", 64).unwrap(), "a+b%26c");
//! ```

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{HttpError, Result};

/// Parse a hexadecimal string to usize.
///
/// Used for chunk sizes. Returns None on an empty string, a non-hex digit,
/// or overflow.
pub fn parse_hex(hex: &str) -> Option<usize> {
    if hex.is_empty() {
        return None;
    }

    let mut result: usize = 0;

    for byte in hex.bytes() {
        let digit = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            b'A'..=b'F' => byte - b'A' + 10,
            _ => return None,
        };

        result = result.checked_mul(16)?;
        result = result.checked_add(digit as usize)?;
    }

    Some(result)
}

/// Parse a decimal string to usize.
///
/// Used for Content-Length and status codes.
pub fn parse_decimal(decimal: &str) -> Option<usize> {
    if decimal.is_empty() {
        return None;
    }

    let mut result: usize = 0;

    for byte in decimal.bytes() {
        let digit = match byte {
            b'0'..=b'9' => byte - b'0',
            _ => return None,
        };

        result = result.checked_mul(10)?;
        result = result.checked_add(digit as usize)?;
    }

    Some(result)
}

/// Case-insensitive ASCII string comparison.
///
/// The one comparator used for every header-name match.
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .all(|(a, b)| a.eq_ignore_ascii_case(&b))
}

/// Trim spaces and tabs (and other ASCII whitespace) from both ends.
pub fn trim_ascii(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_ascii_whitespace())
}

/// URL-encode a string.
///
/// Keeps `A-Z a-z 0-9 - _ . ~`, turns space into `+`, and escapes
/// everything else as `%XX`. BufferOverflow if the result would be longer
/// than `max_len`.
pub fn url_encode(input: &str, max_len: usize) -> Result<String> {
    let mut result = String::new();

    for byte in input.bytes() {
        let needed = match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b' ' => 1,
            _ => 3,
        };
        if result.len() + needed > max_len {
            return Err(HttpError::BufferOverflow);
        }

        match byte {
            b' ' => result.push('+'),
            _ if needed == 1 => result.push(byte as char),
            _ => {
                result.push('%');
                result.push(hex_digit(byte >> 4));
                result.push(hex_digit(byte & 0x0F));
            }
        }
    }

    Ok(result)
}

/// URL-decode a string.
///
/// Decodes `%XX` sequences and `+` to space. A truncated or non-hex escape,
/// or a result that is not UTF-8, is InvalidUrl; a result longer than
/// `max_len` is BufferOverflow.
pub fn url_decode(input: &str, max_len: usize) -> Result<String> {
    let mut result: Vec<u8> = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let byte = match bytes[i] {
            b'%' => {
                let hex = bytes.get(i + 1..i + 3).ok_or(HttpError::InvalidUrl)?;
                let hex = core::str::from_utf8(hex).map_err(|_| HttpError::InvalidUrl)?;
                i += 3;
                parse_hex(hex).ok_or(HttpError::InvalidUrl)? as u8
            }
            b'+' => {
                i += 1;
                b' '
            }
            b => {
                i += 1;
                b
            }
        };

        if result.len() == max_len {
            return Err(HttpError::BufferOverflow);
        }
        result.push(byte);
    }

    String::from_utf8(result).map_err(|_| HttpError::InvalidUrl)
}

fn hex_digit(nibble: u8) -> char {
    if nibble < 10 {
        (b'0' + nibble) as char
    } else {
        (b'A' + nibble - 10) as char
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Number Parsing ====================

    #[test]
    fn test_parse_hex_basic() {
        assert_eq!(parse_hex("0"), Some(0));
        assert_eq!(parse_hex("a"), Some(10));
        assert_eq!(parse_hex("FF"), Some(255));
        assert_eq!(parse_hex("1A"), Some(26));
        assert_eq!(parse_hex("100000"), Some(0x100000));
    }

    #[test]
    fn test_parse_hex_invalid() {
        assert_eq!(parse_hex(""), None);
        assert_eq!(parse_hex("0x10"), None);
        assert_eq!(parse_hex("g"), None);
        assert_eq!(parse_hex("ffffffffffffffffffff"), None);
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("0"), Some(0));
        assert_eq!(parse_decimal("1048576"), Some(1_048_576));
        assert_eq!(parse_decimal("-1"), None);
        assert_eq!(parse_decimal("12a"), None);
        assert_eq!(parse_decimal(""), None);
    }

    // ==================== Comparison ====================

    #[test]
    fn test_eq_ignore_case() {
        assert!(eq_ignore_case("Content-Length", "content-length"));
        assert!(eq_ignore_case("HOST", "host"));
        assert!(!eq_ignore_case("Host", "Hosts"));
        assert!(!eq_ignore_case("Host", "Post"));
    }

    #[test]
    fn test_trim_ascii() {
        assert_eq!(trim_ascii("  chunked\t"), "chunked");
        assert_eq!(trim_ascii("   "), "");
        assert_eq!(trim_ascii("x"), "x");
    }

    // ==================== URL Encoding ====================

    #[test]
    fn test_url_encode() {
        assert_eq!(url_encode("hello world", 64).unwrap(), "hello+world");
        assert_eq!(url_encode("a/b?c=d&e", 64).unwrap(), "a%2Fb%3Fc%3Dd%26e");
        assert_eq!(url_encode("safe-_.~", 64).unwrap(), "safe-_.~");
        assert_eq!(url_encode("é", 64).unwrap(), "%C3%A9");
    }

    #[test]
    fn test_url_encode_limit() {
        assert_eq!(url_encode("abc", 3).unwrap(), "abc");
        assert_eq!(url_encode("abc", 2), Err(HttpError::BufferOverflow));
        // An escape is never split across the limit
        assert_eq!(url_encode("a&", 3), Err(HttpError::BufferOverflow));
    }

    #[test]
    fn test_url_decode() {
        assert_eq!(url_decode("hello+world", 64).unwrap(), "hello world");
        assert_eq!(url_decode("a%2Fb%3f", 64).unwrap(), "a/b?");
        assert_eq!(url_decode("%C3%A9", 64).unwrap(), "é");
    }

    #[test]
    fn test_url_decode_errors() {
        assert_eq!(url_decode("%4", 64), Err(HttpError::InvalidUrl));
        assert_eq!(url_decode("%zz", 64), Err(HttpError::InvalidUrl));
        assert_eq!(url_decode("%FF", 64), Err(HttpError::InvalidUrl));
        assert_eq!(url_decode("abcd", 3), Err(HttpError::BufferOverflow));
    }

    #[test]
    fn test_url_encode_decode_inverse() {
        let original = "name=Kestrel OS & friends/100%";
        let encoded = url_encode(original, 256).unwrap();
        assert_eq!(url_decode(&encoded, 256).unwrap(), original);
    }
}
