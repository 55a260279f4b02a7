//! Literal operand decoding.

use alloc::{string::String, vec::Vec};

use crate::error::ErrorKind;

/// Decode a NUL-terminated string packed four bytes per word, starting at
/// `*index`
///
/// Bytes are little-endian within each word. On success `*index` points at
/// the first word after the string, padding included.
pub fn decode_string(words: &[u32], index: &mut usize) -> Result<String, ErrorKind> {
    let mut bytes = Vec::new();
    let mut cursor = *index;
    loop {
        let Some(word) = words.get(cursor) else {
            return Err(ErrorKind::InvalidLiteral(String::from(
                "string literal is not NUL-terminated",
            )));
        };
        cursor += 1;
        let mut terminated = false;
        for byte in word.to_le_bytes() {
            if byte == 0 {
                terminated = true;
                break;
            }
            bytes.push(byte);
        }
        if terminated {
            break;
        }
    }
    let text = String::from_utf8(bytes)
        .map_err(|_| ErrorKind::InvalidLiteral(String::from("string literal is not valid UTF-8")))?;
    *index = cursor;
    Ok(text)
}

/// Sign-extend the low `width` bits of `bits`
pub fn sign_extend(bits: u64, width: u32) -> i64 {
    if width == 0 || width >= 64 {
        return bits as i64;
    }
    let shift = 64 - width;
    ((bits << shift) as i64) >> shift
}

/// Join a two-word literal, low-order word first
pub fn join_words(low: u32, high: u32) -> u64 {
    u64::from(low) | (u64::from(high) << 32)
}
