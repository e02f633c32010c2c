//! Variable-length and fixed-width integer codecs.
//!
//! Varints are little-endian base-128: each byte carries seven value bits and
//! every byte but the last has its high bit set. Fixed-width integers in block
//! headers and trailers are big-endian `u64`.

use std::io::{self, Read};

use crate::error::CodecError;

/// Maximum encoded length of a `u64` varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Encodes `value` into `out` and returns the encoded length.
fn encode(mut value: u64, out: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut len = 0;
    while value >= 0x80 {
        out[len] = (value as u8) | 0x80;
        value >>= 7;
        len += 1;
    }
    out[len] = value as u8;
    len + 1
}

/// Appends a varint to a byte buffer, returning the number of bytes written.
pub fn write_varint(buf: &mut Vec<u8>, value: u64) -> usize {
    let mut tmp = [0u8; MAX_VARINT_LEN];
    let len = encode(value, &mut tmp);
    buf.extend_from_slice(&tmp[..len]);
    len
}

/// Writes a varint so that it ends at `end`, returning its first byte offset.
///
/// The chunks are produced low-to-high into scratch space and then moved into
/// place, so callers can build a buffer from its tail towards its head.
/// Returns `None` when the varint does not fit before `end`.
pub fn prepend_varint(buf: &mut [u8], end: usize, value: u64) -> Option<usize> {
    let mut tmp = [0u8; MAX_VARINT_LEN];
    let len = encode(value, &mut tmp);
    let start = end.checked_sub(len)?;
    buf.get_mut(start..end)?.copy_from_slice(&tmp[..len]);
    Some(start)
}

/// Decodes a varint front to back starting at `pos`.
///
/// Returns the value and the number of bytes consumed.
pub fn read_varint(data: &[u8], pos: usize) -> Result<(u64, usize), CodecError> {
    let mut value = 0u64;
    let mut shift = 0u32;
    for (i, &byte) in data.get(pos..).unwrap_or_default().iter().enumerate() {
        if i >= MAX_VARINT_LEN {
            return Err(CodecError::OverlongVarint { offset: pos });
        }
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        shift += 7;
    }
    Err(CodecError::Truncated {
        what: "varint",
        offset: data.len(),
    })
}

/// Decodes a varint by scanning to its terminator and folding backwards.
///
/// The scan finds the first byte without a continuation bit, then the value
/// is accumulated from that byte back to `pos`, shifting left by seven per
/// step. Gives the same result as [`read_varint`] without knowing the length
/// up front.
pub fn scan_varint(data: &[u8], pos: usize) -> Result<(u64, usize), CodecError> {
    let tail = data.get(pos..).unwrap_or_default();
    let Some(last) = tail.iter().position(|b| b & 0x80 == 0) else {
        return Err(CodecError::Truncated {
            what: "varint",
            offset: data.len(),
        });
    };
    if last >= MAX_VARINT_LEN {
        return Err(CodecError::OverlongVarint { offset: pos });
    }
    let value = tail[..=last]
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 7) | u64::from(b & 0x7F));
    Ok((value, last + 1))
}

/// Appends a `u64` in big-endian form.
pub fn write_u64_be(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_be_bytes());
}

/// Reads a big-endian `u64` at `pos`.
pub fn read_u64_be(data: &[u8], pos: usize) -> Result<u64, CodecError> {
    let bytes = data
        .get(pos..pos + 8)
        .ok_or(CodecError::Truncated {
            what: "u64",
            offset: pos,
        })?;
    let mut arr = [0u8; 8];
    arr.copy_from_slice(bytes);
    Ok(u64::from_be_bytes(arr))
}

/// Reads a big-endian `u64` from a byte stream.
pub fn read_u64_from<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut arr = [0u8; 8];
    reader.read_exact(&mut arr)?;
    Ok(u64::from_be_bytes(arr))
}
