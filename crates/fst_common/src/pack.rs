//! Compression helpers for every compressed section of a file.
//!
//! Frames, time tables and geometry use zlib at level 9; value-change chains
//! use zlib at level 4 or LZ4 depending on the writer's pack mode; the
//! hierarchy and the whole-file wrapper use gzip.

use std::io::{Read, Write};

use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Chains shorter than this are always stored raw.
pub const MIN_PACK_LEN: usize = 32;

/// Zlib level for chain strings.
pub const CHAIN_ZLIB_LEVEL: u32 = 4;

/// Zlib level for frames, time tables and geometry.
pub const SECTION_ZLIB_LEVEL: u32 = 9;

/// Gzip level for the hierarchy and the whole-file wrapper.
pub const GZIP_LEVEL: u32 = 4;

/// Upper bound on the output reserved per input byte before inflating.
const INFLATE_RESERVE_RATIO: usize = 8;

/// LZ4 cannot expand a block by more than this factor.
const LZ4_MAX_RATIO: usize = 256;

/// Codec used for per-handle chain strings in a value-change block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackType {
    /// Zlib (pack byte `Z`).
    #[default]
    Zlib,
    /// LZ4 block format (pack byte `F`).
    Lz4,
}

impl PackType {
    /// Returns the pack byte recorded in the block.
    pub fn tag(self) -> u8 {
        match self {
            Self::Zlib => b'Z',
            Self::Lz4 => b'F',
        }
    }

    /// Maps a pack byte back to its codec. Unknown bytes read as zlib.
    pub fn from_tag(tag: u8) -> Self {
        if tag == b'F' {
            Self::Lz4
        } else {
            Self::Zlib
        }
    }

    /// Compresses a chain string, returning `None` when raw storage is smaller.
    pub fn pack_chain(self, data: &[u8]) -> Result<Option<Vec<u8>>, CodecError> {
        if data.len() <= MIN_PACK_LEN {
            return Ok(None);
        }
        let packed = match self {
            Self::Zlib => zlib_compress(data, CHAIN_ZLIB_LEVEL)?,
            Self::Lz4 => lz4_flex::block::compress(data),
        };
        Ok((packed.len() < data.len()).then_some(packed))
    }

    /// Inflates a chain string packed by [`pack_chain`](Self::pack_chain).
    pub fn unpack_chain(self, data: &[u8], uncompressed_len: usize) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::Zlib => zlib_inflate(data, uncompressed_len, "chain"),
            Self::Lz4 => {
                if uncompressed_len > data.len().saturating_mul(LZ4_MAX_RATIO) {
                    return Err(CodecError::LengthMismatch {
                        what: "chain",
                        expected: uncompressed_len,
                        actual: data.len().saturating_mul(LZ4_MAX_RATIO),
                    });
                }
                let out = lz4_flex::block::decompress(data, uncompressed_len).map_err(|e| {
                    CodecError::Decompress {
                        codec: "lz4",
                        message: e.to_string(),
                    }
                })?;
                check_len("chain", uncompressed_len, out)
            }
        }
    }
}

fn check_len(what: &'static str, expected: usize, out: Vec<u8>) -> Result<Vec<u8>, CodecError> {
    if out.len() == expected {
        Ok(out)
    } else {
        Err(CodecError::LengthMismatch {
            what,
            expected,
            actual: out.len(),
        })
    }
}

/// Compresses with zlib framing at the given level.
pub fn zlib_compress(data: &[u8], level: u32) -> Result<Vec<u8>, CodecError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Compresses with zlib level 9 and keeps the result only if it is smaller.
///
/// Returns the bytes to store; callers compare their length against the
/// input to tell readers whether the section is compressed.
pub fn zlib_if_smaller(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let packed = zlib_compress(data, SECTION_ZLIB_LEVEL)?;
    Ok(if packed.len() < data.len() {
        packed
    } else {
        data.to_vec()
    })
}

/// Inflates a zlib stream that must produce exactly `expected` bytes.
pub fn zlib_inflate(data: &[u8], expected: usize, what: &'static str) -> Result<Vec<u8>, CodecError> {
    inflate(ZlibDecoder::new(data), "zlib", data.len(), expected, what)
}

/// Returns `data` itself when stored raw, or its inflation otherwise.
///
/// Sections signal compression by storing a compressed length that differs
/// from the uncompressed one.
pub fn zlib_section(data: &[u8], uncompressed_len: usize, what: &'static str) -> Result<Vec<u8>, CodecError> {
    if data.len() == uncompressed_len {
        Ok(data.to_vec())
    } else {
        zlib_inflate(data, uncompressed_len, what)
    }
}

/// Compresses with gzip framing.
pub fn gzip_compress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(GZIP_LEVEL));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Inflates a gzip stream that must produce exactly `expected` bytes.
pub fn gzip_inflate(data: &[u8], expected: usize, what: &'static str) -> Result<Vec<u8>, CodecError> {
    inflate(GzDecoder::new(data), "gzip", data.len(), expected, what)
}

/// Reads at most one byte past `expected` so a lying length field can
/// neither reserve nor produce unbounded output.
fn inflate<R: Read>(
    decoder: R,
    codec: &'static str,
    input_len: usize,
    expected: usize,
    what: &'static str,
) -> Result<Vec<u8>, CodecError> {
    let reserve = expected.min(input_len.saturating_mul(INFLATE_RESERVE_RATIO));
    let mut out = Vec::with_capacity(reserve);
    decoder
        .take((expected as u64).saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|e| CodecError::Decompress {
            codec,
            message: e.to_string(),
        })?;
    check_len(what, expected, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repetitive(len: usize) -> Vec<u8> {
        (0..len).map(|i| b"0011"[i % 4]).collect()
    }

    #[test]
    fn short_chains_stay_raw() {
        let data = repetitive(MIN_PACK_LEN);
        assert!(PackType::Zlib.pack_chain(&data).unwrap().is_none());
        assert!(PackType::Lz4.pack_chain(&data).unwrap().is_none());
    }

    #[test]
    fn zlib_chain_roundtrip() {
        let data = repetitive(400);
        let packed = PackType::Zlib.pack_chain(&data).unwrap().unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(PackType::Zlib.unpack_chain(&packed, data.len()).unwrap(), data);
    }

    #[test]
    fn lz4_chain_roundtrip() {
        let data = repetitive(400);
        let packed = PackType::Lz4.pack_chain(&data).unwrap().unwrap();
        assert_eq!(PackType::Lz4.unpack_chain(&packed, data.len()).unwrap(), data);
    }

    #[test]
    fn incompressible_chain_stays_raw() {
        let data: Vec<u8> = (0..36u8).map(|i| i.wrapping_mul(7)).collect();
        assert!(PackType::Zlib.pack_chain(&data).unwrap().is_none());
    }

    #[test]
    fn pack_tags() {
        assert_eq!(PackType::Zlib.tag(), b'Z');
        assert_eq!(PackType::from_tag(b'F'), PackType::Lz4);
        assert_eq!(PackType::from_tag(b'Z'), PackType::Zlib);
    }

    #[test]
    fn section_helpers() {
        let data = repetitive(200);
        let stored = zlib_if_smaller(&data).unwrap();
        assert!(stored.len() < data.len());
        assert_eq!(zlib_section(&stored, data.len(), "test").unwrap(), data);

        let tiny = b"ab".to_vec();
        let stored = zlib_if_smaller(&tiny).unwrap();
        assert_eq!(stored, tiny);
        assert_eq!(zlib_section(&stored, 2, "test").unwrap(), tiny);
    }

    #[test]
    fn gzip_roundtrip() {
        let data = b"hello world hello world";
        let compressed = gzip_compress(data).unwrap();
        assert_eq!(gzip_inflate(&compressed, data.len(), "test").unwrap(), data);
    }

    #[test]
    fn length_mismatch_detected() {
        let data = repetitive(100);
        let packed = zlib_compress(&data, 9).unwrap();
        assert!(matches!(
            zlib_inflate(&packed, 99, "test"),
            Err(CodecError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn absurd_lengths_fail_without_reserving() {
        let data = repetitive(100);
        let packed = zlib_compress(&data, 9).unwrap();
        assert!(matches!(
            zlib_inflate(&packed, usize::MAX / 2, "test"),
            Err(CodecError::LengthMismatch { actual: 100, .. })
        ));
        let gz = gzip_compress(&data).unwrap();
        assert!(gzip_inflate(&gz, usize::MAX, "test").is_err());
        let lz = PackType::Lz4.pack_chain(&repetitive(400)).unwrap().unwrap();
        assert!(matches!(
            PackType::Lz4.unpack_chain(&lz, usize::MAX / 2),
            Err(CodecError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn serde_names() {
        assert_eq!(serde_json::to_string(&PackType::Lz4).unwrap(), "\"lz4\"");
    }
}
