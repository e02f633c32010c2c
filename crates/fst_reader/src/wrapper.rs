//! Inflating a gzip-wrapped trace into a temporary file.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

use flate2::read::GzDecoder;
use fst_common::varint::read_u64_from;
use fst_common::{BlockKind, CodecError};
use tracing::debug;

use crate::error::ReaderError;

/// Returns the plain trace behind `file`.
///
/// An unwrapped file is returned unchanged; a wrapped one is inflated into
/// an anonymous temporary file that disappears when closed. Either way the
/// returned file is positioned at offset 0.
pub fn unwrap_trace(mut file: File) -> Result<File, ReaderError> {
    let mut tag = [0u8; 1];
    file.seek(SeekFrom::Start(0))?;
    if file.read(&mut tag)? == 0 || BlockKind::from_tag(tag[0]) != Some(BlockKind::Wrapper) {
        file.seek(SeekFrom::Start(0))?;
        return Ok(file);
    }

    let seclen = read_u64_from(&mut file)?;
    let uncompressed = read_u64_from(&mut file)?;
    let stream = (&mut file).take(seclen.saturating_sub(16));
    let mut plain = tempfile::tempfile()?;
    let copied = io::copy(&mut GzDecoder::new(stream), &mut plain).map_err(|e| {
        CodecError::Decompress {
            codec: "gzip",
            message: e.to_string(),
        }
    })?;
    if copied != uncompressed {
        return Err(CodecError::LengthMismatch {
            what: "wrapped trace",
            expected: uncompressed as usize,
            actual: copied as usize,
        }
        .into());
    }
    debug!(bytes = copied, "inflated wrapped trace");
    plain.seek(SeekFrom::Start(0))?;
    Ok(plain)
}
