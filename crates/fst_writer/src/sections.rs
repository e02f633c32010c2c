//! Sections written once, when the trace is closed.

use std::fs::{self, File};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use fst_common::block::{BlockKind, GEOM_VARLEN};
use fst_common::pack::{gzip_compress, zlib_if_smaller, GZIP_LEVEL};
use fst_common::varint::{write_u64_be, write_varint};
use fst_common::{CodecError, SignalKind};

/// Encodes the geometry block: one varint per handle giving its width, 0 for
/// reals, `0xFFFFFFFF` for variable-length values.
pub fn geometry_block(
    handles: impl ExactSizeIterator<Item = (SignalKind, u32)>,
) -> Result<Vec<u8>, CodecError> {
    let max_handle = handles.len() as u64;
    let mut raw = Vec::with_capacity(handles.len());
    for (kind, width) in handles {
        let code = match kind {
            SignalKind::Bits => u64::from(width),
            SignalKind::Real => 0,
            SignalKind::VarLen => GEOM_VARLEN,
        };
        write_varint(&mut raw, code);
    }
    let stored = zlib_if_smaller(&raw)?;
    let mut out = Vec::with_capacity(stored.len() + 25);
    out.push(BlockKind::Geometry.tag());
    write_u64_be(&mut out, stored.len() as u64 + 24);
    write_u64_be(&mut out, raw.len() as u64);
    write_u64_be(&mut out, max_handle);
    out.extend_from_slice(&stored);
    Ok(out)
}

/// Encodes the blackout block from `(time, active)` transitions.
pub fn blackout_block(records: &[(u64, bool)]) -> Vec<u8> {
    let mut payload = Vec::new();
    write_varint(&mut payload, records.len() as u64);
    let mut prev = 0;
    for &(time, active) in records {
        payload.push(u8::from(active));
        write_varint(&mut payload, time - prev);
        prev = time;
    }
    let mut out = Vec::with_capacity(payload.len() + 9);
    out.push(BlockKind::Blackout.tag());
    write_u64_be(&mut out, payload.len() as u64 + 8);
    out.extend_from_slice(&payload);
    out
}

/// Encodes the hierarchy block: uncompressed length plus a gzip stream.
pub fn hierarchy_block(records: &[u8]) -> Result<Vec<u8>, CodecError> {
    let packed = gzip_compress(records)?;
    let mut out = Vec::with_capacity(packed.len() + 17);
    out.push(BlockKind::Hierarchy.tag());
    write_u64_be(&mut out, packed.len() as u64 + 16);
    write_u64_be(&mut out, records.len() as u64);
    out.extend_from_slice(&packed);
    Ok(out)
}

/// Rewrites a finished trace as one gzip-wrapped block, replacing `path`.
pub fn repack(path: &Path) -> io::Result<u64> {
    let mut packed_name = path.as_os_str().to_owned();
    packed_name.push(".pak");
    let packed_path = PathBuf::from(packed_name);

    let mut source = File::open(path)?;
    let uncompressed = source.metadata()?.len();

    let mut out = BufWriter::new(File::create(&packed_path)?);
    out.write_all(&[BlockKind::Wrapper.tag()])?;
    out.write_all(&0u64.to_be_bytes())?;
    out.write_all(&uncompressed.to_be_bytes())?;
    let mut gz = GzEncoder::new(out, Compression::new(GZIP_LEVEL));
    io::copy(&mut source, &mut gz)?;
    let mut out = gz.finish()?;

    let total = out.stream_position()?;
    out.seek(SeekFrom::Start(1))?;
    out.write_all(&(total - 1).to_be_bytes())?;
    out.flush()?;
    drop(out);
    drop(source);

    fs::rename(&packed_path, path)?;
    Ok(total)
}
