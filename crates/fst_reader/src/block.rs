//! Locating and decoding value-change blocks.

use std::borrow::Cow;

use fst_common::block::{VC_FRAME_OFFSET, VC_TIME_TRAILER};
use fst_common::pack::zlib_section;
use fst_common::varint::{read_u64_be, read_varint};
use fst_common::{PackType, SignalKind};

use crate::error::ReaderError;
use crate::geometry::Geometry;

/// Where a value-change block sits in the file and the times it covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Offset of the block's tag byte.
    pub pos: u64,
    /// Section length, as stored after the tag.
    pub seclen: u64,
    /// First time covered.
    pub begin: u64,
    /// Last time covered.
    pub end: u64,
}

impl BlockInfo {
    /// Total bytes including the tag.
    pub fn total_len(&self) -> u64 {
        self.seclen + 1
    }
}

/// A decoded value-change block: frame, time table and chain locations.
#[derive(Debug)]
pub struct ValueBlock {
    /// File offset, for error reports.
    pub pos: u64,
    /// First time covered.
    pub begin: u64,
    /// Last time covered.
    pub end: u64,
    /// Values of every signal when the block opened.
    pub frame: Vec<u8>,
    /// Signals covered by `frame`.
    pub frame_handles: usize,
    /// Absolute times, one per time index.
    pub times: Vec<u64>,
    data: Vec<u8>,
    pack: PackType,
    /// Per-signal `(start, len)` of its stored chain within `data`.
    chains: Vec<Option<(usize, usize)>>,
}

enum IndexEntry {
    Idle,
    At(usize),
    Alias(usize),
}

impl ValueBlock {
    /// Decodes a whole block, tag included, read from offset `pos`.
    ///
    /// `max_handles` bounds the signal count the block may claim.
    pub fn decode(pos: u64, data: Vec<u8>, max_handles: usize) -> Result<Self, ReaderError> {
        let corrupt = |reason: &str| ReaderError::CorruptBlock {
            offset: pos,
            reason: reason.to_string(),
        };
        let begin = read_u64_be(&data, 9)?;
        let end = read_u64_be(&data, 17)?;

        let mut cur = VC_FRAME_OFFSET as usize;
        let (frame_uclen, n) = read_varint(&data, cur)?;
        cur += n;
        let (frame_clen, n) = read_varint(&data, cur)?;
        cur += n;
        let (frame_handles, n) = read_varint(&data, cur)?;
        cur += n;
        let frame_end = usize::try_from(frame_clen)
            .ok()
            .and_then(|len| cur.checked_add(len))
            .filter(|&end| end <= data.len())
            .ok_or_else(|| corrupt("frame overruns block"))?;
        let frame = zlib_section(&data[cur..frame_end], frame_uclen as usize, "frame")?;
        cur = frame_end;

        let (vc_handles, n) = read_varint(&data, cur)?;
        cur += n;
        if vc_handles > max_handles as u64 {
            return Err(corrupt("more signals than the trace declares"));
        }
        let vc_start = cur;
        let pack = PackType::from_tag(*data.get(vc_start).ok_or_else(|| corrupt("missing pack byte"))?);

        let trailer = data
            .len()
            .checked_sub(VC_TIME_TRAILER as usize)
            .ok_or_else(|| corrupt("missing time trailer"))?;
        let time_uclen = read_u64_be(&data, trailer)? as usize;
        let time_clen = read_u64_be(&data, trailer + 8)? as usize;
        let time_count = read_u64_be(&data, trailer + 16)?;
        let table_start = trailer
            .checked_sub(time_clen)
            .ok_or_else(|| corrupt("time table overruns block"))?;
        let table = zlib_section(&data[table_start..trailer], time_uclen, "time table")?;
        if time_count > table.len() as u64 {
            return Err(corrupt("time count exceeds time table"));
        }
        let mut times = Vec::with_capacity(time_count as usize);
        let mut tpos = 0;
        let mut time = 0u64;
        for _ in 0..time_count {
            let (delta, n) = read_varint(&table, tpos)?;
            tpos += n;
            time = time
                .checked_add(delta)
                .ok_or_else(|| corrupt("time table overflows"))?;
            times.push(time);
        }

        let index_end = table_start
            .checked_sub(8)
            .ok_or_else(|| corrupt("missing index length"))?;
        let index_len = read_u64_be(&data, index_end)? as usize;
        let index_start = index_end
            .checked_sub(index_len)
            .filter(|&s| s > vc_start)
            .ok_or_else(|| corrupt("index overruns block"))?;
        let entries = read_index(&data[index_start..index_end], vc_handles as usize)?;
        let chains = resolve_chains(&entries, vc_start, index_start)
            .ok_or_else(|| corrupt("bad chain index"))?;

        Ok(Self {
            pos,
            begin,
            end,
            frame,
            frame_handles: frame_handles as usize,
            times,
            data,
            pack,
            chains,
        })
    }

    /// Returns the inflated chain of the signal at `index`, or `None` when
    /// it did not change in this block.
    pub fn chain(&self, index: usize) -> Result<Option<Cow<'_, [u8]>>, ReaderError> {
        let Some(&Some((start, len))) = self.chains.get(index) else {
            return Ok(None);
        };
        let stored = &self.data[start..start + len];
        let (uclen, n) = read_varint(stored, 0)?;
        let body = &stored[n..];
        if uclen == 0 {
            Ok(Some(Cow::Borrowed(body)))
        } else {
            Ok(Some(Cow::Owned(self.pack.unpack_chain(body, uclen as usize)?)))
        }
    }

    /// Value of the signal at `index` when the block opened.
    ///
    /// Signals declared after the block opened read as all `x`, or NaN for
    /// reals.
    pub fn frame_value(&self, geometry: &Geometry, index: usize) -> Cow<'_, [u8]> {
        let len = geometry.storage_len(index);
        let off = geometry.frame_offset(index);
        match self.frame.get(off..off + len) {
            Some(bytes) if index < self.frame_handles => Cow::Borrowed(bytes),
            _ if geometry.kind(index) == SignalKind::Real => {
                Cow::Owned(f64::NAN.to_ne_bytes().to_vec())
            }
            _ => Cow::Owned(vec![b'x'; len]),
        }
    }
}

fn read_index(index: &[u8], handles: usize) -> Result<Vec<IndexEntry>, ReaderError> {
    let mut entries = Vec::with_capacity(handles);
    let mut pos = 0;
    let mut prev = 0usize;
    while pos < index.len() && entries.len() < handles {
        let (v, n) = read_varint(index, pos)?;
        pos += n;
        if v & 1 == 1 {
            prev = prev.saturating_add((v >> 1) as usize);
            entries.push(IndexEntry::At(prev));
        } else if v == 0 {
            let (target, n) = read_varint(index, pos)?;
            pos += n;
            entries.push(IndexEntry::Alias(target as usize));
        } else {
            let run = ((v >> 1) as usize).min(handles - entries.len());
            entries.extend((0..run).map(|_| IndexEntry::Idle));
        }
    }
    entries.resize_with(handles, || IndexEntry::Idle);
    Ok(entries)
}

/// Turns index entries into absolute `(start, len)` ranges. Each string
/// runs up to the next one; the last runs up to the index.
fn resolve_chains(
    entries: &[IndexEntry],
    vc_start: usize,
    index_start: usize,
) -> Option<Vec<Option<(usize, usize)>>> {
    let mut starts = entries
        .iter()
        .filter_map(|e| match e {
            IndexEntry::At(off) => Some(vc_start.checked_add(*off)),
            _ => None,
        })
        .collect::<Option<Vec<usize>>>()?;
    starts.push(index_start);

    let mut chains: Vec<Option<(usize, usize)>> = Vec::with_capacity(entries.len());
    let mut next = 0;
    for (i, entry) in entries.iter().enumerate() {
        let loc = match entry {
            IndexEntry::Idle => None,
            IndexEntry::At(_) => {
                let start = starts[next];
                let end = starts[next + 1];
                next += 1;
                Some((start, end.checked_sub(start)?))
            }
            IndexEntry::Alias(target) => {
                let target = target.checked_sub(1).filter(|&t| t < i)?;
                chains[target]
            }
        };
        chains.push(loc);
    }
    Some(chains)
}
