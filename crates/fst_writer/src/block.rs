//! Encoding one finished value-change block.
//!
//! A [`BlockJob`] owns everything a block needs, so it can be encoded on the
//! calling thread or handed to the flush worker unchanged.

use std::collections::HashMap;

use fst_common::block::BlockKind;
use fst_common::pack::zlib_if_smaller;
use fst_common::varint::{write_u64_be, write_varint};
use fst_common::{ContentHash, PackType, SignalKind};
use tracing::debug;

use crate::arena::{ChainArena, RecordId};
use crate::chain::{recode_chain, ReverseBuilder};
use crate::error::WriterError;

/// Per-handle chain state captured when a block is sealed.
#[derive(Clone, Copy, Debug)]
pub struct ChainSlot {
    pub kind: SignalKind,
    pub width: u32,
    pub head: Option<RecordId>,
}

/// A sealed block waiting to be encoded and written.
#[derive(Debug)]
pub struct BlockJob {
    pub begin: u64,
    pub end: u64,
    /// Current values of every handle when the block opened.
    pub frame: Vec<u8>,
    /// Handle count covered by `frame`.
    pub frame_handles: u32,
    pub slots: Vec<ChainSlot>,
    pub arena: ChainArena,
    /// Absolute times of the block's time table, in order.
    pub times: Vec<u64>,
    pub pack: PackType,
}

/// Where a handle's chain ended up in the block.
enum IndexEntry {
    Idle,
    Data(u64),
    Alias(u32),
}

impl BlockJob {
    /// Encodes the block, tag included.
    pub fn encode(&self) -> Result<Vec<u8>, WriterError> {
        let mut out = Vec::with_capacity(self.arena.len() / 2 + self.frame.len() + 64);
        out.push(BlockKind::ValueChangeAlias.tag());
        write_u64_be(&mut out, 0);
        write_u64_be(&mut out, self.begin);
        write_u64_be(&mut out, self.end);
        write_u64_be(&mut out, 0);

        let frame = zlib_if_smaller(&self.frame)?;
        write_varint(&mut out, self.frame.len() as u64);
        write_varint(&mut out, frame.len() as u64);
        write_varint(&mut out, u64::from(self.frame_handles));
        out.extend_from_slice(&frame);

        write_varint(&mut out, self.slots.len() as u64);
        let vc_start = out.len();
        out.push(self.pack.tag());

        let (entries, traversal_mem) = self.write_chains(&mut out, vc_start)?;

        let index_pos = out.len();
        write_index(&mut out, &entries);
        let index_len = (out.len() - index_pos) as u64;
        write_u64_be(&mut out, index_len);

        let mut table = Vec::with_capacity(self.times.len() * 2);
        let mut prev = 0;
        for &t in &self.times {
            write_varint(&mut table, t - prev);
            prev = t;
        }
        let stored = zlib_if_smaller(&table)?;
        out.extend_from_slice(&stored);
        write_u64_be(&mut out, table.len() as u64);
        write_u64_be(&mut out, stored.len() as u64);
        write_u64_be(&mut out, self.times.len() as u64);

        let seclen = (out.len() - 1) as u64;
        out[1..9].copy_from_slice(&seclen.to_be_bytes());
        out[25..33].copy_from_slice(&traversal_mem.to_be_bytes());

        debug!(
            begin = self.begin,
            end = self.end,
            times = self.times.len(),
            bytes = out.len(),
            "encoded value-change block"
        );
        Ok(out)
    }

    /// Appends every non-idle chain, sharing byte-identical entries.
    ///
    /// Returns the index entries and the summed uncompressed chain length.
    fn write_chains(
        &self,
        out: &mut Vec<u8>,
        vc_start: usize,
    ) -> Result<(Vec<IndexEntry>, u64), WriterError> {
        let mut entries = Vec::with_capacity(self.slots.len());
        let mut seen: HashMap<ContentHash, Vec<(u32, usize, usize)>> = HashMap::new();
        let mut builder = ReverseBuilder::with_capacity(1024);
        let mut scratch = Vec::new();
        let mut entry = Vec::new();
        let mut traversal_mem = 0u64;

        for (i, slot) in self.slots.iter().enumerate() {
            if slot.head.is_none() {
                entries.push(IndexEntry::Idle);
                continue;
            }
            recode_chain(
                &self.arena,
                slot.head,
                slot.kind,
                slot.width as usize,
                &mut builder,
                &mut scratch,
            )?;
            let chain = builder.as_slice();
            traversal_mem += chain.len() as u64;

            entry.clear();
            match self.pack.pack_chain(chain)? {
                Some(packed) => {
                    write_varint(&mut entry, chain.len() as u64);
                    entry.extend_from_slice(&packed);
                }
                None => {
                    write_varint(&mut entry, 0);
                    entry.extend_from_slice(chain);
                }
            }

            let hash = ContentHash::from_bytes(&entry);
            let candidates = seen.entry(hash).or_default();
            let existing = candidates
                .iter()
                .find(|&&(_, start, end)| out[start..end] == entry[..])
                .map(|&(handle, _, _)| handle);
            match existing {
                Some(handle) => entries.push(IndexEntry::Alias(handle)),
                None => {
                    let start = out.len();
                    out.extend_from_slice(&entry);
                    candidates.push((i as u32 + 1, start, out.len()));
                    entries.push(IndexEntry::Data((start - vc_start) as u64));
                }
            }
        }
        Ok((entries, traversal_mem))
    }
}

/// Writes the handle index: offsets delta-coded, idle runs run-length coded.
fn write_index(out: &mut Vec<u8>, entries: &[IndexEntry]) {
    let mut prev = 0u64;
    let mut idle = 0u64;
    for entry in entries {
        if !matches!(entry, IndexEntry::Idle) && idle > 0 {
            write_varint(out, idle << 1);
            idle = 0;
        }
        match entry {
            IndexEntry::Idle => idle += 1,
            IndexEntry::Data(offset) => {
                write_varint(out, ((offset - prev) << 1) | 1);
                prev = *offset;
            }
            IndexEntry::Alias(handle) => {
                write_varint(out, 0);
                write_varint(out, u64::from(*handle));
            }
        }
    }
    if idle > 0 {
        write_varint(out, idle << 1);
    }
}
