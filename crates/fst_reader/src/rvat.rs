//! Reading one signal's value at an arbitrary time.
//!
//! The last decoded block stays cached, along with every chain inflated from
//! it. Each cached chain keeps a cursor at the last record at or before the
//! previous query, so queries at increasing times only decode new records.

use std::collections::HashMap;

use fst_common::{Handle, SignalKind};

use crate::block::ValueBlock;
use crate::chain::{ChainCursor, CursorMark};
use crate::error::ReaderError;
use crate::reader::{real_from_bytes, Reader};
use crate::stream::load_block;
use crate::value::OwnedValue;

/// Decoded state reused between queries.
#[derive(Debug, Default)]
pub(crate) struct RvatCache {
    block: Option<(usize, ValueBlock)>,
    chains: HashMap<usize, CachedChain>,
}

#[derive(Debug, Default)]
struct CachedChain {
    data: Vec<u8>,
    /// Position just after `last`.
    mark: CursorMark,
    /// Newest record at or before `query`.
    last: Option<Vec<u8>>,
    query: u64,
}

impl Reader {
    /// Index of the block answering a query at `time`.
    ///
    /// A time equal to a block's end belongs to the next block when that
    /// block starts at the same time, unless it is the trace's end time.
    /// Times past the last block use the last block.
    fn block_for_time(&self, time: u64) -> Option<usize> {
        let first = self.blocks.first()?;
        if time < first.begin {
            return None;
        }
        let idx = self.blocks.partition_point(|b| b.end < time);
        let Some(block) = self.blocks.get(idx) else {
            return Some(self.blocks.len() - 1);
        };
        if block.begin > time {
            return Some(idx.saturating_sub(1));
        }
        let next_starts_here = self.blocks.get(idx + 1).is_some_and(|n| n.begin == time);
        if time == block.end && time != self.header.end_time && next_starts_here {
            Some(idx + 1)
        } else {
            Some(idx)
        }
    }

    /// Value of `handle` at `time`.
    ///
    /// Returns `None` before the first block, and for variable-length
    /// signals with no change at or before `time` within the block.
    pub fn value_at(
        &mut self,
        time: u64,
        handle: Handle,
    ) -> Result<Option<OwnedValue>, ReaderError> {
        let idx = handle
            .index()
            .filter(|&i| i < self.geometry.len())
            .ok_or(ReaderError::UnknownHandle(handle))?;
        let Some(bi) = self.block_for_time(time) else {
            return Ok(None);
        };

        if self.rvat.block.as_ref().map(|(i, _)| *i) != Some(bi) {
            let block = load_block(&mut self.file, &self.blocks[bi], self.geometry.len())?;
            self.rvat.block = Some((bi, block));
            self.rvat.chains.clear();
        }
        let RvatCache { block, chains } = &mut self.rvat;
        let Some((_, block)) = block.as_ref() else {
            return Ok(None);
        };

        let kind = self.geometry.kind(idx);
        let len = self.geometry.storage_len(idx);
        let chain = match chains.entry(idx) {
            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::hash_map::Entry::Vacant(e) => {
                let data = block.chain(idx)?.map(|c| c.into_owned()).unwrap_or_default();
                e.insert(CachedChain {
                    data,
                    ..CachedChain::default()
                })
            }
        };
        advance(chain, block, kind, len, time)?;

        let bytes = match (&chain.last, kind) {
            (Some(last), _) => last.clone(),
            (None, SignalKind::VarLen) => return Ok(None),
            (None, _) => block.frame_value(&self.geometry, idx).into_owned(),
        };
        Ok(Some(match kind {
            SignalKind::Bits => OwnedValue::Bits(bytes),
            SignalKind::Real => OwnedValue::Real(real_from_bytes(&bytes, self.header.byte_swapped)),
            SignalKind::VarLen => OwnedValue::Bytes(bytes),
        }))
    }
}

/// Moves the chain's cursor to the newest record at or before `time`.
fn advance(
    chain: &mut CachedChain,
    block: &ValueBlock,
    kind: SignalKind,
    len: usize,
    time: u64,
) -> Result<(), ReaderError> {
    if time < chain.query {
        chain.mark = CursorMark::default();
        chain.last = None;
    }
    chain.query = time;

    let mut cursor = ChainCursor::resume(&chain.data, kind, len, chain.mark);
    let mut value = Vec::new();
    loop {
        let before = cursor.mark();
        let Some(tidx) = cursor.next_into(&mut value)? else {
            break;
        };
        let at = *block
            .times
            .get(tidx as usize)
            .ok_or_else(|| ReaderError::CorruptBlock {
                offset: block.pos,
                reason: "chain record past the time table".to_string(),
            })?;
        if at > time {
            chain.mark = before;
            return Ok(());
        }
        chain.last = Some(value.clone());
    }
    chain.mark = cursor.mark();
    Ok(())
}
