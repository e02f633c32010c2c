//! Chronological traversal of every value change.
//!
//! Each block's chains are decoded handle by handle and scattered into one
//! bucket per time index, so changes come out time by time with ascending
//! handles inside a time step. Only one block is decoded at once.

use std::fs::File;

use fst_common::{Handle, SignalKind};
use tracing::debug;

use crate::block::{BlockInfo, ValueBlock};
use crate::chain::ChainCursor;
use crate::error::ReaderError;
use crate::geometry::Geometry;
use crate::reader::{read_exact_at, real_from_bytes, Reader};
use crate::value::Value;

/// Receives value changes in time order.
pub trait ChangeSink {
    /// A new time step starts. Called once per distinct time.
    fn on_time(&mut self, _time: u64) {}

    /// A fixed-width or real signal changed.
    fn on_value(&mut self, time: u64, handle: Handle, value: Value<'_>);

    /// A variable-length signal changed.
    fn on_varlen(&mut self, time: u64, handle: Handle, value: &[u8]) {
        self.on_value(time, handle, Value::Bytes(value));
    }

    /// Dumping was switched on or off.
    fn on_dump_active(&mut self, _time: u64, _active: bool) {}
}

/// Adapts a closure to [`ChangeSink`].
struct FnSink<F>(F);

impl<F: FnMut(u64, Handle, Value<'_>)> ChangeSink for FnSink<F> {
    fn on_value(&mut self, time: u64, handle: Handle, value: Value<'_>) {
        (self.0)(time, handle, value);
    }
}

/// Announces times and interleaves blackout transitions.
struct Clock<'a> {
    blackouts: &'a [(u64, bool)],
    next_blackout: usize,
    announced: Option<u64>,
}

impl Clock<'_> {
    fn announce<S: ChangeSink + ?Sized>(&mut self, sink: &mut S, time: u64) {
        self.drain_blackouts(sink, |t| t < time);
        self.mark(sink, time);
        self.drain_blackouts(sink, |t| t == time);
    }

    fn mark<S: ChangeSink + ?Sized>(&mut self, sink: &mut S, time: u64) {
        if self.announced != Some(time) {
            sink.on_time(time);
            self.announced = Some(time);
        }
    }

    fn drain_blackouts<S: ChangeSink + ?Sized>(
        &mut self,
        sink: &mut S,
        due: impl Fn(u64) -> bool,
    ) {
        while let Some(&(t, active)) = self.blackouts.get(self.next_blackout) {
            if !due(t) {
                break;
            }
            self.mark(sink, t);
            sink.on_dump_active(t, active);
            self.next_blackout += 1;
        }
    }
}

impl Reader {
    /// Includes `handle` in traversals. Unknown handles are ignored.
    pub fn set_mask(&mut self, handle: Handle) {
        if let Some(slot) = handle.index().and_then(|i| self.mask.get_mut(i)) {
            *slot = true;
        }
    }

    /// Excludes `handle` from traversals. Unknown handles are ignored.
    pub fn clear_mask(&mut self, handle: Handle) {
        if let Some(slot) = handle.index().and_then(|i| self.mask.get_mut(i)) {
            *slot = false;
        }
    }

    /// Includes every handle.
    pub fn set_mask_all(&mut self) {
        self.mask.fill(true);
    }

    /// Excludes every handle.
    pub fn clear_mask_all(&mut self) {
        self.mask.fill(false);
    }

    /// True when `handle` is included in traversals.
    pub fn is_masked(&self, handle: Handle) -> bool {
        handle
            .index()
            .and_then(|i| self.mask.get(i))
            .copied()
            .unwrap_or(false)
    }

    /// Restricts traversals to changes in `start..=end`.
    pub fn set_limit_time_range(&mut self, start: u64, end: u64) {
        self.limit = Some((start, end));
    }

    /// Removes any traversal time limit.
    pub fn set_unlimited_time_range(&mut self) {
        self.limit = None;
    }

    /// Reports every value change of the masked handles, in time order.
    ///
    /// When the traversal starts after the first recorded time, the opening
    /// values of the first visited block are reported at its begin time.
    pub fn iter_blocks<S: ChangeSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<(), ReaderError> {
        let (lo, hi) = self.limit.unwrap_or((0, u64::MAX));
        let mut clock = Clock {
            blackouts: &self.blackouts,
            next_blackout: self.blackouts.partition_point(|&(t, _)| t < lo),
            announced: None,
        };
        let swapped = self.header.byte_swapped;
        let mut skipped = false;
        let mut first = true;
        let mut value = Vec::new();

        for bi in 0..self.blocks.len() {
            let info = self.blocks[bi];
            if info.end < lo {
                skipped = true;
                continue;
            }
            if info.begin > hi {
                break;
            }
            let block = load_block(&mut self.file, &info, self.geometry.len())?;
            debug!(
                begin = block.begin,
                end = block.end,
                times = block.times.len(),
                "streaming block"
            );

            if first {
                first = false;
                if skipped || block.times.first() != Some(&block.begin) {
                    clock.announce(sink, block.begin);
                    for idx in 0..self.geometry.len() {
                        if !self.mask[idx] || self.geometry.kind(idx) == SignalKind::VarLen {
                            continue;
                        }
                        let frame = block.frame_value(&self.geometry, idx);
                        emit(sink, &self.geometry, swapped, block.begin, idx, &frame);
                    }
                }
            }

            let mut buckets: Vec<Vec<(usize, usize, usize)>> =
                vec![Vec::new(); block.times.len()];
            let mut values = Vec::new();
            for idx in 0..self.geometry.len() {
                if !self.mask[idx] {
                    continue;
                }
                let Some(chain) = block.chain(idx)? else {
                    continue;
                };
                let kind = self.geometry.kind(idx);
                let mut cursor = ChainCursor::new(&chain, kind, self.geometry.storage_len(idx));
                while let Some(tidx) = cursor.next_into(&mut value)? {
                    let bucket = buckets.get_mut(tidx as usize).ok_or_else(|| {
                        ReaderError::CorruptBlock {
                            offset: block.pos,
                            reason: format!("handle {} changes past the time table", idx + 1),
                        }
                    })?;
                    bucket.push((idx, values.len(), value.len()));
                    values.extend_from_slice(&value);
                }
            }

            for (tidx, bucket) in buckets.iter().enumerate() {
                let time = block.times[tidx];
                if time < lo || time > hi {
                    continue;
                }
                clock.announce(sink, time);
                for &(idx, start, len) in bucket {
                    let bytes = &values[start..start + len];
                    emit(sink, &self.geometry, swapped, time, idx, bytes);
                }
            }
        }
        clock.drain_blackouts(sink, |t| t <= hi);
        Ok(())
    }

    /// Calls `f` for every value change of the masked handles.
    pub fn for_each_change<F>(&mut self, f: F) -> Result<(), ReaderError>
    where
        F: FnMut(u64, Handle, Value<'_>),
    {
        self.iter_blocks(&mut FnSink(f))
    }
}

/// Reads and decodes one value-change block.
pub(crate) fn load_block(
    file: &mut File,
    info: &BlockInfo,
    max_handles: usize,
) -> Result<ValueBlock, ReaderError> {
    let data = read_exact_at(file, info.pos, info.total_len() as usize)?;
    ValueBlock::decode(info.pos, data, max_handles)
}

fn emit<S: ChangeSink + ?Sized>(
    sink: &mut S,
    geometry: &Geometry,
    byte_swapped: bool,
    time: u64,
    idx: usize,
    bytes: &[u8],
) {
    let handle = Handle::from_index(idx);
    match geometry.kind(idx) {
        SignalKind::Bits => sink.on_value(time, handle, Value::Bits(bytes)),
        SignalKind::Real => {
            sink.on_value(time, handle, Value::Real(real_from_bytes(bytes, byte_swapped)))
        }
        SignalKind::VarLen => sink.on_varlen(time, handle, bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fst_common::{ScopeType, VarDir, VarType};
    use fst_writer::Writer;
    use std::path::{Path, PathBuf};

    fn pair_trace(dir: &Path) -> PathBuf {
        let path = dir.join("t.fst");
        let mut w = Writer::create(&path, true).unwrap();
        w.set_scope(ScopeType::Module, "top", "").unwrap();
        let a = w
            .create_variable(VarType::Wire, VarDir::Implicit, 1, "a", None)
            .unwrap();
        let b = w
            .create_variable(VarType::Reg, VarDir::Implicit, 2, "b", None)
            .unwrap();
        w.set_upscope().unwrap();
        w.emit_time_change(0).unwrap();
        w.emit_value_change(a, b"0").unwrap();
        w.emit_value_change(b, b"00").unwrap();
        w.emit_time_change(5).unwrap();
        w.emit_value_change(a, b"1").unwrap();
        w.emit_time_change(10).unwrap();
        w.emit_value_change(b, b"11").unwrap();
        w.emit_time_change(15).unwrap();
        w.emit_value_change(a, b"0").unwrap();
        w.close().unwrap();
        path
    }

    fn collect(reader: &mut Reader) -> Vec<(u64, u32, String)> {
        let mut seen = Vec::new();
        reader
            .for_each_change(|time, handle, value| {
                let text = match value {
                    Value::Bits(bits) => String::from_utf8_lossy(bits).into_owned(),
                    other => format!("{other:?}"),
                };
                seen.push((time, handle.as_raw(), text));
            })
            .unwrap();
        seen
    }

    fn change(time: u64, handle: u32, text: &str) -> (u64, u32, String) {
        (time, handle, text.to_string())
    }

    #[test]
    fn changes_come_out_by_time_then_handle() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = Reader::open(pair_trace(dir.path())).unwrap();
        assert_eq!(
            collect(&mut reader),
            vec![
                change(0, 1, "0"),
                change(0, 2, "00"),
                change(5, 1, "1"),
                change(10, 2, "11"),
                change(15, 1, "0"),
            ]
        );
    }

    #[test]
    fn masks_select_handles() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = Reader::open(pair_trace(dir.path())).unwrap();
        let a = Handle::from_raw(1);
        let b = Handle::from_raw(2);
        assert!(reader.is_masked(a) && reader.is_masked(b));

        reader.clear_mask(a);
        reader.clear_mask(Handle::from_raw(9));
        assert!(!reader.is_masked(a));
        assert!(!reader.is_masked(Handle::from_raw(9)));
        assert_eq!(
            collect(&mut reader),
            vec![change(0, 2, "00"), change(10, 2, "11")]
        );

        reader.clear_mask_all();
        assert!(collect(&mut reader).is_empty());
        reader.set_mask(a);
        assert_eq!(collect(&mut reader).len(), 3);
        reader.set_mask_all();
        assert_eq!(collect(&mut reader).len(), 5);
    }

    #[test]
    fn time_range_limits_and_resets() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = Reader::open(pair_trace(dir.path())).unwrap();
        reader.set_limit_time_range(5, 10);
        assert_eq!(
            collect(&mut reader),
            vec![change(5, 1, "1"), change(10, 2, "11")]
        );
        reader.set_unlimited_time_range();
        assert_eq!(collect(&mut reader).len(), 5);
    }
}
