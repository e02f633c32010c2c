//! The trace writer.
//!
//! Declarations go to the hierarchy sidecar as they arrive. Value changes
//! accumulate in a [`ChainArena`] until the arena crosses the break size, at
//! which point the open block is sealed into a [`BlockJob`] and written,
//! either inline or by the background [`FlushWorker`]. Geometry, blackout
//! and hierarchy sections plus the final header are written by
//! [`Writer::close`].

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::mem;
use std::path::{Path, PathBuf};

use fst_common::block::HEADER_LEN;
use fst_common::{
    parse_timescale, Handle, HierRecord, PackType, ScopeType, SignalKind, VarDir, VarType,
};
use fst_config::WriterConfig;
use tracing::{debug, info, warn};

use crate::arena::ChainArena;
use crate::block::{BlockJob, ChainSlot};
use crate::budget::BreakBudget;
use crate::error::WriterError;
use crate::header::HeaderFields;
use crate::sections::{blackout_block, geometry_block, hierarchy_block, repack};
use crate::sidecar::{remove_sidecar, HierSidecar};
use crate::worker::{write_block, FlushJob, FlushWorker};

/// Storage class and stored length for a declaration.
fn storage_of(var_type: VarType, width: u32) -> (SignalKind, u32) {
    if var_type.is_real() {
        (SignalKind::Real, 8)
    } else if var_type == VarType::GenString || width == 0 {
        (SignalKind::VarLen, 0)
    } else {
        (SignalKind::Bits, width)
    }
}

/// Initial frame bytes for a newly declared handle.
fn unset_value(kind: SignalKind, len: u32) -> Vec<u8> {
    match kind {
        SignalKind::Real => f64::NAN.to_ne_bytes().to_vec(),
        _ => vec![b'x'; len as usize],
    }
}

/// Writes one FST trace file.
///
/// # Example
///
/// ```no_run
/// use fst_common::{ScopeType, VarDir, VarType};
/// use fst_writer::Writer;
///
/// # fn main() -> Result<(), fst_writer::WriterError> {
/// let mut w = Writer::create("run.fst", true)?;
/// w.set_scope(ScopeType::Module, "top", "")?;
/// let clk = w.create_variable(VarType::Wire, VarDir::Implicit, 1, "clk", None)?;
/// w.set_upscope()?;
/// w.emit_time_change(0)?;
/// w.emit_value_change(clk, b"0")?;
/// w.emit_time_change(5)?;
/// w.emit_value_change(clk, b"1")?;
/// w.close()?;
/// # Ok(())
/// # }
/// ```
pub struct Writer {
    /// Path of the trace file.
    path: PathBuf,
    /// Output file; `None` only while a background flush owns it.
    out: Option<BufWriter<File>>,
    /// Background flush thread when parallel mode is on.
    worker: Option<FlushWorker>,
    /// True between submitting a job and collecting its result.
    in_flight: bool,
    /// Declarations recorded so far.
    sidecar: HierSidecar,
    /// Header values, rewritten at close.
    header: HeaderFields,
    compress_hierarchy: bool,
    repack_on_close: bool,
    pack: PackType,
    budget: BreakBudget,
    /// File size at which block writing stops; 0 disables the limit.
    dump_size_limit: u64,
    /// Bytes written to the trace file so far.
    file_len: u64,
    /// Set once the dump size limit is reached.
    locked: bool,

    /// Per-handle storage class, length and current-block chain head.
    slots: Vec<ChainSlot>,
    /// Per-handle time index of its newest record in the open block.
    last_tidx: Vec<u64>,
    /// Per-handle offset into `curval`.
    offsets: Vec<usize>,
    /// Current value of every fixed-width handle.
    curval: Vec<u8>,
    /// Values snapshotted when the open block started.
    frame: Vec<u8>,
    /// Handle count covered by `frame`.
    frame_handles: u32,
    arena: ChainArena,
    /// Absolute times of the open block.
    times: Vec<u64>,
    block_begin: u64,
    cur_time: u64,
    first_time: u64,
    time_started: bool,
    values_before_time: bool,
    flush_pending: bool,
    /// `(time, active)` dump transitions.
    blackouts: Vec<(u64, bool)>,
}

impl Writer {
    /// Creates a trace at `path` with default settings.
    ///
    /// With `compress_hierarchy` the declarations are folded into the trace
    /// at close; otherwise they stay in `<path>.hier`.
    pub fn create(path: impl AsRef<Path>, compress_hierarchy: bool) -> Result<Self, WriterError> {
        let config = WriterConfig {
            compress_hierarchy,
            ..WriterConfig::default()
        };
        Self::create_with_config(path, &config)
    }

    /// Creates a trace at `path` using every setting from `config`.
    pub fn create_with_config(
        path: impl AsRef<Path>,
        config: &WriterConfig,
    ) -> Result<Self, WriterError> {
        let path = path.as_ref().to_path_buf();
        let mut out = BufWriter::new(File::create(&path)?);
        let sidecar = HierSidecar::create(&path)?;

        let header = HeaderFields {
            timescale: config.timescale,
            version: config.version.clone(),
            ..HeaderFields::default()
        };
        out.write_all(&header.encode())?;

        let mut writer = Self {
            path,
            out: Some(out),
            worker: None,
            in_flight: false,
            sidecar,
            header,
            compress_hierarchy: config.compress_hierarchy,
            repack_on_close: config.repack_on_close,
            pack: config.pack,
            budget: BreakBudget::new(config.break_size),
            dump_size_limit: config.dump_size_limit,
            file_len: HEADER_LEN,
            locked: false,
            slots: Vec::new(),
            last_tidx: Vec::new(),
            offsets: Vec::new(),
            curval: Vec::new(),
            frame: Vec::new(),
            frame_handles: 0,
            arena: ChainArena::new(),
            times: Vec::new(),
            block_begin: 0,
            cur_time: 0,
            first_time: 0,
            time_started: false,
            values_before_time: false,
            flush_pending: false,
            blackouts: Vec::new(),
        };
        writer.set_parallel_mode(config.parallel)?;
        info!(path = %writer.path.display(), "created trace");
        Ok(writer)
    }

    /// Sets the header date string.
    pub fn set_date(&mut self, date: &str) {
        self.header.date = date.to_string();
    }

    /// Sets the simulator version string.
    pub fn set_version(&mut self, version: &str) {
        self.header.version = version.to_string();
    }

    /// Sets the timescale as a power-of-ten exponent.
    pub fn set_timescale(&mut self, exponent: i8) {
        self.header.timescale = exponent;
    }

    /// Sets the timescale from text such as `"1ns"` or `"100us"`.
    pub fn set_timescale_from_str(&mut self, text: &str) -> Result<(), WriterError> {
        let exponent =
            parse_timescale(text).ok_or_else(|| WriterError::InvalidTimescale(text.to_string()))?;
        self.header.timescale = exponent;
        Ok(())
    }

    /// Sets the time offset added to every time by readers.
    pub fn set_timezero(&mut self, timezero: i64) {
        self.header.timezero = timezero;
    }

    /// Selects the codec for per-handle chains in later blocks.
    pub fn set_pack_type(&mut self, pack: PackType) {
        self.pack = pack;
    }

    /// Rewrites the finished file as one gzip-wrapped block at close.
    pub fn set_repack_on_close(&mut self, enable: bool) {
        self.repack_on_close = enable;
    }

    /// Turns background block flushing on or off.
    pub fn set_parallel_mode(&mut self, enable: bool) -> Result<(), WriterError> {
        match (enable, self.worker.is_some()) {
            (true, false) => self.worker = Some(FlushWorker::spawn()?),
            (false, true) => {
                self.join_flush()?;
                self.worker = None;
            }
            _ => {}
        }
        Ok(())
    }

    /// Stops writing blocks once the file reaches `bytes`; 0 disables.
    pub fn set_dump_size_limit(&mut self, bytes: u64) {
        self.dump_size_limit = bytes;
    }

    /// True once the dump size limit has stopped block writing.
    pub fn dump_size_limit_reached(&self) -> bool {
        self.locked
    }

    /// Opens a scope.
    pub fn set_scope(
        &mut self,
        kind: ScopeType,
        name: &str,
        component: &str,
    ) -> Result<(), WriterError> {
        self.sidecar.append(&HierRecord::Scope {
            kind,
            name: name.to_string(),
            component: component.to_string(),
        })?;
        self.header.num_scopes += 1;
        Ok(())
    }

    /// Closes the innermost scope.
    pub fn set_upscope(&mut self) -> Result<(), WriterError> {
        self.sidecar.append(&HierRecord::Upscope)?;
        Ok(())
    }

    /// Declares a variable in the current scope.
    ///
    /// A valid `alias` makes the declaration share that handle's storage and
    /// returns it; otherwise a new handle is allocated. Reals always store
    /// eight bytes, and a width of 0 or a string type makes the handle
    /// variable-length.
    pub fn create_variable(
        &mut self,
        var_type: VarType,
        direction: VarDir,
        width: u32,
        name: &str,
        alias: Option<Handle>,
    ) -> Result<Handle, WriterError> {
        let (kind, len) = storage_of(var_type, width);
        let alias = alias.filter(|h| h.as_raw() != 0 && (h.as_raw() as usize) <= self.slots.len());

        self.sidecar.append(&HierRecord::Var {
            var_type,
            direction,
            name: name.to_string(),
            len,
            alias: alias.map_or(0, Handle::as_raw),
        })?;
        self.header.num_vars += 1;

        if let Some(target) = alias {
            return Ok(target);
        }

        self.offsets.push(self.curval.len());
        self.curval.extend_from_slice(&unset_value(kind, len));
        self.slots.push(ChainSlot {
            kind,
            width: len,
            head: None,
        });
        self.last_tidx.push(0);
        self.budget.on_handle_allocated(self.slots.len() as u64);
        Ok(Handle::from_index(self.slots.len() - 1))
    }

    fn slot_index(&self, handle: Handle) -> Result<usize, WriterError> {
        handle
            .index()
            .filter(|&i| i < self.slots.len())
            .ok_or(WriterError::UnknownHandle(handle))
    }

    /// Records a new value for a fixed-width handle at the current time.
    ///
    /// `value` holds one state character per bit, most significant first, or
    /// eight native-order bytes for reals.
    pub fn emit_value_change(&mut self, handle: Handle, value: &[u8]) -> Result<(), WriterError> {
        let idx = self.slot_index(handle)?;
        let slot = self.slots[idx];
        if slot.kind == SignalKind::VarLen {
            return Err(WriterError::KindMismatch {
                handle,
                kind: slot.kind,
            });
        }
        let len = slot.width as usize;
        if value.len() != len {
            return Err(WriterError::WidthMismatch {
                handle,
                expected: len,
                actual: value.len(),
            });
        }

        let off = self.offsets[idx];
        self.curval[off..off + len].copy_from_slice(value);
        if !self.time_started {
            self.values_before_time = true;
            return Ok(());
        }
        if self.locked {
            return Ok(());
        }

        let tidx = self.time_index();
        if let Some(head) = slot.head {
            if self.last_tidx[idx] == tidx && self.arena.get(head)?.0.payload == value {
                return Ok(());
            }
        }
        self.append_record(idx, tidx, value)
    }

    /// Records a new value for a real handle.
    pub fn emit_real(&mut self, handle: Handle, value: f64) -> Result<(), WriterError> {
        self.emit_value_change(handle, &value.to_ne_bytes())
    }

    /// Records a new value for a variable-length handle.
    ///
    /// Values emitted before the first time change, or after the dump size
    /// limit is reached, are dropped.
    pub fn emit_variable_length_value_change(
        &mut self,
        handle: Handle,
        value: &[u8],
    ) -> Result<(), WriterError> {
        let idx = self.slot_index(handle)?;
        let kind = self.slots[idx].kind;
        if kind != SignalKind::VarLen {
            return Err(WriterError::KindMismatch { handle, kind });
        }
        if !self.time_started || self.locked {
            return Ok(());
        }
        let tidx = self.time_index();
        self.append_record(idx, tidx, value)
    }

    fn time_index(&self) -> u64 {
        self.times.len().saturating_sub(1) as u64
    }

    fn append_record(&mut self, idx: usize, tidx: u64, value: &[u8]) -> Result<(), WriterError> {
        let slot = &mut self.slots[idx];
        let tdelta = tidx - self.last_tidx[idx];
        slot.head = Some(self.arena.push(slot.head, tdelta, value)?);
        self.last_tidx[idx] = tidx;
        Ok(())
    }

    /// Advances simulation time.
    ///
    /// Repeating the current time is a no-op; going backwards is an error.
    /// Crossing the break size seals the open block at the current time
    /// before `time` is recorded.
    pub fn emit_time_change(&mut self, time: u64) -> Result<(), WriterError> {
        if self.locked {
            return Ok(());
        }
        if !self.time_started {
            return self.start_time(time);
        }
        if time < self.cur_time {
            return Err(WriterError::TimeWentBackwards {
                previous: self.cur_time,
                requested: time,
            });
        }
        if time == self.cur_time {
            return Ok(());
        }

        let over_budget = self.arena.len() as u64 >= self.budget.size();
        if (over_budget || self.flush_pending) && !self.arena.is_empty() {
            self.seal_block()?;
        }
        self.flush_pending = false;
        if self.locked {
            return Ok(());
        }
        self.times.push(time);
        self.cur_time = time;
        Ok(())
    }

    /// Opens the first block at the first time change.
    fn start_time(&mut self, time: u64) -> Result<(), WriterError> {
        self.time_started = true;
        self.first_time = if self.values_before_time { 0 } else { time };
        self.block_begin = self.first_time;
        self.cur_time = time;
        self.times = vec![time];
        self.frame = self.curval.clone();
        self.frame_handles = self.slots.len() as u32;

        if self.values_before_time && time == 0 {
            for idx in 0..self.slots.len() {
                let slot = self.slots[idx];
                if slot.kind == SignalKind::VarLen {
                    continue;
                }
                let off = self.offsets[idx];
                let value = self.curval[off..off + slot.width as usize].to_vec();
                self.append_record(idx, 0, &value)?;
            }
        }
        debug!(time, first_time = self.first_time, "first time change");
        Ok(())
    }

    /// Records a dump enable or disable at the current time.
    pub fn emit_dump_active(&mut self, active: bool) {
        if !self.locked {
            self.blackouts.push((self.cur_time, active));
        }
    }

    /// Requests that the open block be sealed at the next time change.
    ///
    /// Ignored until the block spans more than two times.
    pub fn flush_context(&mut self) {
        if self.times.len() > 2 {
            self.flush_pending = true;
        }
    }

    /// Takes the open block and starts the next one at the current time.
    fn take_block(&mut self) -> BlockJob {
        let block = BlockJob {
            begin: self.block_begin,
            end: self.cur_time,
            frame: mem::replace(&mut self.frame, self.curval.clone()),
            frame_handles: self.frame_handles,
            slots: self.slots.clone(),
            arena: mem::take(&mut self.arena),
            times: mem::replace(&mut self.times, vec![self.cur_time]),
            pack: self.pack,
        };
        self.frame_handles = self.slots.len() as u32;
        self.block_begin = self.cur_time;
        for slot in &mut self.slots {
            slot.head = None;
        }
        self.last_tidx.fill(0);
        block
    }

    /// Seals the open block and writes it, inline or on the flush thread.
    fn seal_block(&mut self) -> Result<(), WriterError> {
        self.join_flush()?;
        let block = self.take_block();
        if self.locked {
            debug!(begin = block.begin, "dump size limit reached, dropping block");
            return Ok(());
        }
        self.header.block_count += 1;
        let mut out = self.out.take().ok_or(WriterError::WorkerGone)?;

        if let Some(worker) = &self.worker {
            worker.submit(FlushJob { block, out })?;
            self.in_flight = true;
            return Ok(());
        }
        let written = write_block(&block, &mut out);
        self.out = Some(out);
        self.account_block(written?);
        Ok(())
    }

    /// Waits for the outstanding background flush, if any.
    fn join_flush(&mut self) -> Result<(), WriterError> {
        if !self.in_flight {
            return Ok(());
        }
        let worker = self.worker.as_ref().ok_or(WriterError::WorkerGone)?;
        let done = worker.wait()?;
        self.in_flight = false;
        self.out = Some(done.out);
        self.account_block(done.result?);
        Ok(())
    }

    fn account_block(&mut self, written: u64) {
        self.file_len += written;
        debug!(written, file_len = self.file_len, "wrote value-change block");
        if self.dump_size_limit != 0 && self.file_len >= self.dump_size_limit && !self.locked {
            warn!(
                limit = self.dump_size_limit,
                file_len = self.file_len,
                "dump size limit reached, further changes are ignored"
            );
            self.locked = true;
        }
    }

    /// Finishes the file: last block, geometry, blackouts, hierarchy and the
    /// final header.
    pub fn close(mut self) -> Result<(), WriterError> {
        self.join_flush()?;
        if !self.time_started && !self.locked {
            self.values_before_time = true;
            self.emit_time_change(0)?;
        }
        if !self.locked && (!self.arena.is_empty() || self.header.block_count == 0) {
            self.seal_block()?;
        }
        self.join_flush()?;
        self.worker = None;

        let mut out = self.out.take().ok_or(WriterError::WorkerGone)?;
        let geometry = geometry_block(self.slots.iter().map(|s| (s.kind, s.width)))?;
        out.write_all(&geometry)?;
        if !self.blackouts.is_empty() {
            out.write_all(&blackout_block(&self.blackouts))?;
        }

        if self.compress_hierarchy {
            let (records, sidecar) = self.sidecar.take_contents()?;
            out.write_all(&hierarchy_block(&records)?)?;
            if let Err(err) = remove_sidecar(&sidecar) {
                warn!(path = %sidecar.display(), error = %err, "could not remove hierarchy sidecar");
            }
        } else {
            self.sidecar.finish()?;
        }

        self.header.start_time = self.first_time;
        self.header.end_time = self.cur_time;
        self.header.memory_budget = self.budget.size();
        self.header.max_handle = self.slots.len() as u64;
        out.seek(SeekFrom::Start(0))?;
        out.write_all(&self.header.encode())?;
        out.flush()?;
        drop(out);

        if self.repack_on_close {
            let packed = repack(&self.path)?;
            debug!(bytes = packed, "repacked trace");
        }
        info!(
            path = %self.path.display(),
            handles = self.slots.len(),
            blocks = self.header.block_count,
            start = self.header.start_time,
            end = self.header.end_time,
            "closed trace"
        );
        Ok(())
    }
}
