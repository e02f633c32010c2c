//! Opening a trace and everything that does not touch value changes:
//! header fields, blackouts, geometry and the hierarchy.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fst_common::block::HEADER_LEN;
use fst_common::pack::gzip_inflate;
use fst_common::varint::{read_u64_be, read_varint};
use fst_common::{BlockKind, Handle, SignalKind, VarDir, VarType};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::block::BlockInfo;
use crate::error::ReaderError;
use crate::geometry::Geometry;
use crate::header::TraceHeader;
use crate::hier::{HierCursor, HierEntry, ScopeStack};
use crate::rvat::RvatCache;
use crate::vcd::{self, VcdSink};

/// Where the hierarchy records live.
#[derive(Clone, Debug)]
enum HierSource {
    /// A gzip hierarchy block inside the trace.
    Block { pos: u64, seclen: u64 },
    /// The `<trace>.hier` sidecar left by the writer.
    Sidecar(PathBuf),
}

/// A declared variable with its full dotted name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SignalInfo {
    /// Scope path and leaf name joined by dots.
    pub name: String,
    /// Handle carrying the values.
    pub handle: Handle,
    /// Declared type.
    pub var_type: VarType,
    /// Port direction.
    pub direction: VarDir,
    /// Declared width.
    pub width: u32,
    /// True when the handle belongs to an earlier declaration.
    pub is_alias: bool,
}

/// An open trace file.
pub struct Reader {
    pub(crate) file: File,
    pub(crate) header: TraceHeader,
    pub(crate) blocks: Vec<BlockInfo>,
    pub(crate) blackouts: Vec<(u64, bool)>,
    pub(crate) geometry: Geometry,
    /// Per-handle traversal mask.
    pub(crate) mask: Vec<bool>,
    pub(crate) limit: Option<(u64, u64)>,
    pub(crate) rvat: RvatCache,
    hier_source: HierSource,
    /// Inflated hierarchy records, loaded on first use.
    hier_data: Option<Vec<u8>>,
    hier_cursor: HierCursor,
    scopes: ScopeStack,
}

impl Reader {
    /// Opens a trace, inflating it first when it is gzip-wrapped.
    ///
    /// Fails when the file has no value-change blocks, no signals, or no
    /// hierarchy (neither a hierarchy block nor a `.hier` sidecar).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReaderError> {
        let path = path.as_ref();
        let mut file = crate::wrapper::unwrap_trace(File::open(path)?)?;
        let file_len = file.seek(SeekFrom::End(0))?;
        if file_len < HEADER_LEN {
            return Err(ReaderError::NotATrace {
                tag: read_exact_at(&mut file, 0, 1)
                    .ok()
                    .and_then(|b| b.first().copied())
                    .unwrap_or(u8::MAX),
            });
        }
        let mut header = TraceHeader::parse(&read_exact_at(&mut file, 0, HEADER_LEN as usize)?)?;

        let mut blocks = Vec::new();
        let mut blackouts = Vec::new();
        let mut geometry = None;
        let mut hier_block = None;
        let mut pos = HEADER_LEN;
        while pos + 9 <= file_len {
            let head = read_exact_at(&mut file, pos, 9)?;
            let seclen = read_u64_be(&head, 1)?;
            if seclen < 8 || seclen > file_len - pos - 1 {
                warn!(pos, seclen, "truncated block, ignoring the rest of the file");
                break;
            }
            match BlockKind::from_tag(head[0]) {
                Some(kind) if kind.is_value_change() => {
                    let times = read_exact_at(&mut file, pos + 9, 16)?;
                    blocks.push(BlockInfo {
                        pos,
                        seclen,
                        begin: read_u64_be(&times, 0)?,
                        end: read_u64_be(&times, 8)?,
                    });
                }
                Some(BlockKind::Blackout) => {
                    let data = read_exact_at(&mut file, pos, (seclen + 1) as usize)?;
                    blackouts = parse_blackouts(&data)?;
                }
                Some(BlockKind::Geometry) => {
                    let data = read_exact_at(&mut file, pos, (seclen + 1) as usize)?;
                    geometry = Some(Geometry::from_block(&data)?);
                }
                Some(BlockKind::Hierarchy) => hier_block = Some(HierSource::Block { pos, seclen }),
                Some(BlockKind::Skip) => {
                    warn!(pos, "unfinished block, ignoring the rest of the file");
                    break;
                }
                other => debug!(pos, tag = head[0], kind = ?other, "skipping block"),
            }
            pos += 1 + seclen;
        }

        if blocks.is_empty() {
            return Err(ReaderError::NoValueChanges);
        }
        if header.block_count != blocks.len() as u64 {
            warn!(
                recorded = header.block_count,
                found = blocks.len(),
                "value-change block count differs from header"
            );
            header.block_count = blocks.len() as u64;
        }
        if header.start_time == 0 && header.end_time == 0 {
            header.start_time = blocks[0].begin;
            header.end_time = blocks[blocks.len() - 1].end;
        }

        let sidecar = sidecar_path(path);
        let hier_source = match hier_block {
            Some(source) => source,
            None if sidecar.exists() => HierSource::Sidecar(sidecar),
            None => return Err(ReaderError::NoHierarchy),
        };

        let mut reader = Self {
            file,
            header,
            blocks,
            blackouts,
            geometry: Geometry::default(),
            mask: Vec::new(),
            limit: None,
            rvat: RvatCache::default(),
            hier_source,
            hier_data: None,
            hier_cursor: HierCursor::default(),
            scopes: ScopeStack::new(),
        };
        reader.geometry = match geometry {
            Some(geometry) => geometry,
            None => {
                warn!("no geometry block, replaying hierarchy");
                Geometry::from_hierarchy(reader.hier_data()?)?
            }
        };
        if reader.geometry.is_empty() {
            return Err(ReaderError::NoSignals);
        }
        if reader.header.max_handle != reader.geometry.len() as u64 {
            warn!(
                recorded = reader.header.max_handle,
                found = reader.geometry.len(),
                "max handle differs from header"
            );
            reader.header.max_handle = reader.geometry.len() as u64;
        }
        reader.mask = vec![true; reader.geometry.len()];
        info!(
            path = %path.display(),
            blocks = reader.blocks.len(),
            handles = reader.geometry.len(),
            "opened trace"
        );
        Ok(reader)
    }

    /// All header fields.
    pub fn header(&self) -> &TraceHeader {
        &self.header
    }

    /// First recorded time.
    pub fn start_time(&self) -> u64 {
        self.header.start_time
    }

    /// Last recorded time.
    pub fn end_time(&self) -> u64 {
        self.header.end_time
    }

    /// Timescale as a power of ten relative to one second.
    pub fn timescale(&self) -> i8 {
        self.header.timescale
    }

    /// Offset added to times when displaying.
    pub fn timezero(&self) -> i64 {
        self.header.timezero
    }

    /// Simulator version string.
    pub fn version(&self) -> &str {
        &self.header.version
    }

    /// Creation date string.
    pub fn date(&self) -> &str {
        &self.header.date
    }

    /// Scopes declared.
    pub fn scope_count(&self) -> u64 {
        self.header.num_scopes
    }

    /// Variables declared, aliases included.
    pub fn var_count(&self) -> u64 {
        self.header.num_vars
    }

    /// Declarations sharing another variable's handle.
    pub fn alias_count(&self) -> u64 {
        self.header.alias_count()
    }

    /// Highest signal handle.
    pub fn max_handle(&self) -> u64 {
        self.header.max_handle
    }

    /// Value-change blocks in the file.
    pub fn block_count(&self) -> u64 {
        self.header.block_count
    }

    /// Arena break size the writer used.
    pub fn memory_used(&self) -> u64 {
        self.header.memory_used
    }

    /// False when the file was written with the other byte order.
    pub fn endian_matches(&self) -> bool {
        !self.header.byte_swapped
    }

    /// Dump on/off transitions as `(time, active)`.
    pub fn blackouts(&self) -> &[(u64, bool)] {
        &self.blackouts
    }

    /// Storage class of `handle`, or `None` when it is out of range.
    pub fn signal_kind(&self, handle: Handle) -> Option<SignalKind> {
        let idx = handle.index().filter(|&i| i < self.geometry.len())?;
        Some(self.geometry.kind(idx))
    }

    /// Inflated hierarchy records.
    fn hier_data(&mut self) -> Result<&[u8], ReaderError> {
        if self.hier_data.is_none() {
            let data = match &self.hier_source {
                HierSource::Block { pos, seclen } => {
                    let block = read_exact_at(&mut self.file, *pos, (*seclen + 1) as usize)?;
                    let uncompressed = read_u64_be(&block, 9)? as usize;
                    let stored = block.get(17..).ok_or(fst_common::CodecError::Truncated {
                        what: "hierarchy block",
                        offset: block.len(),
                    })?;
                    gzip_inflate(stored, uncompressed, "hierarchy")?
                }
                HierSource::Sidecar(path) => fs::read(path)?,
            };
            debug!(bytes = data.len(), "loaded hierarchy");
            self.hier_data = Some(data);
        }
        Ok(self.hier_data.as_deref().unwrap_or_default())
    }

    /// Restarts [`iterate_hier`](Self::iterate_hier) from the first record.
    pub fn iterate_hier_rewind(&mut self) {
        self.hier_cursor.rewind();
    }

    /// Returns the next hierarchy entry, or `None` after the last.
    pub fn iterate_hier(&mut self) -> Result<Option<HierEntry>, ReaderError> {
        self.hier_data()?;
        let data = self.hier_data.as_deref().unwrap_or_default();
        self.hier_cursor.next_entry(data)
    }

    /// Enters a scope on the reader's name stack, returning the full path.
    pub fn push_scope(&mut self, name: &str) -> &str {
        self.scopes.push(name)
    }

    /// Leaves the innermost scope, returning the remaining path.
    pub fn pop_scope(&mut self) -> Option<&str> {
        self.scopes.pop()
    }

    /// Empties the scope name stack.
    pub fn reset_scope(&mut self) {
        self.scopes.reset();
    }

    /// Current dotted scope path.
    pub fn current_scope(&self) -> &str {
        self.scopes.current()
    }

    /// Walks the whole hierarchy, optionally printing it as a VCD header,
    /// and returns every variable with its full name.
    pub fn process_hierarchy(
        &mut self,
        mut vcd: Option<&mut dyn Write>,
    ) -> Result<Vec<SignalInfo>, ReaderError> {
        if let Some(out) = vcd.as_deref_mut() {
            vcd::write_preamble(out, &self.header)?;
        }
        self.iterate_hier_rewind();
        self.reset_scope();
        let mut signals = Vec::new();
        while let Some(entry) = self.iterate_hier()? {
            if let Some(out) = vcd.as_deref_mut() {
                vcd::write_entry(out, &entry)?;
            }
            match entry {
                HierEntry::Scope { name, .. } => {
                    self.push_scope(&name);
                }
                HierEntry::Upscope => {
                    self.pop_scope();
                }
                HierEntry::Var {
                    var_type,
                    direction,
                    name,
                    width,
                    handle,
                    is_alias,
                } => signals.push(SignalInfo {
                    name: self.scopes.flat_name(&name),
                    handle,
                    var_type,
                    direction,
                    width,
                    is_alias,
                }),
            }
        }
        if let Some(out) = vcd {
            vcd::write_enddefinitions(out)?;
        }
        self.iterate_hier_rewind();
        self.reset_scope();
        Ok(signals)
    }

    /// Writes the whole trace, or the limited time range, as VCD text.
    pub fn write_vcd<W: Write>(&mut self, mut out: W) -> Result<W, ReaderError> {
        let signals = self.process_hierarchy(Some(&mut out as &mut dyn Write))?;
        let mut ports = vec![false; self.geometry.len()];
        for signal in signals.iter().filter(|s| s.var_type == VarType::Port) {
            if let Some(port) = signal.handle.index().and_then(|i| ports.get_mut(i)) {
                *port = true;
            }
        }
        let mut sink = VcdSink::new(out, ports);
        self.iter_blocks(&mut sink)?;
        Ok(sink.finish()?)
    }
}

/// Path of the hierarchy sidecar the writer leaves next to `trace`.
fn sidecar_path(trace: &Path) -> PathBuf {
    let mut name = trace.as_os_str().to_owned();
    name.push(".hier");
    PathBuf::from(name)
}

/// Reads `len` bytes at `pos`.
pub(crate) fn read_exact_at(file: &mut File, pos: u64, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    file.seek(SeekFrom::Start(pos))?;
    file.read_exact(&mut buf)?;
    Ok(buf)
}

/// Decodes a stored real, swapping bytes for files of the other endianness.
pub(crate) fn real_from_bytes(bytes: &[u8], byte_swapped: bool) -> f64 {
    let Ok(mut raw) = <[u8; 8]>::try_from(bytes) else {
        return f64::NAN;
    };
    if byte_swapped {
        raw.reverse();
    }
    f64::from_ne_bytes(raw)
}

/// Decodes a blackout block, tag included.
fn parse_blackouts(block: &[u8]) -> Result<Vec<(u64, bool)>, ReaderError> {
    let mut pos = 9;
    let (count, n) = read_varint(block, pos)?;
    pos += n;
    if count > block.len() as u64 {
        return Err(fst_common::CodecError::Truncated {
            what: "blackout records",
            offset: block.len(),
        }
        .into());
    }
    let mut records = Vec::with_capacity(count as usize);
    let mut time = 0u64;
    for _ in 0..count {
        let active = *block.get(pos).ok_or(fst_common::CodecError::Truncated {
            what: "blackout record",
            offset: pos,
        })?;
        pos += 1;
        let (delta, n) = read_varint(block, pos)?;
        pos += n;
        time = time.wrapping_add(delta);
        records.push((time, active != 0));
    }
    Ok(records)
}
