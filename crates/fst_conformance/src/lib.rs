//! Writer-to-reader conformance helpers.
//!
//! A [`Script`] lists declarations and emissions. [`write_script`] plays it
//! into a [`Writer`], [`expected_changes`] predicts what a full traversal
//! of the resulting file reports, and [`Recorder`] collects what the reader
//! actually reports so the two can be compared.

#![warn(missing_docs)]

use std::fs;
use std::io;
use std::path::Path;

use fst_common::{BlockKind, Handle, ScopeType, SignalKind, VarDir, VarType};
use fst_config::WriterConfig;
use fst_reader::{ChangeSink, Reader, ReaderError, Value};
use fst_writer::{Writer, WriterError};

/// One variable declaration in a script.
#[derive(Clone, Debug)]
pub struct Decl {
    /// Leaf name, declared under scope `top`.
    pub name: String,
    /// Declared type.
    pub var_type: VarType,
    /// Declared width.
    pub width: u32,
    /// Index of an earlier declaration whose handle this one shares.
    pub alias_of: Option<usize>,
}

impl Decl {
    /// A declaration with its own handle.
    pub fn new(name: &str, var_type: VarType, width: u32) -> Self {
        Self {
            name: name.to_string(),
            var_type,
            width,
            alias_of: None,
        }
    }

    /// A declaration sharing the handle of declaration `target`.
    pub fn alias(name: &str, var_type: VarType, width: u32, target: usize) -> Self {
        Self {
            alias_of: Some(target),
            ..Self::new(name, var_type, width)
        }
    }

    fn storage(&self) -> (SignalKind, usize) {
        if self.var_type.is_real() {
            (SignalKind::Real, 8)
        } else if self.var_type == VarType::GenString || self.width == 0 {
            (SignalKind::VarLen, 0)
        } else {
            (SignalKind::Bits, self.width as usize)
        }
    }
}

/// One writer call in a script. Value steps name a declaration by index.
#[derive(Clone, Debug)]
pub enum Step {
    /// `emit_time_change`.
    Time(u64),
    /// `emit_value_change` with state characters.
    Value(usize, Vec<u8>),
    /// `emit_real`.
    Real(usize, f64),
    /// `emit_variable_length_value_change`.
    VarLen(usize, Vec<u8>),
    /// `emit_dump_active`.
    DumpActive(bool),
    /// `flush_context`.
    Flush,
}

/// Declarations followed by emissions.
#[derive(Clone, Debug, Default)]
pub struct Script {
    /// Declarations, all inside one `top` scope.
    pub decls: Vec<Decl>,
    /// Writer calls in order.
    pub steps: Vec<Step>,
}

impl Script {
    /// An empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a declaration and returns its index.
    pub fn declare(&mut self, decl: Decl) -> usize {
        self.decls.push(decl);
        self.decls.len() - 1
    }

    /// Appends a step.
    pub fn step(&mut self, step: Step) -> &mut Self {
        self.steps.push(step);
        self
    }

    /// Handle each declaration receives, numbered as the writer does.
    pub fn handles(&self) -> Vec<Handle> {
        let mut handles: Vec<Handle> = Vec::with_capacity(self.decls.len());
        let mut next = 0;
        for decl in &self.decls {
            match decl.alias_of.and_then(|i| handles.get(i).copied()) {
                Some(target) => handles.push(target),
                None => {
                    next += 1;
                    handles.push(Handle::from_raw(next));
                }
            }
        }
        handles
    }

    /// Storage of each distinct handle, indexed by handle index.
    fn handle_storage(&self) -> Vec<(SignalKind, usize)> {
        self.decls
            .iter()
            .filter(|d| d.alias_of.is_none())
            .map(Decl::storage)
            .collect()
    }
}

/// A value change as reported by a traversal. Reals are kept as their
/// native-order bytes so NaN compares equal to itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change {
    /// Time of the change.
    pub time: u64,
    /// Raw handle.
    pub handle: u32,
    /// State characters, real bytes or variable-length bytes.
    pub bytes: Vec<u8>,
}

/// Converts a reported value to comparable bytes.
pub fn value_bytes(value: Value<'_>) -> Vec<u8> {
    match value {
        Value::Bits(b) | Value::Bytes(b) => b.to_vec(),
        Value::Real(r) => r.to_ne_bytes().to_vec(),
    }
}

/// A [`ChangeSink`] remembering everything it is told.
#[derive(Debug, Default)]
pub struct Recorder {
    /// Every announced time.
    pub times: Vec<u64>,
    /// Every change, in report order.
    pub changes: Vec<Change>,
    /// Dump on/off transitions.
    pub dumps: Vec<(u64, bool)>,
}

impl ChangeSink for Recorder {
    fn on_time(&mut self, time: u64) {
        self.times.push(time);
    }

    fn on_value(&mut self, time: u64, handle: Handle, value: Value<'_>) {
        self.changes.push(Change {
            time,
            handle: handle.as_raw(),
            bytes: value_bytes(value),
        });
    }

    fn on_dump_active(&mut self, time: u64, active: bool) {
        self.dumps.push((time, active));
    }
}

/// Runs a traversal of `reader` into a fresh [`Recorder`].
pub fn record(reader: &mut Reader) -> Result<Recorder, ReaderError> {
    let mut recorder = Recorder::default();
    reader.iter_blocks(&mut recorder)?;
    Ok(recorder)
}

/// Writes `script` to a new trace at `path` and returns the handle of each
/// declaration.
pub fn write_script(
    path: &Path,
    config: &WriterConfig,
    script: &Script,
) -> Result<Vec<Handle>, WriterError> {
    let mut writer = Writer::create_with_config(path, config)?;
    writer.set_scope(ScopeType::Module, "top", "")?;
    let mut handles = Vec::with_capacity(script.decls.len());
    for decl in &script.decls {
        let alias = decl.alias_of.and_then(|i| handles.get(i).copied());
        let handle = writer.create_variable(
            decl.var_type,
            VarDir::Implicit,
            decl.width,
            &decl.name,
            alias,
        )?;
        handles.push(handle);
    }
    writer.set_upscope()?;

    let handle_of = |decl: usize| handles.get(decl).copied().unwrap_or(Handle::from_raw(0));
    for step in &script.steps {
        match step {
            Step::Time(t) => writer.emit_time_change(*t)?,
            Step::Value(d, v) => writer.emit_value_change(handle_of(*d), v)?,
            Step::Real(d, r) => writer.emit_real(handle_of(*d), *r)?,
            Step::VarLen(d, v) => writer.emit_variable_length_value_change(handle_of(*d), v)?,
            Step::DumpActive(active) => writer.emit_dump_active(*active),
            Step::Flush => writer.flush_context(),
        }
    }
    writer.close()?;
    Ok(handles)
}

/// Predicts the changes a full, unmasked traversal reports for `script`.
///
/// Within one time step changes come out by ascending handle, keeping
/// emission order per handle. A fixed-width emission equal to the handle's
/// newest change at the same time is dropped. Values set before the first
/// time change show up at time 0 for every fixed-width handle, unset ones as
/// `x` or NaN.
pub fn expected_changes(script: &Script) -> Vec<Change> {
    let handles = script.handles();
    let storage = script.handle_storage();
    let mut curval: Vec<Vec<u8>> = storage
        .iter()
        .map(|&(kind, len)| match kind {
            SignalKind::Real => f64::NAN.to_ne_bytes().to_vec(),
            _ => vec![b'x'; len],
        })
        .collect();
    let seed = |curval: &[Vec<u8>]| -> Vec<Change> {
        storage
            .iter()
            .enumerate()
            .filter(|(_, (kind, _))| *kind != SignalKind::VarLen)
            .map(|(i, _)| Change {
                time: 0,
                handle: i as u32 + 1,
                bytes: curval[i].clone(),
            })
            .collect()
    };

    let mut out = Vec::new();
    let mut pending: Vec<Change> = Vec::new();
    let mut time: Option<u64> = None;
    let mut pre_time = false;

    for step in &script.steps {
        let (decl, bytes, fixed) = match step {
            Step::Time(t) => {
                match time {
                    None => {
                        if pre_time && *t == 0 {
                            pending = seed(&curval);
                        } else if pre_time {
                            out.extend(seed(&curval));
                        }
                        time = Some(*t);
                    }
                    Some(cur) if *t > cur => {
                        flush_step(&mut out, &mut pending);
                        time = Some(*t);
                    }
                    Some(_) => {}
                }
                continue;
            }
            Step::Value(d, v) => (*d, v.clone(), true),
            Step::Real(d, r) => (*d, r.to_ne_bytes().to_vec(), true),
            Step::VarLen(d, v) => (*d, v.clone(), false),
            Step::DumpActive(_) | Step::Flush => continue,
        };
        let Some(handle) = handles.get(decl).copied() else {
            continue;
        };
        let Some(idx) = handle.index() else {
            continue;
        };
        if fixed {
            curval[idx] = bytes.clone();
        }
        let Some(t) = time else {
            pre_time |= fixed;
            continue;
        };
        let raw = handle.as_raw();
        let repeat = pending
            .iter()
            .rev()
            .find(|c| c.handle == raw)
            .is_some_and(|c| c.bytes == bytes);
        if fixed && repeat {
            continue;
        }
        pending.push(Change {
            time: t,
            handle: raw,
            bytes,
        });
    }

    if time.is_none() {
        pending = seed(&curval);
    }
    flush_step(&mut out, &mut pending);
    out
}

fn flush_step(out: &mut Vec<Change>, pending: &mut Vec<Change>) {
    pending.sort_by_key(|c| c.handle);
    out.append(pending);
}

/// Value of `handle` at `time` implied by `changes`, for fixed-width
/// handles: the newest change at or before `time`, else `unset`.
pub fn value_in_model(changes: &[Change], handle: Handle, time: u64, unset: &[u8]) -> Vec<u8> {
    changes
        .iter()
        .rev()
        .find(|c| c.handle == handle.as_raw() && c.time <= time)
        .map_or_else(|| unset.to_vec(), |c| c.bytes.clone())
}

/// Rewrites the trace at `path` without any block of `kind`, returning how
/// many were removed.
pub fn strip_blocks(path: &Path, kind: BlockKind) -> io::Result<usize> {
    let data = fs::read(path)?;
    let mut kept = Vec::with_capacity(data.len());
    let mut removed = 0;
    let mut pos = 0;
    while pos < data.len() {
        let seclen = data
            .get(pos + 1..pos + 9)
            .and_then(|b| <[u8; 8]>::try_from(b).ok())
            .map(u64::from_be_bytes)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "truncated block header"))?;
        let end = pos + 1 + seclen as usize;
        let block = data
            .get(pos..end)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "block overruns file"))?;
        if block[0] == kind.tag() {
            removed += 1;
        } else {
            kept.extend_from_slice(block);
        }
        pos = end;
    }
    fs::write(path, kept)?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_share_handles() {
        let mut script = Script::new();
        let a = script.declare(Decl::new("a", VarType::Wire, 1));
        script.declare(Decl::new("b", VarType::Wire, 4));
        script.declare(Decl::alias("a2", VarType::Wire, 1, a));
        script.declare(Decl::new("c", VarType::Real, 64));
        let raw: Vec<u32> = script.handles().iter().map(|h| h.as_raw()).collect();
        assert_eq!(raw, vec![1, 2, 1, 3]);
    }

    #[test]
    fn model_drops_repeats_and_orders_by_handle() {
        let mut script = Script::new();
        let a = script.declare(Decl::new("a", VarType::Wire, 1));
        let b = script.declare(Decl::new("b", VarType::Wire, 2));
        script
            .step(Step::Time(0))
            .step(Step::Value(b, b"01".to_vec()))
            .step(Step::Value(a, b"1".to_vec()))
            .step(Step::Value(a, b"1".to_vec()))
            .step(Step::Value(a, b"0".to_vec()))
            .step(Step::Time(4))
            .step(Step::Value(a, b"0".to_vec()));
        let got: Vec<_> = expected_changes(&script)
            .into_iter()
            .map(|c| (c.time, c.handle, String::from_utf8(c.bytes).unwrap()))
            .collect();
        assert_eq!(
            got,
            vec![
                (0, 1, "1".to_string()),
                (0, 1, "0".to_string()),
                (0, 2, "01".to_string()),
                (4, 1, "0".to_string()),
            ]
        );
    }

    #[test]
    fn model_seeds_values_set_before_time() {
        let mut script = Script::new();
        let a = script.declare(Decl::new("a", VarType::Wire, 1));
        script.declare(Decl::new("b", VarType::Wire, 2));
        script
            .step(Step::Value(a, b"1".to_vec()))
            .step(Step::Time(3))
            .step(Step::Value(a, b"0".to_vec()));
        let got: Vec<_> = expected_changes(&script)
            .into_iter()
            .map(|c| (c.time, c.handle, c.bytes))
            .collect();
        assert_eq!(
            got,
            vec![
                (0, 1, b"1".to_vec()),
                (0, 2, b"xx".to_vec()),
                (3, 1, b"0".to_vec()),
            ]
        );
    }
}
