//! VCD text output: header, declarations and value changes.

use std::io::{self, Write};

use fst_common::{bin_to_esc, timescale_text, Handle, VarType};

use crate::header::TraceHeader;
use crate::hier::HierEntry;
use crate::stream::ChangeSink;
use crate::value::{format_real, Value};

/// VCD identifier for a handle: base 94 over `!`..`~`, least significant
/// character first.
pub fn id_code(handle: Handle) -> String {
    let mut value = handle.as_raw();
    let mut id = String::new();
    while value != 0 {
        value -= 1;
        id.push(char::from(b'!' + (value % 94) as u8));
        value /= 94;
    }
    id
}

/// Keyword a variable type uses in a VCD `$var` line.
pub fn vcd_type(var_type: VarType) -> &'static str {
    match var_type {
        VarType::Array => "sparray",
        other => other.label(),
    }
}

/// Writes `$date`, `$version`, `$timezero` and `$timescale`.
pub fn write_preamble(out: &mut dyn Write, header: &TraceHeader) -> io::Result<()> {
    writeln!(out, "$date\n\t{}\n$end", header.date.trim_end())?;
    writeln!(out, "$version\n\t{}\n$end", header.version)?;
    if header.timezero != 0 {
        writeln!(out, "$timezero\n\t{}\n$end", header.timezero)?;
    }
    writeln!(out, "$timescale\n\t{}\n$end", timescale_text(header.timescale))
}

/// Writes one declaration line.
pub fn write_entry(out: &mut dyn Write, entry: &HierEntry) -> io::Result<()> {
    match entry {
        HierEntry::Scope { kind, name, .. } => writeln!(out, "$scope {kind} {name} $end"),
        HierEntry::Upscope => writeln!(out, "$upscope $end"),
        HierEntry::Var {
            var_type,
            name,
            width,
            handle,
            ..
        } => {
            let width = match var_type {
                t if t.is_real() => 64,
                VarType::GenString => 1,
                _ => *width,
            };
            writeln!(
                out,
                "$var {} {width} {} {name} $end",
                vcd_type(*var_type),
                id_code(*handle)
            )
        }
    }
}

/// Writes the line closing the declarations.
pub fn write_enddefinitions(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "$enddefinitions $end")
}

/// A [`ChangeSink`] printing VCD value-change text.
///
/// The first write error is kept and reported by [`finish`](Self::finish);
/// later changes are dropped.
pub struct VcdSink<W: Write> {
    out: W,
    ports: Vec<bool>,
    error: Option<io::Error>,
}

impl<W: Write> VcdSink<W> {
    /// Creates a sink. `ports[i]` marks handle `i + 1` as a port, printed
    /// with a `p` prefix.
    pub fn new(out: W, ports: Vec<bool>) -> Self {
        Self {
            out,
            ports,
            error: None,
        }
    }

    /// Flushes and returns the writer, or the first error seen.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn write(&mut self, f: impl FnOnce(&mut W) -> io::Result<()>) {
        if self.error.is_none() {
            if let Err(err) = f(&mut self.out) {
                self.error = Some(err);
            }
        }
    }

    fn is_port(&self, handle: Handle) -> bool {
        handle
            .index()
            .and_then(|i| self.ports.get(i))
            .copied()
            .unwrap_or(false)
    }
}

impl<W: Write> ChangeSink for VcdSink<W> {
    fn on_time(&mut self, time: u64) {
        self.write(|out| writeln!(out, "#{time}"));
    }

    fn on_value(&mut self, _time: u64, handle: Handle, value: Value<'_>) {
        let id = id_code(handle);
        let port = self.is_port(handle);
        self.write(|out| match value {
            Value::Bits(bits) if bits.len() == 1 && !port => {
                out.write_all(bits)?;
                writeln!(out, "{id}")
            }
            Value::Bits(bits) => {
                out.write_all(if port { b"p" } else { b"b" })?;
                out.write_all(bits)?;
                writeln!(out, " {id}")
            }
            Value::Real(r) => writeln!(out, "r{} {id}", format_real(r)),
            Value::Bytes(bytes) => writeln!(out, "s{} {id}", bin_to_esc(bytes)),
        });
    }

    fn on_dump_active(&mut self, _time: u64, active: bool) {
        let keyword = if active { "$dumpon" } else { "$dumpoff" };
        self.write(|out| writeln!(out, "{keyword}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fst_common::VarDir;

    #[test]
    fn id_codes_are_base_94() {
        assert_eq!(id_code(Handle::from_raw(1)), "!");
        assert_eq!(id_code(Handle::from_raw(2)), "\"");
        assert_eq!(id_code(Handle::from_raw(94)), "~");
        assert_eq!(id_code(Handle::from_raw(95)), "!!");
    }

    #[test]
    fn declaration_lines() {
        let mut out = Vec::new();
        write_entry(
            &mut out,
            &HierEntry::Var {
                var_type: VarType::Wire,
                direction: VarDir::Implicit,
                name: "bus".to_string(),
                width: 8,
                handle: Handle::from_raw(2),
                is_alias: false,
            },
        )
        .unwrap();
        write_entry(
            &mut out,
            &HierEntry::Var {
                var_type: VarType::Real,
                direction: VarDir::Implicit,
                name: "r".to_string(),
                width: 8,
                handle: Handle::from_raw(3),
                is_alias: false,
            },
        )
        .unwrap();
        write_entry(&mut out, &HierEntry::Upscope).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "$var wire 8 \" bus $end\n$var real 64 # r $end\n$upscope $end\n"
        );
    }

    #[test]
    fn value_lines() {
        let mut sink = VcdSink::new(Vec::new(), vec![false, false, true]);
        sink.on_time(5);
        sink.on_value(5, Handle::from_raw(1), Value::Bits(b"1"));
        sink.on_value(5, Handle::from_raw(2), Value::Bits(b"0101"));
        sink.on_value(5, Handle::from_raw(3), Value::Bits(b"01x"));
        sink.on_value(5, Handle::from_raw(2), Value::Real(3.5));
        sink.on_varlen(5, Handle::from_raw(1), b"a b");
        sink.on_dump_active(5, false);
        let text = String::from_utf8(sink.finish().unwrap()).unwrap();
        assert_eq!(
            text,
            "#5\n1!\nb0101 \"\np01x #\nr3.5 \"\nsa\\040b !\n$dumpoff\n"
        );
    }
}
