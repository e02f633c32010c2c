//! Implementation of the `fst value` command.

use std::io::{self, Write};

use fst_reader::Reader;

use crate::signals::{open, resolve};
use crate::{GlobalArgs, ValueArgs};

/// Runs the `fst value` command.
pub fn run(args: &ValueArgs, _global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let mut reader = open(&args.file)?;
    let stdout = io::stdout();
    print_values(&mut reader, args, &mut stdout.lock())?;
    Ok(0)
}

fn print_values(
    reader: &mut Reader,
    args: &ValueArgs,
    out: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let signals = reader.process_hierarchy(None)?;
    let selected = resolve(&signals, reader.max_handle(), &args.signals)?;
    let width = selected.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, handle) in selected {
        match reader.value_at(args.time, handle)? {
            Some(value) => writeln!(out, "{name:<width$}  {value}")?,
            None => writeln!(out, "{name:<width$}  -")?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_trace;

    fn values_at(time: u64, signals: &[&str]) -> String {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_trace(dir.path());
        let args = ValueArgs {
            file: path.to_str().unwrap().to_string(),
            time,
            signals: signals.iter().map(|s| s.to_string()).collect(),
        };
        let mut reader = open(&args.file).unwrap();
        let mut out = Vec::new();
        print_values(&mut reader, &args, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn values_between_changes() {
        assert_eq!(
            values_at(15, &["top.clk", "top.cpu.pc", "3"]),
            "top.clk       1\ntop.cpu.pc    00000100\ntop.cpu.temp  20.5\n"
        );
    }

    #[test]
    fn values_after_the_end() {
        assert_eq!(values_at(99, &["1", "top.cpu.temp"]), "top.clk       0\ntop.cpu.temp  21\n");
    }
}
