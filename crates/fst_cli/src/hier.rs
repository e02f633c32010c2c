//! Implementation of the `fst hier` command.

use std::io::{self, Write};

use fst_reader::SignalInfo;

use crate::signals::open;
use crate::{GlobalArgs, HierArgs, ReportFormat};

/// Runs the `fst hier` command.
pub fn run(args: &HierArgs, _global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let mut reader = open(&args.file)?;
    let signals = reader.process_hierarchy(None)?;
    let stdout = io::stdout();
    list(&signals, args.format, &mut stdout.lock())?;
    Ok(0)
}

fn list(signals: &[SignalInfo], format: ReportFormat, out: &mut dyn Write) -> io::Result<()> {
    match format {
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, signals)?;
            writeln!(out)
        }
        ReportFormat::Text => {
            for s in signals {
                let alias = if s.is_alias { " (alias)" } else { "" };
                writeln!(
                    out,
                    "{:>6}  {:<10} {:>5}  {}{alias}",
                    s.handle.as_raw(),
                    s.var_type.label(),
                    s.width,
                    s.name
                )?;
            }
            Ok(())
        }
    }
}
