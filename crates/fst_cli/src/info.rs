//! Implementation of the `fst info` command.

use std::io::{self, Write};

use fst_common::timescale_text;
use fst_reader::{Reader, TraceHeader};
use serde::Serialize;

use crate::signals::open;
use crate::{GlobalArgs, InfoArgs, ReportFormat};

/// Everything `fst info` reports.
#[derive(Serialize)]
struct InfoReport<'a> {
    file: &'a str,
    #[serde(flatten)]
    header: &'a TraceHeader,
    timescale_text: String,
    alias_count: u64,
    blackouts: usize,
}

/// Runs the `fst info` command.
pub fn run(args: &InfoArgs, _global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let reader = open(&args.file)?;
    let stdout = io::stdout();
    report(&reader, args, &mut stdout.lock())?;
    Ok(0)
}

fn report(reader: &Reader, args: &InfoArgs, out: &mut dyn Write) -> io::Result<()> {
    let header = reader.header();
    let info = InfoReport {
        file: &args.file,
        header,
        timescale_text: timescale_text(header.timescale),
        alias_count: reader.alias_count(),
        blackouts: reader.blackouts().len(),
    };
    match args.format {
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &info)?;
            writeln!(out)
        }
        ReportFormat::Text => {
            writeln!(out, "file:        {}", info.file)?;
            writeln!(out, "version:     {}", header.version)?;
            writeln!(out, "date:        {}", header.date.trim_end())?;
            writeln!(out, "timescale:   {}", info.timescale_text)?;
            writeln!(out, "timezero:    {}", header.timezero)?;
            writeln!(out, "time range:  {} .. {}", header.start_time, header.end_time)?;
            writeln!(out, "scopes:      {}", header.num_scopes)?;
            writeln!(
                out,
                "variables:   {} ({} aliases)",
                header.num_vars, info.alias_count
            )?;
            writeln!(out, "handles:     {}", header.max_handle)?;
            writeln!(out, "blocks:      {}", header.block_count)?;
            writeln!(out, "break size:  {}", header.memory_used)?;
            writeln!(out, "blackouts:   {}", info.blackouts)?;
            if !reader.endian_matches() {
                writeln!(out, "byte order:  swapped")?;
            }
            Ok(())
        }
    }
}
