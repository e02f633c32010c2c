//! Implementation of the `fst dump` command.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use fst_reader::Reader;
use tracing::info;

use crate::signals::{open, resolve};
use crate::{DumpArgs, GlobalArgs};

/// Runs the `fst dump` command.
pub fn run(args: &DumpArgs, _global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let mut reader = open(&args.file)?;
    configure(&mut reader, args)?;
    match &args.output {
        Some(path) => {
            let out = BufWriter::new(File::create(path)?);
            reader.write_vcd(out)?.flush()?;
            info!(output = %path, "wrote VCD");
        }
        None => {
            let stdout = io::stdout();
            reader.write_vcd(BufWriter::new(stdout.lock()))?.flush()?;
        }
    }
    Ok(0)
}

/// Applies the time range and signal selection.
fn configure(reader: &mut Reader, args: &DumpArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.start.is_some() || args.end.is_some() {
        let start = args.start.unwrap_or(0);
        let end = args.end.unwrap_or(u64::MAX);
        if start > end {
            return Err(format!("--start {start} is after --end {end}").into());
        }
        reader.set_limit_time_range(start, end);
    }
    if !args.signals.is_empty() {
        let signals = reader.process_hierarchy(None)?;
        let selected = resolve(&signals, reader.max_handle(), &args.signals)?;
        reader.clear_mask_all();
        for (_, handle) in selected {
            reader.set_mask(handle);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{quiet, sample_trace};
    use std::fs;

    fn args(file: &str) -> DumpArgs {
        DumpArgs {
            file: file.to_string(),
            start: None,
            end: None,
            signals: Vec::new(),
            output: None,
        }
    }

    #[test]
    fn full_dump_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_trace(dir.path());
        let out_path = dir.path().join("out.vcd");
        let dump = DumpArgs {
            output: Some(out_path.to_str().unwrap().to_string()),
            ..args(path.to_str().unwrap())
        };
        assert_eq!(run(&dump, &quiet()).unwrap(), 0);

        let text = fs::read_to_string(&out_path).unwrap();
        assert!(text.contains("$timescale\n\t1ns\n$end\n"));
        assert!(text.contains("$scope module cpu $end\n"));
        assert!(text.contains("$var reg 8 \" pc $end\n"));
        assert!(text.ends_with("#10\n1!\nb00000100 \"\n#20\n0!\nr21 #\n"));
    }

    #[test]
    fn range_and_selection() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_trace(dir.path());
        let dump = DumpArgs {
            start: Some(10),
            signals: vec!["top.clk".to_string()],
            ..args(path.to_str().unwrap())
        };
        let mut reader = open(&dump.file).unwrap();
        configure(&mut reader, &dump).unwrap();
        let text = String::from_utf8(reader.write_vcd(Vec::new()).unwrap()).unwrap();
        let body = text.split("$enddefinitions $end\n").nth(1).unwrap();
        assert_eq!(body, "#10\n1!\n#20\n0!\n");
    }

    #[test]
    fn inverted_range_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_trace(dir.path());
        let dump = DumpArgs {
            start: Some(30),
            end: Some(5),
            ..args(path.to_str().unwrap())
        };
        let mut reader = open(&dump.file).unwrap();
        assert!(configure(&mut reader, &dump).is_err());
    }
}
