//! `fst`: inspect FST trace files from the command line.
//!
//! Provides `fst info` for header fields, `fst hier` for the declared
//! signals, `fst dump` for VCD text output, and `fst value` for reading
//! signals at one point in time.

#![warn(missing_docs)]

mod dump;
mod hier;
mod info;
mod signals;
mod value;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Inspect FST trace files.
#[derive(Parser, Debug)]
#[command(name = "fst", version, about = "FST trace inspection")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print header fields.
    Info(InfoArgs),
    /// List every declared signal with its handle.
    Hier(HierArgs),
    /// Print the trace as VCD text.
    Dump(DumpArgs),
    /// Print signal values at one time.
    Value(ValueArgs),
}

/// Arguments for `fst info`.
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Trace file.
    pub file: String,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for `fst hier`.
#[derive(Parser, Debug)]
pub struct HierArgs {
    /// Trace file.
    pub file: String,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for `fst dump`.
#[derive(Parser, Debug)]
pub struct DumpArgs {
    /// Trace file.
    pub file: String,

    /// First time to include.
    #[arg(long)]
    pub start: Option<u64>,

    /// Last time to include.
    #[arg(long)]
    pub end: Option<u64>,

    /// Only dump these signals, by full name or handle number.
    #[arg(short, long, num_args = 1..)]
    pub signals: Vec<String>,

    /// Output path; stdout when omitted.
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for `fst value`.
#[derive(Parser, Debug)]
pub struct ValueArgs {
    /// Trace file.
    pub file: String,

    /// Time to read the values at.
    #[arg(short, long)]
    pub time: u64,

    /// Signals by full name or handle number.
    #[arg(required = true)]
    pub signals: Vec<String>,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable text.
    Text,
    /// Machine-readable JSON.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
    };
    init_logging(&global);

    let result = match cli.command {
        Command::Info(ref args) => info::run(args, &global),
        Command::Hier(ref args) => hier::run(args, &global),
        Command::Dump(ref args) => dump::run(args, &global),
        Command::Value(ref args) => value::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs a stderr log subscriber. `RUST_LOG` overrides the level the
/// flags choose.
fn init_logging(global: &GlobalArgs) {
    let level = if global.quiet {
        "error"
    } else if global.verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A subscriber may already be set when running under a test harness.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}


#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_info_default() {
        let cli = Cli::parse_from(["fst", "info", "t.fst"]);
        match cli.command {
            Command::Info(ref args) => {
                assert_eq!(args.file, "t.fst");
                assert_eq!(args.format, ReportFormat::Text);
            }
            _ => panic!("expected Info command"),
        }
    }

    #[test]
    fn parse_info_json() {
        let cli = Cli::parse_from(["fst", "info", "t.fst", "--format", "json"]);
        match cli.command {
            Command::Info(ref args) => assert_eq!(args.format, ReportFormat::Json),
            _ => panic!("expected Info command"),
        }
    }

    #[test]
    fn parse_dump_with_range() {
        let cli = Cli::parse_from([
            "fst", "dump", "t.fst", "--start", "5", "--end", "50", "-o", "out.vcd",
        ]);
        match cli.command {
            Command::Dump(ref args) => {
                assert_eq!(args.start, Some(5));
                assert_eq!(args.end, Some(50));
                assert_eq!(args.output.as_deref(), Some("out.vcd"));
                assert!(args.signals.is_empty());
            }
            _ => panic!("expected Dump command"),
        }
    }

    #[test]
    fn parse_value_signals() {
        let cli = Cli::parse_from(["fst", "value", "t.fst", "--time", "7", "top.clk", "2"]);
        match cli.command {
            Command::Value(ref args) => {
                assert_eq!(args.time, 7);
                assert_eq!(args.signals, vec!["top.clk", "2"]);
            }
            _ => panic!("expected Value command"),
        }
    }

    #[test]
    fn value_requires_a_signal() {
        assert!(Cli::try_parse_from(["fst", "value", "t.fst", "--time", "7"]).is_err());
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["fst", "--quiet", "hier", "t.fst"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        let cli = Cli::parse_from(["fst", "hier", "t.fst", "-v"]);
        assert!(cli.verbose);
    }
}
