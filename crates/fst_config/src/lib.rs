//! Parsing and validation of trace writer configuration files.
//!
//! A configuration file is TOML with a single `[writer]` table; every key is
//! optional. The result is a strongly-typed [`WriterConfig`] that the writer
//! applies when a trace file is created.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use types::*;
