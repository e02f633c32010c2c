//! Block-structured FST trace writer.
//!
//! A [`Writer`] records scope and variable declarations, then value changes
//! in non-decreasing time order. Changes are grouped into value-change
//! blocks, each carrying a snapshot of every signal's value at the block
//! start, per-signal change chains deduplicated within the block, and a
//! compressed time table. Blocks can be flushed on a background thread.
//!
//! # Modules
//!
//! - `arena`: per-block change record storage
//! - `chain`: recoding a signal's records into its on-disk chain
//! - `block`: encoding a sealed value-change block
//! - `worker`: background block flushing
//! - `sections`: geometry, blackout and hierarchy sections, repacking
//! - `sidecar`: the hierarchy file written during a run

#![warn(missing_docs)]

mod arena;
mod block;
mod budget;
mod chain;
pub mod error;
mod header;
mod sections;
mod sidecar;
mod worker;
mod writer;

pub use error::WriterError;
pub use sidecar::sidecar_path;
pub use writer::Writer;
