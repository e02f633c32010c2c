//! Reader for FST trace files.
//!
//! [`Reader::open`] unwraps gzip-wrapped files, indexes the value-change
//! blocks and loads geometry. Values are read two ways: chronological
//! traversal of every change through a [`ChangeSink`], or random access to
//! one signal at one time with [`Reader::value_at`]. The hierarchy can be
//! walked entry by entry or printed as a VCD header.
//!
//! # Modules
//!
//! - `block`: decoding one value-change block
//! - `chain`: walking a signal's change chain
//! - `stream`: time-ordered traversal, masks and time limits
//! - `rvat`: cached random access
//! - `vcd`: VCD text output

#![warn(missing_docs)]

mod block;
mod chain;
pub mod error;
mod geometry;
mod header;
mod hier;
mod reader;
mod rvat;
mod stream;
mod value;
pub mod vcd;
mod wrapper;

pub use error::ReaderError;
pub use header::TraceHeader;
pub use hier::{HierEntry, ScopeStack};
pub use reader::{Reader, SignalInfo};
pub use stream::ChangeSink;
pub use value::{format_real, OwnedValue, Value};
pub use vcd::VcdSink;
