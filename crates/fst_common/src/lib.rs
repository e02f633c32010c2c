//! Shared foundational types for the FST trace engine.
//!
//! This crate holds everything the writer and reader must agree on byte for
//! byte: the varint codec, block tags and header offsets, variable/scope
//! enums, value-state codes, hierarchy records, timescale spellings and the
//! compression helpers used by every compressed section.

#![warn(missing_docs)]

pub mod block;
pub mod error;
pub mod escape;
pub mod hash;
pub mod hier;
pub mod pack;
pub mod timescale;
pub mod types;
pub mod value;
pub mod varint;

pub use block::BlockKind;
pub use error::CodecError;
pub use escape::{bin_to_esc, esc_to_bin};
pub use hash::ContentHash;
pub use hier::{HierRecord, HierRecords};
pub use pack::PackType;
pub use timescale::{parse_timescale, timescale_text};
pub use types::{Handle, ScopeType, VarDir, VarType};
pub use value::SignalKind;
