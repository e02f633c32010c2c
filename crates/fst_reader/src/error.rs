//! Reader error types.

use std::io;

use fst_common::{CodecError, Handle};

/// Errors that can occur while opening or reading a trace file.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// An I/O error occurred on the trace file, its sidecar or a temporary file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A section failed to decode or inflate.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The file does not start with a header block.
    #[error("not an FST trace: first block has tag {tag}")]
    NotATrace {
        /// The tag found at offset 0.
        tag: u8,
    },

    /// The endianness self-test double matched neither byte order.
    #[error("header endianness test failed")]
    EndianMismatch,

    /// The file holds no value-change blocks.
    #[error("trace has no value-change blocks")]
    NoValueChanges,

    /// The file declares no signals.
    #[error("trace declares no signals")]
    NoSignals,

    /// Neither a hierarchy block nor a `.hier` sidecar was found.
    #[error("trace has no hierarchy")]
    NoHierarchy,

    /// A query named a handle outside `1..=max_handle`.
    #[error("unknown handle {0}")]
    UnknownHandle(Handle),

    /// A value-change block is internally inconsistent.
    #[error("corrupt value-change block at byte {offset}: {reason}")]
    CorruptBlock {
        /// File offset of the block's tag.
        offset: u64,
        /// What was wrong.
        reason: String,
    },
}
