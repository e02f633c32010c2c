//! Writer error types.
//!
//! Codec and I/O failures surface here instead of aborting, so callers can
//! decide whether a damaged trace is worth keeping.

use std::io;

use fst_common::{CodecError, Handle, SignalKind};

/// Errors that can occur while writing a trace file.
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    /// An I/O error occurred on the trace file or its hierarchy sidecar.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Compressing a section failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A time change went backwards.
    #[error("time went backwards: {requested} is before {previous}")]
    TimeWentBackwards {
        /// The current time.
        previous: u64,
        /// The rejected time.
        requested: u64,
    },

    /// A value was emitted for a handle that was never declared.
    #[error("unknown handle {0}")]
    UnknownHandle(Handle),

    /// A fixed-width value had the wrong number of bytes.
    #[error("handle {handle} expects {expected} value bytes, got {actual}")]
    WidthMismatch {
        /// The target handle.
        handle: Handle,
        /// Declared storage length.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },

    /// A value was emitted through the call for the other storage class.
    #[error("handle {handle} stores {kind:?} values")]
    KindMismatch {
        /// The target handle.
        handle: Handle,
        /// The handle's storage class.
        kind: SignalKind,
    },

    /// A timescale string could not be parsed.
    #[error("invalid timescale '{0}'")]
    InvalidTimescale(String),

    /// The background flush thread exited before returning its result.
    #[error("flush worker terminated unexpectedly")]
    WorkerGone,
}
