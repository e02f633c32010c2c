//! Error type shared by the byte-level codecs.

/// Errors raised while decoding varints, records, or compressed sections.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The input ended before a complete item could be decoded.
    #[error("truncated {what} at byte {offset}")]
    Truncated {
        /// What was being decoded.
        what: &'static str,
        /// Offset at which the input ran out.
        offset: usize,
    },

    /// A varint ran past the ten bytes a `u64` can occupy.
    #[error("overlong varint at byte {offset}")]
    OverlongVarint {
        /// Offset of the first byte of the varint.
        offset: usize,
    },

    /// A compressed section failed to inflate.
    #[error("{codec} decompression failed: {message}")]
    Decompress {
        /// The codec that failed (`zlib`, `gzip`, `lz4`).
        codec: &'static str,
        /// Underlying library message.
        message: String,
    },

    /// A section inflated to a different size than its header promised.
    #[error("{what} inflated to {actual} bytes, expected {expected}")]
    LengthMismatch {
        /// The section being inflated.
        what: &'static str,
        /// Length recorded in the file.
        expected: usize,
        /// Length actually produced.
        actual: usize,
    },

    /// A hierarchy record carried an unknown tag byte.
    #[error("unknown hierarchy tag 0x{tag:02x} at byte {offset}")]
    UnknownHierTag {
        /// The offending tag.
        tag: u8,
        /// Offset of the tag within the hierarchy stream.
        offset: usize,
    },

    /// A compression call failed while writing.
    #[error("compression failed: {0}")]
    Compress(#[from] std::io::Error),
}
