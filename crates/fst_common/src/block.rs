//! Block tags and fixed header layout.
//!
//! Every block starts with a one-byte tag followed by a big-endian `u64`
//! section length that counts itself and the payload but not the tag.

use serde::{Deserialize, Serialize};

/// Block kinds, keyed by their on-disk tag byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlockKind {
    /// File header with fixed-offset metadata.
    Header = 0,
    /// Value-change data without dynamic aliases.
    ValueChange = 1,
    /// Dump on/off transitions.
    Blackout = 2,
    /// Per-handle width/kind table.
    Geometry = 3,
    /// Gzip-compressed hierarchy records.
    Hierarchy = 4,
    /// Value-change data whose index may carry dynamic aliases.
    ValueChangeAlias = 5,
    /// Whole-file gzip wrapper.
    Wrapper = 254,
    /// A block still being written.
    Skip = 255,
}

impl BlockKind {
    /// Maps a tag byte back to its block kind.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => Self::Header,
            1 => Self::ValueChange,
            2 => Self::Blackout,
            3 => Self::Geometry,
            4 => Self::Hierarchy,
            5 => Self::ValueChangeAlias,
            254 => Self::Wrapper,
            255 => Self::Skip,
            _ => return None,
        })
    }

    /// Returns the tag byte written for this kind.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// True for both value-change variants.
    pub fn is_value_change(self) -> bool {
        matches!(self, Self::ValueChange | Self::ValueChangeAlias)
    }
}

/// Section length recorded for the header block.
pub const HEADER_SECLEN: u64 = 329;

/// Total bytes occupied by the header block including its tag.
pub const HEADER_LEN: u64 = HEADER_SECLEN + 1;

/// Width of the version string field.
pub const VERSION_SIZE: usize = 128;

/// Width of the date string field.
pub const DATE_SIZE: usize = 120;

/// Value stored in the header to detect the byte order of reals.
pub const ENDIAN_TEST: f64 = std::f64::consts::E;

/// Version string used when the caller never sets one.
pub const DEFAULT_VERSION: &str = "fstWriter";

/// Timescale exponent used when the caller never sets one (1ns).
pub const DEFAULT_TIMESCALE: i8 = -9;

/// Byte offsets of the header fields, measured from the tag byte.
pub mod offsets {
    /// Section length.
    pub const SECLEN: u64 = 1;
    /// First recorded time.
    pub const START_TIME: u64 = 9;
    /// Last recorded time.
    pub const END_TIME: u64 = 17;
    /// Endianness self-test double.
    pub const ENDIAN_TEST: u64 = 25;
    /// Writer arena budget.
    pub const MEM_USED: u64 = 33;
    /// Scope count.
    pub const NUM_SCOPES: u64 = 41;
    /// Variable count including aliases.
    pub const NUM_VARS: u64 = 49;
    /// Highest handle.
    pub const MAX_HANDLE: u64 = 57;
    /// Value-change block count.
    pub const SECTION_COUNT: u64 = 65;
    /// Timescale exponent.
    pub const TIMESCALE: u64 = 73;
    /// Simulator version string.
    pub const VERSION: u64 = 74;
    /// Date string.
    pub const DATE: u64 = 202;
    /// Timezero.
    pub const TIMEZERO: u64 = 322;
}

/// Offset of the frame varints inside a value-change block, from its tag.
///
/// Covers the tag, section length, begin, end and traversal-memory fields.
pub const VC_FRAME_OFFSET: u64 = 33;

/// Trailer bytes after a value-change block's time table.
pub const VC_TIME_TRAILER: u64 = 24;

/// Geometry encoding for variable-length handles.
pub const GEOM_VARLEN: u64 = 0xFFFF_FFFF;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for kind in [
            BlockKind::Header,
            BlockKind::ValueChange,
            BlockKind::Blackout,
            BlockKind::Geometry,
            BlockKind::Hierarchy,
            BlockKind::ValueChangeAlias,
            BlockKind::Wrapper,
            BlockKind::Skip,
        ] {
            assert_eq!(BlockKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(BlockKind::from_tag(6), None);
    }

    #[test]
    fn header_offsets_chain() {
        assert_eq!(offsets::VERSION as usize + VERSION_SIZE, offsets::DATE as usize);
        assert_eq!(offsets::DATE as usize + DATE_SIZE, offsets::TIMEZERO as usize);
        assert_eq!(offsets::TIMEZERO + 8, HEADER_LEN);
    }

    #[test]
    fn value_change_variants() {
        assert!(BlockKind::ValueChange.is_value_change());
        assert!(BlockKind::ValueChangeAlias.is_value_change());
        assert!(!BlockKind::Geometry.is_value_change());
    }
}
