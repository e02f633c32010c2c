//! Configuration types deserialized from a trace configuration file.

use fst_common::block::{DEFAULT_TIMESCALE, DEFAULT_VERSION};
use fst_common::{parse_timescale, PackType};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};

/// Default arena size at which the writer flushes a block (128 MiB).
pub const DEFAULT_BREAK_SIZE: u64 = 1 << 27;

/// The top-level configuration document.
#[derive(Debug, Default, Deserialize)]
pub struct TraceConfig {
    /// Settings applied when a trace file is created.
    #[serde(default)]
    pub writer: WriterConfig,
}

/// Writer settings. Every field has a default, so an empty table is valid.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Fold the hierarchy sidecar into a gzip block at close.
    pub compress_hierarchy: bool,
    /// Codec for per-handle value-change chains.
    pub pack: PackType,
    /// Hand block flushes to a background thread.
    pub parallel: bool,
    /// Rewrite the finished file as one gzip-wrapped block.
    pub repack_on_close: bool,
    /// Arena size in bytes at which the writer closes a block.
    pub break_size: u64,
    /// File size in bytes after which no further blocks are written; 0 disables.
    pub dump_size_limit: u64,
    /// Timescale exponent; accepts either `-9` or `"1ns"` in TOML.
    #[serde(deserialize_with = "deserialize_timescale")]
    pub timescale: i8,
    /// Simulator version string stored in the header.
    pub version: String,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compress_hierarchy: true,
            pack: PackType::Zlib,
            parallel: false,
            repack_on_close: false,
            break_size: DEFAULT_BREAK_SIZE,
            dump_size_limit: 0,
            timescale: DEFAULT_TIMESCALE,
            version: DEFAULT_VERSION.to_string(),
        }
    }
}

/// Deserializes a timescale given either as an exponent or as a unit string.
///
/// Allows both `timescale = -12` and `timescale = "1ps"`.
fn deserialize_timescale<'de, D>(deserializer: D) -> Result<i8, D::Error>
where
    D: Deserializer<'de>,
{
    struct ExponentOrUnit;

    impl Visitor<'_> for ExponentOrUnit {
        type Value = i8;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a power-of-ten exponent or a unit string such as \"10ps\"")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            i8::try_from(v).map_err(|_| E::custom(format!("timescale exponent {v} out of range")))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            i8::try_from(v).map_err(|_| E::custom(format!("timescale exponent {v} out of range")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            parse_timescale(v).ok_or_else(|| E::custom(format!("invalid timescale '{v}'")))
        }
    }

    deserializer.deserialize_any(ExponentOrUnit)
}
