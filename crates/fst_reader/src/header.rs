//! Decoding the fixed-layout header block.

use fst_common::block::{offsets, BlockKind, DATE_SIZE, ENDIAN_TEST, HEADER_LEN, VERSION_SIZE};
use fst_common::varint::read_u64_be;
use serde::Serialize;

use crate::error::ReaderError;

/// Every value stored in the header block.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TraceHeader {
    /// First recorded time.
    pub start_time: u64,
    /// Last recorded time.
    pub end_time: u64,
    /// Arena break size the writer used.
    pub memory_used: u64,
    /// Scopes declared.
    pub num_scopes: u64,
    /// Variables declared, aliases included.
    pub num_vars: u64,
    /// Highest signal handle.
    pub max_handle: u64,
    /// Value-change blocks the writer reported.
    pub block_count: u64,
    /// Timescale as a power of ten relative to one second.
    pub timescale: i8,
    /// Simulator version string.
    pub version: String,
    /// Creation date string.
    pub date: String,
    /// Offset added to every time when displaying.
    pub timezero: i64,
    /// True when the file was written on a machine of the other endianness.
    pub byte_swapped: bool,
}

impl TraceHeader {
    /// Parses the first [`HEADER_LEN`] bytes of a trace.
    pub fn parse(data: &[u8]) -> Result<Self, ReaderError> {
        let tag = data.first().copied().unwrap_or(u8::MAX);
        if BlockKind::from_tag(tag) != Some(BlockKind::Header) || data.len() < HEADER_LEN as usize {
            return Err(ReaderError::NotATrace { tag });
        }
        let u64_at = |offset: u64| read_u64_be(data, offset as usize);

        let endian = &data[offsets::ENDIAN_TEST as usize..offsets::ENDIAN_TEST as usize + 8];
        let mut test = [0u8; 8];
        test.copy_from_slice(endian);
        let byte_swapped = if f64::from_ne_bytes(test) == ENDIAN_TEST {
            false
        } else {
            test.reverse();
            if f64::from_ne_bytes(test) != ENDIAN_TEST {
                return Err(ReaderError::EndianMismatch);
            }
            true
        };

        let timezero_at = offsets::TIMEZERO as usize;
        let mut timezero = [0u8; 8];
        timezero.copy_from_slice(&data[timezero_at..timezero_at + 8]);

        Ok(Self {
            start_time: u64_at(offsets::START_TIME)?,
            end_time: u64_at(offsets::END_TIME)?,
            memory_used: u64_at(offsets::MEM_USED)?,
            num_scopes: u64_at(offsets::NUM_SCOPES)?,
            num_vars: u64_at(offsets::NUM_VARS)?,
            max_handle: u64_at(offsets::MAX_HANDLE)?,
            block_count: u64_at(offsets::SECTION_COUNT)?,
            timescale: data[offsets::TIMESCALE as usize] as i8,
            version: fixed_str(data, offsets::VERSION, VERSION_SIZE),
            date: fixed_str(data, offsets::DATE, DATE_SIZE),
            timezero: i64::from_be_bytes(timezero),
            byte_swapped,
        })
    }

    /// Declarations that reuse another signal's handle.
    pub fn alias_count(&self) -> u64 {
        self.num_vars.saturating_sub(self.max_handle)
    }
}

/// Reads a NUL-padded string field.
fn fixed_str(data: &[u8], offset: u64, size: usize) -> String {
    let field = &data[offset as usize..offset as usize + size];
    let end = field.iter().position(|&b| b == 0).unwrap_or(size);
    String::from_utf8_lossy(&field[..end]).into_owned()
}
