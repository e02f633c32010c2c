//! The fixed-layout header block.

use fst_common::block::{
    offsets, BlockKind, DATE_SIZE, DEFAULT_TIMESCALE, DEFAULT_VERSION, ENDIAN_TEST, HEADER_LEN,
    HEADER_SECLEN, VERSION_SIZE,
};

/// Every value stored in the header block.
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderFields {
    pub start_time: u64,
    pub end_time: u64,
    pub memory_budget: u64,
    pub num_scopes: u64,
    pub num_vars: u64,
    pub max_handle: u64,
    pub block_count: u64,
    pub timescale: i8,
    pub version: String,
    pub date: String,
    pub timezero: i64,
}

impl Default for HeaderFields {
    fn default() -> Self {
        Self {
            start_time: 0,
            end_time: 0,
            memory_budget: 0,
            num_scopes: 0,
            num_vars: 0,
            max_handle: 0,
            block_count: 0,
            timescale: DEFAULT_TIMESCALE,
            version: DEFAULT_VERSION.to_string(),
            date: current_date(),
            timezero: 0,
        }
    }
}

/// Local time in `asctime` form, newline included.
pub fn current_date() -> String {
    chrono::Local::now()
        .format("%a %b %e %H:%M:%S %Y\n")
        .to_string()
}

impl HeaderFields {
    /// Serializes the complete header block, tag included.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_LEN as usize];
        buf[0] = BlockKind::Header.tag();
        put_u64(&mut buf, offsets::SECLEN, HEADER_SECLEN);
        put_u64(&mut buf, offsets::START_TIME, self.start_time);
        put_u64(&mut buf, offsets::END_TIME, self.end_time);
        put(&mut buf, offsets::ENDIAN_TEST, &ENDIAN_TEST.to_ne_bytes());
        put_u64(&mut buf, offsets::MEM_USED, self.memory_budget);
        put_u64(&mut buf, offsets::NUM_SCOPES, self.num_scopes);
        put_u64(&mut buf, offsets::NUM_VARS, self.num_vars);
        put_u64(&mut buf, offsets::MAX_HANDLE, self.max_handle);
        put_u64(&mut buf, offsets::SECTION_COUNT, self.block_count);
        buf[offsets::TIMESCALE as usize] = self.timescale as u8;
        put_str(&mut buf, offsets::VERSION, &self.version, VERSION_SIZE);
        put_str(&mut buf, offsets::DATE, &self.date, DATE_SIZE);
        put(&mut buf, offsets::TIMEZERO, &self.timezero.to_be_bytes());
        buf
    }
}

fn put(buf: &mut [u8], offset: u64, bytes: &[u8]) {
    let offset = offset as usize;
    buf[offset..offset + bytes.len()].copy_from_slice(bytes);
}

fn put_u64(buf: &mut [u8], offset: u64, value: u64) {
    put(buf, offset, &value.to_be_bytes());
}

/// Copies at most `size - 1` bytes so the field always ends in a NUL.
fn put_str(buf: &mut [u8], offset: u64, s: &str, size: usize) {
    let bytes = s.as_bytes();
    put(buf, offset, &bytes[..bytes.len().min(size - 1)]);
}
