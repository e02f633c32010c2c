//! Value kinds and the compact state codes used in value-change chains.
//!
//! Values travel through the engine as ASCII state characters, one byte per
//! bit, most significant bit first. Reals travel as eight native-order bytes
//! and variable-length values as opaque byte strings.

use serde::{Deserialize, Serialize};

/// Storage class of a handle, derived from its declared type and width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Two- or four-state bit vector of the declared width.
    Bits,
    /// IEEE-754 double, stored as eight bytes.
    Real,
    /// Opaque byte string of any length.
    VarLen,
}

impl SignalKind {
    /// Value width in bytes: the bit count, 8 for reals, 0 for variable length.
    pub fn storage_len(self, width: u32) -> u32 {
        match self {
            Self::Bits => width,
            Self::Real => 8,
            Self::VarLen => 0,
        }
    }
}

/// Characters for the non-binary single-bit codes, indexed by code.
pub const STATE_CHARS: [u8; 8] = *b"xzhuwl-?";

/// Code assigned to any state character without a dedicated entry.
pub const STATE_DONT_CARE: u8 = 6;

/// Maps a non-binary state character to its 3-bit code.
pub fn state_code(ch: u8) -> u8 {
    match ch {
        b'x' | b'X' => 0,
        b'z' | b'Z' => 1,
        b'h' | b'H' => 2,
        b'u' | b'U' => 3,
        b'w' | b'W' => 4,
        b'l' | b'L' => 5,
        _ => STATE_DONT_CARE,
    }
}

/// Maps a 3-bit code back to its state character.
pub fn state_char(code: u8) -> u8 {
    STATE_CHARS[usize::from(code & 7)]
}

/// Encodes one single-bit record header: time delta plus value.
pub fn encode_bit(tdelta: u64, ch: u8) -> u64 {
    match ch {
        b'0' | b'1' => (tdelta << 2) | (u64::from(ch & 1) << 1),
        other => (tdelta << 4) | (u64::from(state_code(other)) << 1) | 1,
    }
}

/// Decodes a single-bit record header into `(tdelta, state char)`.
pub fn decode_bit(vli: u64) -> (u64, u8) {
    if vli & 1 == 0 {
        (vli >> 2, b'0' | ((vli >> 1) & 1) as u8)
    } else {
        (vli >> 4, state_char(((vli >> 1) & 7) as u8))
    }
}

/// Returns the time delta carried by a record header of the given kind.
pub fn record_tdelta(vli: u64, single_bit: bool) -> u64 {
    if single_bit {
        vli >> (2 << (vli & 1))
    } else {
        vli >> 1
    }
}

/// True when every byte is an ASCII `0` or `1`.
pub fn is_binary(value: &[u8]) -> bool {
    value.iter().all(|&b| b == b'0' || b == b'1')
}

/// Number of bytes needed to bitpack a binary value of `len` bits.
pub fn packed_len(len: usize) -> usize {
    len.div_ceil(8)
}

/// Packs a binary value MSB first: bit `j` lands in byte `j / 8` at
/// position `7 - (j & 7)`.
pub fn pack_binary(value: &[u8], out: &mut [u8]) {
    out.fill(0);
    for (j, &b) in value.iter().enumerate() {
        if b & 1 == 1 {
            out[j / 8] |= 1 << (7 - (j & 7));
        }
    }
}

/// Expands `len` bits packed by [`pack_binary`] back into ASCII.
pub fn unpack_binary(packed: &[u8], len: usize, out: &mut Vec<u8>) {
    out.clear();
    out.extend((0..len).map(|j| b'0' | ((packed[j / 8] >> (7 - (j & 7))) & 1)));
}
