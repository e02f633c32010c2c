//! Decoding one signal's change chain.

use fst_common::value::{decode_bit, packed_len, unpack_binary};
use fst_common::varint::scan_varint;
use fst_common::{CodecError, SignalKind};

/// Forward cursor over the records of an inflated chain.
///
/// Time indexes are accumulated from the per-record deltas, starting at 0
/// for the block's first time.
#[derive(Clone, Debug)]
pub struct ChainCursor<'a> {
    data: &'a [u8],
    pos: usize,
    kind: SignalKind,
    len: usize,
    tidx: u64,
}

/// Saved position of a [`ChainCursor`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CursorMark {
    pos: usize,
    tidx: u64,
}

impl<'a> ChainCursor<'a> {
    /// Starts at the first record. `len` is the signal's stored length.
    pub fn new(data: &'a [u8], kind: SignalKind, len: usize) -> Self {
        Self {
            data,
            pos: 0,
            kind,
            len,
            tidx: 0,
        }
    }

    /// Resumes from a saved position.
    pub fn resume(data: &'a [u8], kind: SignalKind, len: usize, mark: CursorMark) -> Self {
        Self {
            data,
            pos: mark.pos,
            kind,
            len,
            tidx: mark.tidx,
        }
    }

    /// Current position, for [`resume`](Self::resume).
    pub fn mark(&self) -> CursorMark {
        CursorMark {
            pos: self.pos,
            tidx: self.tidx,
        }
    }

    /// Decodes the next record into `value` and returns its time index, or
    /// `None` at the end of the chain.
    pub fn next_into(&mut self, value: &mut Vec<u8>) -> Result<Option<u64>, CodecError> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let (vli, n) = scan_varint(self.data, self.pos)?;
        self.pos += n;
        match self.kind {
            SignalKind::Bits if self.len == 1 => {
                let (tdelta, ch) = decode_bit(vli);
                self.tidx = self.tidx.saturating_add(tdelta);
                value.clear();
                value.push(ch);
            }
            SignalKind::Bits => {
                self.tidx = self.tidx.saturating_add(vli >> 1);
                if vli & 1 == 0 {
                    let packed = self.take(packed_len(self.len))?;
                    unpack_binary(packed, self.len, value);
                } else {
                    let raw = self.take(self.len)?;
                    value.clear();
                    value.extend_from_slice(raw);
                }
            }
            SignalKind::Real => {
                self.tidx = self.tidx.saturating_add(vli >> 1);
                let raw = self.take(8)?;
                value.clear();
                value.extend_from_slice(raw);
            }
            SignalKind::VarLen => {
                self.tidx = self.tidx.saturating_add(vli >> 1);
                let (len, n) = scan_varint(self.data, self.pos)?;
                self.pos += n;
                let raw = self.take(len as usize)?;
                value.clear();
                value.extend_from_slice(raw);
            }
        }
        Ok(Some(self.tidx))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let data = self.data;
        let bytes = self
            .pos
            .checked_add(len)
            .and_then(|end| data.get(self.pos..end))
            .ok_or(CodecError::Truncated {
                what: "chain record",
                offset: self.pos,
            })?;
        self.pos += len;
        Ok(bytes)
    }
}
