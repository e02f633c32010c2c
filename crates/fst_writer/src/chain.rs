//! Recoding arena chains into the compact on-disk record form.
//!
//! Arena chains are linked newest to oldest. [`ReverseBuilder`] prepends each
//! recoded record so the finished buffer reads oldest to newest.

use fst_common::value::{encode_bit, is_binary, pack_binary, packed_len};
use fst_common::varint::{prepend_varint, MAX_VARINT_LEN};
use fst_common::{CodecError, SignalKind};

use crate::arena::{ChainArena, RecordId};

/// A byte buffer filled from its tail towards its head.
#[derive(Debug)]
pub struct ReverseBuilder {
    buf: Vec<u8>,
    start: usize,
}

impl ReverseBuilder {
    /// Creates a builder with room for `capacity` bytes before it grows.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(MAX_VARINT_LEN);
        Self {
            buf: vec![0; capacity],
            start: capacity,
        }
    }

    /// Discards the contents, keeping the allocation.
    pub fn clear(&mut self) {
        self.start = self.buf.len();
    }

    /// The bytes written so far, in final order.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[self.start..]
    }

    /// Makes sure `extra` more bytes fit in front of the current contents.
    fn reserve_front(&mut self, extra: usize) {
        if self.start >= extra {
            return;
        }
        let used = self.buf.len() - self.start;
        let capacity = (self.buf.len() * 2).max(used + extra + MAX_VARINT_LEN);
        let mut grown = vec![0; capacity];
        grown[capacity - used..].copy_from_slice(&self.buf[self.start..]);
        self.start = capacity - used;
        self.buf = grown;
    }

    /// Prepends raw bytes.
    pub fn prepend(&mut self, bytes: &[u8]) {
        self.reserve_front(bytes.len());
        self.start -= bytes.len();
        self.buf[self.start..self.start + bytes.len()].copy_from_slice(bytes);
    }

    /// Prepends a varint.
    pub fn prepend_varint(&mut self, value: u64) {
        self.reserve_front(MAX_VARINT_LEN);
        if let Some(start) = prepend_varint(&mut self.buf, self.start, value) {
            self.start = start;
        }
    }
}

/// Recodes one handle's chain into `out`, oldest record first.
///
/// `width` is the handle's storage length: the bit count for vectors, 8 for
/// reals and 0 for variable-length values.
pub fn recode_chain(
    arena: &ChainArena,
    head: Option<RecordId>,
    kind: SignalKind,
    width: usize,
    out: &mut ReverseBuilder,
    scratch: &mut Vec<u8>,
) -> Result<(), CodecError> {
    out.clear();
    for record in arena.walk(head) {
        let record = record?;
        let td = record.tdelta;
        match kind {
            SignalKind::Bits if width == 1 => {
                let ch = record.payload.first().copied().unwrap_or(b'x');
                out.prepend_varint(encode_bit(td, ch));
            }
            SignalKind::Bits => {
                if is_binary(record.payload) {
                    scratch.clear();
                    scratch.resize(packed_len(record.payload.len()), 0);
                    pack_binary(record.payload, scratch);
                    out.prepend(scratch);
                    out.prepend_varint(td << 1);
                } else {
                    out.prepend(record.payload);
                    out.prepend_varint((td << 1) | 1);
                }
            }
            SignalKind::Real => {
                out.prepend(record.payload);
                out.prepend_varint((td << 1) | 1);
            }
            SignalKind::VarLen => {
                out.prepend(record.payload);
                out.prepend_varint(record.payload.len() as u64);
                out.prepend_varint(td << 1);
            }
        }
    }
    Ok(())
}
