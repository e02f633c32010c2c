//! The per-block value-change arena.
//!
//! Every record appended during a block lives in one growable byte vector.
//! A record is `prev: u32 LE | varint tdelta | varint payload len | payload`,
//! where `prev` is the offset of the same handle's previous record (0 for
//! none). Offset 0 holds a sentinel byte so that no record can start there.

use std::num::NonZeroU32;

use fst_common::varint::{read_varint, write_varint};
use fst_common::CodecError;

/// Byte placed at offset 0 so record offsets are never zero.
const SENTINEL: u8 = b'!';

/// Location of one record in a [`ChainArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordId(NonZeroU32);

impl RecordId {
    fn offset(self) -> usize {
        self.0.get() as usize
    }
}

/// One decoded arena record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record<'a> {
    /// Time-table index delta since the handle's previous record.
    pub tdelta: u64,
    /// Raw value bytes as emitted.
    pub payload: &'a [u8],
}

/// Append-only record storage shared by every handle of the open block.
#[derive(Debug)]
pub struct ChainArena {
    buf: Vec<u8>,
}

impl Default for ChainArena {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainArena {
    /// Creates an arena holding only the sentinel byte.
    pub fn new() -> Self {
        Self { buf: vec![SENTINEL] }
    }

    /// Bytes in use, sentinel included.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when no record has been appended to this arena.
    pub fn is_empty(&self) -> bool {
        self.buf.len() <= 1
    }

    /// Appends a record linked to `prev` and returns its id.
    ///
    /// Fails once record offsets no longer fit in 32 bits.
    pub fn push(
        &mut self,
        prev: Option<RecordId>,
        tdelta: u64,
        payload: &[u8],
    ) -> Result<RecordId, CodecError> {
        let offset = u32::try_from(self.buf.len()).map_err(|_| CodecError::LengthMismatch {
            what: "value-change arena",
            expected: u32::MAX as usize,
            actual: self.buf.len(),
        })?;
        let prev = prev.map_or(0, |p| p.0.get());
        self.buf.extend_from_slice(&prev.to_le_bytes());
        write_varint(&mut self.buf, tdelta);
        write_varint(&mut self.buf, payload.len() as u64);
        self.buf.extend_from_slice(payload);
        // offset >= 1 because the sentinel occupies byte 0.
        NonZeroU32::new(offset)
            .map(RecordId)
            .ok_or(CodecError::Truncated {
                what: "value-change arena",
                offset: 0,
            })
    }

    /// Decodes the record at `id`, returning it and its predecessor.
    pub fn get(&self, id: RecordId) -> Result<(Record<'_>, Option<RecordId>), CodecError> {
        let mut pos = id.offset();
        let link = self
            .buf
            .get(pos..pos + 4)
            .ok_or(CodecError::Truncated {
                what: "arena link",
                offset: pos,
            })?;
        let prev = u32::from_le_bytes([link[0], link[1], link[2], link[3]]);
        pos += 4;
        let (tdelta, n) = read_varint(&self.buf, pos)?;
        pos += n;
        let (len, n) = read_varint(&self.buf, pos)?;
        pos += n;
        let payload = self
            .buf
            .get(pos..pos + len as usize)
            .ok_or(CodecError::Truncated {
                what: "arena payload",
                offset: pos,
            })?;
        Ok((Record { tdelta, payload }, NonZeroU32::new(prev).map(RecordId)))
    }

    /// Walks a chain from its newest record back to its oldest.
    pub fn walk(&self, head: Option<RecordId>) -> ChainWalk<'_> {
        ChainWalk {
            arena: self,
            next: head,
        }
    }
}

/// Iterator over one handle's records, newest first.
pub struct ChainWalk<'a> {
    arena: &'a ChainArena,
    next: Option<RecordId>,
}

impl<'a> Iterator for ChainWalk<'a> {
    type Item = Result<Record<'a>, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        match self.arena.get(id) {
            Ok((record, prev)) => {
                self.next = prev;
                Some(Ok(record))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_arena_is_empty() {
        let arena = ChainArena::new();
        assert!(arena.is_empty());
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn walk_is_newest_first() {
        let mut arena = ChainArena::new();
        let a = arena.push(None, 0, b"0").unwrap();
        let b = arena.push(Some(a), 2, b"1").unwrap();
        let c = arena.push(Some(b), 1, b"x").unwrap();

        let records: Vec<_> = arena.walk(Some(c)).collect::<Result<_, _>>().unwrap();
        let payloads: Vec<&[u8]> = records.iter().map(|r| r.payload).collect();
        assert_eq!(payloads, vec![&b"x"[..], b"1", b"0"]);
        assert_eq!(records[1].tdelta, 2);
    }

    #[test]
    fn interleaved_chains_stay_separate() {
        let mut arena = ChainArena::new();
        let a1 = arena.push(None, 0, b"0011").unwrap();
        let b1 = arena.push(None, 0, b"zz").unwrap();
        let a2 = arena.push(Some(a1), 1, b"1100").unwrap();

        let a: Vec<_> = arena.walk(Some(a2)).map(|r| r.unwrap().payload).collect();
        let b: Vec<_> = arena.walk(Some(b1)).map(|r| r.unwrap().payload).collect();
        assert_eq!(a, vec![&b"1100"[..], b"0011"]);
        assert_eq!(b, vec![&b"zz"[..]]);
    }

    #[test]
    fn taken_arena_starts_over() {
        let mut arena = ChainArena::new();
        arena.push(None, 0, b"1").unwrap();
        assert!(!arena.is_empty());
        let old = std::mem::take(&mut arena);
        assert!(!old.is_empty());
        assert!(arena.is_empty());
        assert_eq!(arena.walk(None).count(), 0);
    }
}
