//! Per-signal storage layout, from the geometry block or a hierarchy replay.

use fst_common::block::GEOM_VARLEN;
use fst_common::pack::zlib_section;
use fst_common::varint::{read_u64_be, read_varint};
use fst_common::{HierRecord, HierRecords, SignalKind, VarType};

use crate::error::ReaderError;

/// Storage class and frame position of every signal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Geometry {
    kinds: Vec<SignalKind>,
    lens: Vec<u32>,
    offsets: Vec<usize>,
    frame_len: usize,
}

impl Geometry {
    /// Decodes a geometry block, tag included.
    pub fn from_block(block: &[u8]) -> Result<Self, ReaderError> {
        let seclen = read_u64_be(block, 1)? as usize;
        let uncompressed = read_u64_be(block, 9)? as usize;
        let max_handle = read_u64_be(block, 17)?;
        let stored = block.get(25..1 + seclen).unwrap_or_default();
        let raw = zlib_section(stored, uncompressed, "geometry")?;

        let mut geometry = Self::default();
        let mut pos = 0;
        for _ in 0..max_handle {
            let (code, n) = read_varint(&raw, pos)?;
            pos += n;
            match code {
                0 => geometry.push(SignalKind::Real, 8),
                GEOM_VARLEN => geometry.push(SignalKind::VarLen, 0),
                width => geometry.push(SignalKind::Bits, width as u32),
            }
        }
        Ok(geometry)
    }

    /// Rebuilds the layout from variable declarations, skipping aliases.
    pub fn from_hierarchy(records: &[u8]) -> Result<Self, ReaderError> {
        let mut geometry = Self::default();
        for record in HierRecords::new(records) {
            if let HierRecord::Var {
                var_type,
                len,
                alias: 0,
                ..
            } = record?
            {
                let (kind, len) = kind_of(var_type, len);
                geometry.push(kind, len);
            }
        }
        Ok(geometry)
    }

    fn push(&mut self, kind: SignalKind, len: u32) {
        self.kinds.push(kind);
        self.lens.push(len);
        self.offsets.push(self.frame_len);
        self.frame_len += len as usize;
    }

    /// Number of signals.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// True when no signal is described.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Storage class of the signal at `index` (0-based).
    pub fn kind(&self, index: usize) -> SignalKind {
        self.kinds[index]
    }

    /// Stored length: bit count, 8 for reals, 0 for variable length.
    pub fn storage_len(&self, index: usize) -> usize {
        self.lens[index] as usize
    }

    /// Offset of the signal's bytes within a frame.
    pub fn frame_offset(&self, index: usize) -> usize {
        self.offsets[index]
    }
}

/// Storage class for a declaration, as the writer assigns it.
pub fn kind_of(var_type: VarType, len: u32) -> (SignalKind, u32) {
    if var_type.is_real() {
        (SignalKind::Real, 8)
    } else if var_type == VarType::GenString || len == 0 {
        (SignalKind::VarLen, 0)
    } else {
        (SignalKind::Bits, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fst_common::varint::{write_u64_be, write_varint};
    use fst_common::VarDir;

    fn geometry_bytes(codes: &[u64]) -> Vec<u8> {
        let mut raw = Vec::new();
        for &c in codes {
            write_varint(&mut raw, c);
        }
        let mut block = vec![3];
        write_u64_be(&mut block, raw.len() as u64 + 24);
        write_u64_be(&mut block, raw.len() as u64);
        write_u64_be(&mut block, codes.len() as u64);
        block.extend_from_slice(&raw);
        block
    }

    #[test]
    fn decodes_codes_into_layout() {
        let geometry = Geometry::from_block(&geometry_bytes(&[1, 0, GEOM_VARLEN, 16])).unwrap();
        assert_eq!(geometry.len(), 4);
        assert_eq!(geometry.kind(1), SignalKind::Real);
        assert_eq!(geometry.kind(2), SignalKind::VarLen);
        assert_eq!(geometry.storage_len(3), 16);
        assert_eq!(geometry.frame_offset(3), 9);
    }

    #[test]
    fn hierarchy_replay_skips_aliases() {
        let mut records = Vec::new();
        let var = |var_type, len, alias| HierRecord::Var {
            var_type,
            direction: VarDir::Implicit,
            name: "v".to_string(),
            len,
            alias,
        };
        var(VarType::Wire, 4, 0).encode(&mut records);
        var(VarType::Wire, 4, 1).encode(&mut records);
        var(VarType::Real, 8, 0).encode(&mut records);
        var(VarType::GenString, 0, 0).encode(&mut records);

        let from_hier = Geometry::from_hierarchy(&records).unwrap();
        let from_block = Geometry::from_block(&geometry_bytes(&[4, 0, GEOM_VARLEN])).unwrap();
        assert_eq!(from_hier, from_block);
    }
}
