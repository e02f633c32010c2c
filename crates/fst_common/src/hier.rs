//! Hierarchy records: scope opens, scope closes and variable declarations.
//!
//! Records are a flat byte stream with no framing of their own:
//! - scope: `0xFE`, scope type, name `\0`, component `\0`
//! - upscope: `0xFF`
//! - variable: var type, direction, name `\0`, varint length, varint alias

use crate::error::CodecError;
use crate::types::{ScopeType, VarDir, VarType};
use crate::varint::{read_varint, write_varint};

/// Tag byte opening a scope.
pub const TAG_SCOPE: u8 = 0xFE;
/// Tag byte closing a scope.
pub const TAG_UPSCOPE: u8 = 0xFF;

/// One hierarchy record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HierRecord {
    /// Opens a scope.
    Scope {
        /// Scope kind.
        kind: ScopeType,
        /// Scope instance name.
        name: String,
        /// Component (definition) name, possibly empty.
        component: String,
    },
    /// Closes the innermost open scope.
    Upscope,
    /// Declares a variable.
    Var {
        /// Declared type.
        var_type: VarType,
        /// Port direction.
        direction: VarDir,
        /// Leaf name.
        name: String,
        /// Stored length: bit width, 8 for reals, 0 for variable length.
        len: u32,
        /// Handle this declaration aliases, or 0 for a new handle.
        alias: u32,
    },
}

impl HierRecord {
    /// Appends the encoded record to `out`, returning the bytes written.
    pub fn encode(&self, out: &mut Vec<u8>) -> usize {
        let start = out.len();
        match self {
            Self::Scope {
                kind,
                name,
                component,
            } => {
                out.push(TAG_SCOPE);
                out.push(kind.as_u8());
                push_cstr(out, name);
                push_cstr(out, component);
            }
            Self::Upscope => out.push(TAG_UPSCOPE),
            Self::Var {
                var_type,
                direction,
                name,
                len,
                alias,
            } => {
                out.push(var_type.as_u8());
                out.push(direction.as_u8());
                push_cstr(out, name);
                write_varint(out, u64::from(*len));
                write_varint(out, u64::from(*alias));
            }
        }
        out.len() - start
    }

    /// Decodes the record starting at `pos`, returning it and its length.
    pub fn decode(data: &[u8], pos: usize) -> Result<(Self, usize), CodecError> {
        let tag = *data.get(pos).ok_or(CodecError::Truncated {
            what: "hierarchy tag",
            offset: pos,
        })?;
        let mut cur = pos + 1;
        let record = match tag {
            TAG_SCOPE => {
                let kind = ScopeType::from_u8(byte_at(data, cur)?).unwrap_or(ScopeType::Module);
                cur += 1;
                let name = read_cstr(data, &mut cur)?;
                let component = read_cstr(data, &mut cur)?;
                Self::Scope {
                    kind,
                    name,
                    component,
                }
            }
            TAG_UPSCOPE => Self::Upscope,
            other => {
                let var_type = VarType::from_u8(other)
                    .ok_or(CodecError::UnknownHierTag { tag: other, offset: pos })?;
                let direction = VarDir::from_u8(byte_at(data, cur)?).unwrap_or(VarDir::Implicit);
                cur += 1;
                let name = read_cstr(data, &mut cur)?;
                let (len, n) = read_varint(data, cur)?;
                cur += n;
                let (alias, n) = read_varint(data, cur)?;
                cur += n;
                Self::Var {
                    var_type,
                    direction,
                    name,
                    len: len as u32,
                    alias: alias as u32,
                }
            }
        };
        Ok((record, cur - pos))
    }
}

fn push_cstr(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
    out.push(0);
}

fn byte_at(data: &[u8], pos: usize) -> Result<u8, CodecError> {
    data.get(pos).copied().ok_or(CodecError::Truncated {
        what: "hierarchy record",
        offset: pos,
    })
}

fn read_cstr(data: &[u8], pos: &mut usize) -> Result<String, CodecError> {
    let tail = data.get(*pos..).unwrap_or_default();
    let end = tail.iter().position(|&b| b == 0).ok_or(CodecError::Truncated {
        what: "hierarchy name",
        offset: *pos,
    })?;
    let s = String::from_utf8_lossy(&tail[..end]).into_owned();
    *pos += end + 1;
    Ok(s)
}

/// Iterator over the records of a hierarchy byte stream.
pub struct HierRecords<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> HierRecords<'a> {
    /// Iterates over `data` from its first byte.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Byte offset of the next record.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl Iterator for HierRecords<'_> {
    type Item = Result<HierRecord, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.data.len() {
            return None;
        }
        match HierRecord::decode(self.data, self.pos) {
            Ok((record, len)) => {
                self.pos += len;
                Some(Ok(record))
            }
            Err(e) => {
                self.pos = self.data.len();
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<HierRecord> {
        vec![
            HierRecord::Scope {
                kind: ScopeType::Module,
                name: "top".to_string(),
                component: "top_mod".to_string(),
            },
            HierRecord::Var {
                var_type: VarType::Wire,
                direction: VarDir::Input,
                name: "clk".to_string(),
                len: 1,
                alias: 0,
            },
            HierRecord::Var {
                var_type: VarType::Real,
                direction: VarDir::Implicit,
                name: "temp".to_string(),
                len: 8,
                alias: 0,
            },
            HierRecord::Var {
                var_type: VarType::Wire,
                direction: VarDir::Implicit,
                name: "clk_alias".to_string(),
                len: 1,
                alias: 1,
            },
            HierRecord::Upscope,
        ]
    }

    #[test]
    fn scope_encoding_bytes() {
        let mut buf = Vec::new();
        let n = HierRecord::Scope {
            kind: ScopeType::Task,
            name: "t".to_string(),
            component: String::new(),
        }
        .encode(&mut buf);
        assert_eq!(n, 5);
        assert_eq!(buf, vec![0xFE, 1, b't', 0, 0]);
    }

    #[test]
    fn var_encoding_bytes() {
        let mut buf = Vec::new();
        HierRecord::Var {
            var_type: VarType::Wire,
            direction: VarDir::Output,
            name: "q".to_string(),
            len: 300,
            alias: 0,
        }
        .encode(&mut buf);
        assert_eq!(buf, vec![16, 2, b'q', 0, 0xAC, 0x02, 0]);
    }

    #[test]
    fn stream_decodes_in_order() {
        let records = sample();
        let mut buf = Vec::new();
        for r in &records {
            r.encode(&mut buf);
        }
        let decoded: Vec<HierRecord> = HierRecords::new(&buf).collect::<Result<_, _>>().unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn unknown_tag_is_an_error() {
        let buf = vec![0x40, 0, b'a', 0, 1, 0];
        let mut iter = HierRecords::new(&buf);
        assert!(matches!(
            iter.next(),
            Some(Err(CodecError::UnknownHierTag { tag: 0x40, .. }))
        ));
        assert!(iter.next().is_none());
    }

    #[test]
    fn truncated_record_is_an_error() {
        let buf = vec![0xFE, 0, b't', b'o'];
        assert!(matches!(
            HierRecord::decode(&buf, 0),
            Err(CodecError::Truncated { .. })
        ));
    }
}
