//! Hierarchy traversal with handle assignment, and the scope name stack.

use fst_common::{Handle, HierRecord, ScopeType, VarDir, VarType};

use crate::error::ReaderError;

/// One hierarchy entry as seen by a reader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HierEntry {
    /// A scope opens.
    Scope {
        /// Scope kind.
        kind: ScopeType,
        /// Instance name.
        name: String,
        /// Component name, possibly empty.
        component: String,
    },
    /// The innermost scope closes.
    Upscope,
    /// A variable declaration.
    Var {
        /// Declared type.
        var_type: VarType,
        /// Port direction.
        direction: VarDir,
        /// Leaf name.
        name: String,
        /// Declared width; ports report `(len - 2) / 3`.
        width: u32,
        /// Handle carrying the variable's values.
        handle: Handle,
        /// True when `handle` belongs to an earlier declaration.
        is_alias: bool,
    },
}

/// Walks hierarchy records, numbering new variables as the writer did.
#[derive(Debug, Default)]
pub struct HierCursor {
    pos: usize,
    next_handle: u32,
}

impl HierCursor {
    /// Returns to the first record.
    pub fn rewind(&mut self) {
        *self = Self::default();
    }

    /// Decodes the next entry of `data`, or `None` at the end.
    pub fn next_entry(&mut self, data: &[u8]) -> Result<Option<HierEntry>, ReaderError> {
        if self.pos >= data.len() {
            return Ok(None);
        }
        let (record, len) = HierRecord::decode(data, self.pos)?;
        self.pos += len;
        Ok(Some(self.entry(record)))
    }

    fn entry(&mut self, record: HierRecord) -> HierEntry {
        match record {
            HierRecord::Scope {
                kind,
                name,
                component,
            } => HierEntry::Scope {
                kind,
                name,
                component,
            },
            HierRecord::Upscope => HierEntry::Upscope,
            HierRecord::Var {
                var_type,
                direction,
                name,
                len,
                alias,
            } => {
                let (handle, is_alias) = if alias == 0 {
                    self.next_handle += 1;
                    (Handle::from_raw(self.next_handle), false)
                } else {
                    (Handle::from_raw(alias), true)
                };
                let width = if var_type == VarType::Port {
                    len.saturating_sub(2) / 3
                } else {
                    len
                };
                HierEntry::Var {
                    var_type,
                    direction,
                    name,
                    width,
                    handle,
                    is_alias,
                }
            }
        }
    }
}

/// Stack of open scope names, joined into dotted paths.
#[derive(Clone, Debug, Default)]
pub struct ScopeStack {
    path: String,
    marks: Vec<usize>,
}

impl ScopeStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters `name` and returns the new full path.
    pub fn push(&mut self, name: &str) -> &str {
        self.marks.push(self.path.len());
        if !self.path.is_empty() {
            self.path.push('.');
        }
        self.path.push_str(name);
        &self.path
    }

    /// Leaves the innermost scope and returns the remaining path, or `None`
    /// when the stack was already empty.
    pub fn pop(&mut self) -> Option<&str> {
        let mark = self.marks.pop()?;
        self.path.truncate(mark);
        Some(&self.path)
    }

    /// Empties the stack.
    pub fn reset(&mut self) {
        self.path.clear();
        self.marks.clear();
    }

    /// Current dotted path; empty at the top level.
    pub fn current(&self) -> &str {
        &self.path
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.marks.len()
    }

    /// Full name of `leaf` in the current scope.
    pub fn flat_name(&self, leaf: &str) -> String {
        if self.path.is_empty() {
            leaf.to_string()
        } else {
            format!("{}.{leaf}", self.path)
        }
    }
}
