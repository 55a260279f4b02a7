//! Tables keyed by module-local result `<id>`s.

use alloc::collections::BTreeMap;
use core::fmt;

use crate::error::ErrorKind;

/// Which namespace a table (or a failed lookup) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Type,
    Constant,
    SpecConstant,
    GlobalVariable,
    Function,
    Value,
    Block,
    Name,
    DebugString,
    ExtInstSet,
    Undef,
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IdKind::Type => "type",
            IdKind::Constant => "constant",
            IdKind::SpecConstant => "spec constant",
            IdKind::GlobalVariable => "global variable",
            IdKind::Function => "function",
            IdKind::Value => "value",
            IdKind::Block => "block",
            IdKind::Name => "name",
            IdKind::DebugString => "debug string",
            IdKind::ExtInstSet => "extended instruction set",
            IdKind::Undef => "undef",
        })
    }
}

/// Write-once map from `<id>` to `V`.
///
/// A second `define` for the same `<id>` fails instead of overwriting.
/// `lookup` reports absence as `None` so callers can tell a forward
/// reference from a malformed one.
#[derive(Debug, Clone)]
pub struct IdTable<V> {
    kind: IdKind,
    entries: BTreeMap<u32, V>,
}

impl<V> IdTable<V> {
    pub fn new(kind: IdKind) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> IdKind {
        self.kind
    }

    pub fn define(&mut self, id: u32, value: V) -> Result<(), ErrorKind> {
        match self.entries.entry(id) {
            alloc::collections::btree_map::Entry::Occupied(_) => Err(ErrorKind::DuplicateDefinition {
                table: self.kind,
                id,
            }),
            alloc::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    pub fn lookup(&self, id: u32) -> Option<&V> {
        self.entries.get(&id)
    }

    pub fn lookup_mut(&mut self, id: u32) -> Option<&mut V> {
        self.entries.get_mut(&id)
    }

    /// Look up an `<id>` that must already be defined
    pub fn require(&self, id: u32) -> Result<&V, ErrorKind> {
        self.entries.get(&id).ok_or(ErrorKind::UndefinedReference {
            kind: self.kind,
            id,
        })
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    /// Drop an entry, so the `<id>` can be defined again
    pub fn remove(&mut self, id: u32) -> Option<V> {
        self.entries.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &V)> {
        self.entries.iter().map(|(id, v)| (*id, v))
    }
}

impl<V: Copy> IdTable<V> {
    pub fn get(&self, id: u32) -> Option<V> {
        self.entries.get(&id).copied()
    }
}
