//! Entity reference system for type-safe entity IDs.
//!
//! Entities (Block, Inst, Region, Value, Type) are small copyable handles
//! into the arenas owned by a function or a type store. Keeping them as
//! distinct newtypes prevents mixing, say, a block index with an instruction
//! index.

use core::fmt;

/// Conversion between an entity and its slot in an entity map.
pub trait EntityRef: Copy + Eq + core::hash::Hash + fmt::Debug {
    fn index(self) -> usize;

    fn from_index(index: usize) -> Self;
}

/// Declares a `u32` newtype entity with a display prefix.
macro_rules! entity_impl {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Create a new entity with the given index
            pub fn new(index: u32) -> Self {
                $name(index)
            }

            /// Get the raw index of this entity
            pub fn as_u32(self) -> u32 {
                self.0
            }
        }

        impl $crate::entity::EntityRef for $name {
            fn index(self) -> usize {
                self.0 as usize
            }

            fn from_index(index: usize) -> Self {
                $name(index as u32)
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }
    };
}

pub(crate) use entity_impl;

entity_impl!(
    /// A basic block inside some region of a function.
    Block,
    "block"
);

entity_impl!(
    /// An instruction (operation) of a function.
    Inst,
    "inst"
);

entity_impl!(
    /// An ordered list of blocks, either a function body or a region nested
    /// inside a structured operation such as `spirv.mlir.selection`.
    Region,
    "region"
);
