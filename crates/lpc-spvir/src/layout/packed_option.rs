//! Compact optional entity references for the layout's linked lists.

use core::marker::PhantomData;

use crate::entity::EntityRef;

const RESERVED: u32 = u32::MAX;

/// An `Option<T>` stored in a single `u32`, with `u32::MAX` meaning none.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PackedOption<T: EntityRef> {
    index: u32,
    _phantom: PhantomData<T>,
}

impl<T: EntityRef> PackedOption<T> {
    pub fn none() -> Self {
        Self {
            index: RESERVED,
            _phantom: PhantomData,
        }
    }

    pub fn some(entity: T) -> Self {
        debug_assert!(entity.index() < RESERVED as usize);
        Self {
            index: entity.index() as u32,
            _phantom: PhantomData,
        }
    }

    pub fn expand(self) -> Option<T> {
        (self.index != RESERVED).then(|| T::from_index(self.index as usize))
    }

    pub fn is_some(&self) -> bool {
        self.index != RESERVED
    }

    pub fn is_none(&self) -> bool {
        self.index == RESERVED
    }
}

impl<T: EntityRef> Default for PackedOption<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T: EntityRef> From<Option<T>> for PackedOption<T> {
    fn from(opt: Option<T>) -> Self {
        opt.map_or_else(Self::none, Self::some)
    }
}

impl<T: EntityRef> From<T> for PackedOption<T> {
    fn from(entity: T) -> Self {
        Self::some(entity)
    }
}
