//! Entity-indexed tables.
//!
//! A `PrimaryMap` allocates entities: pushing data hands out the next key.
//! A `SecondaryMap` attaches extra data to entities allocated elsewhere and
//! grows on demand, so the layout can track blocks and instructions that the
//! function or the DFG created. Neither map ever frees a key; erased IR
//! objects are unlinked from the layout and their slots left behind.

use alloc::vec::Vec;
use core::{
    marker::PhantomData,
    ops::{Index, IndexMut},
};

use crate::entity::EntityRef;

/// Owning table; the only place keys of type `K` come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryMap<K: EntityRef, V> {
    elems: Vec<V>,
    unused: PhantomData<K>,
}

impl<K: EntityRef, V> PrimaryMap<K, V> {
    pub fn new() -> Self {
        Self {
            elems: Vec::new(),
            unused: PhantomData,
        }
    }

    /// Store `value` under a fresh key
    pub fn push(&mut self, value: V) -> K {
        let key = self.next_key();
        self.elems.push(value);
        key
    }

    /// Key the next `push` hands out
    pub fn next_key(&self) -> K {
        K::from_index(self.elems.len())
    }

    pub fn get(&self, key: K) -> Option<&V> {
        self.elems.get(key.index())
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.elems.get_mut(key.index())
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// `(key, value)` pairs in allocation order
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> {
        self.elems
            .iter()
            .enumerate()
            .map(|(index, value)| (K::from_index(index), value))
    }
}

impl<K: EntityRef, V> Default for PrimaryMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EntityRef, V> Index<K> for PrimaryMap<K, V> {
    type Output = V;

    fn index(&self, key: K) -> &V {
        &self.elems[key.index()]
    }
}

impl<K: EntityRef, V> IndexMut<K> for PrimaryMap<K, V> {
    fn index_mut(&mut self, key: K) -> &mut V {
        &mut self.elems[key.index()]
    }
}

/// Side table keyed by entities of another map
///
/// Reading a key that was never written yields the default value; writing
/// through `IndexMut` grows the table up to that key.
#[derive(Debug, Clone)]
pub struct SecondaryMap<K: EntityRef, V: Clone + Default> {
    elems: Vec<V>,
    default: V,
    unused: PhantomData<K>,
}

impl<K: EntityRef, V: Clone + Default> SecondaryMap<K, V> {
    pub fn new() -> Self {
        Self {
            elems: Vec::new(),
            default: V::default(),
            unused: PhantomData,
        }
    }

    /// Entry for `key`, none if it was never written or ensured
    pub fn get(&self, key: K) -> Option<&V> {
        self.elems.get(key.index())
    }

    /// Make room for `key`, leaving it at the default value
    pub fn ensure(&mut self, key: K) {
        if key.index() >= self.elems.len() {
            self.elems.resize(key.index() + 1, self.default.clone());
        }
    }

    pub fn contains(&self, key: K) -> bool {
        key.index() < self.elems.len()
    }
}

impl<K: EntityRef, V: Clone + Default> Default for SecondaryMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EntityRef, V: Clone + Default> Index<K> for SecondaryMap<K, V> {
    type Output = V;

    fn index(&self, key: K) -> &V {
        self.elems.get(key.index()).unwrap_or(&self.default)
    }
}

impl<K: EntityRef, V: Clone + Default> IndexMut<K> for SecondaryMap<K, V> {
    fn index_mut(&mut self, key: K) -> &mut V {
        self.ensure(key);
        &mut self.elems[key.index()]
    }
}
