//! Scoped insertion points.

use core::ops::{Deref, DerefMut};

use crate::builder::insert::InsertPoint;

/// Something with a current insertion point.
pub trait HasInsertPoint {
    fn insert_point(&self) -> InsertPoint;

    fn set_insert_point(&mut self, at: InsertPoint);
}

/// Restores the insertion point of the wrapped value when dropped.
///
/// The guard dereferences to the wrapped value, so code can move the
/// insertion point freely inside the scope; every exit path, including
/// early returns through `?`, puts it back.
pub struct InsertionGuard<'a, T: HasInsertPoint> {
    inner: &'a mut T,
    saved: InsertPoint,
}

impl<'a, T: HasInsertPoint> InsertionGuard<'a, T> {
    pub fn new(inner: &'a mut T) -> Self {
        let saved = inner.insert_point();
        Self { inner, saved }
    }
}

impl<T: HasInsertPoint> Deref for InsertionGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.inner
    }
}

impl<T: HasInsertPoint> DerefMut for InsertionGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.inner
    }
}

impl<T: HasInsertPoint> Drop for InsertionGuard<'_, T> {
    fn drop(&mut self) {
        self.inner.set_insert_point(self.saved);
    }
}
