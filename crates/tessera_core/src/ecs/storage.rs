//! # Component Storage
//!
//! Dense, type-erased component columns.
//!
//! An archetype only knows its component ids at runtime, so each column is a
//! `Box<dyn Column>`. The concrete type behind every column is a plain
//! `Vec<T>`: values of one component sit next to each other in memory and
//! iteration over a column is a linear walk.
//!
//! Typed access downcasts once per column (not once per row).

use std::any::Any;

/// A dense array holding one component value per archetype row.
pub trait Column: Any {
    /// Number of rows stored.
    fn len(&self) -> usize;

    /// Checks if the column holds no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes `row` by moving the last row into its place.
    fn swap_remove(&mut self, row: usize);

    /// Swap-removes `row` and appends the removed value to `dst`.
    ///
    /// `dst` must be a column of the same component.
    fn move_row(&mut self, row: usize, dst: &mut dyn Column);

    /// Upcast for typed access.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed access.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Owned upcast, used to take a column out of its archetype.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: 'static> Column for Vec<T> {
    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn swap_remove(&mut self, row: usize) {
        Vec::swap_remove(self, row);
    }

    fn move_row(&mut self, row: usize, dst: &mut dyn Column) {
        let value = Vec::swap_remove(self, row);
        typed_mut::<T>(dst).push(value);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Creates an empty column for `T`. Stored as a constructor in the registry.
pub(crate) fn new_column<T: 'static>(capacity: usize) -> Box<dyn Column> {
    Box::new(Vec::<T>::with_capacity(capacity))
}

/// Typed view of a column.
///
/// # Panics
///
/// Panics if the column does not store `T`. Component ids are bound to a
/// single Rust type at definition time, so this indicates a bug in the crate.
pub(crate) fn typed<T: 'static>(column: &dyn Column) -> &Vec<T> {
    column.as_any().downcast_ref::<Vec<T>>().unwrap_or_else(|| {
        panic!(
            "column type mismatch: expected `{}`",
            std::any::type_name::<T>()
        )
    })
}

/// Mutable typed view of a column. Same panics as [`typed`].
pub(crate) fn typed_mut<T: 'static>(column: &mut dyn Column) -> &mut Vec<T> {
    column.as_any_mut().downcast_mut::<Vec<T>>().unwrap_or_else(|| {
        panic!(
            "column type mismatch: expected `{}`",
            std::any::type_name::<T>()
        )
    })
}
