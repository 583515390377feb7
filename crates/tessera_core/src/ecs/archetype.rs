//! # Archetype-based Entity Storage
//!
//! Entities with the same component set are stored together, one dense
//! column per component:
//!
//! ```text
//! Archetype [Position, Velocity]:
//!   entities:  [e3, e7, e9]
//!   Position:  [P3, P7, P9]
//!   Velocity:  [V3, V7, V9]
//! ```
//!
//! Row `i` of every column belongs to `entities[i]`, so iteration is a
//! linear walk.
//!
//! ## Edges
//!
//! Each archetype keeps, per known component, the archetype reached by
//! adding or removing that component. The edges form a lattice rooted at
//! the empty archetype:
//!
//! ```text
//!            {}
//!      +A  /    \  +B
//!        {A}    {B}
//!      +B  \    /  +A
//!           {A,B}
//! ```
//!
//! Adding a component to an entity is a single edge lookup once the graph
//! has been warmed up.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;

use super::component::ComponentId;
use super::entity::Entity;
use super::registry;
use super::storage::{typed, typed_mut, Column};

/// Index of an archetype inside its world.
///
/// Archetypes are never destroyed, so an id stays valid for the lifetime of
/// the world that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ArchetypeId(u32);

impl ArchetypeId {
    /// The empty archetype every world starts with.
    pub const ROOT: Self = Self(0);

    pub(crate) fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or_else(|_| panic!("archetype id space exhausted")))
    }

    /// Returns the arena index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Transition targets for one component.
///
/// `None` means the target archetype has not been created yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Edge {
    /// Archetype reached by adding the component.
    pub add: Option<ArchetypeId>,
    /// Archetype reached by removing the component.
    pub remove: Option<ArchetypeId>,
}

/// All entities sharing one exact component set.
pub struct Archetype {
    id: ArchetypeId,
    /// Sorted component ids; the identity of the archetype.
    signature: Box<[ComponentId]>,
    entities: Vec<Entity>,
    columns: HashMap<ComponentId, Box<dyn Column>>,
    /// In registration order, so traversals are deterministic.
    edges: IndexMap<ComponentId, Edge>,
}

impl Archetype {
    /// Creates an archetype with empty columns and an unconnected edge for
    /// every component in `registered`.
    pub(crate) fn new<'a>(
        id: ArchetypeId,
        mut signature: Vec<ComponentId>,
        registered: impl IntoIterator<Item = &'a ComponentId>,
        capacity: usize,
    ) -> Self {
        signature.sort_unstable();
        signature.dedup();

        let columns = signature
            .iter()
            .map(|&component| (component, registry::new_column(component, capacity)))
            .collect();
        let edges = registered
            .into_iter()
            .map(|&component| (component, Edge::default()))
            .collect();

        Self {
            id,
            signature: signature.into_boxed_slice(),
            entities: Vec::with_capacity(capacity),
            columns,
            edges,
        }
    }

    /// Returns the id of this archetype.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ArchetypeId {
        self.id
    }

    /// Returns the sorted component ids of this archetype.
    #[inline]
    #[must_use]
    pub fn signature(&self) -> &[ComponentId] {
        &self.signature
    }

    /// Returns the entities stored here, in row order.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Returns the number of rows.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Checks if the archetype holds no entities.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Checks if the archetype stores a component.
    #[inline]
    #[must_use]
    pub fn contains(&self, component: ComponentId) -> bool {
        self.signature.binary_search(&component).is_ok()
    }

    /// Checks if the archetype stores every listed component.
    #[must_use]
    pub fn contains_all(&self, components: &[ComponentId]) -> bool {
        components.iter().all(|&c| self.contains(c))
    }

    /// Returns the transition edge for a component known to this world.
    #[must_use]
    pub fn edge(&self, component: ComponentId) -> Option<Edge> {
        self.edges.get(&component).copied()
    }

    /// Iterates over every edge slot, connected or not.
    pub fn edges(&self) -> impl Iterator<Item = (ComponentId, Edge)> + '_ {
        self.edges.iter().map(|(&c, &e)| (c, e))
    }

    /// Returns the column of a component as a slice.
    ///
    /// `None` if the component is not part of this archetype.
    #[must_use]
    pub fn column<T: 'static>(&self, component: ComponentId) -> Option<&[T]> {
        self.columns
            .get(&component)
            .map(|column| typed::<T>(&**column).as_slice())
    }

    /// Returns the column of a component as a mutable slice.
    pub fn column_mut<T: 'static>(&mut self, component: ComponentId) -> Option<&mut [T]> {
        self.columns
            .get_mut(&component)
            .map(|column| typed_mut::<T>(&mut **column).as_mut_slice())
    }

    // ========================================================================
    // GRAPH MAINTENANCE
    // ========================================================================

    /// Adds an unconnected edge slot. Existing slots are left untouched.
    pub(crate) fn register_edge(&mut self, component: ComponentId) {
        self.edges.entry(component).or_default();
    }

    pub(crate) fn set_add_edge(&mut self, component: ComponentId, target: ArchetypeId) {
        self.edges.entry(component).or_default().add = Some(target);
    }

    pub(crate) fn set_remove_edge(&mut self, component: ComponentId, target: ArchetypeId) {
        self.edges.entry(component).or_default().remove = Some(target);
    }

    // ========================================================================
    // ROW OPERATIONS
    // ========================================================================

    /// Appends an entity and returns its row. Columns must be filled next.
    pub(crate) fn push_entity(&mut self, entity: Entity) -> usize {
        self.entities.push(entity);
        self.entities.len() - 1
    }

    /// Stores a value at `row`, appending if `row` is one past the end.
    pub(crate) fn write<T: 'static>(&mut self, component: ComponentId, row: usize, value: T) {
        let column = self
            .columns
            .get_mut(&component)
            .unwrap_or_else(|| panic!("archetype {} has no column for {component}", self.id));
        let column = typed_mut::<T>(&mut **column);
        if row == column.len() {
            column.push(value);
        } else {
            column[row] = value;
        }
    }

    /// Swap-removes `row` from the entity list and every column.
    ///
    /// Returns the entity that was moved into `row`, if any.
    pub(crate) fn swap_remove(&mut self, row: usize) -> Option<Entity> {
        self.entities.swap_remove(row);
        for column in self.columns.values_mut() {
            column.swap_remove(row);
        }
        self.entities.get(row).copied()
    }

    /// Moves the whole row to `dst`.
    ///
    /// Columns that `dst` does not have are dropped; columns only `dst` has
    /// are left for the caller to fill. Returns the new row in `dst` and the
    /// entity displaced into `row` here, if any.
    pub(crate) fn move_row(&mut self, row: usize, dst: &mut Self) -> (usize, Option<Entity>) {
        let entity = self.entities.swap_remove(row);
        let new_row = dst.push_entity(entity);

        for (component, column) in &mut self.columns {
            match dst.columns.get_mut(component) {
                Some(target) => column.move_row(row, &mut **target),
                None => column.swap_remove(row),
            }
        }

        (new_row, self.entities.get(row).copied())
    }

    /// Takes a column out so a mutable query can hold it alongside others.
    pub(crate) fn take_column<T: 'static>(&mut self, component: ComponentId) -> Box<Vec<T>> {
        let column = self
            .columns
            .remove(&component)
            .unwrap_or_else(|| panic!("archetype {} has no column for {component}", self.id));
        column.into_any().downcast::<Vec<T>>().unwrap_or_else(|_| {
            panic!(
                "column type mismatch: expected `{}`",
                std::any::type_name::<T>()
            )
        })
    }

    /// Puts back a column taken with [`take_column`](Self::take_column).
    pub(crate) fn restore_column<T: 'static>(&mut self, component: ComponentId, column: Box<Vec<T>>) {
        self.columns.insert(component, column);
    }

    /// Checks that every column is as long as the entity list.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        self.columns.values().all(|c| c.len() == self.entities.len())
    }
}

impl fmt::Debug for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archetype")
            .field("id", &self.id)
            .field("signature", &self.signature)
            .field("len", &self.entities.len())
            .finish_non_exhaustive()
    }
}

/// Returns the single element of `superset` missing from `subset`.
///
/// `None` unless `superset` is exactly `subset` plus one element. Both
/// slices must be sorted.
#[must_use]
pub fn single_diff(superset: &[ComponentId], subset: &[ComponentId]) -> Option<ComponentId> {
    if superset.len() != subset.len() + 1 {
        return None;
    }

    let mut extra = None;
    let mut rest = subset.iter().peekable();
    for &component in superset {
        if rest.peek() == Some(&&component) {
            rest.next();
        } else if extra.is_none() {
            extra = Some(component);
        } else {
            return None;
        }
    }

    if rest.next().is_some() {
        return None;
    }
    extra
}
