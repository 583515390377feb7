//! # Component Definitions
//!
//! A component is identified by a [`ComponentId`], not by its Rust type:
//! two definitions over the same `T`, or with the same name, are different
//! components and never satisfy each other's query filters.
//!
//! ```rust
//! use tessera_core::{component, World};
//!
//! #[derive(Debug, PartialEq)]
//! struct Velocity(f32);
//!
//! let velocity = component::<Velocity>("Velocity");
//!
//! let mut world = World::new();
//! let entity = world.spawn(velocity.with(Velocity(1.0))).unwrap();
//! assert_eq!(world.get(entity, &velocity).unwrap(), Some(&Velocity(1.0)));
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::archetype::Archetype;
use super::registry;
use super::storage::new_column;

/// Process-unique identity of a component.
///
/// Ids are allocated from a single counter and never reused. Ordering
/// follows allocation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ComponentId(u32);

impl ComponentId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or_else(|_| panic!("component id space exhausted")))
    }

    /// Returns the registry index of this id.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the display name given at definition time, if any.
    #[must_use]
    pub fn name(self) -> Option<Arc<str>> {
        registry::component_name(self)
    }

    /// Returns the Rust type stored under this id.
    #[must_use]
    pub fn type_name(self) -> &'static str {
        registry::component_type_name(self)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "<unnamed #{}>", self.0),
        }
    }
}

/// Typed handle for a component.
///
/// Definitions are cheap to copy and are usually stored in a `static` or a
/// struct built once at startup. They double as query filters.
pub struct ComponentDefinition<T> {
    id: ComponentId,
    _marker: PhantomData<fn() -> T>,
}

/// Defines a new named component.
///
/// Every call allocates a new id; calling it twice with the same name yields
/// two unrelated components.
#[must_use]
pub fn component<T: 'static>(name: &str) -> ComponentDefinition<T> {
    ComponentDefinition::new(Some(name))
}

impl<T: 'static> ComponentDefinition<T> {
    fn new(name: Option<&str>) -> Self {
        let id = registry::allocate_component(name, std::any::type_name::<T>(), new_column::<T>);
        tracing::debug!(component = id.index(), name, "defined component");
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// Defines a new component without a display name.
    #[must_use]
    pub fn unnamed() -> Self {
        Self::new(None)
    }

    /// Pairs a value with this component, ready to be spawned or inserted.
    #[inline]
    #[must_use]
    pub fn with(&self, data: T) -> Insertion<T> {
        Insertion { id: self.id, data }
    }
}

impl<T> ComponentDefinition<T> {
    /// Returns the component id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ComponentId {
        self.id
    }
}

impl<T> Clone for ComponentDefinition<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ComponentDefinition<T> {}

impl<T> fmt::Debug for ComponentDefinition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentDefinition").field(&self.id).finish()
    }
}

/// A component value waiting to be stored on an entity.
#[derive(Debug)]
pub struct Insertion<T> {
    id: ComponentId,
    data: T,
}

impl<T> Insertion<T> {
    /// Returns the id of the component being inserted.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ComponentId {
        self.id
    }

    /// Unwraps the value.
    #[inline]
    pub fn into_inner(self) -> T {
        self.data
    }
}

/// A group of insertions applied together by `spawn` or `insert`.
///
/// Implemented for a single [`Insertion`], for tuples of up to eight
/// bundles, and for `()` (no components).
pub trait Bundle {
    /// Appends the ids of every component in the bundle.
    fn component_ids(&self, out: &mut Vec<ComponentId>);

    /// Writes every value into `row`. A row equal to the column length is
    /// appended; anything lower is overwritten.
    fn write(self, archetype: &mut Archetype, row: usize);
}

impl<T: 'static> Bundle for Insertion<T> {
    #[inline]
    fn component_ids(&self, out: &mut Vec<ComponentId>) {
        out.push(self.id);
    }

    #[inline]
    fn write(self, archetype: &mut Archetype, row: usize) {
        archetype.write(self.id, row, self.data);
    }
}

impl Bundle for () {
    fn component_ids(&self, _out: &mut Vec<ComponentId>) {}

    fn write(self, _archetype: &mut Archetype, _row: usize) {}
}

macro_rules! impl_bundle_tuple {
    ($($B:ident),+) => {
        impl<$($B: Bundle),+> Bundle for ($($B,)+) {
            #[allow(non_snake_case)]
            fn component_ids(&self, out: &mut Vec<ComponentId>) {
                let ($($B,)+) = self;
                $($B.component_ids(out);)+
            }

            #[allow(non_snake_case)]
            fn write(self, archetype: &mut Archetype, row: usize) {
                let ($($B,)+) = self;
                $($B.write(archetype, row);)+
            }
        }
    };
}

impl_bundle_tuple!(A);
impl_bundle_tuple!(A, B);
impl_bundle_tuple!(A, B, C);
impl_bundle_tuple!(A, B, C, D);
impl_bundle_tuple!(A, B, C, D, E);
impl_bundle_tuple!(A, B, C, D, E, F);
impl_bundle_tuple!(A, B, C, D, E, F, G);
impl_bundle_tuple!(A, B, C, D, E, F, G, H);
