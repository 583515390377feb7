//! # Resources
//!
//! World-level singletons: time step, configuration, schedulers. At most one
//! value per resource id lives in a world.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::registry;

/// Process-unique identity of a resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ResourceId(u32);

impl ResourceId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or_else(|_| panic!("resource id space exhausted")))
    }

    /// Returns the registry index of this id.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the display name, `<resource-NN>` for unnamed resources.
    #[must_use]
    pub fn name(self) -> Arc<str> {
        registry::resource_name(self)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Typed handle for a resource.
pub struct ResourceDefinition<T> {
    id: ResourceId,
    _marker: PhantomData<fn() -> T>,
}

/// Defines a new named resource.
#[must_use]
pub fn resource<T: 'static>(name: &str) -> ResourceDefinition<T> {
    ResourceDefinition::new(Some(name))
}

impl<T: 'static> ResourceDefinition<T> {
    fn new(name: Option<&str>) -> Self {
        Self {
            id: registry::allocate_resource(name),
            _marker: PhantomData,
        }
    }

    /// Defines a new resource named after its allocation index.
    #[must_use]
    pub fn unnamed() -> Self {
        Self::new(None)
    }

    /// Pairs a value with this resource, for [`World::with_resource`](crate::World::with_resource).
    #[must_use]
    pub fn with(&self, value: T) -> ResourceValue<T> {
        ResourceValue { id: self.id, value }
    }
}

impl<T> ResourceDefinition<T> {
    /// Returns the resource id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ResourceId {
        self.id
    }
}

impl<T> Clone for ResourceDefinition<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ResourceDefinition<T> {}

impl<T> fmt::Debug for ResourceDefinition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceDefinition").field(&self.id).finish()
    }
}

/// A resource value waiting to be stored in a world.
#[derive(Debug)]
pub struct ResourceValue<T> {
    pub(crate) id: ResourceId,
    pub(crate) value: T,
}
