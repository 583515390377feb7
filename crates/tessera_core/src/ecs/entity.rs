//! # Entity Management
//!
//! Entities are opaque, monotonically increasing identifiers. An id is
//! never handed out twice by the same world, so a stale id can only ever
//! fail with "entity does not exist"; it can never alias a newer entity.

use std::fmt;

use crate::error::{EcsError, EcsResult};

use super::archetype::ArchetypeId;

/// Unique identifier for an entity within a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Entity(u64);

impl Entity {
    /// Builds an entity id from its raw value.
    ///
    /// Useful for logging and tests; a fabricated id that the world never
    /// handed out simply does not exist.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an entity's data lives: which archetype, which row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityMeta {
    /// Archetype holding the entity.
    pub archetype: ArchetypeId,
    /// Row index within that archetype.
    pub row: usize,
}

/// Hands out entity ids in increasing order.
#[derive(Debug, Default)]
pub(crate) struct EntityAllocator {
    next: u64,
}

impl EntityAllocator {
    /// Allocates the next id.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityIdsExhausted`] once every `u64` has been used.
    pub(crate) fn allocate(&mut self) -> EcsResult<Entity> {
        let id = self.next;
        self.next = id.checked_add(1).ok_or(EcsError::EntityIdsExhausted)?;
        Ok(Entity(id))
    }

    /// Number of ids handed out so far.
    pub(crate) const fn allocated(&self) -> u64 {
        self.next
    }
}
