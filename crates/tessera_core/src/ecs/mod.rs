//! # Entity Component System
//!
//! An archetype-based store: entities with the same component set share
//! one table of dense columns, and a graph of add/remove edges between
//! tables makes structural changes a lookup.
//!
//! ## Design Philosophy
//!
//! - Components are identified by definition, not by Rust type
//! - Components are stored in dense arrays for cache efficiency
//! - Entity ids are never reused
//! - Archetypes are created lazily and kept forever

pub mod archetype;
mod component;
mod diagnostics;
mod entity;
mod query;
mod registry;
mod resource;
mod storage;
mod system;
mod world;

pub use archetype::{single_diff, Archetype, ArchetypeId, Edge};
pub use component::{component, Bundle, ComponentDefinition, ComponentId, Insertion};
pub use diagnostics::Diagnostics;
pub use entity::{Entity, EntityMeta};
pub use query::{EntityFilter, Query, QueryFilter, QueryIter, ENTITY};
pub use resource::{resource, ResourceDefinition, ResourceId, ResourceValue};
pub use system::{system, System, SystemBuilder, SystemId, SystemParams};
pub use world::{World, WorldId};
