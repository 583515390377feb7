//! # Tessera Core
//!
//! Archetype-based entity-component store for fixed-step simulations:
//! - Components attached and detached at runtime, per entity
//! - Cache-friendly, column-wise iteration over matching entities
//! - Systems with injected queries and resources, run once per tick
//!
//! ## Architecture Rules
//!
//! 1. **Identity over type** - a component is its definition, not its Rust type
//! 2. **Data-oriented design** - components are stored in contiguous arrays
//! 3. **No hidden failure** - precondition violations are returned as [`EcsError`]
//!
//! ## Example
//!
//! ```rust
//! use tessera_core::{component, system, ComponentDefinition, World};
//!
//! let position = component::<f32>("Position");
//! let velocity = component::<f32>("Velocity");
//!
//! let movement = system()
//!     .named("movement")
//!     .query((position, velocity))
//!     .build(|world, params| {
//!         params
//!             .query::<(ComponentDefinition<f32>, ComponentDefinition<f32>)>(0)?
//!             .for_each_mut(world, |(p, v)| *p += *v)
//!     });
//!
//! let mut world = World::new().with_system(movement);
//! let e = world.spawn((position.with(0.0), velocity.with(2.0))).unwrap();
//! world.execute().unwrap();
//! world.execute().unwrap();
//! assert_eq!(world.get(e, &position).unwrap(), Some(&4.0));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod memory;
pub mod timer;

pub use config::WorldConfig;
pub use ecs::{
    component, resource, system, Archetype, ArchetypeId, Bundle, ComponentDefinition,
    ComponentId, Diagnostics, Edge, Entity, EntityFilter, EntityMeta, Insertion, Query,
    QueryFilter, ResourceDefinition, System, SystemBuilder, SystemParams, World, ENTITY,
};
pub use error::{EcsError, EcsResult};
pub use memory::ObjectPool;
pub use timer::{TickScheduler, TimerId};
