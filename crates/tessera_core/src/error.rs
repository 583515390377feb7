//! # ECS Error Types
//!
//! All errors that can occur while mutating or driving a [`World`](crate::World).
//!
//! Every variant is a precondition violation: the operation that returned it
//! applied nothing.

use thiserror::Error;

use crate::ecs::Entity;

/// Errors that can occur in the entity-component store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The entity was never spawned in this world or has been despawned.
    #[error("entity {0} does not exist")]
    EntityNotFound(Entity),

    /// A component was explicitly registered twice in the same world.
    #[error("component {0} is already registered")]
    DuplicateComponent(String),

    /// A resource was requested but no value is installed.
    #[error("resource {0} is not registered in this world")]
    ResourceNotRegistered(String),

    /// Tried to disable a system that was never registered.
    #[error("system {0} is not registered")]
    SystemNotRegistered(String),

    /// A system callback tried to run itself while already running.
    #[error("system {0} is already running")]
    SystemReentered(String),

    /// A system parameter was accessed with the wrong kind or type.
    #[error("system parameter {index} is not {expected}")]
    ParamMismatch {
        /// Position of the parameter in the declaration order.
        index: usize,
        /// What the caller asked for.
        expected: &'static str,
    },

    /// A mutable query requested the same component more than once.
    #[error("component {0} is requested more than once by a mutable query")]
    ConflictingAccess(String),

    /// Every entity id has been handed out.
    #[error("entity id space exhausted")]
    EntityIdsExhausted,

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;
