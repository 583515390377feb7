//! # Memory Management
//!
//! Reusable allocations for hot paths.
//!
//! Structural world operations need short-lived buffers (the set of
//! component ids being added, for instance). Those buffers come from an
//! [`ObjectPool`] and go back to it, so steady-state ticks do not allocate.

mod pool;

pub use pool::ObjectPool;
