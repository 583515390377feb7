//! # Systems
//!
//! A system is a callback run once per tick by [`World::execute`], together
//! with a positional list of parameters it wants resolved first: queries
//! (refreshed against the world) and resources (checked for presence).
//!
//! ```rust
//! use tessera_core::{component, resource, system, ComponentDefinition, World};
//!
//! let velocity = component::<f32>("Velocity");
//! let gravity = resource::<f32>("Gravity");
//!
//! let fall = system()
//!     .named("fall")
//!     .query(velocity)
//!     .res(&gravity)
//!     .build(|world, params| {
//!         let g = *params.res::<f32>(world, 1)?;
//!         params
//!             .query::<ComponentDefinition<f32>>(0)?
//!             .for_each_mut(world, |v| *v -= g)
//!     });
//!
//! let mut world = World::new().with_resource(gravity.with(9.8)).with_system(fall);
//! let e = world.spawn(velocity.with(0.0)).unwrap();
//! world.execute().unwrap();
//! assert_eq!(world.get(e, &velocity).unwrap(), Some(&-9.8));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use super::query::{ErasedQuery, Query, QueryFilter};
use super::resource::{ResourceDefinition, ResourceId};
use super::world::World;
use crate::error::{EcsError, EcsResult};

/// Process-unique identity of a system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SystemId(u32);

static NEXT_SYSTEM: AtomicU32 = AtomicU32::new(0);

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Callback signature of every system.
pub(crate) type SystemFn = dyn FnMut(&mut World, &mut SystemParams) -> EcsResult<()>;

enum Param {
    Query(Box<dyn ErasedQuery>),
    Resource(ResourceId),
}

impl Clone for Param {
    fn clone(&self) -> Self {
        match self {
            Self::Query(query) => Self::Query(query.boxed_clone()),
            Self::Resource(id) => Self::Resource(*id),
        }
    }
}

/// Resolved parameters handed to a system callback.
#[derive(Clone, Default)]
pub struct SystemParams {
    params: Vec<Param>,
}

impl SystemParams {
    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Checks if the system declared no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns the query declared at position `index`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ParamMismatch`] if that parameter is not a query
    /// over `F`.
    pub fn query<F: QueryFilter>(&mut self, index: usize) -> EcsResult<&mut Query<F>> {
        let mismatch = EcsError::ParamMismatch {
            index,
            expected: std::any::type_name::<Query<F>>(),
        };
        match self.params.get_mut(index) {
            Some(Param::Query(query)) => query.as_any_mut().downcast_mut::<Query<F>>().ok_or(mismatch),
            _ => Err(mismatch),
        }
    }

    /// Returns the resource declared at position `index`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ParamMismatch`] if that parameter is not a
    /// resource of type `T`, or [`EcsError::ResourceNotRegistered`] if the
    /// resource was removed by an earlier call in the same tick.
    pub fn res<'w, T: 'static>(&self, world: &'w World, index: usize) -> EcsResult<&'w T> {
        let id = self.resource_id::<T>(index)?;
        world.res_by_id::<T>(id)?.ok_or_else(|| Self::mismatch::<T>(index))
    }

    /// Mutable variant of [`res`](Self::res).
    ///
    /// # Errors
    ///
    /// Same as [`res`](Self::res).
    pub fn res_mut<'w, T: 'static>(&self, world: &'w mut World, index: usize) -> EcsResult<&'w mut T> {
        let id = self.resource_id::<T>(index)?;
        world.res_mut_by_id::<T>(id)?.ok_or_else(|| Self::mismatch::<T>(index))
    }

    fn resource_id<T: 'static>(&self, index: usize) -> EcsResult<ResourceId> {
        match self.params.get(index) {
            Some(Param::Resource(id)) => Ok(*id),
            _ => Err(Self::mismatch::<T>(index)),
        }
    }

    fn mismatch<T: 'static>(index: usize) -> EcsError {
        EcsError::ParamMismatch {
            index,
            expected: std::any::type_name::<T>(),
        }
    }

    /// Refreshes every query and checks every resource.
    pub(crate) fn resolve(&mut self, world: &World) -> EcsResult<()> {
        for param in &mut self.params {
            match param {
                Param::Query(query) => query.refresh(world),
                Param::Resource(id) => {
                    if !world.has_resource_id(*id) {
                        return Err(EcsError::ResourceNotRegistered(id.name().to_string()));
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for SystemParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemParams")
            .field("len", &self.params.len())
            .finish()
    }
}

/// A unit of per-tick work. Build one with [`system`].
///
/// Cloning is cheap and yields the same system: registering a clone is a
/// no-op if the original is already registered.
#[derive(Clone)]
pub struct System {
    id: SystemId,
    name: Arc<str>,
    params: Rc<SystemParams>,
    callback: Rc<RefCell<SystemFn>>,
    start_enabled: bool,
}

impl System {
    /// Returns the system id.
    #[must_use]
    pub const fn id(&self) -> SystemId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the system runs as soon as it is registered.
    #[must_use]
    pub const fn start_enabled(&self) -> bool {
        self.start_enabled
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub(crate) fn callback(&self) -> Rc<RefCell<SystemFn>> {
        Rc::clone(&self.callback)
    }

    /// A private copy of the parameter list, with unbound queries.
    pub(crate) fn fresh_params(&self) -> SystemParams {
        SystemParams::clone(&self.params)
    }
}

impl fmt::Debug for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("params", &self.params.len())
            .field("start_enabled", &self.start_enabled)
            .finish()
    }
}

/// Starts building a system.
#[must_use]
pub fn system() -> SystemBuilder {
    SystemBuilder::default()
}

/// Builder returned by [`system`].
#[derive(Default)]
pub struct SystemBuilder {
    name: Option<String>,
    params: SystemParams,
    disabled: bool,
}

impl SystemBuilder {
    /// Sets the display name used in logs and errors.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declares a query parameter.
    #[must_use]
    pub fn query<F: QueryFilter>(self, filter: F) -> Self {
        self.query_with(Query::new(filter))
    }

    /// Declares a prepared query parameter, e.g. one with `has` terms.
    #[must_use]
    pub fn query_with<F: QueryFilter>(mut self, query: Query<F>) -> Self {
        self.params.params.push(Param::Query(Box::new(query)));
        self
    }

    /// Declares a resource parameter. The tick fails if the resource is
    /// missing when the system is about to run.
    #[must_use]
    pub fn res<T>(mut self, resource: &ResourceDefinition<T>) -> Self {
        self.params.params.push(Param::Resource(resource.id()));
        self
    }

    /// Registers the system disabled; it runs only once enabled.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Finishes the system.
    pub fn build<F>(self, callback: F) -> System
    where
        F: FnMut(&mut World, &mut SystemParams) -> EcsResult<()> + 'static,
    {
        let id = SystemId(NEXT_SYSTEM.fetch_add(1, Ordering::Relaxed));
        let name = self.name.unwrap_or_else(|| format!("system-{id}"));
        let callback: Rc<RefCell<SystemFn>> = Rc::new(RefCell::new(callback));
        System {
            id,
            name: Arc::from(name),
            params: Rc::new(self.params),
            callback,
            start_enabled: !self.disabled,
        }
    }
}

/// A system as registered in one world.
pub(crate) struct RuntimeSystem {
    pub(crate) name: Arc<str>,
    pub(crate) callback: Rc<RefCell<SystemFn>>,
    /// Held across a run, so a panicking callback cannot lose it.
    pub(crate) params: Rc<RefCell<SystemParams>>,
    pub(crate) enabled: bool,
}

impl RuntimeSystem {
    pub(crate) fn new(system: &System) -> Self {
        Self {
            name: system.shared_name(),
            callback: system.callback(),
            params: Rc::new(RefCell::new(system.fresh_params())),
            enabled: system.start_enabled,
        }
    }
}
