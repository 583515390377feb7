//! # Process-wide Registry
//!
//! Component and resource ids are identity tokens: every definition call
//! allocates a fresh id, even for a name that was used before. Ids index
//! into the tables below and are never reclaimed.
//!
//! The tables are only touched when a definition is created, when a world
//! creates an archetype, and when diagnostics are exported. Hot paths
//! (spawn into an existing archetype, iteration) never take these locks.

use std::sync::Arc;

use parking_lot::{const_rwlock, RwLock};

use super::component::ComponentId;
use super::resource::ResourceId;
use super::storage::Column;

/// Everything the store needs to know about a component id.
struct ComponentDescriptor {
    name: Option<Arc<str>>,
    type_name: &'static str,
    new_column: fn(usize) -> Box<dyn Column>,
}

static COMPONENTS: RwLock<Vec<ComponentDescriptor>> = const_rwlock(Vec::new());

static RESOURCES: RwLock<Vec<Arc<str>>> = const_rwlock(Vec::new());

pub(crate) fn allocate_component(
    name: Option<&str>,
    type_name: &'static str,
    new_column: fn(usize) -> Box<dyn Column>,
) -> ComponentId {
    let mut components = COMPONENTS.write();
    let id = ComponentId::from_index(components.len());
    components.push(ComponentDescriptor {
        name: name.map(Arc::from),
        type_name,
        new_column,
    });
    id
}

/// Display name given at definition time, if any.
pub(crate) fn component_name(id: ComponentId) -> Option<Arc<str>> {
    COMPONENTS.read().get(id.index()).and_then(|d| d.name.clone())
}

/// Rust type stored under this id.
pub(crate) fn component_type_name(id: ComponentId) -> &'static str {
    COMPONENTS
        .read()
        .get(id.index())
        .map_or("<unknown>", |d| d.type_name)
}

/// Builds an empty column for the component.
///
/// # Panics
///
/// Panics if the id was not produced by [`allocate_component`], which the
/// `ComponentId` constructor visibility rules out.
pub(crate) fn new_column(id: ComponentId, capacity: usize) -> Box<dyn Column> {
    let constructor = COMPONENTS
        .read()
        .get(id.index())
        .map(|d| d.new_column)
        .unwrap_or_else(|| panic!("component id {} was never allocated", id.index()));
    constructor(capacity)
}

pub(crate) fn allocate_resource(name: Option<&str>) -> ResourceId {
    let mut resources = RESOURCES.write();
    let index = resources.len();
    let name = match name {
        Some(name) => Arc::from(name),
        None => Arc::from(format!("<resource-{index:02}>")),
    };
    resources.push(name);
    ResourceId::from_index(index)
}

pub(crate) fn resource_name(id: ResourceId) -> Arc<str> {
    RESOURCES
        .read()
        .get(id.index())
        .cloned()
        .unwrap_or_else(|| Arc::from("<unknown>"))
}
