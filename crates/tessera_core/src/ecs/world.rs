//! # ECS World
//!
//! The central container for entities, archetypes, resources and systems.
//!
//! Entity data lives in [`Archetype`]s. The world keeps, per entity, the
//! archetype and row holding it, and the archetype graph used to find the
//! destination of a structural change without comparing signatures.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use super::archetype::{single_diff, Archetype, ArchetypeId};
use super::component::{Bundle, ComponentDefinition, ComponentId};
use super::diagnostics::Diagnostics;
use super::entity::{Entity, EntityAllocator, EntityMeta};
use super::query::{Query, QueryFilter};
use super::resource::{ResourceDefinition, ResourceId, ResourceValue};
use super::system::{RuntimeSystem, System, SystemFn, SystemId, SystemParams};
use crate::config::WorldConfig;
use crate::error::{EcsError, EcsResult};
use crate::memory::ObjectPool;

static NEXT_WORLD: AtomicU64 = AtomicU64::new(0);

/// Identity of a world, used by queries to notice they changed worlds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldId(u64);

/// The ECS World.
///
/// # Example
///
/// ```rust
/// use tessera_core::{component, World};
///
/// let position = component::<(f32, f32)>("Position");
/// let velocity = component::<(f32, f32)>("Velocity");
///
/// let mut world = World::new();
/// let e = world.spawn(position.with((0.0, 0.0))).unwrap();
/// world.insert(e, velocity.with((1.0, 0.0))).unwrap();
///
/// assert_eq!(world.get(e, &velocity).unwrap(), Some(&(1.0, 0.0)));
/// assert_eq!(world.remove(e, &position).unwrap(), Some((0.0, 0.0)));
/// assert_eq!(world.get(e, &position).unwrap(), None);
/// ```
pub struct World {
    id: WorldId,
    config: WorldConfig,
    allocator: EntityAllocator,
    entities: HashMap<Entity, EntityMeta>,
    /// Arena indexed by [`ArchetypeId`]; index 0 is the empty archetype.
    archetypes: Vec<Archetype>,
    by_signature: HashMap<Box<[ComponentId]>, ArchetypeId>,
    /// Every component this world has seen, in first-seen order.
    components: IndexSet<ComponentId>,
    resources: HashMap<ResourceId, Box<dyn Any>>,
    systems: IndexMap<SystemId, RuntimeSystem>,
    scratch: ObjectPool<Vec<ComponentId>>,
}

impl World {
    /// Creates an empty world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Creates an empty world.
    #[must_use]
    pub fn with_config(config: WorldConfig) -> Self {
        let id = WorldId(NEXT_WORLD.fetch_add(1, Ordering::Relaxed));
        let root = Archetype::new(
            ArchetypeId::ROOT,
            Vec::new(),
            std::iter::empty(),
            config.column_capacity,
        );

        let mut by_signature = HashMap::new();
        by_signature.insert(Box::from(root.signature()), ArchetypeId::ROOT);

        Self {
            id,
            scratch: ObjectPool::with_capacity(config.scratch_pool_size, Vec::new, Vec::clear),
            config,
            allocator: EntityAllocator::default(),
            entities: HashMap::new(),
            archetypes: vec![root],
            by_signature,
            components: IndexSet::new(),
            resources: HashMap::new(),
            systems: IndexMap::new(),
        }
    }

    /// Returns the identity of this world.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> WorldId {
        self.id
    }

    /// Returns the configuration this world was built with.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    // ========================================================================
    // COMPONENTS
    // ========================================================================

    /// Registers a component ahead of its first use.
    ///
    /// Spawning or inserting registers components implicitly; this is only
    /// needed to make a component show up in diagnostics early.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateComponent`] if this world already knows
    /// the component.
    pub fn register_component<T>(&mut self, component: &ComponentDefinition<T>) -> EcsResult<()> {
        let id = component.id();
        if self.components.contains(&id) {
            return Err(EcsError::DuplicateComponent(id.to_string()));
        }
        self.register_id(id);
        Ok(())
    }

    /// Components seen by this world, in first-seen order.
    #[must_use]
    pub fn components(&self) -> &IndexSet<ComponentId> {
        &self.components
    }

    fn register_id(&mut self, id: ComponentId) {
        if self.components.insert(id) {
            for archetype in &mut self.archetypes {
                archetype.register_edge(id);
            }
            tracing::debug!(component = %id, "registered component");
        }
    }

    // ========================================================================
    // ENTITIES
    // ========================================================================

    /// Creates an entity holding the given components.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityIdsExhausted`] if no id is left.
    pub fn spawn<B: Bundle>(&mut self, bundle: B) -> EcsResult<Entity> {
        let entity = self.allocator.allocate()?;

        let mut ids = self.scratch.acquire();
        bundle.component_ids(&mut ids);
        let archetype = self.find_archetype(ArchetypeId::ROOT, &ids);
        self.scratch.recycle(ids);

        let table = &mut self.archetypes[archetype.index()];
        let row = table.push_entity(entity);
        bundle.write(table, row);
        self.entities.insert(entity, EntityMeta { archetype, row });

        tracing::trace!(%entity, %archetype, row, "spawned entity");
        Ok(entity)
    }

    /// Destroys an entity and drops its components.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity does not exist.
    pub fn despawn(&mut self, entity: Entity) -> EcsResult<()> {
        let meta = self
            .entities
            .remove(&entity)
            .ok_or(EcsError::EntityNotFound(entity))?;

        let archetype = &mut self.archetypes[meta.archetype.index()];
        if let Some(moved) = archetype.swap_remove(meta.row) {
            if let Some(moved_meta) = self.entities.get_mut(&moved) {
                moved_meta.row = meta.row;
            }
        }

        tracing::trace!(%entity, "despawned entity");
        Ok(())
    }

    /// Adds or overwrites components on an entity.
    ///
    /// Overwriting components the entity already has is done in place. Any
    /// new component moves the entity to the archetype of its extended set.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity does not exist.
    pub fn insert<B: Bundle>(&mut self, entity: Entity, bundle: B) -> EcsResult<()> {
        let meta = self.location(entity)?;

        let mut ids = self.scratch.acquire();
        bundle.component_ids(&mut ids);

        let current = &self.archetypes[meta.archetype.index()];
        if ids.iter().all(|&id| current.contains(id)) {
            self.scratch.recycle(ids);
            bundle.write(&mut self.archetypes[meta.archetype.index()], meta.row);
            return Ok(());
        }

        let target = self.find_archetype(meta.archetype, &ids);
        self.scratch.recycle(ids);

        let row = self.relocate(entity, meta, target);
        bundle.write(&mut self.archetypes[target.index()], row);
        Ok(())
    }

    /// Removes one component from an entity and returns it.
    ///
    /// Returns `Ok(None)` without moving the entity if it lacks the
    /// component.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity does not exist.
    pub fn remove<T: 'static>(
        &mut self,
        entity: Entity,
        component: &ComponentDefinition<T>,
    ) -> EcsResult<Option<T>> {
        let meta = self.location(entity)?;
        let id = component.id();
        if !self.archetypes[meta.archetype.index()].contains(id) {
            return Ok(None);
        }

        let target = self.remove_target(meta.archetype, id);

        // Pull the removed column aside so the row move drops nothing.
        let source = &mut self.archetypes[meta.archetype.index()];
        let mut column = source.take_column::<T>(id);
        let value = column.swap_remove(meta.row);
        self.relocate(entity, meta, target);
        self.archetypes[meta.archetype.index()].restore_column(id, column);

        Ok(Some(value))
    }

    /// Moves an entity's row to `target`. Returns the new row.
    ///
    /// Columns only `target` has are left for the caller to fill.
    fn relocate(&mut self, entity: Entity, meta: EntityMeta, target: ArchetypeId) -> usize {
        let (source, destination) =
            pair_mut(&mut self.archetypes, meta.archetype.index(), target.index());
        let (row, displaced) = source.move_row(meta.row, destination);

        if let Some(moved) = displaced {
            if let Some(moved_meta) = self.entities.get_mut(&moved) {
                moved_meta.row = meta.row;
            }
        }
        self.entities.insert(
            entity,
            EntityMeta {
                archetype: target,
                row,
            },
        );

        tracing::trace!(%entity, from = %meta.archetype, to = %target, row, "moved entity");
        row
    }

    /// Returns a component of an entity, `None` if it lacks it.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity does not exist.
    pub fn get<T: 'static>(
        &self,
        entity: Entity,
        component: &ComponentDefinition<T>,
    ) -> EcsResult<Option<&T>> {
        let meta = self.location(entity)?;
        Ok(self.archetypes[meta.archetype.index()]
            .column::<T>(component.id())
            .map(|column| &column[meta.row]))
    }

    /// Mutable variant of [`get`](Self::get).
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity does not exist.
    pub fn get_mut<T: 'static>(
        &mut self,
        entity: Entity,
        component: &ComponentDefinition<T>,
    ) -> EcsResult<Option<&mut T>> {
        let meta = self.location(entity)?;
        Ok(self.archetypes[meta.archetype.index()]
            .column_mut::<T>(component.id())
            .map(|column| &mut column[meta.row]))
    }

    /// Checks if an entity exists.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains_key(&entity)
    }

    /// Returns where an entity's data lives.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity does not exist.
    pub fn location(&self, entity: Entity) -> EcsResult<EntityMeta> {
        self.entities
            .get(&entity)
            .copied()
            .ok_or(EcsError::EntityNotFound(entity))
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    // ========================================================================
    // ARCHETYPES
    // ========================================================================

    /// Returns an archetype by id.
    #[must_use]
    pub fn archetype(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(id.index())
    }

    /// Returns every archetype, the empty one first.
    #[must_use]
    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    /// Looks up the archetype of an exact component set.
    #[must_use]
    pub fn archetype_of(&self, components: &[ComponentId]) -> Option<ArchetypeId> {
        let mut signature = components.to_vec();
        signature.sort_unstable();
        signature.dedup();
        self.by_signature.get(signature.as_slice()).copied()
    }

    pub(crate) fn archetype_mut(&mut self, id: ArchetypeId) -> &mut Archetype {
        &mut self.archetypes[id.index()]
    }

    /// Follows add edges from `start` until every id in `ids` is present,
    /// creating archetypes on the way.
    fn find_archetype(&mut self, start: ArchetypeId, ids: &[ComponentId]) -> ArchetypeId {
        let mut current = start;
        for &id in ids {
            if self.archetypes[current.index()].contains(id) {
                continue;
            }
            self.register_id(id);

            let archetype = &self.archetypes[current.index()];
            current = match archetype.edge(id).and_then(|edge| edge.add) {
                Some(next) => next,
                None => {
                    let mut signature = self.scratch.acquire();
                    signature.extend_from_slice(archetype.signature());
                    signature.push(id);
                    self.get_or_create(signature)
                }
            };
        }
        current
    }

    /// Archetype reached by removing `id` from `from`.
    fn remove_target(&mut self, from: ArchetypeId, id: ComponentId) -> ArchetypeId {
        let archetype = &self.archetypes[from.index()];
        if let Some(target) = archetype.edge(id).and_then(|edge| edge.remove) {
            return target;
        }

        let mut signature = self.scratch.acquire();
        signature.extend(archetype.signature().iter().copied().filter(|&c| c != id));
        self.get_or_create(signature)
    }

    /// Consumes a scratch signature buffer.
    fn get_or_create(&mut self, mut signature: Vec<ComponentId>) -> ArchetypeId {
        signature.sort_unstable();
        if let Some(&existing) = self.by_signature.get(signature.as_slice()) {
            self.scratch.recycle(signature);
            return existing;
        }
        let id = self.create_archetype(&signature);
        self.scratch.recycle(signature);
        id
    }

    /// Creates the archetype of `signature` and wires it to every archetype
    /// one component away.
    fn create_archetype(&mut self, signature: &[ComponentId]) -> ArchetypeId {
        let id = ArchetypeId::from_index(self.archetypes.len());
        let mut archetype = Archetype::new(
            id,
            signature.to_vec(),
            &self.components,
            self.config.column_capacity,
        );

        for other in &mut self.archetypes {
            if let Some(component) = single_diff(archetype.signature(), other.signature()) {
                other.set_add_edge(component, id);
                archetype.set_remove_edge(component, other.id());
            } else if let Some(component) = single_diff(other.signature(), archetype.signature()) {
                archetype.set_add_edge(component, other.id());
                other.set_remove_edge(component, id);
            }
        }

        tracing::debug!(archetype = %id, signature = ?archetype.signature(), "created archetype");
        self.by_signature.insert(Box::from(archetype.signature()), id);
        self.archetypes.push(archetype);
        id
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Builds a query bound to this world.
    pub fn query<F: QueryFilter>(&self, filter: F) -> Query<F> {
        let mut query = Query::new(filter);
        query.refresh(self);
        query
    }

    // ========================================================================
    // RESOURCES
    // ========================================================================

    /// Installs a resource, builder style.
    #[must_use]
    pub fn with_resource<T: 'static>(mut self, resource: ResourceValue<T>) -> Self {
        self.resources.insert(resource.id, Box::new(resource.value));
        self
    }

    /// Installs a resource and returns the previous value.
    pub fn insert_resource<T: 'static>(
        &mut self,
        resource: &ResourceDefinition<T>,
        value: T,
    ) -> Option<T> {
        self.resources
            .insert(resource.id(), Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    /// Returns a resource.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ResourceNotRegistered`] if it is not installed.
    pub fn res<T: 'static>(&self, resource: &ResourceDefinition<T>) -> EcsResult<&T> {
        let id = resource.id();
        self.res_by_id::<T>(id)?
            .ok_or_else(|| EcsError::ResourceNotRegistered(id.name().to_string()))
    }

    /// Returns a resource mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ResourceNotRegistered`] if it is not installed.
    pub fn res_mut<T: 'static>(&mut self, resource: &ResourceDefinition<T>) -> EcsResult<&mut T> {
        let id = resource.id();
        self.res_mut_by_id::<T>(id)?
            .ok_or_else(|| EcsError::ResourceNotRegistered(id.name().to_string()))
    }

    /// Uninstalls a resource and returns its value.
    pub fn remove_resource<T: 'static>(&mut self, resource: &ResourceDefinition<T>) -> Option<T> {
        self.resources
            .remove(&resource.id())
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }

    /// Checks if a resource is installed.
    #[must_use]
    pub fn has_resource<T>(&self, resource: &ResourceDefinition<T>) -> bool {
        self.has_resource_id(resource.id())
    }

    pub(crate) fn has_resource_id(&self, id: ResourceId) -> bool {
        self.resources.contains_key(&id)
    }

    /// `Ok(None)` if the installed value is not a `T`.
    pub(crate) fn res_by_id<T: 'static>(&self, id: ResourceId) -> EcsResult<Option<&T>> {
        self.resources
            .get(&id)
            .map(|value| value.downcast_ref::<T>())
            .ok_or_else(|| EcsError::ResourceNotRegistered(id.name().to_string()))
    }

    pub(crate) fn res_mut_by_id<T: 'static>(&mut self, id: ResourceId) -> EcsResult<Option<&mut T>> {
        self.resources
            .get_mut(&id)
            .map(|value| value.downcast_mut::<T>())
            .ok_or_else(|| EcsError::ResourceNotRegistered(id.name().to_string()))
    }

    // ========================================================================
    // SYSTEMS
    // ========================================================================

    /// Registers a system. Registering it again does nothing.
    pub fn register_system(&mut self, system: &System) {
        if self.systems.contains_key(&system.id()) {
            return;
        }
        self.systems.insert(system.id(), RuntimeSystem::new(system));
        tracing::debug!(
            system = system.name(),
            enabled = system.start_enabled(),
            "registered system"
        );
    }

    /// Registers a system, builder style.
    #[must_use]
    pub fn with_system(mut self, system: System) -> Self {
        self.register_system(&system);
        self
    }

    /// Enables a system, registering it first if needed.
    pub fn enable(&mut self, system: &System) {
        self.register_system(system);
        if let Some(runtime) = self.systems.get_mut(&system.id()) {
            runtime.enabled = true;
        }
    }

    /// Stops a system from running on subsequent ticks.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`] if the system was never
    /// registered in this world.
    pub fn disable(&mut self, system: &System) -> EcsResult<()> {
        let runtime = self
            .systems
            .get_mut(&system.id())
            .ok_or_else(|| EcsError::SystemNotRegistered(system.name().to_owned()))?;
        runtime.enabled = false;
        Ok(())
    }

    /// Whether a system is registered and enabled.
    #[must_use]
    pub fn is_enabled(&self, system: &System) -> bool {
        self.systems
            .get(&system.id())
            .is_some_and(|runtime| runtime.enabled)
    }

    /// Runs a system once, outside the per-tick rotation.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while resolving parameters or by the
    /// callback itself.
    pub fn run_once(&mut self, system: &System) -> EcsResult<()> {
        let mut params = system.fresh_params();
        self.invoke(system.name(), &system.callback(), &mut params)
    }

    /// Runs every enabled system once, in registration order.
    ///
    /// Systems registered by a running system join the same tick.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first error.
    pub fn execute(&mut self) -> EcsResult<()> {
        let mut index = 0;
        while let Some((_, runtime)) = self.systems.get_index_mut(index) {
            index += 1;
            if !runtime.enabled {
                continue;
            }

            let name = Arc::clone(&runtime.name);
            let callback = Rc::clone(&runtime.callback);
            let shared = Rc::clone(&runtime.params);
            let mut params = shared
                .try_borrow_mut()
                .map_err(|_| EcsError::SystemReentered(name.to_string()))?;

            self.invoke(&name, &callback, &mut params)?;
        }
        Ok(())
    }

    fn invoke(
        &mut self,
        name: &str,
        callback: &Rc<RefCell<SystemFn>>,
        params: &mut SystemParams,
    ) -> EcsResult<()> {
        params.resolve(self)?;

        let mut callback = callback
            .try_borrow_mut()
            .map_err(|_| EcsError::SystemReentered(name.to_owned()))?;

        let _span = tracing::trace_span!("system", name).entered();
        (&mut *callback)(self, params)
    }

    // ========================================================================
    // DIAGNOSTICS
    // ========================================================================

    /// Snapshot of the world's structure.
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::collect(self)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("id", &self.id)
            .field("entities", &self.entities.len())
            .field("spawned", &self.allocator.allocated())
            .field("archetypes", &self.archetypes.len())
            .field("resources", &self.resources.len())
            .field("systems", &self.systems.len())
            .finish_non_exhaustive()
    }
}

/// Borrows two distinct archetypes mutably.
fn pair_mut(archetypes: &mut [Archetype], a: usize, b: usize) -> (&mut Archetype, &mut Archetype) {
    assert_ne!(a, b, "an entity cannot move to its own archetype");
    if a < b {
        let (left, right) = archetypes.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = archetypes.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::component;
    use crate::ecs::resource::resource;
    use crate::ecs::system::system;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position(i32, i32);

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Velocity(i32);

    fn assert_consistent(world: &World) {
        for archetype in world.archetypes() {
            assert!(archetype.is_consistent());
            for (row, &entity) in archetype.entities().iter().enumerate() {
                let meta = world.location(entity).unwrap();
                assert_eq!(meta.archetype, archetype.id());
                assert_eq!(meta.row, row);
            }
        }
    }

    #[test]
    fn test_spawn_and_get() {
        let pos = component::<Position>("Position");
        let vel = component::<Velocity>("Velocity");
        let mut world = World::new();

        let e = world.spawn((pos.with(Position(1, 2)), vel.with(Velocity(3)))).unwrap();

        assert_eq!(world.get(e, &pos).unwrap(), Some(&Position(1, 2)));
        assert_eq!(world.get(e, &vel).unwrap(), Some(&Velocity(3)));
        assert_eq!(world.entity_count(), 1);
        assert_consistent(&world);
    }

    #[test]
    fn test_spawn_empty_lands_in_root() {
        let mut world = World::new();
        let e = world.spawn(()).unwrap();
        assert_eq!(world.location(e).unwrap().archetype, ArchetypeId::ROOT);
    }

    #[test]
    fn test_despawn_fixes_displaced_row() {
        let vel = component::<Velocity>("Velocity");
        let mut world = World::new();
        let a = world.spawn(vel.with(Velocity(1))).unwrap();
        let b = world.spawn(vel.with(Velocity(2))).unwrap();
        let c = world.spawn(vel.with(Velocity(3))).unwrap();

        world.despawn(a).unwrap();

        assert_eq!(world.get(a, &vel), Err(EcsError::EntityNotFound(a)));
        assert_eq!(world.get(b, &vel).unwrap(), Some(&Velocity(2)));
        assert_eq!(world.get(c, &vel).unwrap(), Some(&Velocity(3)));
        assert_eq!(world.location(c).unwrap().row, 0);
        assert_eq!(world.despawn(a), Err(EcsError::EntityNotFound(a)));
        assert_consistent(&world);
    }

    #[test]
    fn test_insert_fast_path_keeps_location() {
        let pos = component::<Position>("Position");
        let vel = component::<Velocity>("Velocity");
        let mut world = World::new();
        let e = world.spawn((pos.with(Position(0, 0)), vel.with(Velocity(1)))).unwrap();
        let before = world.location(e).unwrap();
        let archetypes = world.archetypes().len();

        world.insert(e, pos.with(Position(5, 5))).unwrap();

        assert_eq!(world.location(e).unwrap(), before);
        assert_eq!(world.archetypes().len(), archetypes);
        assert_eq!(world.get(e, &pos).unwrap(), Some(&Position(5, 5)));
    }

    #[test]
    fn test_insert_slow_path_preserves_values() {
        let pos = component::<Position>("Position");
        let vel = component::<Velocity>("Velocity");
        let mut world = World::new();
        let other = world.spawn(vel.with(Velocity(7))).unwrap();
        let e = world.spawn(vel.with(Velocity(1))).unwrap();
        let last = world.spawn(vel.with(Velocity(9))).unwrap();

        world.insert(other, pos.with(Position(4, 4))).unwrap();

        let target = world.archetype_of(&[pos.id(), vel.id()]).unwrap();
        assert_eq!(world.location(other).unwrap().archetype, target);
        assert_eq!(world.get(other, &vel).unwrap(), Some(&Velocity(7)));
        assert_eq!(world.get(other, &pos).unwrap(), Some(&Position(4, 4)));
        assert_eq!(world.get(e, &vel).unwrap(), Some(&Velocity(1)));
        assert_eq!(world.get(last, &vel).unwrap(), Some(&Velocity(9)));
        assert_consistent(&world);
    }

    #[test]
    fn test_remove_follows_remove_edge() {
        let pos = component::<Position>("Position");
        let vel = component::<Velocity>("Velocity");
        let mut world = World::new();
        let e = world.spawn((pos.with(Position(1, 1)), vel.with(Velocity(2)))).unwrap();
        let mate = world.spawn((pos.with(Position(3, 3)), vel.with(Velocity(4)))).unwrap();

        assert_eq!(world.remove(e, &vel).unwrap(), Some(Velocity(2)));
        assert_eq!(world.remove(e, &vel).unwrap(), None);

        let only_pos = world.archetype_of(&[pos.id()]).unwrap();
        let both = world.archetype_of(&[pos.id(), vel.id()]).unwrap();
        assert_eq!(world.location(e).unwrap().archetype, only_pos);
        assert_eq!(world.archetype(both).unwrap().edge(vel.id()).unwrap().remove, Some(only_pos));
        assert_eq!(world.archetype(only_pos).unwrap().edge(vel.id()).unwrap().add, Some(both));
        assert_eq!(world.get(mate, &vel).unwrap(), Some(&Velocity(4)));
        assert_consistent(&world);
    }

    #[test]
    fn test_register_component_twice_fails() {
        let c = component::<u8>("C");
        let mut world = World::new();
        world.register_component(&c).unwrap();
        assert!(matches!(
            world.register_component(&c),
            Err(EcsError::DuplicateComponent(_))
        ));
    }

    #[test]
    fn test_late_component_gets_edge_slot_everywhere() {
        let a = component::<u8>("A");
        let b = component::<u8>("B");
        let mut world = World::new();
        world.spawn(a.with(0)).unwrap();
        world.register_component(&b).unwrap();

        for archetype in world.archetypes() {
            assert!(archetype.edge(b.id()).is_some());
        }
    }

    #[test]
    fn test_resources() {
        let dt = resource::<f32>("dt");
        let mut world = World::new();

        assert!(matches!(world.res(&dt), Err(EcsError::ResourceNotRegistered(_))));
        assert_eq!(world.insert_resource(&dt, 0.5), None);
        assert_eq!(world.insert_resource(&dt, 0.25), Some(0.5));
        *world.res_mut(&dt).unwrap() *= 2.0;
        assert_eq!(world.res(&dt), Ok(&0.5));
        assert_eq!(world.remove_resource(&dt), Some(0.5));
        assert!(!world.has_resource(&dt));
    }

    #[test]
    fn test_execute_order_and_disable() {
        let log = resource::<Vec<&'static str>>("log");
        let first = system().res(&log).build(|world, params| {
            params.res_mut::<Vec<&'static str>>(world, 0)?.push("first");
            Ok(())
        });
        let second = system().res(&log).build(|world, params| {
            params.res_mut::<Vec<&'static str>>(world, 0)?.push("second");
            Ok(())
        });

        let mut world = World::new()
            .with_resource(log.with(Vec::new()))
            .with_system(first.clone())
            .with_system(second.clone());

        world.execute().unwrap();
        world.disable(&first).unwrap();
        world.execute().unwrap();
        world.enable(&first);
        world.execute().unwrap();

        assert_eq!(
            world.res(&log).unwrap(),
            &vec!["first", "second", "second", "first", "second"]
        );
    }

    #[test]
    fn test_missing_resource_fails_tick() {
        let missing = resource::<u32>("missing");
        let ran = system().res(&missing).build(|_, _| Ok(()));
        let mut world = World::new().with_system(ran);

        assert!(matches!(world.execute(), Err(EcsError::ResourceNotRegistered(_))));
    }

    #[test]
    fn test_disable_unknown_system() {
        let s = system().named("ghost").build(|_, _| Ok(()));
        let mut world = World::new();
        assert_eq!(world.disable(&s), Err(EcsError::SystemNotRegistered("ghost".into())));
    }

    #[test]
    fn test_system_params_survive_panic() {
        use std::cell::Cell;
        use std::panic::{catch_unwind, AssertUnwindSafe};

        let a = component::<u32>("A");
        let armed = Rc::new(Cell::new(true));
        let trigger = Rc::clone(&armed);
        let bump = system().named("bump").query(a).build(move |world, params| {
            if trigger.replace(false) {
                panic!("system failed");
            }
            params
                .query::<ComponentDefinition<u32>>(0)?
                .for_each_mut(world, |value| *value += 1)
        });

        let mut world = World::new().with_system(bump);
        let e = world.spawn(a.with(1)).unwrap();

        assert!(catch_unwind(AssertUnwindSafe(|| world.execute())).is_err());
        assert!(!armed.get());

        world.execute().unwrap();
        assert_eq!(world.get(e, &a).unwrap(), Some(&2));
    }

    #[test]
    fn test_reentrant_system_fails() {
        let slot = resource::<Option<System>>("self");
        let recursive = system().res(&slot).build(|world, params| {
            let me = params.res::<Option<System>>(world, 0)?.clone();
            match me {
                Some(me) => world.run_once(&me),
                None => Ok(()),
            }
        });

        let mut world = World::new().with_system(recursive.clone());
        world.insert_resource(&slot, Some(recursive));

        assert!(matches!(world.execute(), Err(EcsError::SystemReentered(_))));
    }
}
