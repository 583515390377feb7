//! # Queries
//!
//! A query selects every archetype holding a set of components and walks
//! their rows.
//!
//! ```rust
//! use tessera_core::{component, World, ENTITY};
//!
//! let position = component::<(i32, i32)>("Position");
//! let velocity = component::<i32>("Velocity");
//!
//! let mut world = World::new();
//! world.spawn(velocity.with(1)).unwrap();
//! let e = world.spawn((position.with((81, 42)), velocity.with(3))).unwrap();
//!
//! let mut query = world.query((ENTITY, position, velocity));
//! let rows: Vec<_> = query.iter(&world).collect();
//! assert_eq!(rows, vec![(e, &(81, 42), &3)]);
//!
//! let mut moving = world.query(velocity);
//! moving.for_each_mut(&mut world, |v| *v += 1).unwrap();
//! assert_eq!(moving.iter(&world).copied().sum::<i32>(), 6);
//! ```
//!
//! ## Matching
//!
//! Archetypes are append-only, so a query remembers how many archetypes of
//! its world it has already tested and only looks at the new ones when it is
//! refreshed. Refreshing happens before every iteration.
//!
//! ## Mutable iteration
//!
//! [`Query::for_each_mut`] takes the requested columns out of each archetype,
//! hands out `&mut` rows, and puts the columns back. No two requested columns
//! may be the same component.

use std::any::Any;
use std::collections::HashSet;

use super::archetype::{Archetype, ArchetypeId};
use super::component::{ComponentDefinition, ComponentId};
use super::entity::Entity;
use super::world::{World, WorldId};
use crate::error::{EcsError, EcsResult};

/// A term of a query: what an archetype must contain and what each row
/// yields.
///
/// Implemented for [`ComponentDefinition`] (yields the component), for
/// [`ENTITY`] (yields the row's entity), for `()` (yields nothing) and for
/// tuples of up to eight filters (yields a tuple in declared order).
pub trait QueryFilter: Clone + 'static {
    /// Value produced per row by shared iteration.
    type Item<'w>;
    /// Value produced per row by mutable iteration.
    type ItemMut<'c>;
    /// Per-archetype borrowed columns for shared iteration.
    type State<'w>;
    /// Per-archetype owned columns for mutable iteration.
    type Columns;

    /// Number of values this filter contributes to a row.
    const PRODUCES: usize;

    /// Appends the components an archetype must contain.
    fn required(&self, out: &mut Vec<ComponentId>);

    /// Borrows the columns of a matching archetype.
    fn state<'w>(&self, archetype: &'w Archetype) -> Self::State<'w>;

    /// Reads one row.
    fn fetch<'w>(state: &Self::State<'w>, row: usize) -> Self::Item<'w>;

    /// Takes the columns out of a matching archetype.
    fn extract(&self, archetype: &mut Archetype) -> Self::Columns;

    /// Puts back what [`extract`](Self::extract) took.
    fn restore(&self, archetype: &mut Archetype, columns: Self::Columns);

    /// Borrows one row mutably.
    fn fetch_mut<'c>(
        columns: &'c mut Self::Columns,
        entities: &'c [Entity],
        row: usize,
    ) -> Self::ItemMut<'c>;
}

impl<T: 'static> QueryFilter for ComponentDefinition<T> {
    type Item<'w> = &'w T;
    type ItemMut<'c> = &'c mut T;
    type State<'w> = &'w [T];
    type Columns = Box<Vec<T>>;

    const PRODUCES: usize = 1;

    fn required(&self, out: &mut Vec<ComponentId>) {
        out.push(self.id());
    }

    fn state<'w>(&self, archetype: &'w Archetype) -> &'w [T] {
        archetype.column::<T>(self.id()).unwrap_or(&[])
    }

    #[inline]
    fn fetch<'w>(state: &Self::State<'w>, row: usize) -> Self::Item<'w> {
        let column: &'w [T] = *state;
        &column[row]
    }

    fn extract(&self, archetype: &mut Archetype) -> Box<Vec<T>> {
        archetype.take_column::<T>(self.id())
    }

    fn restore(&self, archetype: &mut Archetype, columns: Box<Vec<T>>) {
        archetype.restore_column(self.id(), columns);
    }

    #[inline]
    fn fetch_mut<'c>(columns: &'c mut Box<Vec<T>>, _entities: &'c [Entity], row: usize) -> &'c mut T {
        &mut columns[row]
    }
}

/// Filter term yielding the entity of each row. See [`ENTITY`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntityFilter;

/// Yields the entity owning each row. Places no requirement on archetypes.
pub const ENTITY: EntityFilter = EntityFilter;

impl QueryFilter for EntityFilter {
    type Item<'w> = Entity;
    type ItemMut<'c> = Entity;
    type State<'w> = &'w [Entity];
    type Columns = ();

    const PRODUCES: usize = 1;

    fn required(&self, _out: &mut Vec<ComponentId>) {}

    fn state<'w>(&self, archetype: &'w Archetype) -> &'w [Entity] {
        archetype.entities()
    }

    #[inline]
    fn fetch<'w>(state: &Self::State<'w>, row: usize) -> Self::Item<'w> {
        state[row]
    }

    fn extract(&self, _archetype: &mut Archetype) {}

    fn restore(&self, _archetype: &mut Archetype, _columns: ()) {}

    #[inline]
    fn fetch_mut<'c>(_columns: &'c mut (), entities: &'c [Entity], row: usize) -> Entity {
        entities[row]
    }
}

impl QueryFilter for () {
    type Item<'w> = ();
    type ItemMut<'c> = ();
    type State<'w> = ();
    type Columns = ();

    const PRODUCES: usize = 0;

    fn required(&self, _out: &mut Vec<ComponentId>) {}

    fn state<'w>(&self, _archetype: &'w Archetype) {}

    fn fetch<'w>(_state: &Self::State<'w>, _row: usize) -> Self::Item<'w> {}

    fn extract(&self, _archetype: &mut Archetype) {}

    fn restore(&self, _archetype: &mut Archetype, _columns: ()) {}

    fn fetch_mut<'c>(_columns: &'c mut (), _entities: &'c [Entity], _row: usize) {}
}

macro_rules! impl_filter_tuple {
    ($($F:ident : $i:tt),+) => {
        impl<$($F: QueryFilter),+> QueryFilter for ($($F,)+) {
            type Item<'w> = ($($F::Item<'w>,)+);
            type ItemMut<'c> = ($($F::ItemMut<'c>,)+);
            type State<'w> = ($($F::State<'w>,)+);
            type Columns = ($($F::Columns,)+);

            const PRODUCES: usize = 0 $(+ $F::PRODUCES)+;

            fn required(&self, out: &mut Vec<ComponentId>) {
                $(self.$i.required(out);)+
            }

            fn state<'w>(&self, archetype: &'w Archetype) -> Self::State<'w> {
                ($(self.$i.state(archetype),)+)
            }

            #[inline]
            fn fetch<'w>(state: &Self::State<'w>, row: usize) -> Self::Item<'w> {
                ($($F::fetch(&state.$i, row),)+)
            }

            fn extract(&self, archetype: &mut Archetype) -> Self::Columns {
                ($(self.$i.extract(archetype),)+)
            }

            #[allow(non_snake_case)]
            fn restore(&self, archetype: &mut Archetype, columns: Self::Columns) {
                let ($($F,)+) = columns;
                $(self.$i.restore(archetype, $F);)+
            }

            #[inline]
            #[allow(non_snake_case)]
            fn fetch_mut<'c>(
                columns: &'c mut Self::Columns,
                entities: &'c [Entity],
                row: usize,
            ) -> Self::ItemMut<'c> {
                let ($($F,)+) = columns;
                ($(<$F as QueryFilter>::fetch_mut($F, entities, row),)+)
            }
        }
    };
}

impl_filter_tuple!(A: 0);
impl_filter_tuple!(A: 0, B: 1);
impl_filter_tuple!(A: 0, B: 1, C: 2);
impl_filter_tuple!(A: 0, B: 1, C: 2, D: 3);
impl_filter_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_filter_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_filter_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_filter_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

/// A cached selection of archetypes plus the filter used to read them.
#[derive(Clone, Debug)]
pub struct Query<F: QueryFilter> {
    filter: F,
    has: Vec<ComponentId>,
    required: Vec<ComponentId>,
    matched: Vec<ArchetypeId>,
    /// Number of archetypes of `world` already tested.
    seen: usize,
    world: Option<WorldId>,
}

impl<F: QueryFilter> Query<F> {
    /// Creates an unbound query. It binds to a world on first use.
    #[must_use]
    pub fn new(filter: F) -> Self {
        let mut required = Vec::new();
        filter.required(&mut required);
        Self {
            filter,
            has: Vec::new(),
            required,
            matched: Vec::new(),
            seen: 0,
            world: None,
        }
    }

    /// Additionally requires a component without reading it.
    #[must_use]
    pub fn has<T>(mut self, component: &ComponentDefinition<T>) -> Self {
        self.has.push(component.id());
        self.required.push(component.id());
        self.seen = 0;
        self.matched.clear();
        self
    }

    /// Returns the filter.
    #[must_use]
    pub fn filter(&self) -> &F {
        &self.filter
    }

    /// Returns the archetypes matched so far.
    #[must_use]
    pub fn matched(&self) -> &[ArchetypeId] {
        &self.matched
    }

    /// Tests archetypes created since the last refresh.
    ///
    /// A query used with a different world starts over.
    pub fn refresh(&mut self, world: &World) {
        if self.world != Some(world.id()) {
            if F::PRODUCES == 0 && world.config().warn_unproductive_queries {
                tracing::warn!(
                    filter = std::any::type_name::<F>(),
                    "query produces no values"
                );
            }
            self.world = Some(world.id());
            self.matched.clear();
            self.seen = 0;
        }

        let archetypes = world.archetypes();
        for archetype in &archetypes[self.seen..] {
            if archetype.contains_all(&self.required) {
                self.matched.push(archetype.id());
            }
        }
        self.seen = archetypes.len();
    }

    /// Iterates over every matching row.
    pub fn iter<'w, 'q>(&'q mut self, world: &'w World) -> QueryIter<'w, 'q, F> {
        self.refresh(world);
        QueryIter {
            world,
            filter: &self.filter,
            archetypes: &self.matched,
            next_archetype: 0,
            current: None,
            row: 0,
        }
    }

    /// Calls `f` with mutable access to every matching row.
    ///
    /// If `f` panics, the columns of the archetype being walked are put back
    /// before the panic leaves this call.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ConflictingAccess`] if the filter names the same
    /// component twice.
    pub fn for_each_mut(
        &mut self,
        world: &mut World,
        mut f: impl FnMut(F::ItemMut<'_>),
    ) -> EcsResult<()> {
        self.check_access()?;
        self.refresh(world);

        for &id in &self.matched {
            let archetype = world.archetype_mut(id);
            if archetype.is_empty() {
                continue;
            }

            let columns = Some(self.filter.extract(archetype));
            let mut taken = Taken {
                filter: &self.filter,
                archetype,
                columns,
            };
            let Taken {
                archetype, columns, ..
            } = &mut taken;
            let entities = archetype.entities();
            if let Some(columns) = columns {
                for row in 0..entities.len() {
                    f(F::fetch_mut(columns, entities, row));
                }
            }
        }
        Ok(())
    }

    /// Collects the entities of every matching row.
    pub fn entities(&mut self, world: &World) -> Vec<Entity> {
        self.refresh(world);
        self.matched
            .iter()
            .flat_map(|&id| world.archetype(id).map_or(&[][..], Archetype::entities))
            .copied()
            .collect()
    }

    /// Counts matching rows without reading them.
    pub fn count(&mut self, world: &World) -> usize {
        self.refresh(world);
        self.matched
            .iter()
            .filter_map(|&id| world.archetype(id))
            .map(Archetype::len)
            .sum()
    }

    fn check_access(&self) -> EcsResult<()> {
        let mut produced = Vec::new();
        self.filter.required(&mut produced);

        let mut seen = HashSet::with_capacity(produced.len());
        for id in produced {
            if !seen.insert(id) {
                return Err(EcsError::ConflictingAccess(id.to_string()));
            }
        }
        Ok(())
    }
}

/// Columns taken out of an archetype. They go back on drop, so a panicking
/// callback leaves the archetype whole.
struct Taken<'a, F: QueryFilter> {
    filter: &'a F,
    archetype: &'a mut Archetype,
    columns: Option<F::Columns>,
}

impl<F: QueryFilter> Drop for Taken<'_, F> {
    fn drop(&mut self) {
        if let Some(columns) = self.columns.take() {
            self.filter.restore(self.archetype, columns);
        }
    }
}

/// Shared iterator returned by [`Query::iter`].
pub struct QueryIter<'w, 'q, F: QueryFilter> {
    world: &'w World,
    filter: &'q F,
    archetypes: &'q [ArchetypeId],
    next_archetype: usize,
    current: Option<(F::State<'w>, usize)>,
    row: usize,
}

impl<'w, F: QueryFilter> Iterator for QueryIter<'w, '_, F> {
    type Item = F::Item<'w>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((state, len)) = &self.current {
                if self.row < *len {
                    let row = self.row;
                    self.row += 1;
                    return Some(F::fetch(state, row));
                }
            }

            let id = *self.archetypes.get(self.next_archetype)?;
            self.next_archetype += 1;

            let world: &'w World = self.world;
            if let Some(archetype) = world.archetype(id) {
                self.current = Some((self.filter.state(archetype), archetype.len()));
                self.row = 0;
            }
        }
    }
}

/// Object-safe view of a [`Query`], used to store system parameters.
pub(crate) trait ErasedQuery: Any {
    fn refresh(&mut self, world: &World);

    fn boxed_clone(&self) -> Box<dyn ErasedQuery>;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<F: QueryFilter> ErasedQuery for Query<F> {
    fn refresh(&mut self, world: &World) {
        Query::refresh(self, world);
    }

    fn boxed_clone(&self) -> Box<dyn ErasedQuery> {
        Box::new(self.clone())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
