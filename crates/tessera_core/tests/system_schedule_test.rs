//! # System Schedule Tests
//!
//! Systems, resources and the tick scheduler working together the way a
//! simulation loop drives them.
//!
//! Run with: cargo test --test system_schedule_test

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tessera_core::{
    component, resource, system, ComponentDefinition, EcsError, Query, TickScheduler, World,
    WorldConfig, ENTITY,
};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position(f32);

#[derive(Debug, Clone, Copy, PartialEq)]
struct Velocity(f32);

type Movement = (ComponentDefinition<Position>, ComponentDefinition<Velocity>);

#[test]
fn verify_movement_with_time_resource() {
    let position = component::<Position>("Position");
    let velocity = component::<Velocity>("Velocity");
    let dt = resource::<f32>("dt");

    let movement = system()
        .named("movement")
        .query((position, velocity))
        .res(&dt)
        .build(|world, params| {
            let dt = *params.res::<f32>(world, 1)?;
            params
                .query::<Movement>(0)?
                .for_each_mut(world, |(p, v)| p.0 += v.0 * dt)
        });

    let mut world = World::new()
        .with_resource(dt.with(0.5))
        .with_system(movement);

    let moving = world
        .spawn((position.with(Position(0.0)), velocity.with(Velocity(2.0))))
        .unwrap();
    let still = world.spawn(position.with(Position(9.0))).unwrap();

    for _ in 0..4 {
        world.execute().unwrap();
    }

    assert_eq!(world.get(moving, &position).unwrap(), Some(&Position(4.0)));
    assert_eq!(world.get(still, &position).unwrap(), Some(&Position(9.0)));
}

#[test]
fn verify_cached_query_sees_new_entities() {
    let velocity = component::<Velocity>("Velocity");
    let count = resource::<usize>("count");

    let counter = system()
        .query(velocity)
        .res(&count)
        .build(|world, params| {
            let n = params.query::<ComponentDefinition<Velocity>>(0)?.count(world);
            *params.res_mut::<usize>(world, 1)? = n;
            Ok(())
        });

    let mut world = World::new().with_resource(count.with(0)).with_system(counter);
    world.execute().unwrap();
    assert_eq!(world.res(&count), Ok(&0));

    let e = world.spawn(velocity.with(Velocity(1.0))).unwrap();
    world.execute().unwrap();
    assert_eq!(world.res(&count), Ok(&1));

    // A new archetype created after the query was cached.
    let tag = component::<()>("Tag");
    world.insert(e, tag.with(())).unwrap();
    world.spawn(velocity.with(Velocity(2.0))).unwrap();
    world.execute().unwrap();
    assert_eq!(world.res(&count), Ok(&2));
}

#[test]
fn verify_has_filter_in_system() {
    let velocity = component::<Velocity>("Velocity");
    let frozen = component::<()>("Frozen");

    let freeze = system()
        .query_with(Query::new(ENTITY).has(&frozen))
        .query(velocity)
        .build(move |world, params| {
            let entities = params.query::<tessera_core::EntityFilter>(0)?.entities(world);
            for e in entities {
                world.insert(e, velocity.with(Velocity(0.0)))?;
            }
            Ok(())
        });

    let mut world = World::new().with_system(freeze);
    let cold = world
        .spawn((velocity.with(Velocity(3.0)), frozen.with(())))
        .unwrap();
    let warm = world.spawn(velocity.with(Velocity(3.0))).unwrap();

    world.execute().unwrap();

    assert_eq!(world.get(cold, &velocity).unwrap(), Some(&Velocity(0.0)));
    assert_eq!(world.get(warm, &velocity).unwrap(), Some(&Velocity(3.0)));
}

#[test]
fn verify_disabled_system_is_skipped_until_enabled() {
    let runs = Rc::new(Cell::new(0));
    let counter = Rc::clone(&runs);
    let tick = system().disabled().build(move |_, _| {
        counter.set(counter.get() + 1);
        Ok(())
    });

    let mut world = World::new().with_system(tick.clone());
    world.execute().unwrap();
    assert_eq!(runs.get(), 0);
    assert!(!world.is_enabled(&tick));

    world.enable(&tick);
    world.execute().unwrap();
    world.run_once(&tick).unwrap();
    assert_eq!(runs.get(), 2);

    // Registering again changes nothing.
    world.register_system(&tick);
    world.execute().unwrap();
    assert_eq!(runs.get(), 3);
}

#[test]
fn verify_first_error_aborts_tick() {
    let missing = resource::<u32>("missing");
    let runs = Rc::new(Cell::new(0));

    let before = {
        let runs = Rc::clone(&runs);
        system().build(move |_, _| {
            runs.set(runs.get() + 1);
            Ok(())
        })
    };
    let failing = system().named("needs-missing").res(&missing).build(|_, _| Ok(()));
    let after = {
        let runs = Rc::clone(&runs);
        system().build(move |_, _| {
            runs.set(runs.get() + 10);
            Ok(())
        })
    };

    let mut world = World::new()
        .with_system(before)
        .with_system(failing.clone())
        .with_system(after);

    assert_eq!(
        world.execute(),
        Err(EcsError::ResourceNotRegistered("missing".to_owned()))
    );
    assert_eq!(runs.get(), 1);

    world.disable(&failing).unwrap();
    world.execute().unwrap();
    assert_eq!(runs.get(), 12);
}

#[test]
fn verify_scheduler_as_resource() {
    let scheduler = resource::<TickScheduler>("scheduler");
    let fired = Rc::new(Cell::new(false));

    let advance = system().res(&scheduler).build(|world, params| {
        params
            .res_mut::<TickScheduler>(world, 0)?
            .tick(Duration::from_millis(16));
        Ok(())
    });

    let mut world = World::new()
        .with_resource(scheduler.with(TickScheduler::new()))
        .with_system(advance);

    let flag = Rc::clone(&fired);
    world
        .res_mut(&scheduler)
        .unwrap()
        .set_timeout(move || flag.set(true), Duration::from_millis(40));

    world.execute().unwrap();
    world.execute().unwrap();
    assert!(!fired.get());
    world.execute().unwrap();
    assert!(fired.get());
    assert_eq!(world.res(&scheduler).unwrap().pending(), 0);
}

#[test]
fn verify_world_from_config() {
    let config = WorldConfig::from_toml_str(
        r#"
        column_capacity = 16
        graph_name = "lattice"
        "#,
    )
    .unwrap();

    let a = component::<u8>("A");
    let mut world = World::with_config(config);
    world.spawn(a.with(1)).unwrap();

    assert_eq!(world.config().column_capacity, 16);
    assert!(world
        .diagnostics()
        .archetype_graph
        .starts_with("strict digraph \"lattice\" {"));
}

#[test]
fn verify_invalid_config_is_rejected() {
    let result = WorldConfig::from_toml_str("column_capacity = \"many\"");
    assert!(matches!(result, Err(EcsError::InvalidConfig(_))));
}
