//! # Warning Event Tests
//!
//! The store reports structural oddities as `tracing` warnings. These tests
//! install a recording layer for the current thread and count what the
//! store emits.
//!
//! Run with: cargo test --test warning_events_test

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tessera_core::{component, system, Query, World, WorldConfig};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// Messages of every WARN event seen while installed.
#[derive(Clone, Default)]
struct Warnings(Arc<Mutex<Vec<String>>>);

struct Message(String);

impl Visit for Message {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for Warnings {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            let mut message = Message(String::new());
            event.record(&mut message);
            self.0.lock().push(message.0);
        }
    }
}

fn warnings_during(f: impl FnOnce()) -> Vec<String> {
    let warnings = Warnings::default();
    let subscriber = tracing_subscriber::registry().with(warnings.clone());
    tracing::subscriber::with_default(subscriber, f);
    let seen = warnings.0.lock().clone();
    seen
}

fn count(warnings: &[String], message: &str) -> usize {
    warnings.iter().filter(|w| w.as_str() == message).count()
}

// ============================================================================
// UNPRODUCTIVE QUERIES
// ============================================================================

#[test]
fn verify_unproductive_query_warns_once_per_binding() {
    let b = component::<u8>("B");

    let warnings = warnings_during(|| {
        let mut world = World::new();
        world.spawn(b.with(1)).unwrap();

        let mut query = world.query(()).has(&b);
        assert_eq!(query.count(&world), 1);
        assert_eq!(query.count(&world), 1);
        world.spawn(b.with(2)).unwrap();
        assert_eq!(query.count(&world), 2);
    });
    assert_eq!(count(&warnings, "query produces no values"), 1);

    let warnings = warnings_during(|| {
        let mut first = World::new();
        first.spawn(b.with(1)).unwrap();
        let second = World::new();

        let mut query = Query::new(()).has(&b);
        assert_eq!(query.count(&first), 1);
        assert_eq!(query.count(&second), 0);
        assert_eq!(query.count(&second), 0);
    });
    assert_eq!(count(&warnings, "query produces no values"), 2);
}

#[test]
fn verify_system_query_warns_on_first_tick_only() {
    let b = component::<u8>("B");

    let warnings = warnings_during(|| {
        let tagged = system()
            .named("tagged")
            .query_with(Query::new(()).has(&b))
            .build(|_, _| Ok(()));
        let mut world = World::new().with_system(tagged);
        world.spawn(b.with(1)).unwrap();

        for _ in 0..3 {
            world.execute().unwrap();
        }
    });
    assert_eq!(count(&warnings, "query produces no values"), 1);
}

#[test]
fn verify_productive_query_is_silent() {
    let a = component::<u32>("A");
    let b = component::<u8>("B");

    let warnings = warnings_during(|| {
        let mut world = World::new();
        world.spawn((a.with(1), b.with(1))).unwrap();
        assert_eq!(world.query(a).has(&b).count(&world), 1);
    });
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
}

#[test]
fn verify_config_suppresses_unproductive_warning() {
    let b = component::<u8>("B");
    let config = WorldConfig {
        warn_unproductive_queries: false,
        ..WorldConfig::default()
    };

    let warnings = warnings_during(|| {
        let mut world = World::with_config(config);
        world.spawn(b.with(1)).unwrap();
        assert_eq!(world.query(()).has(&b).count(&world), 1);
    });
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
}

// ============================================================================
// DUPLICATE COMPONENT NAMES
// ============================================================================

#[test]
fn verify_duplicate_names_warn_in_diagnostics() {
    let first = component::<u8>("C");
    let second = component::<u16>("C");
    let other = component::<u32>("D");

    let mut world = World::new();
    world.spawn((first.with(1), second.with(2), other.with(3))).unwrap();

    let warnings = warnings_during(|| {
        let diagnostics = world.diagnostics();
        assert_eq!(diagnostics.registered_components.len(), 3);
    });
    assert_eq!(count(&warnings, "duplicate component name in archetype graph"), 1);
}

#[test]
fn verify_distinct_names_are_silent() {
    let first = component::<u8>("E");
    let second = component::<u16>("F");

    let mut world = World::new();
    world.spawn((first.with(1), second.with(2))).unwrap();

    let warnings = warnings_during(|| {
        let _ = world.diagnostics();
    });
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
}
