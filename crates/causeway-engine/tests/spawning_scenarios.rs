//! End-to-end spawning scenarios: capture, unwind, dispatch, cancellation.
//!
//! These tests drive the tracker the way gameplay code does -- through the
//! intercepted entry points -- and assert on the emitted events and the
//! resulting world state.

use causeway_engine::prelude::*;

// -- test dispatchers --------------------------------------------------------

/// Records every posted event; cancels none.
#[derive(Default)]
struct Recording {
    events: Vec<WorldEvent>,
}

impl EventDispatcher for Recording {
    fn post(&mut self, event: &mut WorldEvent) -> bool {
        self.events.push(event.clone());
        false
    }
}

/// Cancels everything.
struct CancelAll;

impl EventDispatcher for CancelAll {
    fn post(&mut self, _event: &mut WorldEvent) -> bool {
        true
    }
}

// -- fixtures -----------------------------------------------------------------

fn tracker() -> Tracker {
    Tracker::new(
        EntityTypeRegistry::with_defaults(),
        SpawnTypeRegistry::with_defaults(),
    )
}

fn entity(kind: &str) -> Entity {
    Entity::new(kind, Position::default())
}

fn record_entity_cause(world: &mut World, kind: &str) -> EntityCause {
    let e = entity(kind);
    let snapshot = e.snapshot();
    let id = world.spawn_direct(e);
    EntityCause { id, snapshot }
}

// -- 1. Simple spawn ----------------------------------------------------------

#[test]
fn simple_chunk_spawn_round_trip() {
    let mut world = World::new();
    let mut tracker = tracker();
    let mut dispatcher = Recording::default();

    tracker
        .enter(PhaseContext::new(PhaseState::ChunkSpawning))
        .unwrap();
    tracker.spawn_entity(&mut world, entity("zombie")).unwrap();
    assert_eq!(world.entity_count(), 0, "buffered, not yet applied");

    let outcome = tracker
        .exit(PhaseState::ChunkSpawning, &mut world, &mut dispatcher)
        .unwrap();

    assert_eq!(outcome.events_posted, 1);
    assert_eq!(dispatcher.events.len(), 1);
    assert_eq!(
        world.entities_of_type("zombie").len(),
        1,
        "present in world state exactly once"
    );
}

// -- 2. Death with mixed drops ------------------------------------------------

#[test]
fn death_with_mixed_drops_emits_three_attributed_events() {
    let mut world = World::new();
    let mut tracker = tracker();
    let mut dispatcher = Recording::default();

    let dying = record_entity_cause(&mut world, "zombie");
    let frame = PhaseContext::new(PhaseState::DeathDropsSpawning)
        .with_cause(cause_keys::SOURCE, CauseValue::Entity(dying.clone()))
        .unwrap()
        .with_cause(
            cause_keys::DAMAGE_SOURCE,
            CauseValue::Damage(DamageSource::by(DamageKind::Attack, dying.id)),
        )
        .unwrap();
    tracker.enter(frame).unwrap();

    tracker.spawn_entity(&mut world, entity("item")).unwrap();
    tracker.spawn_entity(&mut world, entity("item")).unwrap();
    tracker
        .spawn_entity(&mut world, entity("experience_orb"))
        .unwrap();
    tracker.spawn_entity(&mut world, entity("skeleton")).unwrap();

    let outcome = tracker
        .exit(PhaseState::DeathDropsSpawning, &mut world, &mut dispatcher)
        .unwrap();

    // Exactly three events: items, experience, other -- never merged.
    assert_eq!(outcome.events_posted, 3);
    let tags: Vec<&str> = dispatcher
        .events
        .iter()
        .filter_map(|e| e.cause().spawn_type())
        .map(|t| t.id.as_str())
        .collect();
    assert_eq!(tags, vec!["dropped_item", "experience", "entity_death"]);

    // Each event carries the dying zombie as primary cause and the damage
    // source as secondary cause.
    for event in &dispatcher.events {
        assert_eq!(
            event.cause().spawn_source().map(|s| s.entity_type.as_str()),
            Some("zombie")
        );
        let damage = event
            .cause()
            .named(cause_keys::DAMAGE_SOURCE)
            .and_then(CauseValue::as_damage)
            .expect("damage source carried on every group");
        assert_eq!(damage.kind, DamageKind::Attack);
        assert_eq!(damage.attacker, Some(dying.id));
    }

    assert_eq!(world.entities_of_type("item").len(), 2);
    assert_eq!(world.entities_of_type("experience_orb").len(), 1);
    assert_eq!(world.entities_of_type("skeleton").len(), 1);
}

// -- 3. Missing cause ----------------------------------------------------------

#[test]
fn death_drops_without_source_is_a_fatal_signal() {
    let mut world = World::new();
    let mut tracker = tracker();
    let mut dispatcher = Recording::default();

    tracker
        .enter(PhaseContext::new(PhaseState::DeathDropsSpawning))
        .unwrap();
    tracker.spawn_entity(&mut world, entity("item")).unwrap();

    let err = tracker
        .exit(PhaseState::DeathDropsSpawning, &mut world, &mut dispatcher)
        .unwrap_err();

    assert!(matches!(err, TrackerError::MissingCause { ref key, .. } if key == "source"));
    assert!(dispatcher.events.is_empty(), "not silently skipped into an event");
    assert_eq!(world.entity_count(), 0, "and nothing entered world state");
}

// -- 4. Illegal transition ------------------------------------------------------

#[test]
fn illegal_transition_rejected_before_any_capture() {
    let mut tracker = tracker();

    tracker
        .enter(PhaseContext::new(PhaseState::DropItem))
        .unwrap();

    // DropItem forbids switching away mid-frame.
    let err = tracker
        .enter(PhaseContext::new(PhaseState::ChunkSpawning))
        .unwrap_err();
    assert!(matches!(
        err,
        TrackerError::IllegalTransition {
            from: PhaseState::DropItem,
            to: PhaseState::ChunkSpawning,
        }
    ));

    // The rejected frame never existed: the stack still holds one frame
    // and that frame has no captures.
    assert_eq!(tracker.stack().depth(), 1);
    assert_eq!(tracker.current_state(), PhaseState::DropItem);
    assert!(tracker.stack().current().unwrap().is_capture_empty());
}

// -- 5. Cancellation -------------------------------------------------------------

#[test]
fn cancelled_spawn_leaves_zero_mutations_and_drained_buffers() {
    let mut world = World::new();
    let mut tracker = tracker();

    let before = world.state_digest();
    tracker
        .enter(PhaseContext::new(PhaseState::ChunkSpawning))
        .unwrap();
    tracker.spawn_entity(&mut world, entity("zombie")).unwrap();
    tracker.spawn_entity(&mut world, entity("pig")).unwrap();

    let outcome = tracker
        .exit(PhaseState::ChunkSpawning, &mut world, &mut CancelAll)
        .unwrap();

    assert_eq!(outcome.events_posted, 1);
    assert_eq!(outcome.events_cancelled, 1);
    assert_eq!(outcome.entities_spawned, 0);
    assert_eq!(world.state_digest(), before, "zero world mutations");
    assert!(tracker.stack().is_empty(), "frame fully released");
}

// -- 6. Chunk spawn triggering a nested tick -------------------------------------

#[test]
fn chunk_spawn_can_nest_a_tick_which_can_nest_death_drops() {
    let mut world = World::new();
    let mut tracker = tracker();
    let mut dispatcher = Recording::default();

    // Chunk spawning begins...
    tracker
        .enter(PhaseContext::new(PhaseState::ChunkSpawning))
        .unwrap();
    tracker.spawn_entity(&mut world, entity("pig")).unwrap();

    // ...and waking the chunk's entities triggers a nested entity tick,
    // during which one of them dies.
    tracker
        .enter(PhaseContext::new(PhaseState::EntityTick))
        .unwrap();
    let dying = record_entity_cause(&mut world, "skeleton");
    tracker
        .enter(
            PhaseContext::new(PhaseState::DeathDropsSpawning)
                .with_cause(cause_keys::SOURCE, CauseValue::Entity(dying))
                .unwrap()
                .with_cause(
                    cause_keys::DAMAGE_SOURCE,
                    CauseValue::Damage(DamageSource::new(DamageKind::Fall)),
                )
                .unwrap(),
        )
        .unwrap();
    tracker.spawn_entity(&mut world, entity("item")).unwrap();

    let drops = tracker
        .exit(PhaseState::DeathDropsSpawning, &mut world, &mut dispatcher)
        .unwrap();
    assert_eq!(drops.events_posted, 1);
    assert_eq!(drops.items_spawned, 1);

    let tick = tracker
        .exit(PhaseState::EntityTick, &mut world, &mut dispatcher)
        .unwrap();
    assert_eq!(tick.events_posted, 0, "the tick itself captured nothing");

    let chunk = tracker
        .exit(PhaseState::ChunkSpawning, &mut world, &mut dispatcher)
        .unwrap();
    assert_eq!(chunk.events_posted, 1);
    assert_eq!(chunk.entities_spawned, 1);

    // Inner attribution stayed with the inner frame.
    assert_eq!(
        dispatcher.events[0].cause().spawn_type().map(|t| t.id.as_str()),
        Some("dropped_item")
    );
    assert_eq!(
        dispatcher.events[1].cause().spawn_type().map(|t| t.id.as_str()),
        Some("chunk_load")
    );
    assert!(tracker.stack().is_empty());
}

// -- 7. Pop mismatch surfaces history ---------------------------------------------

#[test]
fn pop_mismatch_reports_full_frame_history() {
    let mut world = World::new();
    let mut tracker = tracker();
    let mut dispatcher = Recording::default();

    tracker
        .enter(PhaseContext::new(PhaseState::WorldTick))
        .unwrap();
    tracker
        .enter(PhaseContext::new(PhaseState::BlockBreak))
        .unwrap();

    let err = tracker
        .exit(PhaseState::WorldTick, &mut world, &mut dispatcher)
        .unwrap_err();
    match err {
        TrackerError::PopMismatch { history, .. } => {
            assert_eq!(history, vec![PhaseState::WorldTick, PhaseState::BlockBreak]);
        }
        other => panic!("expected PopMismatch, got {other:?}"),
    }
}
