//! The per-world tracker: phase stack plus intercepted mutation entry points.
//!
//! Ordinary game logic mutates the world through [`Tracker::spawn_entity`]
//! and [`Tracker::set_block`]. While a capturing frame is active those calls
//! buffer into it; otherwise they pass straight through to the world's
//! direct entry points. One tracker exists per world and is only ever
//! touched by that world's simulation thread.

use tracing::{error, warn};

use causeway_world::block::{BlockChange, BlockPos, BlockState};
use causeway_world::catalog::{EntityCategory, EntityTypeRegistry, SpawnTypeRegistry};
use causeway_world::entity::{Entity, EntityId};
use causeway_world::world::World;

use crate::context::PhaseContext;
use crate::event::EventDispatcher;
use crate::stack::PhaseStack;
use crate::state::PhaseState;
use crate::unwind::{unwind_frame, UnwindOutcome};
use crate::TrackerError;

// ---------------------------------------------------------------------------
// Dispositions
// ---------------------------------------------------------------------------

/// What happened to an intercepted spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnDisposition {
    /// Buffered into the active frame; resolves at unwind.
    Captured,
    /// No active frame -- applied directly with the resulting id.
    Spawned(EntityId),
}

/// What happened to an intercepted block change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockDisposition {
    /// Buffered into the active frame; resolves at unwind.
    Captured,
    /// Applied directly (no active frame, or the active state applies
    /// block changes immediately).
    Applied,
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Phase tracking for one world.
///
/// The registries are plain values handed in at construction; the tracker
/// consults them to route item spawns and to tag cause chains.
#[derive(Debug)]
pub struct Tracker {
    stack: PhaseStack,
    entity_types: EntityTypeRegistry,
    spawn_types: SpawnTypeRegistry,
}

impl Tracker {
    /// Create a tracker over the given registries with an idle stack.
    pub fn new(entity_types: EntityTypeRegistry, spawn_types: SpawnTypeRegistry) -> Self {
        Self {
            stack: PhaseStack::new(),
            entity_types,
            spawn_types,
        }
    }

    /// The phase stack (read access for diagnostics).
    pub fn stack(&self) -> &PhaseStack {
        &self.stack
    }

    /// The state currently on top, `Idle` when no operation is active.
    pub fn current_state(&self) -> PhaseState {
        self.stack.current_state()
    }

    /// The entity type registry this tracker classifies spawns with.
    pub fn entity_types(&self) -> &EntityTypeRegistry {
        &self.entity_types
    }

    // -- frame lifecycle ----------------------------------------------------

    /// Begin a traceable operation: install `context` as the current frame.
    pub fn enter(&mut self, context: PhaseContext) -> Result<(), TrackerError> {
        self.stack.push(context)
    }

    /// Finish a traceable operation: pop the frame pushed with `state` and
    /// unwind it against `world` through `dispatcher`.
    ///
    /// The popped frame is consumed; its buffers cannot outlive this call.
    pub fn exit(
        &mut self,
        state: PhaseState,
        world: &mut World,
        dispatcher: &mut dyn EventDispatcher,
    ) -> Result<UnwindOutcome, TrackerError> {
        let mut frame = self.stack.pop(state)?;
        let outcome = unwind_frame(
            &mut frame,
            world,
            dispatcher,
            &self.entity_types,
            &self.spawn_types,
        );
        if let Err(ref e) = outcome {
            error!(state = ?state, error = %e, "unwind failed");
        }
        outcome
    }

    /// Abort a traceable operation: pop the frame pushed with `state` and
    /// discard its captures without posting any events.
    ///
    /// For callers isolating a failure mid-operation -- the stack must still
    /// be left clean, but half-finished captures must not reach world state.
    pub fn abandon(&mut self, state: PhaseState) -> Result<(), TrackerError> {
        let frame = self.stack.pop(state)?;
        if !frame.is_capture_empty() {
            warn!(
                state = ?state,
                entities = frame.has_captured_entities(),
                items = frame.has_captured_items(),
                blocks = frame.has_captured_blocks(),
                "abandoned frame discarded captures"
            );
        }
        Ok(())
    }

    // -- intercepted entry points -------------------------------------------

    /// Spawn `entity`, buffering it into the active frame when one exists.
    ///
    /// Item entities are routed to the frame's item buffer, everything else
    /// to its entity buffer. With no active frame the spawn applies
    /// directly, unattributed.
    pub fn spawn_entity(
        &mut self,
        world: &mut World,
        entity: Entity,
    ) -> Result<SpawnDisposition, TrackerError> {
        // Validate the type up front so a typo'd id fails at the call-site,
        // not deep inside a later unwind.
        let category = self.entity_types.category(&entity.entity_type)?;

        match self.stack.current_mut() {
            Some(frame) => {
                if category == EntityCategory::Item {
                    frame.capture_item(entity);
                } else {
                    frame.capture_entity(entity);
                }
                Ok(SpawnDisposition::Captured)
            }
            None => Ok(SpawnDisposition::Spawned(world.spawn_direct(entity))),
        }
    }

    /// Change the block at `pos`, buffering when the active state requires
    /// block capture.
    ///
    /// The pre-change state is recorded at capture time so listeners see the
    /// world as it stood when the mutation was attempted.
    pub fn set_block(
        &mut self,
        world: &mut World,
        pos: BlockPos,
        state: BlockState,
    ) -> BlockDisposition {
        match self.stack.current_mut() {
            Some(frame) if frame.state().requires_block_capture() => {
                let from = world.block(pos);
                frame.capture_block_change(BlockChange {
                    pos,
                    from,
                    to: state,
                });
                BlockDisposition::Captured
            }
            _ => {
                world.set_block_direct(pos, state);
                BlockDisposition::Applied
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use causeway_world::entity::Position;

    use crate::cause::{cause_keys, CauseValue, DamageKind, DamageSource, EntityCause};
    use crate::event::{NullDispatcher, WorldEvent};

    fn tracker() -> Tracker {
        Tracker::new(
            EntityTypeRegistry::with_defaults(),
            SpawnTypeRegistry::with_defaults(),
        )
    }

    fn entity(kind: &str) -> Entity {
        Entity::new(kind, Position::default())
    }

    /// Records every posted event; cancels none.
    #[derive(Default)]
    struct Recording {
        events: Vec<WorldEvent>,
    }

    impl crate::event::EventDispatcher for Recording {
        fn post(&mut self, event: &mut WorldEvent) -> bool {
            self.events.push(event.clone());
            false
        }
    }

    // -- 1. Pass-through with no active frame --------------------------------

    #[test]
    fn spawn_with_idle_stack_applies_directly() {
        let mut world = World::new();
        let mut tracker = tracker();

        let disposition = tracker.spawn_entity(&mut world, entity("pig")).unwrap();
        match disposition {
            SpawnDisposition::Spawned(id) => assert!(world.is_alive(id)),
            SpawnDisposition::Captured => panic!("nothing should capture on an idle stack"),
        }
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn set_block_with_idle_stack_applies_directly() {
        let mut world = World::new();
        let mut tracker = tracker();
        let pos = BlockPos::new(0, 0, 0);

        let disposition = tracker.set_block(&mut world, pos, BlockState::named("stone"));
        assert_eq!(disposition, BlockDisposition::Applied);
        assert_eq!(world.block(pos), BlockState::named("stone"));
    }

    // -- 2. Capture routing ---------------------------------------------------

    #[test]
    fn active_frame_captures_instead_of_applying() {
        let mut world = World::new();
        let mut tracker = tracker();
        tracker
            .enter(PhaseContext::new(PhaseState::ChunkSpawning))
            .unwrap();

        let d1 = tracker.spawn_entity(&mut world, entity("zombie")).unwrap();
        let d2 = tracker.spawn_entity(&mut world, entity("item")).unwrap();
        assert_eq!(d1, SpawnDisposition::Captured);
        assert_eq!(d2, SpawnDisposition::Captured);
        assert_eq!(world.entity_count(), 0, "nothing applied yet");

        let frame = tracker.stack().current().unwrap();
        assert!(frame.has_captured_entities());
        assert!(frame.has_captured_items(), "items route to the item buffer");
    }

    #[test]
    fn block_capture_follows_state_policy() {
        let mut world = World::new();
        let mut tracker = tracker();
        let pos = BlockPos::new(1, 1, 1);

        // DropItem does not capture block changes -- they apply immediately.
        tracker
            .enter(PhaseContext::new(PhaseState::DropItem))
            .unwrap();
        let d = tracker.set_block(&mut world, pos, BlockState::named("stone"));
        assert_eq!(d, BlockDisposition::Applied);
        assert_eq!(world.block(pos), BlockState::named("stone"));
        tracker
            .exit(PhaseState::DropItem, &mut world, &mut NullDispatcher)
            .unwrap();

        // BlockBreak does capture.
        tracker
            .enter(PhaseContext::new(PhaseState::BlockBreak))
            .unwrap();
        let d = tracker.set_block(&mut world, pos, BlockState::air());
        assert_eq!(d, BlockDisposition::Captured);
        assert_eq!(
            world.block(pos),
            BlockState::named("stone"),
            "buffered, not applied"
        );
    }

    #[test]
    fn unknown_entity_type_is_rejected_at_the_call_site() {
        let mut world = World::new();
        let mut tracker = tracker();
        tracker
            .enter(PhaseContext::new(PhaseState::ChunkSpawning))
            .unwrap();

        let err = tracker.spawn_entity(&mut world, entity("dragon")).unwrap_err();
        assert!(matches!(err, TrackerError::World(_)));
        assert!(tracker.stack().current().unwrap().is_capture_empty());
    }

    // -- 3. Enter / exit round trip -------------------------------------------

    #[test]
    fn enter_capture_exit_round_trip() {
        let mut world = World::new();
        let mut tracker = tracker();
        let mut dispatcher = Recording::default();

        tracker
            .enter(PhaseContext::new(PhaseState::ChunkSpawning))
            .unwrap();
        tracker.spawn_entity(&mut world, entity("zombie")).unwrap();

        let outcome = tracker
            .exit(PhaseState::ChunkSpawning, &mut world, &mut dispatcher)
            .unwrap();

        assert_eq!(outcome.events_posted, 1);
        assert_eq!(outcome.entities_spawned, 1);
        assert_eq!(world.entities_of_type("zombie").len(), 1);
        assert_eq!(tracker.current_state(), PhaseState::Idle);
    }

    #[test]
    fn abandon_discards_captures_without_events() {
        let mut world = World::new();
        let mut tracker = tracker();

        tracker
            .enter(PhaseContext::new(PhaseState::ChunkSpawning))
            .unwrap();
        tracker.spawn_entity(&mut world, entity("zombie")).unwrap();

        tracker.abandon(PhaseState::ChunkSpawning).unwrap();
        assert_eq!(tracker.current_state(), PhaseState::Idle);
        assert_eq!(world.entity_count(), 0, "captures never reached the world");

        // Abandon obeys the same pop discipline.
        let err = tracker.abandon(PhaseState::ChunkSpawning).unwrap_err();
        assert!(matches!(err, TrackerError::PopOnEmptyStack { .. }));
    }

    #[test]
    fn exit_with_wrong_state_preserves_the_frame() {
        let mut world = World::new();
        let mut tracker = tracker();

        tracker
            .enter(PhaseContext::new(PhaseState::BlockBreak))
            .unwrap();
        tracker.spawn_entity(&mut world, entity("item")).unwrap();

        let err = tracker
            .exit(PhaseState::DropItem, &mut world, &mut NullDispatcher)
            .unwrap_err();
        assert!(matches!(err, TrackerError::PopMismatch { .. }));

        // The frame and its captures are still intact.
        assert_eq!(tracker.current_state(), PhaseState::BlockBreak);
        assert!(tracker.stack().current().unwrap().has_captured_items());
    }

    // -- 4. Nested frames ------------------------------------------------------

    #[test]
    fn nested_drop_under_block_break_unwinds_inner_first() {
        let mut world = World::new();
        let mut tracker = tracker();
        let mut dispatcher = Recording::default();

        let breaker = {
            let pig = entity("pig");
            let snapshot = pig.snapshot();
            let id = world.spawn_direct(pig);
            EntityCause { id, snapshot }
        };

        tracker
            .enter(
                PhaseContext::new(PhaseState::BlockBreak)
                    .with_cause(cause_keys::SOURCE, CauseValue::Entity(breaker))
                    .unwrap(),
            )
            .unwrap();
        let pos = BlockPos::new(0, 60, 0);
        world.set_block_direct(pos, BlockState::named("stone"));
        tracker.set_block(&mut world, pos, BlockState::air());

        // The break triggers a nested drop operation.
        tracker
            .enter(PhaseContext::new(PhaseState::DropItem))
            .unwrap();
        tracker.spawn_entity(&mut world, entity("item")).unwrap();
        let inner = tracker
            .exit(PhaseState::DropItem, &mut world, &mut dispatcher)
            .unwrap();
        assert_eq!(inner.events_posted, 1);
        assert_eq!(inner.items_spawned, 1);

        let outer = tracker
            .exit(PhaseState::BlockBreak, &mut world, &mut dispatcher)
            .unwrap();
        assert_eq!(outer.events_posted, 1);
        assert_eq!(outer.blocks_applied, 1);
        assert!(world.block(pos).is_air());
        assert_eq!(tracker.current_state(), PhaseState::Idle);
    }

    // -- 5. Death drops through the facade -------------------------------------

    #[test]
    fn death_drops_through_the_tracker() {
        let mut world = World::new();
        let mut tracker = tracker();
        let mut dispatcher = Recording::default();

        let zombie = entity("zombie");
        let snapshot = zombie.snapshot();
        let id = world.spawn_direct(zombie);

        tracker
            .enter(PhaseContext::new(PhaseState::WorldTick))
            .unwrap();
        tracker
            .enter(
                PhaseContext::new(PhaseState::DeathDropsSpawning)
                    .with_cause(
                        cause_keys::SOURCE,
                        CauseValue::Entity(EntityCause { id, snapshot }),
                    )
                    .unwrap()
                    .with_cause(
                        cause_keys::DAMAGE_SOURCE,
                        CauseValue::Damage(DamageSource::new(DamageKind::Fire)),
                    )
                    .unwrap(),
            )
            .unwrap();

        tracker.spawn_entity(&mut world, entity("item")).unwrap();
        tracker
            .spawn_entity(&mut world, entity("experience_orb"))
            .unwrap();

        let outcome = tracker
            .exit(PhaseState::DeathDropsSpawning, &mut world, &mut dispatcher)
            .unwrap();
        assert_eq!(outcome.events_posted, 2);
        assert_eq!(outcome.items_spawned, 1);
        assert_eq!(outcome.entities_spawned, 1);

        tracker
            .exit(PhaseState::WorldTick, &mut world, &mut dispatcher)
            .unwrap();
        assert!(tracker.stack().is_empty());
    }
}
