//! The unwind engine.
//!
//! Given a completed frame, drain its capture buffers, partition the captures
//! into cause-specific groups, post each group as one cancellable event, and
//! apply the surviving effects through the world's *direct* entry points
//! (which bypass capture, so applying can never recursively recapture).
//!
//! The empty-capture case returns before any event object or snapshot is
//! allocated; almost every frame in a running simulation takes that path.

use tracing::{debug, trace};

use causeway_world::catalog::spawn_types as spawn_ids;
use causeway_world::catalog::{EntityCategory, EntityTypeRegistry, SpawnTypeRegistry};
use causeway_world::entity::Entity;
use causeway_world::snapshot::EntitySnapshot;
use causeway_world::world::World;

use crate::cause::{cause_keys, Cause, CauseValue};
use crate::context::PhaseContext;
use crate::event::{
    post_and_then, ChangeBlocksEvent, DropItemsEvent, EventDispatcher, SpawnEntitiesEvent,
    WorldEvent,
};
use crate::state::PhaseState;
use crate::TrackerError;

// ---------------------------------------------------------------------------
// UnwindOutcome
// ---------------------------------------------------------------------------

/// Summary of one frame's unwind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnwindOutcome {
    /// Events submitted to the dispatch collaborator.
    pub events_posted: usize,
    /// Of those, how many a listener cancelled.
    pub events_cancelled: usize,
    /// Entities that entered world state.
    pub entities_spawned: usize,
    /// Item entities that entered world state.
    pub items_spawned: usize,
    /// Block changes that were applied.
    pub blocks_applied: usize,
}

impl UnwindOutcome {
    /// Fold another outcome into this one.
    pub fn merge(&mut self, other: UnwindOutcome) {
        self.events_posted += other.events_posted;
        self.events_cancelled += other.events_cancelled;
        self.entities_spawned += other.entities_spawned;
        self.items_spawned += other.items_spawned;
        self.blocks_applied += other.blocks_applied;
    }
}

// ---------------------------------------------------------------------------
// unwind_frame
// ---------------------------------------------------------------------------

/// Resolve a popped frame's captures into events and surviving world state.
///
/// Draining is destructive: a second call on the same frame finds empty
/// buffers and produces no further events.
pub fn unwind_frame(
    frame: &mut PhaseContext,
    world: &mut World,
    dispatcher: &mut dyn EventDispatcher,
    entity_types: &EntityTypeRegistry,
    spawn_types: &SpawnTypeRegistry,
) -> Result<UnwindOutcome, TrackerError> {
    if frame.is_capture_empty() {
        trace!(state = ?frame.state(), "unwind: nothing captured");
        return Ok(UnwindOutcome::default());
    }

    let outcome = match frame.state() {
        PhaseState::Idle => Ok(UnwindOutcome::default()),
        PhaseState::DeathDropsSpawning => {
            unwind_death_drops(frame, world, dispatcher, entity_types, spawn_types)
        }
        PhaseState::DropItem => unwind_drop_item(frame, world, dispatcher, spawn_types),
        PhaseState::ChunkSpawning => unwind_chunk_spawning(frame, world, dispatcher, spawn_types),
        PhaseState::WorldTick | PhaseState::EntityTick | PhaseState::BlockTick => {
            unwind_ticking(frame, world, dispatcher, spawn_types)
        }
        PhaseState::BlockBreak | PhaseState::BlockPlace => {
            unwind_interaction(frame, world, dispatcher, spawn_types)
        }
        PhaseState::TerrainGeneration | PhaseState::Populating => {
            unwind_generation(frame, world, dispatcher, spawn_types)
        }
    }?;

    debug!(
        state = ?frame.state(),
        events = outcome.events_posted,
        cancelled = outcome.events_cancelled,
        "frame unwound"
    );
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Per-family unwind algorithms
// ---------------------------------------------------------------------------

/// Death drops: items, experience orbs, and remaining entities each go out
/// as their own event so each group carries its distinct spawn tag, with the
/// dying entity as primary cause and the damage source carried as a
/// secondary cause on every one.
fn unwind_death_drops(
    frame: &mut PhaseContext,
    world: &mut World,
    dispatcher: &mut dyn EventDispatcher,
    entity_types: &EntityTypeRegistry,
    spawn_types: &SpawnTypeRegistry,
) -> Result<UnwindOutcome, TrackerError> {
    let mut outcome = UnwindOutcome::default();
    if !frame.has_captured_entities() && !frame.has_captured_items() {
        // No event will be built, so no cause is needed.
        return Ok(outcome);
    }

    // Mandatory context; omitting either is a bug at the pushing call-site.
    let source = frame.named_entity(cause_keys::SOURCE)?.clone();
    frame.named_damage(cause_keys::DAMAGE_SOURCE)?;
    let secondary = frame.secondary_causes();

    let items = frame.take_items();
    if !items.is_empty() {
        let cause = Cause::spawning(
            spawn_types.get(spawn_ids::DROPPED_ITEM)?.clone(),
            Some(source.snapshot.clone()),
        )
        .with_all(secondary.clone());
        post_spawn_batch(world, dispatcher, &mut outcome, items, cause, true);
    }

    let entities = frame.take_entities();
    if !entities.is_empty() {
        let mut experience = Vec::new();
        let mut other = Vec::new();
        for entity in entities {
            if entity_types.category(&entity.entity_type)? == EntityCategory::ExperienceOrb {
                experience.push(entity);
            } else {
                other.push(entity);
            }
        }

        if !experience.is_empty() {
            let cause = Cause::spawning(
                spawn_types.get(spawn_ids::EXPERIENCE)?.clone(),
                Some(source.snapshot.clone()),
            )
            .with_all(secondary.clone());
            post_spawn_batch(world, dispatcher, &mut outcome, experience, cause, false);
        }

        if !other.is_empty() {
            let cause = Cause::spawning(
                spawn_types.get(spawn_ids::ENTITY_DEATH)?.clone(),
                Some(source.snapshot.clone()),
            )
            .with_all(secondary);
            post_spawn_batch(world, dispatcher, &mut outcome, other, cause, false);
        }
    }

    Ok(outcome)
}

/// A single dropped stack. The dropper is optional -- dispensers and
/// natural causes have no source entity.
fn unwind_drop_item(
    frame: &mut PhaseContext,
    world: &mut World,
    dispatcher: &mut dyn EventDispatcher,
    spawn_types: &SpawnTypeRegistry,
) -> Result<UnwindOutcome, TrackerError> {
    let mut outcome = UnwindOutcome::default();
    let source_snapshot = frame
        .first_named_entity(cause_keys::SOURCE)
        .map(|e| e.snapshot.clone());
    let secondary = frame.secondary_causes();

    let items = frame.take_items();
    if !items.is_empty() {
        let cause = Cause::spawning(
            spawn_types.get(spawn_ids::DROPPED_ITEM)?.clone(),
            source_snapshot.clone(),
        )
        .with_all(secondary.clone());
        post_spawn_batch(world, dispatcher, &mut outcome, items, cause, true);
    }

    let entities = frame.take_entities();
    if !entities.is_empty() {
        let cause = Cause::spawning(spawn_types.get(spawn_ids::CUSTOM)?.clone(), source_snapshot)
            .with_all(secondary);
        post_spawn_batch(world, dispatcher, &mut outcome, entities, cause, false);
    }

    Ok(outcome)
}

/// A chunk becoming active spawns its stored entities wholesale: one batch,
/// one event. Buffered block changes (fix-ups performed while the chunk
/// wakes) resolve as one block event rooted in the chunk position.
fn unwind_chunk_spawning(
    frame: &mut PhaseContext,
    world: &mut World,
    dispatcher: &mut dyn EventDispatcher,
    spawn_types: &SpawnTypeRegistry,
) -> Result<UnwindOutcome, TrackerError> {
    let mut outcome = UnwindOutcome::default();
    let source_snapshot = frame
        .first_named_entity(cause_keys::SOURCE)
        .map(|e| e.snapshot.clone());
    let secondary = frame.secondary_causes();

    let mut batch = frame.take_entities();
    batch.extend(frame.take_items());
    if !batch.is_empty() {
        let cause = Cause::spawning(
            spawn_types.get(spawn_ids::CHUNK_LOAD)?.clone(),
            source_snapshot,
        )
        .with_all(secondary.clone());
        post_spawn_batch(world, dispatcher, &mut outcome, batch, cause, false);
    }

    let blocks = frame.take_block_changes();
    if !blocks.is_empty() {
        let (root, named) = match frame.first_named(cause_keys::CHUNK) {
            Some(chunk) => (
                chunk.clone(),
                secondary
                    .into_iter()
                    .filter(|(k, _)| k != cause_keys::CHUNK)
                    .collect::<Vec<_>>(),
            ),
            None => (CauseValue::Note("chunk_spawning".to_owned()), secondary),
        };
        let cause = Cause::of(root).with_all(named);
        post_block_batch(world, dispatcher, &mut outcome, blocks, cause);
    }

    Ok(outcome)
}

/// Ticking frames batch whatever their logic produced, attributed to the
/// tick's source when one was recorded.
fn unwind_ticking(
    frame: &mut PhaseContext,
    world: &mut World,
    dispatcher: &mut dyn EventDispatcher,
    spawn_types: &SpawnTypeRegistry,
) -> Result<UnwindOutcome, TrackerError> {
    let mut outcome = UnwindOutcome::default();
    let source = frame.first_named(cause_keys::SOURCE).cloned();
    let source_snapshot = source
        .as_ref()
        .and_then(CauseValue::as_entity)
        .map(|e| e.snapshot.clone());
    let secondary = frame.secondary_causes();

    let entities = frame.take_entities();
    if !entities.is_empty() {
        let cause = Cause::spawning(
            spawn_types.get(spawn_ids::TICK)?.clone(),
            source_snapshot.clone(),
        )
        .with_all(secondary.clone());
        post_spawn_batch(world, dispatcher, &mut outcome, entities, cause, false);
    }

    let items = frame.take_items();
    if !items.is_empty() {
        let cause = Cause::spawning(
            spawn_types.get(spawn_ids::DROPPED_ITEM)?.clone(),
            source_snapshot,
        )
        .with_all(secondary.clone());
        post_spawn_batch(world, dispatcher, &mut outcome, items, cause, true);
    }

    let blocks = frame.take_block_changes();
    if !blocks.is_empty() {
        let root = source.unwrap_or_else(|| CauseValue::Note("tick".to_owned()));
        let cause = Cause::of(root).with_all(secondary);
        post_block_batch(world, dispatcher, &mut outcome, blocks, cause);
    }

    Ok(outcome)
}

/// Block interaction: the block event resolves first (whether the break or
/// placement happens at all), then any drops it produced.
fn unwind_interaction(
    frame: &mut PhaseContext,
    world: &mut World,
    dispatcher: &mut dyn EventDispatcher,
    spawn_types: &SpawnTypeRegistry,
) -> Result<UnwindOutcome, TrackerError> {
    let mut outcome = UnwindOutcome::default();
    let fallback = match frame.state() {
        PhaseState::BlockPlace => "block_place",
        _ => "block_break",
    };
    let root = frame
        .first_named(cause_keys::SOURCE)
        .cloned()
        .unwrap_or_else(|| CauseValue::Note(fallback.to_owned()));
    let source_snapshot = root.as_entity().map(|e| e.snapshot.clone());
    let secondary = frame.secondary_causes();

    let blocks = frame.take_block_changes();
    if !blocks.is_empty() {
        let cause = Cause::of(root.clone()).with_all(secondary.clone());
        post_block_batch(world, dispatcher, &mut outcome, blocks, cause);
    }

    let items = frame.take_items();
    if !items.is_empty() {
        let cause = Cause::spawning(
            spawn_types.get(spawn_ids::BLOCK_SPAWNING)?.clone(),
            source_snapshot.clone(),
        )
        .with_all(secondary.clone());
        post_spawn_batch(world, dispatcher, &mut outcome, items, cause, true);
    }

    let entities = frame.take_entities();
    if !entities.is_empty() {
        let cause = Cause::spawning(
            spawn_types.get(spawn_ids::BLOCK_SPAWNING)?.clone(),
            source_snapshot,
        )
        .with_all(secondary);
        post_spawn_batch(world, dispatcher, &mut outcome, entities, cause, false);
    }

    Ok(outcome)
}

/// Generation applies its block changes immediately (they are never
/// buffered), so only the population spawns remain to resolve -- one batch,
/// listeners may still veto it.
fn unwind_generation(
    frame: &mut PhaseContext,
    world: &mut World,
    dispatcher: &mut dyn EventDispatcher,
    spawn_types: &SpawnTypeRegistry,
) -> Result<UnwindOutcome, TrackerError> {
    let mut outcome = UnwindOutcome::default();
    let secondary = frame.secondary_causes();

    let mut batch = frame.take_entities();
    batch.extend(frame.take_items());
    if !batch.is_empty() {
        let cause = Cause::spawning(spawn_types.get(spawn_ids::WORLD_GENERATION)?.clone(), None)
            .with_all(secondary);
        post_spawn_batch(world, dispatcher, &mut outcome, batch, cause, false);
    }

    // A hand-built frame may still carry block captures; they are not
    // eventable in this family, apply them as-is.
    for change in frame.take_block_changes() {
        world.set_block_direct(change.pos, change.to);
        outcome.blocks_applied += 1;
    }

    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Posting helpers
// ---------------------------------------------------------------------------

/// Snapshot a batch, post it as one spawn or drop event, and apply the
/// surviving accept list through the direct entry point.
fn post_spawn_batch(
    world: &mut World,
    dispatcher: &mut dyn EventDispatcher,
    outcome: &mut UnwindOutcome,
    batch: Vec<Entity>,
    cause: Cause,
    as_items: bool,
) {
    let snapshots: Vec<EntitySnapshot> = batch.iter().map(Entity::snapshot).collect();
    let mut event = if as_items {
        WorldEvent::DropItems(DropItemsEvent {
            cause,
            items: batch,
            snapshots,
        })
    } else {
        WorldEvent::SpawnEntities(SpawnEntitiesEvent {
            cause,
            entities: batch,
            snapshots,
        })
    };

    outcome.events_posted += 1;
    let cancelled = post_and_then(dispatcher, &mut event, |ev| match ev {
        WorldEvent::SpawnEntities(e) => {
            for entity in e.entities.drain(..) {
                world.spawn_direct(entity);
                outcome.entities_spawned += 1;
            }
        }
        WorldEvent::DropItems(e) => {
            for item in e.items.drain(..) {
                world.spawn_direct(item);
                outcome.items_spawned += 1;
            }
        }
        WorldEvent::ChangeBlocks(_) => {}
    });
    if cancelled {
        outcome.events_cancelled += 1;
    }
}

/// Post a block-change batch as one event and apply the surviving changes.
fn post_block_batch(
    world: &mut World,
    dispatcher: &mut dyn EventDispatcher,
    outcome: &mut UnwindOutcome,
    changes: Vec<causeway_world::block::BlockChange>,
    cause: Cause,
) {
    let mut event = WorldEvent::ChangeBlocks(ChangeBlocksEvent { cause, changes });

    outcome.events_posted += 1;
    let cancelled = post_and_then(dispatcher, &mut event, |ev| {
        if let WorldEvent::ChangeBlocks(e) = ev {
            for change in e.changes.drain(..) {
                world.set_block_direct(change.pos, change.to);
                outcome.blocks_applied += 1;
            }
        }
    });
    if cancelled {
        outcome.events_cancelled += 1;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
