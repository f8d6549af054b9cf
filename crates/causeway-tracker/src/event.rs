//! Cancellable events and the dispatch collaborator contract.
//!
//! The unwind engine depends only on a two-valued contract: post an event,
//! learn whether it was cancelled. Listeners receive the event mutably and
//! may filter its accept list (the `entities`/`items`/`changes` vector)
//! before returning; the snapshot list stays immutable so consumers always
//! see capture-time state.

use serde::{Deserialize, Serialize};

use causeway_world::block::BlockChange;
use causeway_world::entity::Entity;
use causeway_world::snapshot::EntitySnapshot;

use crate::cause::Cause;

// ---------------------------------------------------------------------------
// Event payloads
// ---------------------------------------------------------------------------

/// A batch of entities about to spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnEntitiesEvent {
    pub cause: Cause,
    /// Mutable accept list: entities remaining here after dispatch are
    /// applied to world state.
    pub entities: Vec<Entity>,
    /// Immutable capture-time snapshots, index-aligned with the accept list
    /// as originally built.
    pub snapshots: Vec<EntitySnapshot>,
}

/// A batch of item entities about to drop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropItemsEvent {
    pub cause: Cause,
    /// Mutable accept list.
    pub items: Vec<Entity>,
    /// Immutable capture-time snapshots.
    pub snapshots: Vec<EntitySnapshot>,
}

/// A batch of block changes about to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeBlocksEvent {
    pub cause: Cause,
    /// Mutable accept list: changes remaining here after dispatch are
    /// applied to world state.
    pub changes: Vec<BlockChange>,
}

// ---------------------------------------------------------------------------
// WorldEvent
// ---------------------------------------------------------------------------

/// The closed set of events the unwind engine emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    SpawnEntities(SpawnEntitiesEvent),
    DropItems(DropItemsEvent),
    ChangeBlocks(ChangeBlocksEvent),
}

impl WorldEvent {
    /// The event's cause chain.
    pub fn cause(&self) -> &Cause {
        match self {
            WorldEvent::SpawnEntities(e) => &e.cause,
            WorldEvent::DropItems(e) => &e.cause,
            WorldEvent::ChangeBlocks(e) => &e.cause,
        }
    }

    /// A short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            WorldEvent::SpawnEntities(_) => "spawn_entities",
            WorldEvent::DropItems(_) => "drop_items",
            WorldEvent::ChangeBlocks(_) => "change_blocks",
        }
    }
}

// ---------------------------------------------------------------------------
// EventDispatcher
// ---------------------------------------------------------------------------

/// The external event-dispatch collaborator.
///
/// Implementations run whatever listener machinery the host has; the tracker
/// only needs the return value. `true` means cancelled: the captured effects
/// behind the event are discarded and never enter world state.
pub trait EventDispatcher {
    fn post(&mut self, event: &mut WorldEvent) -> bool;
}

/// A dispatcher with no listeners. Never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDispatcher;

impl EventDispatcher for NullDispatcher {
    fn post(&mut self, _event: &mut WorldEvent) -> bool {
        false
    }
}

/// Post `event` and invoke `apply` only when it was not cancelled.
///
/// Returns whether the event was cancelled.
pub fn post_and_then<F>(
    dispatcher: &mut dyn EventDispatcher,
    event: &mut WorldEvent,
    apply: F,
) -> bool
where
    F: FnOnce(&mut WorldEvent),
{
    let cancelled = dispatcher.post(event);
    if !cancelled {
        apply(event);
    }
    cancelled
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
