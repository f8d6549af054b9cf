//! Immutable point-in-time entity snapshots.
//!
//! Event consumers must see the state an entity held when it was captured,
//! not a live, still-mutable handle. An [`EntitySnapshot`] is taken during
//! unwind, just before the entity is offered to listeners.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entity::{Entity, Position};

// ---------------------------------------------------------------------------
// EntitySnapshot
// ---------------------------------------------------------------------------

/// A frozen copy of an entity's data.
///
/// Properties are copied into a `BTreeMap` for deterministic serialization
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Catalog id of the entity's type.
    pub entity_type: String,
    /// Position at snapshot time.
    pub position: Position,
    /// Property values at snapshot time.
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl Entity {
    /// Take an immutable snapshot of this entity's current state.
    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            entity_type: self.entity_type.clone(),
            position: self.position,
            properties: self.properties.raw().clone(),
        }
    }
}
