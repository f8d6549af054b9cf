//! Entity identifiers, positions, and pending entity values.
//!
//! An [`EntityId`] is a 64-bit handle that packs a *generation* counter in the
//! high 32 bits and an *index* in the low 32 bits. The generation is bumped
//! every time an index is recycled, which allows immediate stale-ID detection.
//!
//! An [`Entity`] is a plain value: the full data of a game object that may or
//! may not currently live in a [`World`](crate::world::World). Capture
//! machinery holds `Entity` values that have not yet been assigned an
//! [`EntityId`]; the id is only allocated when the entity actually enters
//! world state.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::properties::PropertyMap;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A generational entity identifier.
///
/// Layout: `[generation: u32 | index: u32]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Construct an `EntityId` from an index and generation.
    #[inline]
    pub fn new(index: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | index as u64)
    }

    /// The index portion (low 32 bits).
    #[inline]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    /// The generation portion (high 32 bits).
    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A world-space position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// The full data of a game object.
///
/// `entity_type` names an entry in the
/// [`EntityTypeRegistry`](crate::catalog::EntityTypeRegistry); the registry,
/// not the entity, knows the type's category (item, experience orb, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Catalog id of this entity's type (e.g. `"zombie"`, `"item"`).
    pub entity_type: String,
    /// Current world-space position.
    pub position: Position,
    /// Typed named attributes (fuse duration, explosion radius, ...).
    pub properties: PropertyMap,
}

impl Entity {
    /// Create an entity of the given type at a position, with no properties.
    pub fn new(entity_type: impl Into<String>, position: Position) -> Self {
        Self {
            entity_type: entity_type.into(),
            position,
            properties: PropertyMap::new(),
        }
    }

    /// Attach a property value, consuming and returning the entity.
    ///
    /// Intended for construction sites; fails only if the value cannot be
    /// serialized, which for plain data types cannot happen.
    pub fn with_property<T: Serialize>(
        mut self,
        key: &str,
        value: T,
    ) -> Result<Self, crate::WorldError> {
        self.properties.set(key, value)?;
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Allocates and recycles [`EntityId`]s with generational tracking.
///
/// Free indices are kept in a FIFO queue so that generations are spread out
/// over time rather than concentrated on a hot index.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    /// Current generation for each index slot.
    generations: Vec<u32>,
    /// Whether the slot is currently alive.
    alive: Vec<bool>,
    /// Free-list of recyclable indices (FIFO queue).
    free_indices: VecDeque<u32>,
}

impl EntityAllocator {
    /// Create a new, empty allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh [`EntityId`].
    ///
    /// If a recycled index is available it will be reused with an incremented
    /// generation; otherwise a brand-new index is created.
    pub fn allocate(&mut self) -> EntityId {
        if let Some(index) = self.free_indices.pop_front() {
            // Reuse recycled index -- generation was already bumped on despawn.
            self.alive[index as usize] = true;
            EntityId::new(index, self.generations[index as usize])
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            self.alive.push(true);
            EntityId::new(index, 0)
        }
    }

    /// Deallocate (despawn) an entity, incrementing the generation for that
    /// index so that any outstanding handles become stale.
    ///
    /// Returns `true` if the entity was alive and is now despawned,
    /// `false` if it was already dead or had a stale generation.
    pub fn deallocate(&mut self, id: EntityId) -> bool {
        let idx = id.index() as usize;
        if idx >= self.generations.len() {
            return false;
        }
        if self.generations[idx] != id.generation() || !self.alive[idx] {
            return false;
        }
        self.alive[idx] = false;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.free_indices.push_back(id.index());
        true
    }

    /// Whether the given id refers to a currently-alive entity.
    pub fn is_alive(&self, id: EntityId) -> bool {
        let idx = id.index() as usize;
        idx < self.generations.len()
            && self.alive[idx]
            && self.generations[idx] == id.generation()
    }

    /// Number of currently-alive entities.
    pub fn alive_count(&self) -> usize {
        self.alive.iter().filter(|a| **a).count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
