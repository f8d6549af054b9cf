//! Catalog registries: stable name -> type lookup tables populated at startup.
//!
//! The tracker consumes these only to classify captured entities and to tag
//! cause chains; gameplay code registers its own types during world setup.
//! Registries are plain values passed in at construction time -- there are no
//! global lazily-constructed holders.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::WorldError;

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// A string-id keyed lookup table.
///
/// Ids are unique; registering an id twice is rejected so a startup module
/// cannot silently shadow another's entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog<T> {
    entries: BTreeMap<String, T>,
}

impl<T> Default for Catalog<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> Catalog<T> {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Register `value` under `id`. Fails if `id` is already taken.
    pub fn register(&mut self, id: impl Into<String>, value: T) -> Result<(), WorldError> {
        let id = id.into();
        if self.entries.contains_key(&id) {
            return Err(WorldError::DuplicateCatalogId { id });
        }
        self.entries.insert(id, value);
        Ok(())
    }

    /// Look up the entry registered under `id`.
    pub fn get(&self, id: &str) -> Option<&T> {
        self.entries.get(id)
    }

    /// All registered ids, in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// EntityType
// ---------------------------------------------------------------------------

/// Broad classification of an entity type, used when partitioning captured
/// entities into cause-specific groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityCategory {
    /// A dropped item entity.
    Item,
    /// An experience orb.
    ExperienceOrb,
    /// A living creature.
    Living,
    /// A projectile in flight.
    Projectile,
    /// Anything else (primed explosives, falling blocks, ...).
    Other,
}

/// A registered entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityType {
    /// Catalog id, e.g. `"zombie"`.
    pub id: String,
    /// Category used for capture routing and unwind partitioning.
    pub category: EntityCategory,
}

/// Name -> [`EntityType`] lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityTypeRegistry {
    catalog: Catalog<EntityType>,
}

impl EntityTypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with the built-in types.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let defaults = [
            ("item", EntityCategory::Item),
            ("experience_orb", EntityCategory::ExperienceOrb),
            ("zombie", EntityCategory::Living),
            ("skeleton", EntityCategory::Living),
            ("creeper", EntityCategory::Living),
            ("pig", EntityCategory::Living),
            ("bat", EntityCategory::Living),
            ("arrow", EntityCategory::Projectile),
            ("fireball", EntityCategory::Projectile),
            ("tnt", EntityCategory::Other),
            ("falling_block", EntityCategory::Other),
        ];
        for (id, category) in defaults {
            // Ids are distinct literals; registration cannot collide.
            let _ = registry.register(EntityType {
                id: id.to_owned(),
                category,
            });
        }
        registry
    }

    /// Register an entity type under its own id.
    pub fn register(&mut self, entity_type: EntityType) -> Result<(), WorldError> {
        self.catalog.register(entity_type.id.clone(), entity_type)
    }

    /// Look up a type by id, with a context-rich error on miss.
    pub fn get(&self, id: &str) -> Result<&EntityType, WorldError> {
        self.catalog.get(id).ok_or_else(|| WorldError::UnknownEntityType {
            name: id.to_owned(),
            registered: self.catalog.ids().collect::<Vec<_>>().join(", "),
        })
    }

    /// The category of the type registered under `id`.
    pub fn category(&self, id: &str) -> Result<EntityCategory, WorldError> {
        self.get(id).map(|t| t.category)
    }
}

// ---------------------------------------------------------------------------
// SpawnType
// ---------------------------------------------------------------------------

/// Well-known spawn type ids. Used as primary-cause tags on spawn events.
pub mod spawn_types {
    pub const DROPPED_ITEM: &str = "dropped_item";
    pub const EXPERIENCE: &str = "experience";
    pub const ENTITY_DEATH: &str = "entity_death";
    pub const CHUNK_LOAD: &str = "chunk_load";
    pub const WORLD_GENERATION: &str = "world_generation";
    pub const BLOCK_SPAWNING: &str = "block_spawning";
    pub const PLACEMENT: &str = "placement";
    pub const DISPENSE: &str = "dispense";
    pub const TICK: &str = "tick";
    pub const CUSTOM: &str = "custom";
}

/// A semantic tag describing *why* a batch of entities is spawning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpawnType {
    /// Catalog id, e.g. `"dropped_item"`.
    pub id: String,
}

/// Name -> [`SpawnType`] lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpawnTypeRegistry {
    catalog: Catalog<SpawnType>,
}

impl SpawnTypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with the built-in spawn types.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for id in [
            spawn_types::DROPPED_ITEM,
            spawn_types::EXPERIENCE,
            spawn_types::ENTITY_DEATH,
            spawn_types::CHUNK_LOAD,
            spawn_types::WORLD_GENERATION,
            spawn_types::BLOCK_SPAWNING,
            spawn_types::PLACEMENT,
            spawn_types::DISPENSE,
            spawn_types::TICK,
            spawn_types::CUSTOM,
        ] {
            let _ = registry.catalog.register(id, SpawnType { id: id.to_owned() });
        }
        registry
    }

    /// Register a custom spawn type under its own id.
    pub fn register(&mut self, spawn_type: SpawnType) -> Result<(), WorldError> {
        self.catalog.register(spawn_type.id.clone(), spawn_type)
    }

    /// Look up a spawn type by id.
    pub fn get(&self, id: &str) -> Result<&SpawnType, WorldError> {
        self.catalog
            .get(id)
            .ok_or_else(|| WorldError::UnknownSpawnType { name: id.to_owned() })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
