//! Causeway World -- game world state and collaborator services.
//!
//! This crate holds everything the phase-tracking core treats as an external
//! collaborator: the [`World`](world::World) itself (entities plus a sparse
//! block grid) with its *direct* mutation entry points, immutable
//! [`EntitySnapshot`](snapshot::EntitySnapshot)s, the typed property-value
//! store, and the catalog registries populated at startup.
//!
//! # Quick Start
//!
//! ```
//! use causeway_world::prelude::*;
//!
//! let mut world = World::new();
//! let id = world.spawn_direct(Entity::new("zombie", Position::new(0.0, 64.0, 0.0)));
//! assert!(world.is_alive(id));
//!
//! world.set_block_direct(BlockPos::new(0, 63, 0), BlockState::named("stone"));
//! assert_eq!(world.block(BlockPos::new(0, 63, 0)), BlockState::named("stone"));
//! ```

#![deny(unsafe_code)]

pub mod block;
pub mod catalog;
pub mod entity;
pub mod properties;
pub mod snapshot;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by world and collaborator operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The entity does not exist (stale generation or never allocated).
    #[error("entity {entity:?} does not exist (stale or never allocated)")]
    StaleEntity {
        entity: entity::EntityId,
    },

    /// An entity type was referenced that has not been registered.
    #[error("entity type '{name}' not registered. Registered types: [{registered}]")]
    UnknownEntityType {
        name: String,
        registered: String,
    },

    /// A spawn type was referenced that has not been registered.
    #[error("spawn type '{name}' not registered")]
    UnknownSpawnType {
        name: String,
    },

    /// A catalog id was registered twice.
    #[error("catalog id '{id}' is already registered")]
    DuplicateCatalogId {
        id: String,
    },

    /// Deserialization of a stored property value failed.
    #[error("failed to deserialize property '{key}': {details}")]
    PropertyDeserialization {
        key: String,
        details: String,
    },

    /// Serialization of a property value failed.
    #[error("failed to serialize property '{key}': {details}")]
    PropertySerialization {
        key: String,
        details: String,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::block::{BlockChange, BlockPos, BlockState, ChunkPos};
    pub use crate::catalog::{
        spawn_types, Catalog, EntityCategory, EntityType, EntityTypeRegistry, SpawnType,
        SpawnTypeRegistry,
    };
    pub use crate::entity::{Entity, EntityId, Position};
    pub use crate::properties::{keys, PropertyMap};
    pub use crate::snapshot::EntitySnapshot;
    pub use crate::world::World;
    pub use crate::WorldError;
}
