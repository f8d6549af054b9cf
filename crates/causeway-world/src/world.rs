//! The game world: entity store, sparse block grid, and the *direct*
//! mutation entry points.
//!
//! The direct entry points ([`World::spawn_direct`],
//! [`World::set_block_direct`]) apply state immediately and never consult
//! phase tracking. Ordinary game logic must not call them while a capturing
//! phase is active -- it goes through the tracker's intercepted entry points
//! instead, which buffer the mutation and re-enter the world here only for
//! effects that survived event dispatch. Keeping the two paths distinct is
//! what prevents unwind from recursively recapturing its own applications.

use std::collections::HashMap;

use tracing::trace;

use crate::block::{BlockPos, BlockState};
use crate::entity::{Entity, EntityAllocator, EntityId};
use crate::WorldError;

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// All mutable state for one simulated world.
///
/// Advanced by exactly one logical simulation thread; no interior locking.
#[derive(Debug, Default)]
pub struct World {
    allocator: EntityAllocator,
    entities: HashMap<EntityId, Entity>,
    /// Sparse block grid; unset positions read as air.
    blocks: HashMap<BlockPos, BlockState>,
}

impl World {
    /// Create a new, empty world.
    pub fn new() -> Self {
        Self::default()
    }

    // -- entities -----------------------------------------------------------

    /// Insert `entity` into world state immediately, bypassing capture.
    ///
    /// This is the unwind engine's application path and the pass-through for
    /// spawns performed while no phase is active.
    pub fn spawn_direct(&mut self, entity: Entity) -> EntityId {
        let id = self.allocator.allocate();
        trace!(entity = %id, entity_type = %entity.entity_type, "spawned");
        self.entities.insert(id, entity);
        id
    }

    /// Remove an entity from world state, returning its final data.
    pub fn despawn(&mut self, id: EntityId) -> Result<Entity, WorldError> {
        if !self.allocator.deallocate(id) {
            return Err(WorldError::StaleEntity { entity: id });
        }
        self.entities
            .remove(&id)
            .ok_or(WorldError::StaleEntity { entity: id })
    }

    /// Whether `id` refers to a currently-alive entity.
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.allocator.is_alive(id)
    }

    /// Shared access to an entity's data.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Mutable access to an entity's data.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Number of alive entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Ids of all alive entities of the given type, sorted for determinism.
    pub fn entities_of_type(&self, entity_type: &str) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|(_, e)| e.entity_type == entity_type)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    // -- blocks -------------------------------------------------------------

    /// The block state at `pos` (air if unset).
    pub fn block(&self, pos: BlockPos) -> BlockState {
        self.blocks.get(&pos).cloned().unwrap_or_default()
    }

    /// Set the block at `pos` immediately, bypassing capture.
    ///
    /// Returns the previous state. Setting air removes the entry so the grid
    /// stays sparse.
    pub fn set_block_direct(&mut self, pos: BlockPos, state: BlockState) -> BlockState {
        if state.is_air() {
            self.blocks.remove(&pos).unwrap_or_default()
        } else {
            self.blocks.insert(pos, state).unwrap_or_default()
        }
    }

    /// Number of non-air block positions.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    // -- state digest -------------------------------------------------------

    /// Deterministic blake3 digest of the full world state.
    ///
    /// Entities and blocks are folded in sorted order so two worlds with
    /// identical state always hash identically. Used by tests and by
    /// determinism tooling to prove that an operation performed zero
    /// mutations.
    pub fn state_digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();

        hasher.update(&(self.entities.len() as u64).to_le_bytes());
        let mut ids: Vec<EntityId> = self.entities.keys().copied().collect();
        ids.sort();
        for id in ids {
            hasher.update(&id.to_raw().to_le_bytes());
            if let Some(entity) = self.entities.get(&id) {
                hasher.update(entity.entity_type.as_bytes());
                hasher.update(&entity.position.x.to_le_bytes());
                hasher.update(&entity.position.y.to_le_bytes());
                hasher.update(&entity.position.z.to_le_bytes());
                for (key, value) in entity.properties.raw() {
                    hasher.update(key.as_bytes());
                    hasher.update(value.to_string().as_bytes());
                }
            }
        }

        hasher.update(&(self.blocks.len() as u64).to_le_bytes());
        let mut positions: Vec<BlockPos> = self.blocks.keys().copied().collect();
        positions.sort();
        for pos in positions {
            hasher.update(&pos.x.to_le_bytes());
            hasher.update(&pos.y.to_le_bytes());
            hasher.update(&pos.z.to_le_bytes());
            if let Some(state) = self.blocks.get(&pos) {
                hasher.update(state.name().as_bytes());
            }
        }

        hasher.finalize().to_hex().to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Position;

    fn zombie_at(x: f64) -> Entity {
        Entity::new("zombie", Position::new(x, 64.0, 0.0))
    }

    // -- 1. Spawn / despawn -------------------------------------------------

    #[test]
    fn spawn_direct_then_despawn() {
        let mut world = World::new();
        let id = world.spawn_direct(zombie_at(0.0));
        assert!(world.is_alive(id));
        assert_eq!(world.entity_count(), 1);

        let data = world.despawn(id).unwrap();
        assert_eq!(data.entity_type, "zombie");
        assert!(!world.is_alive(id));
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn despawn_stale_id_is_an_error() {
        let mut world = World::new();
        let id = world.spawn_direct(zombie_at(0.0));
        world.despawn(id).unwrap();
        assert!(matches!(
            world.despawn(id),
            Err(WorldError::StaleEntity { .. })
        ));
    }

    #[test]
    fn entities_of_type_filters_and_sorts() {
        let mut world = World::new();
        let z1 = world.spawn_direct(zombie_at(0.0));
        let _pig = world.spawn_direct(Entity::new("pig", Position::default()));
        let z2 = world.spawn_direct(zombie_at(1.0));

        assert_eq!(world.entities_of_type("zombie"), vec![z1, z2]);
        assert!(world.entities_of_type("creeper").is_empty());
    }

    // -- 2. Blocks ----------------------------------------------------------

    #[test]
    fn unset_block_reads_as_air() {
        let world = World::new();
        assert!(world.block(BlockPos::new(0, 0, 0)).is_air());
    }

    #[test]
    fn set_block_returns_previous_state() {
        let mut world = World::new();
        let pos = BlockPos::new(1, 2, 3);

        let prev = world.set_block_direct(pos, BlockState::named("stone"));
        assert!(prev.is_air());

        let prev = world.set_block_direct(pos, BlockState::named("dirt"));
        assert_eq!(prev, BlockState::named("stone"));
        assert_eq!(world.block_count(), 1);
    }

    #[test]
    fn setting_air_clears_the_position() {
        let mut world = World::new();
        let pos = BlockPos::new(0, 0, 0);
        world.set_block_direct(pos, BlockState::named("stone"));
        world.set_block_direct(pos, BlockState::air());
        assert_eq!(world.block_count(), 0);
        assert!(world.block(pos).is_air());
    }

    // -- 3. State digest ----------------------------------------------------

    #[test]
    fn digest_is_stable_for_identical_state() {
        let build = || {
            let mut world = World::new();
            world.spawn_direct(zombie_at(5.0));
            world.set_block_direct(BlockPos::new(0, 60, 0), BlockState::named("stone"));
            world
        };
        assert_eq!(build().state_digest(), build().state_digest());
    }

    #[test]
    fn digest_changes_on_any_mutation() {
        let mut world = World::new();
        let before = world.state_digest();

        world.spawn_direct(zombie_at(0.0));
        let after_spawn = world.state_digest();
        assert_ne!(before, after_spawn);

        world.set_block_direct(BlockPos::new(0, 0, 0), BlockState::named("stone"));
        assert_ne!(after_spawn, world.state_digest());
    }
}
