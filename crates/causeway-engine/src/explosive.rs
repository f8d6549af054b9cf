//! Fused-explosive helpers built on the property store.
//!
//! A fused explosive carries `fuse_duration` and `explosion_radius`
//! properties. Priming starts the fuse; each tick of the fuse counts down;
//! at zero the device detonates inside a block-interaction frame, so the
//! blast's block damage and debris drops resolve as cancellable events like
//! any other tracked operation.

use rand::Rng;
use tracing::debug;

use causeway_tracker::cause::{cause_keys, CauseValue, DamageKind, DamageSource, EntityCause};
use causeway_tracker::context::PhaseContext;
use causeway_tracker::state::PhaseState;
use causeway_tracker::unwind::UnwindOutcome;
use causeway_world::block::{BlockPos, BlockState};
use causeway_world::entity::{Entity, EntityId};
use causeway_world::properties::keys;
use causeway_world::world::World;

use crate::tick::SimContext;
use crate::EngineError;

/// Fuse length applied when the entity carries no `fuse_duration`.
pub const DEFAULT_FUSE_TICKS: u32 = 80;

/// Blast radius applied when the entity carries no `explosion_radius`.
pub const DEFAULT_EXPLOSION_RADIUS: f64 = 4.0;

// ---------------------------------------------------------------------------
// Fuse control
// ---------------------------------------------------------------------------

/// Prime the explosive: mark it primed and start its fuse.
///
/// Re-priming an already-primed device restarts the fuse.
pub fn prime(world: &mut World, id: EntityId) -> Result<(), EngineError> {
    let entity = world
        .entity_mut(id)
        .ok_or(EngineError::MissingEntity { entity: id })?;
    let fuse: u32 = entity
        .properties
        .get(keys::FUSE_DURATION)?
        .unwrap_or(DEFAULT_FUSE_TICKS);
    entity.properties.set(keys::PRIMED, true)?;
    entity.properties.set(keys::FUSE_TICKS_REMAINING, fuse)?;
    debug!(entity = %id, fuse, "explosive primed");
    Ok(())
}

/// Defuse the explosive. Returns whether it was primed.
pub fn defuse(world: &mut World, id: EntityId) -> Result<bool, EngineError> {
    let entity = world
        .entity_mut(id)
        .ok_or(EngineError::MissingEntity { entity: id })?;
    let was_primed = entity.properties.get(keys::PRIMED)?.unwrap_or(false);
    entity.properties.set(keys::PRIMED, false)?;
    entity.properties.remove(keys::FUSE_TICKS_REMAINING);
    Ok(was_primed)
}

/// Whether the explosive is currently primed.
pub fn is_primed(world: &World, id: EntityId) -> Result<bool, EngineError> {
    let entity = world
        .entity(id)
        .ok_or(EngineError::MissingEntity { entity: id })?;
    Ok(entity.properties.get(keys::PRIMED)?.unwrap_or(false))
}

/// Advance a primed explosive's fuse by one tick, detonating at zero.
///
/// Returns the detonation outcome when it fired, `None` while the fuse is
/// still burning or the device is not primed.
pub fn tick_fuse(
    sim: &mut SimContext<'_>,
    id: EntityId,
) -> Result<Option<UnwindOutcome>, EngineError> {
    let entity = sim
        .world
        .entity_mut(id)
        .ok_or(EngineError::MissingEntity { entity: id })?;
    if !entity.properties.get(keys::PRIMED)?.unwrap_or(false) {
        return Ok(None);
    }
    let remaining: u32 = entity
        .properties
        .get(keys::FUSE_TICKS_REMAINING)?
        .unwrap_or(0);
    if remaining > 1 {
        entity
            .properties
            .set(keys::FUSE_TICKS_REMAINING, remaining - 1)?;
        return Ok(None);
    }
    detonate(sim, id).map(Some)
}

// ---------------------------------------------------------------------------
// Detonation
// ---------------------------------------------------------------------------

/// Detonate the explosive now.
///
/// The device itself is consumed unconditionally; the blast's block damage
/// and debris drops run inside a block-break frame, so listeners can veto
/// or filter them before any of it reaches world state.
pub fn detonate(sim: &mut SimContext<'_>, id: EntityId) -> Result<UnwindOutcome, EngineError> {
    let entity = sim
        .world
        .entity(id)
        .ok_or(EngineError::MissingEntity { entity: id })?;
    let radius: f64 = entity
        .properties
        .get(keys::EXPLOSION_RADIUS)?
        .unwrap_or(DEFAULT_EXPLOSION_RADIUS);
    let center = entity.position;
    let snapshot = entity.snapshot();

    // The device is spent whether or not listeners allow the damage.
    sim.world.despawn(id)?;

    sim.push(
        PhaseContext::new(PhaseState::BlockBreak)
            .with_cause(
                cause_keys::SOURCE,
                CauseValue::Entity(EntityCause { id, snapshot }),
            )?
            .with_cause(
                cause_keys::DAMAGE_SOURCE,
                CauseValue::Damage(DamageSource::new(DamageKind::Explosion)),
            )?,
    )?;

    let result = raze_blocks(sim, center.x, center.y, center.z, radius);
    match result {
        Ok(()) => Ok(sim.pop(PhaseState::BlockBreak)?),
        Err(e) => {
            sim.tracker.abandon(PhaseState::BlockBreak)?;
            Err(e)
        }
    }
}

/// Clear every non-air block within `radius` of the center, capturing a
/// debris drop for each destroyed block.
fn raze_blocks(
    sim: &mut SimContext<'_>,
    cx: f64,
    cy: f64,
    cz: f64,
    radius: f64,
) -> Result<(), EngineError> {
    let r = radius.ceil() as i32;
    let origin = BlockPos::new(cx.floor() as i32, cy.floor() as i32, cz.floor() as i32);

    for dx in -r..=r {
        for dy in -r..=r {
            for dz in -r..=r {
                let dist2 = f64::from(dx * dx + dy * dy + dz * dz);
                if dist2 > radius * radius {
                    continue;
                }
                let pos = BlockPos::new(origin.x + dx, origin.y + dy, origin.z + dz);
                if sim.world.block(pos).is_air() {
                    continue;
                }
                sim.set_block(pos, BlockState::air());
                // Debris has a chance to survive the blast as a drop.
                if sim.rng.gen_bool(0.3) {
                    sim.spawn(Entity::new(
                        "item",
                        causeway_world::entity::Position::new(
                            f64::from(pos.x) + 0.5,
                            f64::from(pos.y) + 0.5,
                            f64::from(pos.z) + 0.5,
                        ),
                    ))?;
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
