//! Phase contexts: one stack frame of tracked execution.
//!
//! A [`PhaseContext`] owns the frame's capture buffers and its named causal
//! objects. Buffers are allocated lazily on first capture -- most frames
//! never populate most buffer kinds, and frames are created at very high
//! frequency while the simulation runs, so eager allocation would be pure
//! waste.

use std::collections::BTreeMap;

use causeway_world::block::BlockChange;
use causeway_world::entity::Entity;

use crate::cause::{cause_keys, CauseValue, DamageSource, EntityCause};
use crate::state::PhaseState;
use crate::TrackerError;

// ---------------------------------------------------------------------------
// CaptureBuffers
// ---------------------------------------------------------------------------

/// Per-category accumulators for one frame.
///
/// Append-only during the frame's lifetime; each buffer is drained exactly
/// once during unwind (a drained buffer reads as empty afterwards).
#[derive(Debug, Default)]
pub struct CaptureBuffers {
    entities: Option<Vec<Entity>>,
    items: Option<Vec<Entity>>,
    blocks: Option<Vec<BlockChange>>,
}

impl CaptureBuffers {
    fn push_entity(&mut self, entity: Entity) {
        self.entities.get_or_insert_with(Vec::new).push(entity);
    }

    fn push_item(&mut self, item: Entity) {
        self.items.get_or_insert_with(Vec::new).push(item);
    }

    fn push_block(&mut self, change: BlockChange) {
        self.blocks.get_or_insert_with(Vec::new).push(change);
    }

    fn has_entities(&self) -> bool {
        self.entities.as_ref().is_some_and(|v| !v.is_empty())
    }

    fn has_items(&self) -> bool {
        self.items.as_ref().is_some_and(|v| !v.is_empty())
    }

    fn has_blocks(&self) -> bool {
        self.blocks.as_ref().is_some_and(|v| !v.is_empty())
    }
}

// ---------------------------------------------------------------------------
// PhaseContext
// ---------------------------------------------------------------------------

/// One frame on the phase stack.
///
/// Created when a traceable operation begins and destroyed when that
/// operation's logic unit finishes, at which point its buffers are handed to
/// the unwind engine and released.
#[derive(Debug)]
pub struct PhaseContext {
    state: PhaseState,
    buffers: CaptureBuffers,
    causes: BTreeMap<String, CauseValue>,
}

impl PhaseContext {
    /// Create a frame for the given state with no captures and no causes.
    pub fn new(state: PhaseState) -> Self {
        Self {
            state,
            buffers: CaptureBuffers::default(),
            causes: BTreeMap::new(),
        }
    }

    /// The state this frame was created with.
    pub fn state(&self) -> PhaseState {
        self.state
    }

    // -- causes -------------------------------------------------------------

    /// Register a named causal object on this frame.
    ///
    /// Each name may be set at most once per frame.
    pub fn add_cause(
        &mut self,
        key: impl Into<String>,
        value: CauseValue,
    ) -> Result<(), TrackerError> {
        let key = key.into();
        if self.causes.contains_key(&key) {
            return Err(TrackerError::DuplicateCause { key });
        }
        self.causes.insert(key, value);
        Ok(())
    }

    /// Builder-style [`add_cause`](Self::add_cause) for frame assembly at
    /// push sites.
    pub fn with_cause(
        mut self,
        key: impl Into<String>,
        value: CauseValue,
    ) -> Result<Self, TrackerError> {
        self.add_cause(key, value)?;
        Ok(self)
    }

    /// The causal object registered under `key`; fails if absent.
    pub fn named(&self, key: &str) -> Result<&CauseValue, TrackerError> {
        self.causes.get(key).ok_or_else(|| TrackerError::MissingCause {
            key: key.to_owned(),
            state: self.state,
        })
    }

    /// The causal object registered under `key`, if any.
    pub fn first_named(&self, key: &str) -> Option<&CauseValue> {
        self.causes.get(key)
    }

    /// The entity cause registered under `key`; fails if absent or if the
    /// stored value is not an entity.
    pub fn named_entity(&self, key: &str) -> Result<&EntityCause, TrackerError> {
        match self.named(key)? {
            CauseValue::Entity(e) => Ok(e),
            other => Err(TrackerError::CauseTypeMismatch {
                key: key.to_owned(),
                expected: "entity",
                found: other.kind_name(),
            }),
        }
    }

    /// The damage source registered under `key`; fails if absent or
    /// wrong-typed.
    pub fn named_damage(&self, key: &str) -> Result<&DamageSource, TrackerError> {
        match self.named(key)? {
            CauseValue::Damage(d) => Ok(d),
            other => Err(TrackerError::CauseTypeMismatch {
                key: key.to_owned(),
                expected: "damage source",
                found: other.kind_name(),
            }),
        }
    }

    /// Optional entity lookup: absent (or wrong-typed) reads as `None`, for
    /// logic that may legitimately run without the cause.
    pub fn first_named_entity(&self, key: &str) -> Option<&EntityCause> {
        self.first_named(key).and_then(CauseValue::as_entity)
    }

    /// All named causes except the primary `source`, for carrying into an
    /// event's cause chain as secondary causes.
    pub fn secondary_causes(&self) -> Vec<(String, CauseValue)> {
        self.causes
            .iter()
            .filter(|(k, _)| k.as_str() != cause_keys::SOURCE)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    // -- captures -----------------------------------------------------------

    /// Buffer a pending entity spawn.
    pub fn capture_entity(&mut self, entity: Entity) {
        self.buffers.push_entity(entity);
    }

    /// Buffer a pending item-entity spawn.
    pub fn capture_item(&mut self, item: Entity) {
        self.buffers.push_item(item);
    }

    /// Buffer a pending block change.
    pub fn capture_block_change(&mut self, change: BlockChange) {
        self.buffers.push_block(change);
    }

    /// Whether any entities were captured and not yet drained.
    pub fn has_captured_entities(&self) -> bool {
        self.buffers.has_entities()
    }

    /// Whether any items were captured and not yet drained.
    pub fn has_captured_items(&self) -> bool {
        self.buffers.has_items()
    }

    /// Whether any block changes were captured and not yet drained.
    pub fn has_captured_blocks(&self) -> bool {
        self.buffers.has_blocks()
    }

    /// Whether all buffers are empty (or already drained).
    pub fn is_capture_empty(&self) -> bool {
        !self.has_captured_entities() && !self.has_captured_items() && !self.has_captured_blocks()
    }

    /// Drain the entity buffer. Subsequent drains return nothing.
    pub fn take_entities(&mut self) -> Vec<Entity> {
        self.buffers.entities.take().unwrap_or_default()
    }

    /// Drain the item buffer. Subsequent drains return nothing.
    pub fn take_items(&mut self) -> Vec<Entity> {
        self.buffers.items.take().unwrap_or_default()
    }

    /// Drain the block-change buffer. Subsequent drains return nothing.
    pub fn take_block_changes(&mut self) -> Vec<BlockChange> {
        self.buffers.blocks.take().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use causeway_world::block::{BlockPos, BlockState};
    use causeway_world::entity::Position;

    use crate::cause::{DamageKind, EntityCause};
    use causeway_world::entity::EntityId;

    fn entity(kind: &str) -> Entity {
        Entity::new(kind, Position::default())
    }

    fn entity_cause() -> CauseValue {
        CauseValue::Entity(EntityCause {
            id: EntityId::new(0, 0),
            snapshot: entity("zombie").snapshot(),
        })
    }

    // -- 1. Lazy buffers -----------------------------------------------------

    #[test]
    fn buffers_start_empty_and_unallocated() {
        let ctx = PhaseContext::new(PhaseState::DropItem);
        assert!(ctx.is_capture_empty());
        assert!(!ctx.has_captured_entities());
        assert!(!ctx.has_captured_items());
        assert!(!ctx.has_captured_blocks());
    }

    #[test]
    fn capture_appends_in_order() {
        let mut ctx = PhaseContext::new(PhaseState::DeathDropsSpawning);
        ctx.capture_entity(entity("zombie"));
        ctx.capture_entity(entity("pig"));

        let drained = ctx.take_entities();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].entity_type, "zombie");
        assert_eq!(drained[1].entity_type, "pig");
    }

    #[test]
    fn buffers_drain_exactly_once() {
        let mut ctx = PhaseContext::new(PhaseState::DropItem);
        ctx.capture_item(entity("item"));
        ctx.capture_block_change(BlockChange {
            pos: BlockPos::new(0, 0, 0),
            from: BlockState::air(),
            to: BlockState::named("stone"),
        });

        assert_eq!(ctx.take_items().len(), 1);
        assert_eq!(ctx.take_block_changes().len(), 1);
        assert!(ctx.take_items().is_empty());
        assert!(ctx.take_block_changes().is_empty());
        assert!(ctx.is_capture_empty());
    }

    // -- 2. Named causes -----------------------------------------------------

    #[test]
    fn cause_set_at_most_once_per_frame() {
        let mut ctx = PhaseContext::new(PhaseState::DeathDropsSpawning);
        ctx.add_cause(cause_keys::SOURCE, entity_cause()).unwrap();

        let err = ctx.add_cause(cause_keys::SOURCE, entity_cause()).unwrap_err();
        assert!(matches!(err, TrackerError::DuplicateCause { .. }));
    }

    #[test]
    fn named_fails_on_absent_key() {
        let ctx = PhaseContext::new(PhaseState::DeathDropsSpawning);
        let err = ctx.named(cause_keys::SOURCE).unwrap_err();
        assert!(matches!(err, TrackerError::MissingCause { .. }));
        assert!(ctx.first_named(cause_keys::SOURCE).is_none());
    }

    #[test]
    fn typed_lookup_fails_on_wrong_type() {
        let ctx = PhaseContext::new(PhaseState::DeathDropsSpawning)
            .with_cause(
                cause_keys::DAMAGE_SOURCE,
                CauseValue::Damage(DamageSource::new(DamageKind::Fall)),
            )
            .unwrap();

        let err = ctx.named_entity(cause_keys::DAMAGE_SOURCE).unwrap_err();
        assert!(matches!(err, TrackerError::CauseTypeMismatch { .. }));

        // Optional lookup reads wrong type as absent.
        assert!(ctx.first_named_entity(cause_keys::DAMAGE_SOURCE).is_none());
        // Correctly-typed lookup works.
        assert!(ctx.named_damage(cause_keys::DAMAGE_SOURCE).is_ok());
    }

    #[test]
    fn secondary_causes_exclude_the_source() {
        let ctx = PhaseContext::new(PhaseState::DeathDropsSpawning)
            .with_cause(cause_keys::SOURCE, entity_cause())
            .unwrap()
            .with_cause(
                cause_keys::DAMAGE_SOURCE,
                CauseValue::Damage(DamageSource::new(DamageKind::Attack)),
            )
            .unwrap();

        let secondary = ctx.secondary_causes();
        assert_eq!(secondary.len(), 1);
        assert_eq!(secondary[0].0, cause_keys::DAMAGE_SOURCE);
    }
}
