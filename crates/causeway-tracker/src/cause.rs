//! Causal objects and the cause chains attached to emitted events.
//!
//! A frame carries *named* causes ([`CauseValue`]s keyed by the constants in
//! [`cause_keys`]); the unwind engine combines the operation's primary cause
//! with those secondary named causes into one [`Cause`] per event.

use serde::{Deserialize, Serialize};

use causeway_world::block::{BlockPos, ChunkPos};
use causeway_world::catalog::SpawnType;
use causeway_world::entity::EntityId;
use causeway_world::snapshot::EntitySnapshot;

/// Well-known named-cause keys.
pub mod cause_keys {
    /// The entity or object this operation originates from.
    pub const SOURCE: &str = "source";
    /// The damage that killed the source entity.
    pub const DAMAGE_SOURCE: &str = "damage_source";
    /// The player responsible, when one exists.
    pub const PLAYER: &str = "player";
    /// The entity that owns a projectile or dropped stack.
    pub const OWNER: &str = "owner";
    /// The block position an interaction targets.
    pub const BLOCK_POSITION: &str = "block_position";
    /// The chunk a spawning or generation operation belongs to.
    pub const CHUNK: &str = "chunk";
}

// ---------------------------------------------------------------------------
// EntityCause
// ---------------------------------------------------------------------------

/// A live world entity recorded as a cause: its handle plus a snapshot taken
/// when the cause was attached, so event consumers see capture-time state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityCause {
    pub id: EntityId,
    pub snapshot: EntitySnapshot,
}

// ---------------------------------------------------------------------------
// DamageSource
// ---------------------------------------------------------------------------

/// What kind of damage produced a death.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageKind {
    Attack,
    Projectile,
    Explosion,
    Fire,
    Fall,
    Void,
    Generic,
}

/// The damage that killed an entity, carried as a secondary cause on
/// death-drop events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageSource {
    pub kind: DamageKind,
    /// The attacking entity, when the damage had one.
    pub attacker: Option<EntityId>,
}

impl DamageSource {
    pub fn new(kind: DamageKind) -> Self {
        Self {
            kind,
            attacker: None,
        }
    }

    pub fn by(kind: DamageKind, attacker: EntityId) -> Self {
        Self {
            kind,
            attacker: Some(attacker),
        }
    }
}

// ---------------------------------------------------------------------------
// CauseValue
// ---------------------------------------------------------------------------

/// The closed set of causal-object types a frame can carry.
///
/// Typed lookups on a frame fail with a type-mismatch error when the stored
/// variant differs from the requested one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CauseValue {
    /// A live world entity (with capture-time snapshot).
    Entity(EntityCause),
    /// A damage source.
    Damage(DamageSource),
    /// A block position.
    Block(BlockPos),
    /// A chunk position.
    Chunk(ChunkPos),
    /// A free-form note for causes with no richer representation.
    Note(String),
}

impl CauseValue {
    /// A short name for the stored variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            CauseValue::Entity(_) => "entity",
            CauseValue::Damage(_) => "damage source",
            CauseValue::Block(_) => "block position",
            CauseValue::Chunk(_) => "chunk position",
            CauseValue::Note(_) => "note",
        }
    }

    pub fn as_entity(&self) -> Option<&EntityCause> {
        match self {
            CauseValue::Entity(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_damage(&self) -> Option<&DamageSource> {
        match self {
            CauseValue::Damage(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<BlockPos> {
        match self {
            CauseValue::Block(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_chunk(&self) -> Option<ChunkPos> {
        match self {
            CauseValue::Chunk(c) => Some(*c),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// SpawnCause
// ---------------------------------------------------------------------------

/// The primary cause of a spawn event: a semantic spawn tag plus the entity
/// responsible, when one exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnCause {
    /// Why this batch is spawning (`"dropped_item"`, `"entity_death"`, ...).
    pub spawn_type: SpawnType,
    /// Snapshot of the entity responsible (the dying entity, the dropper).
    pub source: Option<EntitySnapshot>,
}

// ---------------------------------------------------------------------------
// Cause
// ---------------------------------------------------------------------------

/// The root element of a cause chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CauseRoot {
    /// A spawn operation with its semantic tag.
    Spawn(SpawnCause),
    /// Any other causal object.
    Value(CauseValue),
}

/// A complete cause chain: the primary cause plus secondary named causes
/// carried over from the frame that produced the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cause {
    pub root: CauseRoot,
    pub named: Vec<(String, CauseValue)>,
}

impl Cause {
    /// A cause rooted in a spawn operation.
    pub fn spawning(spawn_type: SpawnType, source: Option<EntitySnapshot>) -> Self {
        Self {
            root: CauseRoot::Spawn(SpawnCause { spawn_type, source }),
            named: Vec::new(),
        }
    }

    /// A cause rooted in an arbitrary causal object.
    pub fn of(value: CauseValue) -> Self {
        Self {
            root: CauseRoot::Value(value),
            named: Vec::new(),
        }
    }

    /// Attach a secondary named cause.
    pub fn with_named(mut self, key: impl Into<String>, value: CauseValue) -> Self {
        self.named.push((key.into(), value));
        self
    }

    /// Attach several secondary named causes.
    pub fn with_all(mut self, named: impl IntoIterator<Item = (String, CauseValue)>) -> Self {
        self.named.extend(named);
        self
    }

    /// Look up a secondary named cause.
    pub fn named(&self, key: &str) -> Option<&CauseValue> {
        self.named.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// The spawn tag, if this cause is rooted in a spawn.
    pub fn spawn_type(&self) -> Option<&SpawnType> {
        match &self.root {
            CauseRoot::Spawn(s) => Some(&s.spawn_type),
            CauseRoot::Value(_) => None,
        }
    }

    /// The primary source snapshot, if this cause is rooted in a spawn with
    /// a responsible entity.
    pub fn spawn_source(&self) -> Option<&EntitySnapshot> {
        match &self.root {
            CauseRoot::Spawn(s) => s.source.as_ref(),
            CauseRoot::Value(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
