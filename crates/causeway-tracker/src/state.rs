//! Phase states, phase families, and transition policy.
//!
//! Each [`PhaseState`] is a plain value in a closed set; the policy that
//! governs it (does it capture block changes? what may nest under it?) lives
//! in its [`PhaseFamily`]'s lookup methods, keyed by the state value. Nothing
//! here carries behavior -- the unwind algorithms live in
//! [`unwind`](crate::unwind) and dispatch on these same values.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PhaseState
// ---------------------------------------------------------------------------

/// The kind of traceable operation a frame represents.
///
/// Immutable once chosen for a frame. [`PhaseState::Idle`] is the implicit
/// bottom of every stack -- it is never pushed and represents "no active
/// phase".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseState {
    /// No active phase. Both initial and terminal for the whole stack.
    Idle,

    // -- spawning family ----------------------------------------------------
    /// Entities being spawned as part of a chunk becoming active.
    ChunkSpawning,
    /// Drops and experience being produced by an entity's death.
    DeathDropsSpawning,
    /// An item stack being dropped into the world.
    DropItem,

    // -- ticking family -----------------------------------------------------
    /// A whole-world simulation step.
    WorldTick,
    /// A single entity's update within a tick.
    EntityTick,
    /// A single scheduled block update.
    BlockTick,

    // -- interaction family -------------------------------------------------
    /// A block being broken.
    BlockBreak,
    /// A block being placed.
    BlockPlace,

    // -- generation family --------------------------------------------------
    /// Raw terrain being generated for a new chunk.
    TerrainGeneration,
    /// Features (trees, ores, structures) being placed into new terrain.
    Populating,
}

impl PhaseState {
    /// The family this state belongs to.
    pub fn family(self) -> PhaseFamily {
        match self {
            PhaseState::Idle => PhaseFamily::General,
            PhaseState::ChunkSpawning | PhaseState::DeathDropsSpawning | PhaseState::DropItem => {
                PhaseFamily::Spawning
            }
            PhaseState::WorldTick | PhaseState::EntityTick | PhaseState::BlockTick => {
                PhaseFamily::Ticking
            }
            PhaseState::BlockBreak | PhaseState::BlockPlace => PhaseFamily::Interaction,
            PhaseState::TerrainGeneration | PhaseState::Populating => PhaseFamily::Generation,
        }
    }

    /// Whether this state is a ticking state.
    pub fn is_ticking(self) -> bool {
        self.family() == PhaseFamily::Ticking
    }

    /// Whether block mutations during this state must be buffered rather
    /// than applied immediately.
    pub fn requires_block_capture(self) -> bool {
        self.family().requires_block_capture(self)
    }

    /// Whether execution may switch from this state into `next` while this
    /// state's frame is on top of the stack.
    pub fn can_switch_to(self, next: PhaseState) -> bool {
        self.family().can_switch_to(self, next)
    }
}

// ---------------------------------------------------------------------------
// PhaseFamily
// ---------------------------------------------------------------------------

/// A group of related phase states sharing capture and transition policy.
///
/// Families form a tree: every concrete family has [`PhaseFamily::General`]
/// as its parent, and `General` has none. A family may delegate unwind
/// behavior upward but never forms a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseFamily {
    /// The root family. Owns only [`PhaseState::Idle`].
    General,
    /// Entity and item spawning operations.
    Spawning,
    /// Simulation tick operations.
    Ticking,
    /// Player- or machine-driven block interaction.
    Interaction,
    /// World generation.
    Generation,
}

impl PhaseFamily {
    /// The parent family, if any.
    pub fn parent(self) -> Option<PhaseFamily> {
        match self {
            PhaseFamily::General => None,
            _ => Some(PhaseFamily::General),
        }
    }

    /// Whether block mutations in `state` must be buffered.
    ///
    /// Generation applies block changes immediately for performance and only
    /// buffers entity/item side effects; of the spawning states only
    /// `ChunkSpawning` touches blocks at all.
    pub fn requires_block_capture(self, state: PhaseState) -> bool {
        match self {
            PhaseFamily::Spawning => state == PhaseState::ChunkSpawning,
            PhaseFamily::Interaction | PhaseFamily::Ticking => true,
            PhaseFamily::Generation | PhaseFamily::General => false,
        }
    }

    /// Asymmetric transition legality: may `next` be pushed while `from`
    /// (a member of this family) is on top?
    ///
    /// There is no global transition table -- legality is purely this
    /// pairwise predicate between adjacent frames. The empty stack carries
    /// no policy, so the first frame is always admitted; `Idle` itself is
    /// terminal and admits nothing.
    pub fn can_switch_to(self, from: PhaseState, next: PhaseState) -> bool {
        if next == PhaseState::Idle {
            return false;
        }
        match self {
            PhaseFamily::General => false,
            // A chunk-spawn operation can itself trigger a nested world
            // tick from its terminal chunk-spawning state; the other
            // spawning states forbid switching away mid-frame.
            PhaseFamily::Spawning => from == PhaseState::ChunkSpawning && next.is_ticking(),
            // Any traceable operation can begin under a tick, including a
            // nested tick (an entity update inside the world step).
            PhaseFamily::Ticking => true,
            // Breaking or placing a block can produce drops.
            PhaseFamily::Interaction => {
                matches!(next, PhaseState::DropItem | PhaseState::DeathDropsSpawning)
            }
            // Generation stays inside generation (terrain -> population).
            PhaseFamily::Generation => next.family() == PhaseFamily::Generation,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
