//! Block positions, block states, and block-change records.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// BlockPos
// ---------------------------------------------------------------------------

/// An integer block coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The chunk this position falls in (16x16 columns).
    pub fn chunk(self) -> ChunkPos {
        ChunkPos {
            x: self.x.div_euclid(16),
            z: self.z.div_euclid(16),
        }
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// ChunkPos
// ---------------------------------------------------------------------------

/// A chunk column coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

// ---------------------------------------------------------------------------
// BlockState
// ---------------------------------------------------------------------------

/// The state of one block position.
///
/// A name-keyed state is enough here; block property variants (facing,
/// waterlogged, ...) belong to the data-accessor layer, not this core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockState(String);

impl BlockState {
    /// The empty block. Unset positions read as air.
    pub fn air() -> Self {
        Self("air".to_owned())
    }

    /// A named block state.
    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The state's name.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Whether this is the empty block.
    pub fn is_air(&self) -> bool {
        self.0 == "air"
    }
}

impl Default for BlockState {
    fn default() -> Self {
        Self::air()
    }
}

// ---------------------------------------------------------------------------
// BlockChange
// ---------------------------------------------------------------------------

/// One buffered block mutation: position plus before/after states.
///
/// `from` is recorded at capture time so a listener inspecting the change
/// sees the state the world held when the mutation was attempted, even if a
/// later change in the same frame targets the same position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockChange {
    pub pos: BlockPos,
    pub from: BlockState,
    pub to: BlockState,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
