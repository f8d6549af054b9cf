//! Causeway Engine -- simulation driver over the phase-tracked world.
//!
//! This crate builds on [`causeway_tracker`] to provide the tick loop: a
//! fixed-timestep driver that wraps each step in a
//! [`WorldTick`](causeway_tracker::state::PhaseState::WorldTick) frame, runs
//! systems in a deterministic order against a [`SimContext`](tick::SimContext),
//! and unwinds the frame so every spawn a system performed surfaces as a
//! cancellable event.
//!
//! # Quick Start
//!
//! ```
//! use causeway_engine::prelude::*;
//!
//! let mut tick_loop = TickLoop::new(
//!     World::new(),
//!     Tracker::new(
//!         EntityTypeRegistry::with_defaults(),
//!         SpawnTypeRegistry::with_defaults(),
//!     ),
//!     NullDispatcher,
//!     EngineConfig::default(),
//! );
//!
//! tick_loop.add_system("spawn_one_pig", |sim| {
//!     if sim.tick == 0 {
//!         sim.spawn(Entity::new("pig", Position::default()))?;
//!     }
//!     Ok(())
//! });
//!
//! tick_loop.run_ticks(10).unwrap();
//! assert_eq!(tick_loop.world().entities_of_type("pig").len(), 1);
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod explosive;
pub mod logging;
pub mod tick;

use causeway_tracker::TrackerError;
use causeway_world::entity::EntityId;
use causeway_world::WorldError;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the tracker crate for convenience.
pub use causeway_tracker;

/// Re-export the world crate for convenience.
pub use causeway_world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by the simulation driver.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Phase tracking rejected an operation.
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// A world collaborator rejected an operation.
    #[error(transparent)]
    World(#[from] WorldError),

    /// An explosive helper was pointed at a missing entity.
    #[error("entity {entity:?} does not exist")]
    MissingEntity { entity: EntityId },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use causeway_tracker::prelude::*;
    pub use causeway_world::prelude::*;

    pub use crate::config::EngineConfig;
    pub use crate::explosive;
    pub use crate::tick::{SimContext, SystemFn, TickLoop, TickReport};
    pub use crate::EngineError;
}
