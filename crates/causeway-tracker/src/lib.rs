//! Causeway Tracker -- phase-tracked capture and unwind of world mutations.
//!
//! While a unit of game logic runs (a chunk spawn, a death's item drops, a
//! block being broken), low-level world mutations are *intercepted* and
//! buffered into the active [`PhaseContext`](context::PhaseContext) instead
//! of being applied. When the unit completes, the frame is popped and the
//! unwind engine resolves the buffered captures into cancellable events,
//! applying only the effects that survive dispatch.
//!
//! The tracker is a strictly single-threaded, stack-disciplined state
//! machine: frames nest only through synchronous call nesting, a frame may
//! only be popped by the code that pushed it, and every violation of that
//! discipline is surfaced as a fatal [`TrackerError`] rather than tolerated.
//!
//! # Quick Start
//!
//! ```
//! use causeway_tracker::prelude::*;
//! use causeway_world::prelude::*;
//!
//! let mut world = World::new();
//! let mut tracker = Tracker::new(
//!     EntityTypeRegistry::with_defaults(),
//!     SpawnTypeRegistry::with_defaults(),
//! );
//! let mut dispatcher = NullDispatcher;
//!
//! tracker.enter(PhaseContext::new(PhaseState::ChunkSpawning)).unwrap();
//! tracker
//!     .spawn_entity(&mut world, Entity::new("zombie", Position::default()))
//!     .unwrap();
//! let outcome = tracker
//!     .exit(PhaseState::ChunkSpawning, &mut world, &mut dispatcher)
//!     .unwrap();
//!
//! assert_eq!(outcome.events_posted, 1);
//! assert_eq!(world.entity_count(), 1);
//! ```

#![deny(unsafe_code)]

pub mod cause;
pub mod context;
pub mod event;
pub mod stack;
pub mod state;
pub mod tracker;
pub mod unwind;

use causeway_world::WorldError;
use state::PhaseState;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by phase-tracking operations.
///
/// Every variant except [`TrackerError::World`] signals a caller bug -- a
/// missed unwind, an illegal nesting, or a frame pushed without its mandatory
/// context. They are returned (never panicked) so the surrounding simulation
/// can fail the operation without taking the whole world down, but they must
/// not be swallowed: each one is also logged with frame-history context at
/// the point of detection.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// `pop` named a state that does not match the frame on top.
    #[error(
        "phase pop mismatch: expected {expected:?} on top but found {found:?} \
         (frame history, bottom first: {history:?})"
    )]
    PopMismatch {
        expected: PhaseState,
        found: PhaseState,
        history: Vec<PhaseState>,
    },

    /// `pop` was called with no active frame.
    #[error("phase pop on an empty stack (expected {expected:?})")]
    PopOnEmptyStack { expected: PhaseState },

    /// `push` requested a state the current top state's policy forbids.
    #[error("illegal phase transition: {from:?} does not allow entering {to:?}")]
    IllegalTransition { from: PhaseState, to: PhaseState },

    /// A required named cause was never set on the frame being unwound.
    #[error("required cause '{key}' missing while unwinding {state:?}")]
    MissingCause { key: String, state: PhaseState },

    /// A named cause exists but holds a different type than requested.
    #[error("cause '{key}' holds a {found} value but {expected} was requested")]
    CauseTypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A named cause was set twice on the same frame.
    #[error("cause '{key}' was already set for this frame")]
    DuplicateCause { key: String },

    /// A collaborator (registry, property store) rejected an operation.
    #[error(transparent)]
    World(#[from] WorldError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::cause::{
        cause_keys, Cause, CauseRoot, CauseValue, DamageKind, DamageSource, EntityCause,
        SpawnCause,
    };
    pub use crate::context::PhaseContext;
    pub use crate::event::{
        post_and_then, ChangeBlocksEvent, DropItemsEvent, EventDispatcher, NullDispatcher,
        SpawnEntitiesEvent, WorldEvent,
    };
    pub use crate::stack::PhaseStack;
    pub use crate::state::{PhaseFamily, PhaseState};
    pub use crate::tracker::{BlockDisposition, SpawnDisposition, Tracker};
    pub use crate::unwind::{unwind_frame, UnwindOutcome};
    pub use crate::TrackerError;
}
