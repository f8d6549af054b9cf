//! The per-world phase stack.
//!
//! A LIFO stack of active [`PhaseContext`]s, touched only by the world's one
//! simulation thread. The empty stack reads as [`PhaseState::Idle`] -- "no
//! active phase". Nesting arises solely from synchronous call nesting (a
//! captured side effect triggering a new push while the outer frame is still
//! active), which is exactly why this is a stack and not a single
//! current-phase variable.

use tracing::error;

use crate::context::PhaseContext;
use crate::state::PhaseState;
use crate::TrackerError;

// ---------------------------------------------------------------------------
// PhaseStack
// ---------------------------------------------------------------------------

/// LIFO stack of active frames for one world.
#[derive(Debug, Default)]
pub struct PhaseStack {
    frames: Vec<PhaseContext>,
}

impl PhaseStack {
    /// Create an empty stack (current state: [`PhaseState::Idle`]).
    pub fn new() -> Self {
        Self::default()
    }

    /// The state on top of the stack, or `Idle` when no frame is active.
    pub fn current_state(&self) -> PhaseState {
        self.frames
            .last()
            .map_or(PhaseState::Idle, PhaseContext::state)
    }

    /// The active frame, if any.
    pub fn current(&self) -> Option<&PhaseContext> {
        self.frames.last()
    }

    /// Mutable access to the active frame (for intercepted call-sites to
    /// append captures).
    pub fn current_mut(&mut self) -> Option<&mut PhaseContext> {
        self.frames.last_mut()
    }

    /// Number of active frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Whether no frame is active.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The states of all active frames, bottom first. Attached to
    /// stack-discipline errors as diagnostic context.
    pub fn history(&self) -> Vec<PhaseState> {
        self.frames.iter().map(PhaseContext::state).collect()
    }

    /// Install `context` as the new current frame.
    ///
    /// Rejected before any capture occurs if the state on top forbids the
    /// transition. The first frame on an empty stack is always admitted
    /// (the empty stack carries no policy); `Idle` itself is never pushed.
    pub fn push(&mut self, context: PhaseContext) -> Result<(), TrackerError> {
        let from = self.current_state();
        let to = context.state();

        let legal = if to == PhaseState::Idle {
            false
        } else {
            self.frames.is_empty() || from.can_switch_to(to)
        };

        if !legal {
            error!(
                from = ?from,
                to = ?to,
                history = ?self.history(),
                "illegal phase transition rejected"
            );
            return Err(TrackerError::IllegalTransition { from, to });
        }

        self.frames.push(context);
        Ok(())
    }

    /// Remove and return the top frame, asserting it was pushed with
    /// `expected`.
    ///
    /// A mismatch means some caller failed to unwind a prior operation --
    /// tolerated, it would corrupt capture attribution for every subsequent
    /// operation on this world. The stack is left unchanged on failure.
    pub fn pop(&mut self, expected: PhaseState) -> Result<PhaseContext, TrackerError> {
        match self.frames.pop() {
            None => {
                error!(expected = ?expected, "phase pop on an empty stack");
                Err(TrackerError::PopOnEmptyStack { expected })
            }
            Some(top) if top.state() != expected => {
                let found = top.state();
                // Restore the frame so the stack is observably unchanged.
                self.frames.push(top);
                let history = self.history();
                error!(
                    expected = ?expected,
                    found = ?found,
                    history = ?history,
                    "phase pop mismatch"
                );
                Err(TrackerError::PopMismatch {
                    expected,
                    found,
                    history,
                })
            }
            Some(top) => Ok(top),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- 1. Idle bottom ------------------------------------------------------

    #[test]
    fn empty_stack_reads_idle() {
        let stack = PhaseStack::new();
        assert_eq!(stack.current_state(), PhaseState::Idle);
        assert!(stack.current().is_none());
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn idle_is_never_pushed() {
        let mut stack = PhaseStack::new();
        let err = stack.push(PhaseContext::new(PhaseState::Idle)).unwrap_err();
        assert!(matches!(err, TrackerError::IllegalTransition { .. }));
        assert!(stack.is_empty());
    }

    // -- 2. Push / pop discipline --------------------------------------------

    #[test]
    fn matched_push_pop_returns_to_empty() {
        let mut stack = PhaseStack::new();
        stack.push(PhaseContext::new(PhaseState::WorldTick)).unwrap();
        stack.push(PhaseContext::new(PhaseState::EntityTick)).unwrap();
        stack
            .push(PhaseContext::new(PhaseState::DeathDropsSpawning))
            .unwrap();
        assert_eq!(stack.depth(), 3);

        stack.pop(PhaseState::DeathDropsSpawning).unwrap();
        stack.pop(PhaseState::EntityTick).unwrap();
        stack.pop(PhaseState::WorldTick).unwrap();
        assert!(stack.is_empty());
        assert_eq!(stack.current_state(), PhaseState::Idle);
    }

    #[test]
    fn mismatched_pop_leaves_stack_unchanged() {
        let mut stack = PhaseStack::new();
        stack.push(PhaseContext::new(PhaseState::WorldTick)).unwrap();
        stack.push(PhaseContext::new(PhaseState::DropItem)).unwrap();

        let err = stack.pop(PhaseState::WorldTick).unwrap_err();
        match err {
            TrackerError::PopMismatch {
                expected,
                found,
                history,
            } => {
                assert_eq!(expected, PhaseState::WorldTick);
                assert_eq!(found, PhaseState::DropItem);
                assert_eq!(history, vec![PhaseState::WorldTick, PhaseState::DropItem]);
            }
            other => panic!("expected PopMismatch, got {other:?}"),
        }

        // Unchanged: the correct pop still succeeds.
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.current_state(), PhaseState::DropItem);
        stack.pop(PhaseState::DropItem).unwrap();
    }

    #[test]
    fn pop_on_empty_stack_is_an_error() {
        let mut stack = PhaseStack::new();
        let err = stack.pop(PhaseState::WorldTick).unwrap_err();
        assert!(matches!(err, TrackerError::PopOnEmptyStack { .. }));
    }

    // -- 3. Transition checks at push time -----------------------------------

    #[test]
    fn first_frame_is_always_admitted() {
        for state in [
            PhaseState::WorldTick,
            PhaseState::ChunkSpawning,
            PhaseState::BlockBreak,
            PhaseState::TerrainGeneration,
        ] {
            let mut stack = PhaseStack::new();
            stack.push(PhaseContext::new(state)).unwrap();
            assert_eq!(stack.current_state(), state);
        }
    }

    #[test]
    fn forbidden_transition_is_rejected_at_push() {
        let mut stack = PhaseStack::new();
        stack.push(PhaseContext::new(PhaseState::DropItem)).unwrap();

        let err = stack
            .push(PhaseContext::new(PhaseState::ChunkSpawning))
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::IllegalTransition {
                from: PhaseState::DropItem,
                to: PhaseState::ChunkSpawning,
            }
        ));
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn chunk_spawning_admits_a_nested_tick() {
        let mut stack = PhaseStack::new();
        stack.push(PhaseContext::new(PhaseState::WorldTick)).unwrap();
        stack
            .push(PhaseContext::new(PhaseState::ChunkSpawning))
            .unwrap();
        stack.push(PhaseContext::new(PhaseState::EntityTick)).unwrap();

        assert_eq!(
            stack.history(),
            vec![
                PhaseState::WorldTick,
                PhaseState::ChunkSpawning,
                PhaseState::EntityTick,
            ]
        );
    }
}
