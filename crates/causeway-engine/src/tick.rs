//! Fixed-timestep tick loop over a phase-tracked world.
//!
//! Each tick:
//!
//! 1. A [`WorldTick`](PhaseState::WorldTick) frame is pushed, so every
//!    mutation a system performs is captured and attributed.
//! 2. All registered systems run in declaration order, each receiving a
//!    [`SimContext`] (world access through the tracker's intercepted entry
//!    points, plus the seeded RNG).
//! 3. The frame is popped and unwound: captures surface as cancellable
//!    events, survivors enter world state, and the tick counter and
//!    simulation time advance.
//!
//! Because system ordering is fixed, captures resolve in capture order, and
//! randomness comes from a seeded RNG, the loop is fully deterministic: same
//! initial state + same systems + same seed = same final state.
//!
//! If a system fails, the frame is still removed -- its captures are
//! discarded rather than applied, and the stack is left clean for the next
//! tick. Leaving the frame behind would corrupt attribution for every
//! subsequent operation, which is exactly the failure mode the tracker
//! exists to catch.

use rand::SeedableRng;
use rand_pcg::Pcg64;
use tracing::{debug, warn};

use causeway_tracker::context::PhaseContext;
use causeway_tracker::event::EventDispatcher;
use causeway_tracker::state::PhaseState;
use causeway_tracker::tracker::{BlockDisposition, SpawnDisposition, Tracker};
use causeway_tracker::unwind::UnwindOutcome;
use causeway_tracker::TrackerError;
use causeway_world::block::{BlockPos, BlockState};
use causeway_world::entity::Entity;
use causeway_world::world::World;

use crate::config::EngineConfig;
use crate::EngineError;

// ---------------------------------------------------------------------------
// SimContext
// ---------------------------------------------------------------------------

/// What a system sees each tick: the world behind the tracker's intercepted
/// entry points, frame control for nested operations, and the seeded RNG.
pub struct SimContext<'a> {
    pub world: &'a mut World,
    pub tracker: &'a mut Tracker,
    pub dispatcher: &'a mut dyn EventDispatcher,
    /// Deterministic RNG; systems must draw randomness from here only.
    pub rng: &'a mut Pcg64,
    /// The current tick number.
    pub tick: u64,
}

impl SimContext<'_> {
    /// Spawn through the intercepted entry point (buffered while any frame
    /// is active -- during a tick that is always the case).
    pub fn spawn(&mut self, entity: Entity) -> Result<SpawnDisposition, TrackerError> {
        self.tracker.spawn_entity(self.world, entity)
    }

    /// Change a block through the intercepted entry point.
    pub fn set_block(&mut self, pos: BlockPos, state: BlockState) -> BlockDisposition {
        self.tracker.set_block(self.world, pos, state)
    }

    /// Begin a nested traceable operation.
    pub fn push(&mut self, context: PhaseContext) -> Result<(), TrackerError> {
        self.tracker.enter(context)
    }

    /// Finish the nested operation pushed with `state`, unwinding it.
    pub fn pop(&mut self, state: PhaseState) -> Result<UnwindOutcome, TrackerError> {
        self.tracker.exit(state, self.world, self.dispatcher)
    }
}

// ---------------------------------------------------------------------------
// SystemFn / RegisteredSystem
// ---------------------------------------------------------------------------

/// A system function, run once per tick in declaration order.
pub type SystemFn = fn(&mut SimContext<'_>) -> Result<(), EngineError>;

/// A named system in the registry.
struct RegisteredSystem {
    /// Human-readable name, used in logging.
    name: String,
    func: SystemFn,
}

// ---------------------------------------------------------------------------
// TickReport
// ---------------------------------------------------------------------------

/// Summary of one completed tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickReport {
    /// The tick that just ran.
    pub tick: u64,
    /// The world-tick frame's own unwind results. Nested operations a
    /// system completed mid-tick resolved their own events and are not
    /// counted here.
    pub outcome: UnwindOutcome,
}

// ---------------------------------------------------------------------------
// TickLoop
// ---------------------------------------------------------------------------

/// The deterministic fixed-timestep tick loop.
pub struct TickLoop<D: EventDispatcher> {
    world: World,
    tracker: Tracker,
    dispatcher: D,
    systems: Vec<RegisteredSystem>,
    rng: Pcg64,
    config: EngineConfig,
    tick_count: u64,
    sim_time: f64,
}

impl<D: EventDispatcher> TickLoop<D> {
    /// Create a tick loop over the given world, tracker, and dispatcher.
    pub fn new(world: World, tracker: Tracker, dispatcher: D, config: EngineConfig) -> Self {
        let rng = Pcg64::seed_from_u64(config.seed);
        Self {
            world,
            tracker,
            dispatcher,
            systems: Vec::new(),
            rng,
            config,
            tick_count: 0,
            sim_time: 0.0,
        }
    }

    /// Register a system. Systems run in registration order.
    pub fn add_system(&mut self, name: &str, func: SystemFn) {
        self.systems.push(RegisteredSystem {
            name: name.to_owned(),
            func,
        });
    }

    /// Run one tick.
    pub fn tick(&mut self) -> Result<TickReport, EngineError> {
        self.tracker
            .enter(PhaseContext::new(PhaseState::WorldTick))?;

        let mut failure: Option<(String, EngineError)> = None;
        for system in &self.systems {
            let mut sim = SimContext {
                world: &mut self.world,
                tracker: &mut self.tracker,
                dispatcher: &mut self.dispatcher,
                rng: &mut self.rng,
                tick: self.tick_count,
            };
            if let Err(e) = (system.func)(&mut sim) {
                warn!(system = %system.name, error = %e, "system failed; tick aborted");
                failure = Some((system.name.clone(), e));
                break;
            }
        }

        let report = match failure {
            None => {
                let outcome = self.tracker.exit(
                    PhaseState::WorldTick,
                    &mut self.world,
                    &mut self.dispatcher,
                )?;
                TickReport {
                    tick: self.tick_count,
                    outcome,
                }
            }
            Some((_, error)) => {
                // Failure isolation: the frame must not outlive the tick,
                // and half-finished captures must not reach world state.
                self.tracker.abandon(PhaseState::WorldTick)?;
                return Err(error);
            }
        };

        self.tick_count += 1;
        // Multiplication, not accumulation: no floating-point drift.
        self.sim_time = self.tick_count as f64 * self.config.fixed_dt;
        debug!(tick = report.tick, events = report.outcome.events_posted, "tick complete");
        Ok(report)
    }

    /// Run `n` ticks, returning the aggregated unwind outcome.
    pub fn run_ticks(&mut self, n: u64) -> Result<UnwindOutcome, EngineError> {
        let mut total = UnwindOutcome::default();
        for _ in 0..n {
            total.merge(self.tick()?.outcome);
        }
        Ok(total)
    }

    /// The simulated world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world access, for setup between ticks.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The tracker (read access for diagnostics).
    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// The event dispatcher.
    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Number of completed ticks.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Simulation time in seconds.
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
