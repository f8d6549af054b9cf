//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the fixed-timestep tick loop.
///
/// `fixed_dt` is the duration in seconds of each simulation tick; the
/// default of `1.0 / 20.0` gives the conventional 20 ticks per second.
/// `seed` feeds the deterministic RNG systems draw from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed time step in seconds per tick. Must be positive and finite.
    pub fixed_dt: f64,
    /// Seed for the simulation RNG.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 20.0,
            seed: 0,
        }
    }
}
