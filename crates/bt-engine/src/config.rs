//! Engine configuration constants and tunable parameters.

use serde::{Deserialize, Serialize};

/// Defaults applied when trees are built or loaded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cascade flag for composites that do not set one explicitly.
    pub default_cascade: bool,
    /// Cadence used by [`crate::Brain`]s created from this config.
    pub brain: BrainConfig,
}

impl EngineConfig {
    pub const DEFAULT_CASCADE: bool = true;

    /// Configuration with every default applied.
    pub fn new() -> Self {
        Self {
            default_cascade: Self::DEFAULT_CASCADE,
            brain: BrainConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// How often a [`crate::Brain`] ticks its tree.
///
/// A brain thinks on driver tick `t` when
/// `(t + think_offset_ticks) % think_every_ticks == 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    pub think_every_ticks: u32,
    pub think_offset_ticks: u32,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            think_every_ticks: 1,
            think_offset_ticks: 0,
        }
    }
}

impl BrainConfig {
    /// Spreads agents that think every `think_every_ticks` across the
    /// interval, using a stable per-agent number.
    pub fn staggered(stable_id: u64, think_every_ticks: u32) -> Self {
        let every = think_every_ticks.max(1);
        let offset = (stable_id % u64::from(every)) as u32;
        Self {
            think_every_ticks: every,
            think_offset_ticks: offset,
        }
    }

    /// Returns `true` if the brain thinks on driver tick `tick`.
    pub fn should_think(&self, tick: u64) -> bool {
        let every = u64::from(self.think_every_ticks.max(1));
        (tick + u64::from(self.think_offset_ticks)) % every == 0
    }
}
