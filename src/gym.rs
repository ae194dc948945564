use serde::{Deserialize, Serialize};

use crate::{
    impl_display_primitive, impl_from_primitive, impl_ledger_arithmetic, impl_neg_primitive,
};

pub mod stock;

/// Represents a reward value in whole price units.
///
/// Prices in the simulated market are integers, so every realized gain or loss is
/// an exact integer too. Wrapping an `i64` keeps comparisons exact and ordering
/// deterministic; the Q-learning trader converts to `f64` only at the update step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Reward(pub i64);
impl_from_primitive!(Reward, i64);
impl_ledger_arithmetic!(Reward, i64);
impl_neg_primitive!(Reward);
impl_display_primitive!(Reward);

impl Reward {
    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

/// Represents the lifecycle status of the stock environment.
///
/// # Lifecycle
///
/// ```md
/// Current State                    | Action  | Next State  | Notes
/// ---------------------------------|---------|-------------|------------------------------------
/// `Running` (budget spent)         | step()  | EpisodeDone | Trading day is over
/// `Running`                        | step()  | Running     | Continue within the trading day
/// `Ready` / `Running` / `EpisodeDone` | reset() | Running  | Restart from the initial market state
/// ```
///
/// Stepping in `Ready` or `EpisodeDone` is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvStatus {
    /// Initial state. The environment is waiting for `reset()` to be called.
    Ready,

    /// A trading day is active and the environment is ready for `step()` calls.
    Running,

    /// The active trading day has reached a terminal state.
    EpisodeDone,
}

impl EnvStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_episode_done(&self) -> bool {
        matches!(self, Self::EpisodeDone)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    InProgress,
    /// period budget spent and the trader is flat
    Terminated,
    /// period budget spent with an open position
    Truncated,
}

impl StepOutcome {
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated)
    }

    pub fn is_terminal(&self) -> bool {
        self.is_terminated() || self.is_truncated()
    }
}
