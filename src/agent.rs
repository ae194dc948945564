pub mod q_learning;
pub mod random;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};

use crate::{
    error::StockGymResult,
    gym::{
        Reward,
        stock::{config::StockConfig, domain::Transaction, observation::StockState},
    },
};

// ============================================================================
//  Core Trader Definitions
// ============================================================================

/// Identifies a trader in logs and reports.
///
/// Built-in traders have their own variant; anything else reports itself as
/// `Named`.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Display,
    Default,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentIdentifier {
    /// A custom user-defined trader.
    #[strum(to_string = "{0}")]
    Named(Arc<String>),

    #[default]
    Random,

    QLearning,
}

/// One period as seen by the trader that acted in it.
///
/// `transaction` is what the trader requested, even if the stock downgraded it
/// to a hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    pub state: StockState,
    pub transaction: Transaction,
    pub reward: Reward,
    pub next_state: StockState,
}

/// A price-taking trader.
///
/// The stock calls `act` once per period, processes the returned transaction,
/// transitions and then hands the trader an [`Experience`] through `learn`.
pub trait Trader {
    /// Decide on a transaction for the current state.
    fn act(&mut self, state: &StockState) -> StockGymResult<Transaction>;

    /// Update internal estimates from one period. Default is no-op.
    fn learn(&mut self, _experience: &Experience) -> StockGymResult<()> {
        Ok(())
    }

    /// Optional trader name for logging/debugging.
    fn identifier(&self) -> AgentIdentifier {
        AgentIdentifier::Named(Arc::new(
            "UnnamedTrader: override Trader::identifier()".to_string(),
        ))
    }

    /// Whether a trading day keeps going past its nominal length until this
    /// trader is flat. Default is `false`.
    fn trades_until_flat(&self) -> bool {
        false
    }

    /// Fails with `AgentError::Incompatible` if the trader cannot trade a
    /// stock built from `config`. Default accepts every stock.
    fn check_compatible(&self, _config: &StockConfig) -> StockGymResult<()> {
        Ok(())
    }

    /// Reset per-episode state at the end of a trading day. Default is no-op.
    fn reset(&mut self) {}
}

impl Trader for Box<dyn Trader> {
    fn act(&mut self, state: &StockState) -> StockGymResult<Transaction> {
        (**self).act(state)
    }

    fn learn(&mut self, experience: &Experience) -> StockGymResult<()> {
        (**self).learn(experience)
    }

    fn identifier(&self) -> AgentIdentifier {
        (**self).identifier()
    }

    fn trades_until_flat(&self) -> bool {
        (**self).trades_until_flat()
    }

    fn check_compatible(&self, config: &StockConfig) -> StockGymResult<()> {
        (**self).check_compatible(config)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::agent::random::RandomTrader;

    #[test]
    fn identifier_display() {
        assert_eq!(AgentIdentifier::Random.to_string(), "RANDOM");
        assert_eq!(AgentIdentifier::QLearning.to_string(), "Q_LEARNING");
        assert_eq!(
            AgentIdentifier::Named(Arc::new("Momentum".to_string())).to_string(),
            "Momentum"
        );
        assert_eq!(
            AgentIdentifier::from_str("Q_LEARNING").unwrap(),
            AgentIdentifier::QLearning
        );
    }

    #[test]
    fn boxed_trader_forwards() {
        let config = StockConfig::default();
        let mut boxed: Box<dyn Trader> = Box::new(RandomTrader::for_stock(&config, Some(1)));

        assert_eq!(boxed.identifier(), AgentIdentifier::Random);
        assert!(!boxed.trades_until_flat());
        assert!(boxed.check_compatible(&config).is_ok());

        let state = StockState::default();
        let t = boxed.act(&state).unwrap();
        assert!(config.action_space().contains(t));
    }
}
