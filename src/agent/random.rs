use rand::{SeedableRng, rngs::StdRng};
use tracing::trace;

use crate::{
    agent::{AgentIdentifier, Trader},
    error::{AgentError, StockGymResult},
    gym::stock::{
        action::ActionSpace, config::StockConfig, domain::Transaction, observation::StockState,
    },
};

/// Picks a transaction uniformly from its action space every period and never learns.
///
/// Serves as the baseline every learning trader should beat.
#[derive(Debug, Clone)]
pub struct RandomTrader {
    action_space: ActionSpace,
    rng: StdRng,
}

impl RandomTrader {
    /// `seed = None` seeds from the operating system.
    pub fn new(action_space: ActionSpace, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { action_space, rng }
    }

    /// A random trader over the action space of a stock built from `config`.
    pub fn for_stock(config: &StockConfig, seed: Option<u64>) -> Self {
        Self::new(config.action_space(), seed)
    }

    pub fn action_space(&self) -> &ActionSpace {
        &self.action_space
    }
}

impl Trader for RandomTrader {
    fn act(&mut self, state: &StockState) -> StockGymResult<Transaction> {
        let transaction = self.action_space.sample(&mut self.rng);
        trace!(position = %state.position, transaction = %transaction, "Random pick");
        Ok(transaction)
    }

    fn identifier(&self) -> AgentIdentifier {
        AgentIdentifier::Random
    }

    fn check_compatible(&self, config: &StockConfig) -> StockGymResult<()> {
        let expected = config.action_space();
        if self.action_space != expected {
            return Err(AgentError::Incompatible(format!(
                "trader samples {:?}, stock accepts {:?}",
                self.action_space.transactions(),
                expected.transactions()
            ))
            .into());
        }
        Ok(())
    }
}
