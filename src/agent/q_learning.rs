use ndarray::{Array2, ArrayView1};
use rand::{
    SeedableRng,
    distr::{Distribution, weighted::WeightedIndex},
    rngs::StdRng,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    agent::{AgentIdentifier, Experience, Trader},
    error::{AgentError, StockGymResult},
    gym::stock::{
        action::ActionSpace, config::StockConfig, domain::Transaction,
        observation::{StateSpace, StockState},
    },
};

// ================================================================================================
// Hyper-Parameters
// ================================================================================================

/// Hyper-parameters of a [`QLearningTrader`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QLearningConfig {
    /// Learning rate in `(0, 1]`.
    alpha: f64,
    /// Discount factor in `[0, 1]`.
    gamma: f64,
    /// Seed for action sampling. `None` seeds from the operating system.
    seed: Option<u64>,
    /// Keep trading past the end of the day until flat.
    trades_until_flat: bool,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.9,
            seed: None,
            trades_until_flat: true,
        }
    }
}

impl QLearningConfig {
    pub fn with_alpha(self, alpha: f64) -> Self {
        Self { alpha, ..self }
    }

    pub fn with_gamma(self, gamma: f64) -> Self {
        Self { gamma, ..self }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self
        }
    }

    pub fn with_trades_until_flat(self, trades_until_flat: bool) -> Self {
        Self {
            trades_until_flat,
            ..self
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn trades_until_flat(&self) -> bool {
        self.trades_until_flat
    }

    pub fn validate(&self) -> StockGymResult<()> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(AgentError::InvalidHyperParameter(format!(
                "alpha must be in (0, 1], got {}",
                self.alpha
            ))
            .into());
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(AgentError::InvalidHyperParameter(format!(
                "gamma must be in [0, 1], got {}",
                self.gamma
            ))
            .into());
        }
        Ok(())
    }
}

// ================================================================================================
// Tabular Q-Learning Trader
// ================================================================================================

/// Tabular Q-learning over the full (indicator, price, position) state space.
///
/// The Q-table starts at zero with one row per state and one column per
/// transaction. While a state's row is still all zeros the trader explores
/// uniformly; afterwards it samples from the softmax of the row.
#[derive(Debug, Clone)]
pub struct QLearningTrader {
    config: QLearningConfig,
    state_space: StateSpace,
    action_space: ActionSpace,
    q_table: Array2<f64>,
    rng: StdRng,
}

impl QLearningTrader {
    /// A fresh trader for stocks built from `stock`.
    pub fn new(stock: &StockConfig, config: QLearningConfig) -> StockGymResult<Self> {
        config.validate()?;

        let state_space = stock.state_space();
        let action_space = stock.action_space();
        let q_table = Array2::zeros((state_space.len(), action_space.len()));

        info!(
            states = state_space.len(),
            actions = action_space.len(),
            alpha = config.alpha,
            gamma = config.gamma,
            "Q-table initialized"
        );

        Ok(Self {
            rng: rng_from(config.seed),
            config,
            state_space,
            action_space,
            q_table,
        })
    }

    pub fn config(&self) -> &QLearningConfig {
        &self.config
    }

    pub fn q_table(&self) -> &Array2<f64> {
        &self.q_table
    }

    /// Q-values of `state`, one per transaction in action-space order.
    pub fn q_values(&self, state: &StockState) -> StockGymResult<ArrayView1<'_, f64>> {
        let s = self.state_index(state)?;
        Ok(self.q_table.row(s))
    }

    /// Transaction with the highest Q-value in `state`. Ties go to the smallest transaction.
    pub fn greedy_action(&self, state: &StockState) -> StockGymResult<Transaction> {
        let row = self.q_values(state)?;
        let best = row
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(bi, bq), (i, &q)| {
                if q > bq { (i, q) } else { (bi, bq) }
            })
            .0;
        self.transaction_at(best)
    }

    fn state_index(&self, state: &StockState) -> StockGymResult<usize> {
        self.state_space
            .index_of(state)
            .ok_or_else(|| AgentError::UnknownState(format!("{state:?}")).into())
    }

    fn action_index(&self, transaction: Transaction) -> StockGymResult<usize> {
        self.action_space
            .index_of(transaction)
            .ok_or_else(|| AgentError::UnknownAction(transaction.to_string()).into())
    }

    fn transaction_at(&self, index: usize) -> StockGymResult<Transaction> {
        self.action_space
            .transaction_at(index)
            .ok_or_else(|| AgentError::UnknownAction(format!("action index {index}")).into())
    }
}

impl Trader for QLearningTrader {
    fn act(&mut self, state: &StockState) -> StockGymResult<Transaction> {
        let s = self.state_index(state)?;
        let row = self.q_table.row(s);

        if row.iter().all(|q| *q == 0.0) {
            return Ok(self.action_space.sample(&mut self.rng));
        }

        let probabilities = stable_softmax(&row.to_vec());
        let dist =
            WeightedIndex::new(&probabilities).map_err(|e| AgentError::Sampling(e.to_string()))?;
        let index = dist.sample(&mut self.rng);
        self.transaction_at(index)
    }

    fn learn(&mut self, experience: &Experience) -> StockGymResult<()> {
        let s = self.state_index(&experience.state)?;
        let a = self.action_index(experience.transaction)?;
        let next = self.state_index(&experience.next_state)?;

        let max_next = self
            .q_table
            .row(next)
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let target = experience.reward.as_f64() + self.config.gamma * max_next;

        let q = &mut self.q_table[[s, a]];
        let td_error = target - *q;
        *q += self.config.alpha * td_error;

        debug!(
            state = s,
            transaction = %experience.transaction,
            reward = %experience.reward,
            td_error,
            q = *q,
            "Q update"
        );
        Ok(())
    }

    fn identifier(&self) -> AgentIdentifier {
        AgentIdentifier::QLearning
    }

    fn trades_until_flat(&self) -> bool {
        self.config.trades_until_flat
    }

    fn check_compatible(&self, config: &StockConfig) -> StockGymResult<()> {
        if self.state_space != config.state_space() {
            return Err(AgentError::Incompatible(format!(
                "Q-table has {} states, stock has {}",
                self.state_space.len(),
                config.state_space().len()
            ))
            .into());
        }
        if self.action_space != config.action_space() {
            return Err(AgentError::Incompatible(format!(
                "Q-table has actions {:?}, stock accepts {:?}",
                self.action_space.transactions(),
                config.action_space().transactions()
            ))
            .into());
        }
        Ok(())
    }
}

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Softmax shifted by the maximum so large Q-values do not overflow `exp`.
///
/// Returns an empty vector for empty input.
pub fn stable_softmax(values: &[f64]) -> Vec<f64> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = values.iter().map(|v| (v - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
