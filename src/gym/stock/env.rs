use indicatif::{ProgressBar, ProgressStyle};
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::{
    agent::{Experience, Trader},
    error::{EnvError, StockGymResult},
    gym::{
        EnvStatus, Reward, StepOutcome,
        stock::{
            Env,
            action::ActionSpace,
            config::StockConfig,
            domain::{Cashflow, Growth, Indicator, Position, Price, Transaction},
            history::HistoryLog,
            ledger::Portfolio,
            observation::{StateSpace, StockState},
            transition::MarkovModel,
        },
    },
    report::training::TrainingReport,
};

/// Result of processing one requested transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutcome {
    /// What the trader asked for.
    pub requested: Transaction,
    /// What was executed. Equals `requested` unless it was downgraded to a hold.
    pub actual: Transaction,
    pub reward: Reward,
    pub cashflow: Cashflow,
}

impl TransactionOutcome {
    pub fn was_downgraded(&self) -> bool {
        self.requested != self.actual
    }
}

/// Totals of one simulated trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySummary {
    /// Periods actually simulated, including any spent trading back to flat.
    pub periods: usize,
    pub total_reward: Reward,
    pub total_cashflow: Cashflow,
    pub final_price: Price,
    pub final_position: Position,
    /// Mark-to-market value of the lots still open at the end of the day.
    pub unrealized: Reward,
}

/// A synthetic single-stock market traded by one price-taking trader.
///
/// The trader's transactions never move the price. Each period the stock
/// first processes the trader's transaction against the [`Portfolio`] and then
/// transitions: the current indicator selects a growth distribution for the
/// next price and a distribution for the next indicator.
#[derive(Debug, Clone)]
pub struct SimpleStock {
    // === Configuration ===
    config: StockConfig,
    model: MarkovModel,
    action_space: ActionSpace,
    state_space: StateSpace,

    // === Market State ===
    indicator: Indicator,
    price: Price,
    portfolio: Portfolio,
    history: HistoryLog,
    rng: StdRng,

    // === Lifecycle (Env API) ===
    /// Periods stepped in the current trading day.
    period: usize,
    env_status: EnvStatus,
}

impl SimpleStock {
    /// Builds a stock in its initial state. The initial price is clamped into
    /// the configured price bounds.
    pub fn new(config: StockConfig) -> StockGymResult<Self> {
        config.validate()?;

        let model = MarkovModel::from_config(&config)?;
        let rng = match config.seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let indicator = config.initial_indicator();
        let price = config.initial_price();

        Ok(Self {
            action_space: config.action_space(),
            state_space: config.state_space(),
            model,
            indicator,
            price,
            portfolio: Portfolio::new(),
            history: HistoryLog::new(price, indicator),
            rng,
            period: 0,
            env_status: EnvStatus::Ready,
            config,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> StockState {
        StockState::new(self.indicator, self.price, self.position())
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn indicator(&self) -> Indicator {
        self.indicator
    }

    pub fn position(&self) -> Position {
        self.portfolio.net_position()
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    /// Mutable access to the open lots, e.g. to seed a scenario.
    ///
    /// Every `Portfolio` mutation recomputes the net position, so the stock's
    /// position stays consistent.
    pub fn portfolio_mut(&mut self) -> &mut Portfolio {
        &mut self.portfolio
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn config(&self) -> &StockConfig {
        &self.config
    }

    pub fn action_space(&self) -> &ActionSpace {
        &self.action_space
    }

    pub fn state_space(&self) -> &StateSpace {
        &self.state_space
    }

    pub fn status(&self) -> EnvStatus {
        self.env_status
    }

    pub fn summary(&self) -> DaySummary {
        self.summary_since(0)
    }

    // ========================================================================
    // Transaction Processing
    // ========================================================================

    /// A transaction is valid if it belongs to the action space and keeps the
    /// net position within the configured bounds.
    pub fn is_valid_transaction(&self, transaction: Transaction) -> bool {
        let (min, max) = self.config.position_bounds();
        let after = self.position().after(transaction);
        self.action_space.contains(transaction) && min <= after && after <= max
    }

    /// Executes `transaction` at the current price.
    ///
    /// Invalid transactions are downgraded to a hold. The actual transaction,
    /// its reward and its cashflow are appended to the history.
    pub fn process_transaction(&mut self, transaction: Transaction) -> TransactionOutcome {
        let actual = if self.is_valid_transaction(transaction) {
            transaction
        } else {
            debug!(
                requested = %transaction,
                position = %self.position(),
                "Invalid transaction downgraded to hold"
            );
            Transaction::HOLD
        };

        let (mut reward, mut cashflow) = if actual.is_long() {
            self.portfolio.transact_long(actual.quantity(), self.price)
        } else if actual.is_short() {
            self.portfolio.transact_short(actual.quantity(), self.price)
        } else {
            let previous = self.history.previous_price().unwrap_or(self.price);
            self.portfolio.transact_hold(self.price, previous)
        };

        let fee = self.config.transaction_cost() * actual.quantity() as i64;
        reward -= fee;
        cashflow -= fee;

        self.portfolio.compute_net_position();
        let position = self.portfolio.net_position();
        self.history
            .record_transaction(actual, position, reward, cashflow);

        debug!(
            requested = %transaction,
            actual = %actual,
            reward = %reward,
            cashflow = %cashflow,
            position = %self.position(),
            price = %self.price,
            "Transaction processed"
        );

        TransactionOutcome {
            requested: transaction,
            actual,
            reward,
            cashflow,
        }
    }

    // ========================================================================
    // State Transition
    // ========================================================================

    /// Advances the Markov chain by one period.
    ///
    /// The growth draw and the next indicator both condition on the current
    /// indicator only. The new price is clamped into the price bounds.
    pub fn transition(&mut self) -> StockGymResult<Growth> {
        let growth = self.model.sample_growth(self.indicator, &mut self.rng)?;
        let next_indicator = self.model.sample_indicator(self.indicator, &mut self.rng)?;

        let (min, max) = self.config.price_bounds();
        let next_price = self.price.apply_growth(growth).clamp_to(min, max);

        trace!(
            growth = %growth,
            price = %next_price,
            indicator = %next_indicator,
            "Market transition"
        );

        self.price = next_price;
        self.indicator = next_indicator;
        self.history.record_transition(growth, next_price, next_indicator);

        Ok(growth)
    }

    /// One lock-step period: act at the current price, then transition.
    fn advance(&mut self, transaction: Transaction) -> StockGymResult<TransactionOutcome> {
        let outcome = self.process_transaction(transaction);
        self.transition()?;
        Ok(outcome)
    }

    // ========================================================================
    // Day Simulation
    // ========================================================================

    /// Lets `trader` trade for `periods` periods, continuing from the current
    /// market state.
    ///
    /// If the trader trades until flat and still holds a position after
    /// `periods`, the day goes on until the position is flat or the configured
    /// flatten limit of extra periods is spent. The trader learns from every
    /// period it acted in.
    ///
    /// Returns `AgentError::Incompatible` before simulating anything if the
    /// trader was built for a different market.
    #[tracing::instrument(skip(self, trader), fields(agent = %trader.identifier()))]
    pub fn simulate_trading_day<T: Trader + ?Sized>(
        &mut self,
        periods: usize,
        trader: &mut T,
    ) -> StockGymResult<DaySummary> {
        trader.check_compatible(&self.config)?;

        let start = self.history.periods();
        let until_flat = trader.trades_until_flat();
        let flatten_limit = self.config.flatten_limit();

        for period in 0.. {
            if period >= periods {
                if !until_flat || self.position().is_flat() {
                    break;
                }
                if period - periods >= flatten_limit {
                    warn!(
                        position = %self.position(),
                        flatten_limit,
                        "Flatten limit reached with an open position"
                    );
                    break;
                }
            }

            let state = self.state();
            let transaction = trader.act(&state)?;
            let outcome = self.advance(transaction)?;
            let next_state = self.state();

            trader.learn(&Experience {
                state,
                transaction,
                reward: outcome.reward,
                next_state,
            })?;
        }

        let summary = self.summary_since(start);
        info!(
            periods = summary.periods,
            total_reward = %summary.total_reward,
            total_cashflow = %summary.total_cashflow,
            final_position = %summary.final_position,
            "Trading day finished"
        );
        Ok(summary)
    }

    /// Runs `episodes` independent trading days of `periods` periods each,
    /// restarting the market before every day.
    pub fn train<T: Trader + ?Sized>(
        &mut self,
        trader: &mut T,
        episodes: usize,
        periods: usize,
    ) -> StockGymResult<TrainingReport> {
        trader.check_compatible(&self.config)?;

        let pb = progress_bar(episodes as u64)?;
        pb.set_message("Training...");

        let mut summaries = Vec::with_capacity(episodes);
        for episode in 0..episodes {
            self.restart();
            let summary = self.simulate_trading_day(periods, trader)?;
            trader.reset();
            debug!(episode, total_reward = %summary.total_reward, "Episode finished");
            summaries.push(summary);
            pb.inc(1);
        }

        pb.finish_with_message("Training complete.");
        TrainingReport::new(summaries)
    }

    fn summary_since(&self, start: usize) -> DaySummary {
        let rewards = self.history.reward_history().get(start..).unwrap_or_default();
        let cashflows = self.history.cashflow_history().get(start..).unwrap_or_default();

        DaySummary {
            periods: rewards.len(),
            total_reward: rewards.iter().copied().sum(),
            total_cashflow: cashflows.iter().copied().sum(),
            final_price: self.price,
            final_position: self.position(),
            unrealized: self.portfolio.unrealized(self.price),
        }
    }

    /// Restores the initial market state: indicator, price, empty portfolio and
    /// history. The RNG keeps its stream so consecutive days differ.
    fn restart(&mut self) {
        self.indicator = self.config.initial_indicator();
        self.price = self.config.initial_price();
        self.portfolio.clear();
        self.history.clear_to(self.price, self.indicator);
        self.period = 0;
    }

    fn check_step_status(&self) -> StockGymResult<()> {
        use EnvStatus::*;
        match self.env_status {
            Running => Ok(()),
            Ready => Err(EnvError::InvalidState(
                "Environment is not started. Call `reset()` before stepping.".to_string(),
            )
            .into()),
            EpisodeDone => Err(EnvError::InvalidState(
                "Trading day is done. Call `reset()` before stepping.".to_string(),
            )
            .into()),
        }
    }
}

impl Env for SimpleStock {
    #[tracing::instrument(skip(self))]
    fn reset(&mut self) -> StockGymResult<(StockState, Reward, StepOutcome)> {
        self.restart();
        self.env_status = EnvStatus::Running;
        info!(
            price = %self.price,
            indicator = %self.indicator,
            "Environment Reset Initiated."
        );
        Ok((self.state(), Reward(0), StepOutcome::InProgress))
    }

    fn step(
        &mut self,
        transaction: Transaction,
    ) -> StockGymResult<(StockState, Reward, StepOutcome)> {
        self.check_step_status()?;

        let outcome = self.advance(transaction)?;
        self.period += 1;

        let step_outcome = if self.period < self.config.periods_per_day() {
            StepOutcome::InProgress
        } else if self.position().is_flat() {
            StepOutcome::Terminated
        } else {
            StepOutcome::Truncated
        };

        if step_outcome.is_terminal() {
            self.env_status = EnvStatus::EpisodeDone;
        }

        Ok((self.state(), outcome.reward, step_outcome))
    }
}

fn progress_bar(capacity: u64) -> StockGymResult<ProgressBar> {
    let bar = ProgressBar::new(capacity);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta_precise}) {msg}")
            .map_err(EnvError::ProgressBar)?
            .progress_chars("#>-"),
    );
    Ok(bar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::{AgentIdentifier, random::RandomTrader},
        error::{AgentError, StockGymError},
        gym::stock::domain::Lot,
    };

    fn stock() -> SimpleStock {
        SimpleStock::new(StockConfig::default().with_seed(3)).unwrap()
    }

    /// Market that never moves: every indicator keeps growth 0 and stays put.
    fn frozen_config() -> StockConfig {
        let n = StockConfig::default().indicators().len();
        let identity: Vec<Vec<f64>> = (0..n)
            .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
            .collect();
        let zero_growth = vec![vec![0.0, 0.0, 1.0, 0.0, 0.0]; n];
        let base = StockConfig::default();
        let indicators = base.indicators().to_vec();
        let growths = base.growths().to_vec();
        base.with_indicator_chain(indicators, identity)
            .with_growth_model(growths, zero_growth)
            .with_seed(1)
    }

    /// Trader replaying a fixed script of transactions, then holding.
    struct Scripted {
        script: Vec<i64>,
        cursor: usize,
        until_flat: bool,
        learned: Vec<Experience>,
    }

    impl Scripted {
        fn new(script: Vec<i64>, until_flat: bool) -> Self {
            Self {
                script,
                cursor: 0,
                until_flat,
                learned: Vec::new(),
            }
        }
    }

    impl Trader for Scripted {
        fn act(&mut self, _state: &StockState) -> StockGymResult<Transaction> {
            let t = self.script.get(self.cursor).copied().unwrap_or(0);
            self.cursor += 1;
            Ok(Transaction(t))
        }

        fn learn(&mut self, experience: &Experience) -> StockGymResult<()> {
            self.learned.push(*experience);
            Ok(())
        }

        fn identifier(&self) -> AgentIdentifier {
            AgentIdentifier::Named(std::sync::Arc::new("Scripted".to_string()))
        }

        fn trades_until_flat(&self) -> bool {
            self.until_flat
        }
    }

    #[test]
    fn construction_clamps_initial_price() {
        let config = StockConfig::default()
            .with_price_bounds(Price(30), Price(70))
            .with_initial_price(Price(100));
        let stock = SimpleStock::new(config).unwrap();
        assert_eq!(stock.price(), Price(70));
        assert_eq!(stock.history().price_history(), &[Price(70)]);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = StockConfig::default().with_increment(0);
        assert!(matches!(
            SimpleStock::new(config),
            Err(StockGymError::Env(EnvError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn position_moves_by_actual_transaction() {
        let mut stock = stock();
        for t in [3, 2, 1, -3, -3, -3, -3, 0, 2, -1, 3, 3, -2] {
            let before = stock.position();
            let outcome = stock.process_transaction(Transaction(t));
            assert_eq!(stock.position(), before.after(outcome.actual));
            stock.transition().unwrap();
        }
    }

    #[test]
    fn out_of_bounds_short_is_downgraded_to_hold() {
        let config = frozen_config().with_price_bounds(Price(30), Price(70));
        let mut stock = SimpleStock::new(config).unwrap();
        for _ in 0..5 {
            stock.portfolio_mut().push(Lot::short(Price(40)));
        }
        assert_eq!(stock.position(), Position(-5));

        // Move the price once so the hold has a delta to reward.
        stock.history.record_transition(Growth(2), Price(52), Indicator(0));
        stock.price = Price(52);

        let outcome = stock.process_transaction(Transaction(-3));

        assert_eq!(outcome.actual, Transaction::HOLD);
        assert!(outcome.was_downgraded());
        assert_eq!(outcome.reward, Reward(-5 * (52 - 50)));
        assert_eq!(outcome.cashflow, Cashflow(0));
        assert_eq!(stock.position(), Position(-5));
        assert_eq!(stock.history().transaction_history(), &[Transaction::HOLD]);
    }

    #[test]
    fn transaction_outside_action_space_is_downgraded() {
        let mut stock = stock();
        let outcome = stock.process_transaction(Transaction(4));
        assert_eq!(outcome.actual, Transaction::HOLD);
        assert!(stock.position().is_flat());
    }

    #[test]
    fn flat_hold_earns_nothing() {
        let mut stock = stock();
        stock.transition().unwrap();
        stock.transition().unwrap();
        let outcome = stock.process_transaction(Transaction::HOLD);
        assert_eq!(outcome.reward, Reward(0));
        assert_eq!(outcome.cashflow, Cashflow(0));
    }

    #[test]
    fn transaction_cost_is_charged_per_share() {
        let mut stock = SimpleStock::new(frozen_config().with_transaction_cost(1)).unwrap();
        let outcome = stock.process_transaction(Transaction(3));
        assert_eq!(outcome.cashflow, Cashflow(-3 * 50 - 3));
        assert_eq!(outcome.reward, Reward(-3));
    }

    #[test]
    fn transition_keeps_price_in_bounds_and_logs() {
        let mut stock = SimpleStock::new(
            StockConfig::default()
                .with_initial_indicator(Indicator(2))
                .with_initial_price(Price(69))
                .with_seed(9),
        )
        .unwrap();
        for _ in 0..200 {
            stock.transition().unwrap();
            let (min, max) = stock.config().price_bounds();
            assert!(stock.price() >= min && stock.price() <= max);
        }
        let history = stock.history();
        assert_eq!(history.price_history().len(), 201);
        assert_eq!(history.indicator_history().len(), 201);
        assert_eq!(history.growth_history().len(), 200);
        // Indicator 2 always grows by 2 from 69, which the upper bound clamps.
        assert_eq!(history.growth_history()[0], Growth(2));
        assert_eq!(history.price_history()[1], Price(70));
    }

    #[test]
    fn day_runs_exact_periods_without_flatten() {
        let mut stock = stock();
        let mut trader = Scripted::new(vec![1, 1, 1], false);
        let summary = stock.simulate_trading_day(5, &mut trader).unwrap();

        assert_eq!(summary.periods, 5);
        assert_eq!(trader.learned.len(), 5);
        assert_eq!(stock.history().transaction_history().len(), 5);
        assert_eq!(stock.history().price_history().len(), 6);
        assert_eq!(summary.final_position, Position(3));
    }

    #[test]
    fn day_extends_until_flat() {
        let mut stock = SimpleStock::new(frozen_config()).unwrap();
        // Buy 2 during the day, then sell one share per extra period.
        let mut trader = Scripted::new(vec![2, 0, 0, -1, -1], true);
        let summary = stock.simulate_trading_day(3, &mut trader).unwrap();

        assert_eq!(summary.periods, 5);
        assert_eq!(summary.final_position, Position(0));
        // Frozen market: buying at 50 and selling at 50 nets out.
        assert_eq!(summary.total_cashflow, Cashflow(0));
    }

    #[test]
    fn flatten_limit_caps_the_day() {
        let mut stock = SimpleStock::new(frozen_config().with_flatten_limit(4)).unwrap();
        let mut trader = Scripted::new(vec![1], true);
        let summary = stock.simulate_trading_day(2, &mut trader).unwrap();

        assert_eq!(summary.periods, 2 + 4);
        assert_eq!(summary.final_position, Position(1));
    }

    #[test]
    fn experiences_use_requested_transaction() {
        let mut stock = SimpleStock::new(frozen_config()).unwrap();
        let mut trader = Scripted::new(vec![3, 3], false);
        stock.simulate_trading_day(2, &mut trader).unwrap();

        let second = trader.learned[1];
        assert_eq!(second.transaction, Transaction(3));
        assert_eq!(second.state.position, Position(3));
        // 3 + 3 exceeds the bound of 5, so the stock held instead.
        assert_eq!(second.next_state.position, Position(3));
    }

    #[test]
    fn incompatible_trader_is_rejected_before_trading() {
        let other = StockConfig::default().with_max_transaction(1);
        let mut trader = RandomTrader::new(other.action_space(), Some(0));
        let mut stock = stock();

        let err = stock.simulate_trading_day(10, &mut trader).unwrap_err();
        assert!(matches!(err, StockGymError::Agent(AgentError::Incompatible(_))));
        assert_eq!(stock.history().periods(), 0);
    }

    #[test]
    fn env_lifecycle() {
        let mut stock = SimpleStock::new(frozen_config().with_periods_per_day(3)).unwrap();
        assert!(stock.step(Transaction(1)).is_err());

        let (state, reward, outcome) = stock.reset().unwrap();
        assert_eq!(state.price, Price(50));
        assert_eq!(reward, Reward(0));
        assert_eq!(outcome, StepOutcome::InProgress);

        let (_, _, o1) = stock.step(Transaction(1)).unwrap();
        let (_, _, o2) = stock.step(Transaction(0)).unwrap();
        let (_, _, o3) = stock.step(Transaction(0)).unwrap();
        assert_eq!(
            (o1, o2, o3),
            (StepOutcome::InProgress, StepOutcome::InProgress, StepOutcome::Truncated)
        );
        assert!(stock.status().is_episode_done());
        assert!(stock.step(Transaction(0)).is_err());

        stock.reset().unwrap();
        stock.step(Transaction(1)).unwrap();
        stock.step(Transaction(-1)).unwrap();
        let (_, _, outcome) = stock.step(Transaction(0)).unwrap();
        assert!(outcome.is_terminated());
    }

    #[test]
    fn train_restarts_every_episode() {
        let mut stock = stock();
        let mut trader = RandomTrader::for_stock(stock.config(), Some(5));
        let report = stock.train(&mut trader, 4, 10).unwrap();

        assert_eq!(report.summaries().len(), 4);
        assert!(report.summaries().iter().all(|s| s.periods == 10));
        // History only holds the last day.
        assert_eq!(stock.history().periods(), 10);
    }
}
