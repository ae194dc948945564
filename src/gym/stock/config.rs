use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

use crate::{
    error::{EnvError, IoError, StockGymResult},
    gym::stock::{
        action::ActionSpace,
        domain::{Growth, Indicator, Position, Price},
        observation::StateSpace,
        transition::MarkovModel,
    },
};

// ================================================================================================
// Preset Configurations
// ================================================================================================

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    PartialOrd,
    Ord,
    EnumIter,
    IntoStaticStr,
    EnumCount,
)]
pub enum StockPreset {
    /// **Long/short market.**
    ///
    /// * **Price:** 30 to 70, starting at 50.
    /// * **Position:** -5 to 5 shares.
    /// * **Actions:** trade up to 3 shares per period, one share at a time.
    Default,

    /// **Long-only market with coarse lots.**
    ///
    /// The trader cannot go short and owns at most 10 shares, traded in
    /// increments of 2.
    ///
    /// * **Price:** 40 to 60, starting at 50.
    /// * **Position:** 0 to 10 shares.
    /// * **Actions:** -10 to 10 in steps of 2.
    LongOnly,
}

impl From<StockPreset> for StockConfig {
    fn from(preset: StockPreset) -> Self {
        match preset {
            StockPreset::Default => StockConfig::default(),
            StockPreset::LongOnly => StockConfig::default()
                .with_price_bounds(Price(40), Price(60))
                .with_position_bounds(Position(0), Position(10))
                .with_increment(2)
                .with_max_transaction(10),
        }
    }
}

// ================================================================================================
// Stock Configuration
// ================================================================================================

/// Configuration blueprint for a [`SimpleStock`](crate::gym::stock::env::SimpleStock).
///
/// # Core Components
///
/// **Markov model:**
/// - `indicators`, `indicator_transition`: the indicator chain
/// - `growths`, `growth_probabilities`: price increments conditional on the indicator
///
/// **Bounds:**
/// - `price_bounds`: prices are clamped into this range
/// - `position_bounds`: transactions that would leave this range are downgraded to holds
///
/// **Action space:**
/// - `max_transaction`, `increment`: transactions are `-max..=max` in steps of `increment`
///
/// # Example
///
/// ```
/// # use stockgym::prelude::*;
/// # fn example() -> StockGymResult<()> {
/// let config = StockConfig::default()
///     .with_price_bounds(Price(30), Price(70))
///     .with_initial_price(Price(55))
///     .with_seed(7);
///
/// let stock = SimpleStock::new(config)?;
/// assert_eq!(stock.state().price, Price(55));
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockConfig {
    // ========================================================================
    // Markov Model
    // ========================================================================
    /// Indicator values. Also the row (and column) order of `indicator_transition`.
    indicators: Vec<Indicator>,

    /// `indicator_transition[i][j]` = P(next indicator = `indicators[j]` | current = `indicators[i]`).
    indicator_transition: Vec<Vec<f64>>,

    /// Possible one-period price increments.
    growths: Vec<Growth>,

    /// `growth_probabilities[i][k]` = P(growth = `growths[k]` | indicator = `indicators[i]`).
    growth_probabilities: Vec<Vec<f64>>,

    // ========================================================================
    // Bounds
    // ========================================================================
    /// Inclusive `[min, max]` clamp range for the price.
    price_bounds: (Price, Price),

    /// Inclusive `[min, max]` range for the net position.
    position_bounds: (Position, Position),

    // ========================================================================
    // Action Space
    // ========================================================================
    /// Largest number of shares traded in one period.
    max_transaction: i64,

    /// Transactions and positions move in multiples of this.
    increment: i64,

    /// Fixed fee per share traded. Deducted from both reward and cashflow.
    transaction_cost: i64,

    // ========================================================================
    // Initial State
    // ========================================================================
    initial_indicator: Indicator,
    initial_price: Price,

    // ========================================================================
    // Simulation Parameters
    // ========================================================================
    /// Seed for the market RNG. `None` seeds from the operating system.
    seed: Option<u64>,

    /// Length of a trading day when the stock is stepped through [`Env`](crate::gym::stock::Env).
    periods_per_day: usize,

    /// Maximum number of extra periods a trading day may run while a trader
    /// trades back to a flat position.
    flatten_limit: usize,
}

impl Default for StockConfig {
    fn default() -> Self {
        let values = || (-2..=2).collect::<Vec<i64>>();
        Self {
            indicators: values().into_iter().map(Indicator).collect(),
            indicator_transition: vec![
                vec![0.40, 0.60, 0.00, 0.00, 0.00],
                vec![0.00, 0.40, 0.60, 0.00, 0.00],
                vec![0.00, 0.00, 0.10, 0.90, 0.00],
                vec![0.00, 0.00, 0.00, 0.40, 0.60],
                vec![0.60, 0.00, 0.00, 0.00, 0.40],
            ],
            growths: values().into_iter().map(Growth).collect(),
            growth_probabilities: vec![
                vec![1.00, 0.00, 0.00, 0.00, 0.00],
                vec![0.00, 0.90, 0.10, 0.00, 0.00],
                vec![0.00, 0.00, 0.90, 0.10, 0.00],
                vec![0.00, 0.00, 0.00, 0.90, 0.10],
                vec![0.00, 0.00, 0.00, 0.00, 1.00],
            ],
            price_bounds: (Price(30), Price(70)),
            position_bounds: (Position(-5), Position(5)),
            max_transaction: 3,
            increment: 1,
            transaction_cost: 0,
            initial_indicator: Indicator(0),
            initial_price: Price(50),
            seed: None,
            periods_per_day: 20,
            flatten_limit: 1_000,
        }
    }
}

// ================================================================================================
// Builder Methods
// ================================================================================================

impl StockConfig {
    /// Replaces the indicator chain. `transition` rows follow the order of `indicators`.
    pub fn with_indicator_chain(self, indicators: Vec<Indicator>, transition: Vec<Vec<f64>>) -> Self {
        Self {
            indicators,
            indicator_transition: transition,
            ..self
        }
    }

    /// Replaces the growth model. One row per indicator, one column per growth.
    pub fn with_growth_model(self, growths: Vec<Growth>, probabilities: Vec<Vec<f64>>) -> Self {
        Self {
            growths,
            growth_probabilities: probabilities,
            ..self
        }
    }

    pub fn with_price_bounds(self, min: Price, max: Price) -> Self {
        Self {
            price_bounds: (min, max),
            ..self
        }
    }

    pub fn with_position_bounds(self, min: Position, max: Position) -> Self {
        Self {
            position_bounds: (min, max),
            ..self
        }
    }

    pub fn with_max_transaction(self, max_transaction: i64) -> Self {
        Self {
            max_transaction,
            ..self
        }
    }

    pub fn with_increment(self, increment: i64) -> Self {
        Self { increment, ..self }
    }

    pub fn with_transaction_cost(self, transaction_cost: i64) -> Self {
        Self {
            transaction_cost,
            ..self
        }
    }

    pub fn with_initial_indicator(self, initial_indicator: Indicator) -> Self {
        Self {
            initial_indicator,
            ..self
        }
    }

    /// Sets the starting price. Values outside `price_bounds` are clamped when
    /// the stock is built.
    pub fn with_initial_price(self, initial_price: Price) -> Self {
        Self {
            initial_price,
            ..self
        }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self
        }
    }

    pub fn with_periods_per_day(self, periods_per_day: usize) -> Self {
        Self {
            periods_per_day,
            ..self
        }
    }

    pub fn with_flatten_limit(self, flatten_limit: usize) -> Self {
        Self {
            flatten_limit,
            ..self
        }
    }
}

// ================================================================================================
// Accessors
// ================================================================================================

impl StockConfig {
    pub fn indicators(&self) -> &[Indicator] {
        &self.indicators
    }

    pub fn indicator_transition(&self) -> &[Vec<f64>] {
        &self.indicator_transition
    }

    pub fn growths(&self) -> &[Growth] {
        &self.growths
    }

    pub fn growth_probabilities(&self) -> &[Vec<f64>] {
        &self.growth_probabilities
    }

    pub fn price_bounds(&self) -> (Price, Price) {
        self.price_bounds
    }

    pub fn position_bounds(&self) -> (Position, Position) {
        self.position_bounds
    }

    pub fn max_transaction(&self) -> i64 {
        self.max_transaction
    }

    pub fn increment(&self) -> i64 {
        self.increment
    }

    pub fn transaction_cost(&self) -> i64 {
        self.transaction_cost
    }

    pub fn initial_indicator(&self) -> Indicator {
        self.initial_indicator
    }

    /// Starting price, already clamped into `price_bounds`.
    pub fn initial_price(&self) -> Price {
        let (min, max) = self.price_bounds;
        self.initial_price.clamp_to(min, max)
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn periods_per_day(&self) -> usize {
        self.periods_per_day
    }

    pub fn flatten_limit(&self) -> usize {
        self.flatten_limit
    }

    pub fn action_space(&self) -> ActionSpace {
        ActionSpace::new(self.max_transaction, self.increment)
    }

    pub fn state_space(&self) -> StateSpace {
        StateSpace::new(
            self.indicators.clone(),
            self.price_bounds,
            self.position_bounds,
            self.increment,
        )
    }
}

// ================================================================================================
// Validation & IO
// ================================================================================================

impl StockConfig {
    /// Checks every invariant the simulator relies on.
    pub fn validate(&self) -> StockGymResult<()> {
        fn invalid(msg: String) -> StockGymResult<()> {
            Err(EnvError::InvalidConfig(msg).into())
        }

        let (price_min, price_max) = self.price_bounds;
        if price_min > price_max {
            return invalid(format!("price bounds inverted: [{price_min}, {price_max}]"));
        }

        let (pos_min, pos_max) = self.position_bounds;
        if pos_min > pos_max {
            return invalid(format!("position bounds inverted: [{pos_min}, {pos_max}]"));
        }
        if pos_min.0 > 0 || pos_max.0 < 0 {
            return invalid(format!(
                "position bounds [{pos_min}, {pos_max}] must contain the flat position"
            ));
        }

        if self.increment <= 0 {
            return invalid(format!("increment must be positive, got {}", self.increment));
        }
        if self.max_transaction <= 0 {
            return invalid(format!(
                "max_transaction must be positive, got {}",
                self.max_transaction
            ));
        }
        if self.max_transaction % self.increment != 0 {
            return invalid(format!(
                "max_transaction {} is not a multiple of increment {}",
                self.max_transaction, self.increment
            ));
        }
        if pos_min.0 % self.increment != 0 || pos_max.0 % self.increment != 0 {
            return invalid(format!(
                "position bounds [{pos_min}, {pos_max}] must be multiples of increment {}",
                self.increment
            ));
        }
        if self.transaction_cost < 0 {
            return invalid(format!(
                "transaction_cost must be >= 0, got {}",
                self.transaction_cost
            ));
        }

        if self.periods_per_day == 0 {
            return invalid("periods_per_day must be positive".to_string());
        }

        if self.indicators.is_empty() || self.growths.is_empty() {
            return invalid("indicator and growth sets must not be empty".to_string());
        }
        if !self.indicators.contains(&self.initial_indicator) {
            return invalid(format!(
                "initial indicator {} is not one of {:?}",
                self.initial_indicator, self.indicators
            ));
        }

        // Matrix shapes and row sums.
        MarkovModel::from_config(self).map(|_| ())
    }

    /// Deterministic hash of this configuration, e.g. to name files derived from it.
    pub fn hash(&self) -> StockGymResult<String> {
        let mut hasher = blake3::Hasher::new();
        let bytes = postcard::to_stdvec(self).map_err(EnvError::Encoding)?;
        hasher.update(&bytes);
        Ok(format!("{}", hasher.finalize()))
    }

    /// Reads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> StockGymResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(IoError::from)?;
        let config: Self = serde_json::from_str(&raw).map_err(IoError::Json)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON, creating parent directories.
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> StockGymResult<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(IoError::from)?;
        }
        let raw = serde_json::to_string_pretty(self).map_err(IoError::Json)?;
        fs::write(path, raw).map_err(IoError::from)?;
        Ok(())
    }
}
