#![allow(dead_code)]

use std::sync::Once;

use stockgym::prelude::*;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Installs a test-friendly subscriber once per test binary.
///
/// Honors `RUST_LOG`, defaults to `warn`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

pub fn seeded_config(seed: u64) -> StockConfig {
    StockConfig::default().with_seed(seed)
}

/// A market whose price and indicator never change.
pub fn frozen_config() -> StockConfig {
    let base = StockConfig::default();
    let n = base.indicators().len();
    let indicators = base.indicators().to_vec();
    let growths = base.growths().to_vec();
    let stay_put = growths.iter().map(|g| if g.0 == 0 { 1.0 } else { 0.0 }).collect::<Vec<_>>();

    base
        .with_indicator_chain(
            indicators,
            (0..n)
                .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
                .collect(),
        )
        .with_growth_model(growths, vec![stay_put; n])
        .with_seed(0)
}

/// Replays a fixed list of transactions, then holds.
pub struct ScriptedTrader {
    script: Vec<i64>,
    cursor: usize,
}

impl ScriptedTrader {
    pub fn new(script: Vec<i64>) -> Self {
        Self { script, cursor: 0 }
    }
}

impl Trader for ScriptedTrader {
    fn act(&mut self, _state: &StockState) -> StockGymResult<Transaction> {
        let t = self.script.get(self.cursor).copied().unwrap_or(0);
        self.cursor += 1;
        Ok(Transaction(t))
    }
}
