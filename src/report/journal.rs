use std::sync::Arc;

use polars::{
    df,
    frame::DataFrame,
    prelude::{DataType, Field, IntoLazy, PlSmallStr, Schema, SchemaRef, col, len, lit},
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{
    error::{DataError, StockGymResult},
    gym::stock::history::HistoryLog,
    report::{
        io::{Report, ReportName, ToSchema},
        polars_ext::{ExprExt, polars_to_stockgym_error},
    },
};

/// Columns of the per-period [`Journal`].
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
)]
#[strum(serialize_all = "snake_case")]
pub enum JournalCol {
    /// Zero-based period within the recorded history.
    Period,
    /// Indicator observed when the trader acted.
    Indicator,
    /// Price the transaction executed at.
    Price,
    /// Executed transaction (after any downgrade to a hold).
    Transaction,
    /// Net position after the transaction.
    Position,
    Reward,
    Cashflow,
    /// Growth drawn in the transition that followed. Null if none followed yet.
    Growth,
}

impl From<JournalCol> for PlSmallStr {
    fn from(value: JournalCol) -> Self {
        value.as_str().into()
    }
}

impl JournalCol {
    pub fn name(&self) -> PlSmallStr {
        (*self).into()
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// One row per processed period of a [`HistoryLog`].
#[derive(Debug, Clone)]
pub struct Journal {
    df: DataFrame,
}

impl ReportName for Journal {
    fn base_name(&self) -> String {
        "journal".to_string()
    }
}

impl Report for Journal {
    fn as_df(&self) -> &DataFrame {
        &self.df
    }

    fn as_df_mut(&mut self) -> &mut DataFrame {
        &mut self.df
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self {
            df: DataFrame::empty_with_schema(&Self::to_schema()),
        }
    }
}

impl ToSchema for Journal {
    fn to_schema() -> SchemaRef {
        let fields: Vec<Field> = JournalCol::iter()
            .map(|c| {
                let dtype = match c {
                    JournalCol::Period => DataType::UInt32,
                    _ => DataType::Int64,
                };
                Field::new(c.into(), dtype)
            })
            .collect();

        Arc::new(Schema::from_iter(fields))
    }
}

impl TryFrom<&HistoryLog> for Journal {
    type Error = crate::error::StockGymError;

    fn try_from(history: &HistoryLog) -> Result<Self, Self::Error> {
        Journal::from_history(history)
    }
}

impl Journal {
    pub fn from_history(history: &HistoryLog) -> StockGymResult<Self> {
        let n = history.periods();
        let prices = history.price_history();
        let indicators = history.indicator_history();
        let growths = history.growth_history();
        let positions = history.position_history();

        if prices.len() < n
            || indicators.len() < n
            || positions.len() != n
            || growths.len() > prices.len()
        {
            return Err(DataError::InconsistentHistory(format!(
                "{n} transactions but {} prices, {} indicators, {} positions, {} growths",
                prices.len(),
                indicators.len(),
                positions.len(),
                growths.len()
            ))
            .into());
        }

        let df = df![
            JournalCol::Period.as_str() => (0..n as u32).collect::<Vec<_>>(),
            JournalCol::Indicator.as_str() => indicators[..n].iter().map(|x| x.0).collect::<Vec<_>>(),
            JournalCol::Price.as_str() => prices[..n].iter().map(|x| x.0).collect::<Vec<_>>(),
            JournalCol::Transaction.as_str() => history.transaction_history().iter().map(|x| x.0).collect::<Vec<_>>(),
            JournalCol::Position.as_str() => positions.iter().map(|x| x.0).collect::<Vec<_>>(),
            JournalCol::Reward.as_str() => history.reward_history().iter().map(|x| x.0).collect::<Vec<_>>(),
            JournalCol::Cashflow.as_str() => history.cashflow_history().iter().map(|x| x.0).collect::<Vec<_>>(),
            JournalCol::Growth.as_str() => (0..n).map(|i| growths.get(i).map(|g| g.0)).collect::<Vec<Option<i64>>>(),
        ]
        .map_err(|e| polars_to_stockgym_error("journal", e))?;

        Ok(Self { df })
    }

    /// Aggregates the journal into a single-row frame:
    /// `periods, trades, total_reward, mean_reward, total_cashflow, hit_rate`.
    ///
    /// `hit_rate` is the share of non-zero rewards that were positive (0 if
    /// no reward was ever realized).
    pub fn stats(&self) -> StockGymResult<DataFrame> {
        let reward = || col(JournalCol::Reward.as_str());
        let positive = reward().gt(lit(0)).cast(DataType::Float64).sum();
        let non_zero = reward().neq(lit(0)).cast(DataType::Float64).sum();

        self.df
            .clone()
            .lazy()
            .select([
                len().alias("periods"),
                col(JournalCol::Transaction.as_str())
                    .neq(lit(0))
                    .cast(DataType::Int64)
                    .sum()
                    .alias("trades"),
                reward().sum().alias("total_reward"),
                reward().cast(DataType::Float64).mean().alias("mean_reward"),
                col(JournalCol::Cashflow.as_str()).sum().alias("total_cashflow"),
                positive.safe_div(non_zero, 0.0).alias("hit_rate"),
            ])
            .collect()
            .map_err(|e| polars_to_stockgym_error("journal stats", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gym::{
        Reward,
        stock::{
            config::StockConfig,
            domain::{Cashflow, Growth, Indicator, Lot, Position, Price, Transaction},
            env::SimpleStock,
        },
    };

    fn history() -> HistoryLog {
        let mut log = HistoryLog::new(Price(50), Indicator(0));
        log.record_transaction(Transaction(2), Position(2), Reward(0), Cashflow(-100));
        log.record_transition(Growth(1), Price(51), Indicator(1));
        log.record_transaction(Transaction(0), Position(2), Reward(2), Cashflow(0));
        log.record_transition(Growth(-1), Price(50), Indicator(0));
        log.record_transaction(Transaction(-2), Position(0), Reward(-2), Cashflow(100));
        log
    }

    #[test]
    fn one_row_per_transaction() {
        let journal = Journal::from_history(&history()).unwrap();
        let df = journal.as_df();

        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), JournalCol::iter().count());

        let positions: Vec<Option<i64>> = df
            .column(JournalCol::Position.as_str())
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(positions, vec![Some(2), Some(2), Some(0)]);

        // The last transaction has no transition after it yet.
        let growth: Vec<Option<i64>> = df
            .column(JournalCol::Growth.as_str())
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(growth, vec![Some(1), Some(-1), None]);
    }

    #[test]
    fn schema_matches_built_frame() {
        let journal = Journal::from_history(&history()).unwrap();
        let schema = journal.as_df().schema();
        for (name, dtype) in Journal::to_schema().iter() {
            assert_eq!(schema.get(name), Some(dtype), "column {name}");
        }
        assert_eq!(Journal::default().as_df().height(), 0);
    }

    #[test]
    fn stats_aggregate_the_day() {
        let stats = Journal::from_history(&history()).unwrap().stats().unwrap();
        assert_eq!(stats.height(), 1);

        let get_i64 = |name: &str| stats.column(name).unwrap().i64().unwrap().get(0);
        assert_eq!(get_i64("total_reward"), Some(0));
        assert_eq!(get_i64("total_cashflow"), Some(0));
        assert_eq!(get_i64("trades"), Some(2));
        assert_eq!(
            stats.column("hit_rate").unwrap().f64().unwrap().get(0),
            Some(0.5)
        );
    }

    #[test]
    fn positions_follow_a_portfolio_opened_before_the_day() {
        let mut stock = SimpleStock::new(StockConfig::default()).unwrap();
        for _ in 0..3 {
            stock.portfolio_mut().push(Lot::short(Price(40)));
        }

        stock.process_transaction(Transaction(1));
        stock.transition().unwrap();
        stock.process_transaction(Transaction(-2));

        let journal = Journal::from_history(stock.history()).unwrap();
        let positions: Vec<Option<i64>> = journal
            .as_df()
            .column(JournalCol::Position.as_str())
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(positions, vec![Some(-2), Some(-4)]);
        assert_eq!(stock.position(), Position(-4));
    }

    #[test]
    fn empty_history_gives_empty_journal() {
        let journal = Journal::from_history(&HistoryLog::new(Price(50), Indicator(0))).unwrap();
        assert_eq!(journal.as_df().height(), 0);
    }
}
