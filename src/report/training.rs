use std::sync::Arc;

use polars::{
    df,
    frame::DataFrame,
    prelude::{DataType, Field, PlSmallStr, Schema, SchemaRef},
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{
    error::StockGymResult,
    gym::stock::env::DaySummary,
    report::{
        io::{Report, ReportName, ToSchema},
        polars_ext::polars_to_stockgym_error,
    },
};

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
pub enum TrainingCol {
    Episode,
    Periods,
    TotalReward,
    TotalCashflow,
    FinalPrice,
    FinalPosition,
    Unrealized,
}

impl From<TrainingCol> for PlSmallStr {
    fn from(value: TrainingCol) -> Self {
        value.as_str().into()
    }
}

impl TrainingCol {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// One row per trained episode.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    summaries: Vec<DaySummary>,
    df: DataFrame,
}

impl TrainingReport {
    pub fn new(summaries: Vec<DaySummary>) -> StockGymResult<Self> {
        let column = |f: fn(&DaySummary) -> i64| summaries.iter().map(f).collect::<Vec<_>>();

        let df = df![
            TrainingCol::Episode.as_str() => (0..summaries.len() as u32).collect::<Vec<_>>(),
            TrainingCol::Periods.as_str() => column(|s| s.periods as i64),
            TrainingCol::TotalReward.as_str() => column(|s| s.total_reward.0),
            TrainingCol::TotalCashflow.as_str() => column(|s| s.total_cashflow.0),
            TrainingCol::FinalPrice.as_str() => column(|s| s.final_price.0),
            TrainingCol::FinalPosition.as_str() => column(|s| s.final_position.0),
            TrainingCol::Unrealized.as_str() => column(|s| s.unrealized.0),
        ]
        .map_err(|e| polars_to_stockgym_error("training report", e))?;

        Ok(Self { summaries, df })
    }

    pub fn summaries(&self) -> &[DaySummary] {
        &self.summaries
    }

    /// Mean total reward over all episodes, `None` without episodes.
    pub fn mean_reward(&self) -> Option<f64> {
        if self.summaries.is_empty() {
            return None;
        }
        let total: i64 = self.summaries.iter().map(|s| s.total_reward.0).sum();
        Some(total as f64 / self.summaries.len() as f64)
    }

    /// Trailing mean of the total reward over `window` episodes, one value per
    /// episode once the window is full.
    pub fn reward_moving_average(&self, window: usize) -> Vec<f64> {
        if window == 0 {
            return Vec::new();
        }
        self.summaries
            .windows(window)
            .map(|w| w.iter().map(|s| s.total_reward.0 as f64).sum::<f64>() / window as f64)
            .collect()
    }
}

impl ReportName for TrainingReport {
    fn base_name(&self) -> String {
        "training".to_string()
    }
}

impl Report for TrainingReport {
    fn as_df(&self) -> &DataFrame {
        &self.df
    }

    fn as_df_mut(&mut self) -> &mut DataFrame {
        &mut self.df
    }
}

impl ToSchema for TrainingReport {
    fn to_schema() -> SchemaRef {
        let fields: Vec<Field> = TrainingCol::iter()
            .map(|c| {
                let dtype = match c {
                    TrainingCol::Episode => DataType::UInt32,
                    _ => DataType::Int64,
                };
                Field::new(c.into(), dtype)
            })
            .collect();

        Arc::new(Schema::from_iter(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gym::{
        Reward,
        stock::domain::{Cashflow, Position, Price},
    };

    fn summary(total_reward: i64) -> DaySummary {
        DaySummary {
            periods: 10,
            total_reward: Reward(total_reward),
            total_cashflow: Cashflow(total_reward),
            final_price: Price(50),
            final_position: Position(0),
            unrealized: Reward(0),
        }
    }

    #[test]
    fn builds_one_row_per_episode() {
        let report = TrainingReport::new(vec![summary(4), summary(-2), summary(7)]).unwrap();
        assert_eq!(report.as_df().height(), 3);

        let schema = report.as_df().schema();
        for (name, dtype) in TrainingReport::to_schema().iter() {
            assert_eq!(schema.get(name), Some(dtype), "column {name}");
        }
    }

    #[test]
    fn reward_statistics() {
        let report = TrainingReport::new(vec![summary(4), summary(-2), summary(7)]).unwrap();
        assert_eq!(report.mean_reward(), Some(3.0));
        assert_eq!(report.reward_moving_average(2), vec![1.0, 2.5]);
        assert!(report.reward_moving_average(0).is_empty());
        assert!(report.reward_moving_average(4).is_empty());

        let empty = TrainingReport::new(Vec::new()).unwrap();
        assert_eq!(empty.mean_reward(), None);
        assert_eq!(empty.as_df().height(), 0);
    }
}
