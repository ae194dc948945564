use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    gym::Reward, impl_display_primitive, impl_from_primitive, impl_ledger_arithmetic,
    impl_neg_primitive,
};

// ================================================================================================
// Domain Strong Types (NewTypes)
// ================================================================================================

/// A discrete share price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Price(pub i64);
impl_from_primitive!(Price, i64);
impl_ledger_arithmetic!(Price, i64);
impl_display_primitive!(Price);

impl Price {
    /// Clamps the price into the inclusive range `[min, max]`.
    pub fn clamp_to(self, min: Price, max: Price) -> Self {
        Self(self.0.clamp(min.0, max.0))
    }

    pub fn apply_growth(self, growth: Growth) -> Self {
        Self(self.0 + growth.0)
    }
}

/// Net number of shares held. Positive is net long, negative is net short.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position(pub i64);
impl_from_primitive!(Position, i64);
impl_ledger_arithmetic!(Position, i64);
impl_neg_primitive!(Position);
impl_display_primitive!(Position);

impl Position {
    pub fn is_flat(&self) -> bool {
        self.0 == 0
    }

    /// Position after applying `transaction`.
    pub fn after(self, transaction: Transaction) -> Self {
        Self(self.0 + transaction.0)
    }
}

/// Value of the exogenous firm-performance signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Indicator(pub i64);
impl_from_primitive!(Indicator, i64);
impl_display_primitive!(Indicator);

/// One-period price increment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Growth(pub i64);
impl_from_primitive!(Growth, i64);
impl_display_primitive!(Growth);

/// Money exchanged by a transaction, independent of realized profit.
///
/// Buying shares is a negative cashflow, selling a positive one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cashflow(pub i64);
impl_from_primitive!(Cashflow, i64);
impl_ledger_arithmetic!(Cashflow, i64);
impl_neg_primitive!(Cashflow);
impl_display_primitive!(Cashflow);

/// A signed number of shares to trade: `> 0` buys, `< 0` sells, `0` holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Transaction(pub i64);
impl_from_primitive!(Transaction, i64);
impl_neg_primitive!(Transaction);
impl_display_primitive!(Transaction);

impl Transaction {
    pub const HOLD: Transaction = Transaction(0);

    pub fn is_long(&self) -> bool {
        self.0 > 0
    }

    pub fn is_short(&self) -> bool {
        self.0 < 0
    }

    pub fn is_hold(&self) -> bool {
        self.0 == 0
    }

    /// Number of shares moved, regardless of direction.
    pub fn quantity(&self) -> u64 {
        self.0.unsigned_abs()
    }
}

// ================================================================================================
// Lots
// ================================================================================================

#[derive(
    Copy,
    Clone,
    Debug,
    EnumString,
    EnumIter,
    Display,
    PartialEq,
    Eq,
    Hash,
    Deserialize,
    Serialize,
    PartialOrd,
    Ord,
    IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// `+1` for long lots, `-1` for short lots.
    pub fn sign(&self) -> i64 {
        match self {
            Direction::Long => 1,
            Direction::Short => -1,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// One share of an open position, tagged with the price it was opened at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Lot {
    pub direction: Direction,
    pub entry_price: Price,
}

impl Lot {
    pub fn long(entry_price: Price) -> Self {
        Self {
            direction: Direction::Long,
            entry_price,
        }
    }

    pub fn short(entry_price: Price) -> Self {
        Self {
            direction: Direction::Short,
            entry_price,
        }
    }

    /// Mark-to-market gain of this lot at `price`.
    pub fn unrealized(&self, price: Price) -> Reward {
        Reward(self.direction.sign() * (price.0 - self.entry_price.0))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn price_clamps_into_bounds() {
        assert_eq!(Price(100).clamp_to(Price(30), Price(70)), Price(70));
        assert_eq!(Price(10).clamp_to(Price(30), Price(70)), Price(30));
        assert_eq!(Price(45).clamp_to(Price(30), Price(70)), Price(45));
    }

    #[test]
    fn transaction_classification() {
        assert!(Transaction(2).is_long());
        assert!(Transaction(-2).is_short());
        assert!(Transaction::HOLD.is_hold());
        assert_eq!(Transaction(-3).quantity(), 3);
        assert_eq!(Position(-2).after(Transaction(5)), Position(3));
    }

    #[test]
    fn direction_parses_lowercase() {
        assert_eq!(Direction::from_str("short").unwrap(), Direction::Short);
        assert_eq!(Direction::Long.to_string(), "long");
        assert_eq!(Direction::Short.opposite(), Direction::Long);
    }

    #[test]
    fn lot_unrealized_is_signed_by_direction() {
        assert_eq!(Lot::long(Price(40)).unrealized(Price(45)), Reward(5));
        assert_eq!(Lot::short(Price(40)).unrealized(Price(45)), Reward(-5));
    }
}
