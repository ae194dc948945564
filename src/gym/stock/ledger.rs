use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::gym::{
    Reward,
    stock::domain::{Cashflow, Direction, Lot, Position, Price},
};

/// The trader's open lots.
///
/// Lots are an ordered multiset: one entry per open share, kept in the order
/// they were opened. The net position is cached and recomputed after every
/// mutation, so `net_position()` always equals the signed count of lots.
///
/// # Closing Rule
///
/// A transaction that opposes the open side closes existing lots before it
/// opens new ones:
/// - buying closes shorts, **cheapest entry first**,
///   realizing `current_price - entry_price` per lot;
/// - selling closes longs, **most expensive entry first**,
///   realizing `entry_price - current_price` per lot.
///
/// Once the opposite side is exhausted, the remaining quantity opens new lots
/// at the current price. Opening a lot realizes nothing. Lots with equal entry
/// prices close in the order they were opened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    lots: Vec<Lot>,
    net_position: Position,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a portfolio from existing lots, e.g. to set up a scenario.
    pub fn from_lots(lots: impl IntoIterator<Item = Lot>) -> Self {
        let mut portfolio = Self {
            lots: lots.into_iter().collect(),
            net_position: Position(0),
        };
        portfolio.compute_net_position();
        portfolio
    }

    pub fn lots(&self) -> &[Lot] {
        &self.lots
    }

    pub fn longs(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter().filter(|l| l.direction == Direction::Long)
    }

    pub fn shorts(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter().filter(|l| l.direction == Direction::Short)
    }

    pub fn net_position(&self) -> Position {
        self.net_position
    }

    pub fn is_flat(&self) -> bool {
        self.net_position.is_flat()
    }

    pub fn push(&mut self, lot: Lot) {
        self.lots.push(lot);
        self.compute_net_position();
    }

    pub fn clear(&mut self) {
        self.lots.clear();
        self.compute_net_position();
    }

    /// Recomputes the cached net position as the sum of lot directions.
    pub fn compute_net_position(&mut self) -> Position {
        self.net_position = Position(self.lots.iter().map(|l| l.direction.sign()).sum());
        self.net_position
    }

    /// Buys `quantity` shares at `price`.
    ///
    /// Returns the realized reward from closed shorts and the cashflow
    /// (`-price` per share bought).
    pub fn transact_long(&mut self, quantity: u64, price: Price) -> (Reward, Cashflow) {
        let mut reward = Reward(0);
        let mut cashflow = Cashflow(0);

        for _ in 0..quantity {
            match self.cheapest_short() {
                Some(idx) => {
                    let lot = self.lots.remove(idx);
                    reward += price.0 - lot.entry_price.0;
                    trace!(entry = %lot.entry_price, exit = %price, "Closed short lot");
                }
                None => self.lots.push(Lot::long(price)),
            }
            cashflow -= price.0;
        }

        self.compute_net_position();
        (reward, cashflow)
    }

    /// Sells `quantity` shares at `price`.
    ///
    /// Returns the realized reward from closed longs and the cashflow
    /// (`+price` per share sold).
    pub fn transact_short(&mut self, quantity: u64, price: Price) -> (Reward, Cashflow) {
        let mut reward = Reward(0);
        let mut cashflow = Cashflow(0);

        for _ in 0..quantity {
            match self.most_expensive_long() {
                Some(idx) => {
                    let lot = self.lots.remove(idx);
                    reward += lot.entry_price.0 - price.0;
                    trace!(entry = %lot.entry_price, exit = %price, "Closed long lot");
                }
                None => self.lots.push(Lot::short(price)),
            }
            cashflow += price.0;
        }

        self.compute_net_position();
        (reward, cashflow)
    }

    /// Holds the current position through the price move `previous_price -> price`.
    ///
    /// A non-flat position earns `position * (price - previous_price)`; a flat
    /// one earns nothing. Holding never moves cash.
    pub fn transact_hold(&self, price: Price, previous_price: Price) -> (Reward, Cashflow) {
        let reward = if self.is_flat() {
            Reward(0)
        } else {
            Reward(self.net_position.0 * (price.0 - previous_price.0))
        };
        (reward, Cashflow(0))
    }

    /// Mark-to-market value of all open lots at `price`.
    pub fn unrealized(&self, price: Price) -> Reward {
        self.lots.iter().map(|l| l.unrealized(price)).sum()
    }

    /// Index of the open short with the lowest entry price (first opened on ties).
    fn cheapest_short(&self) -> Option<usize> {
        self.lots
            .iter()
            .enumerate()
            .filter(|(_, l)| l.direction == Direction::Short)
            .min_by_key(|(_, l)| l.entry_price)
            .map(|(i, _)| i)
    }

    /// Index of the open long with the highest entry price (first opened on ties).
    fn most_expensive_long(&self) -> Option<usize> {
        self.lots
            .iter()
            .enumerate()
            .filter(|(_, l)| l.direction == Direction::Long)
            .min_by_key(|(_, l)| Reverse(l.entry_price))
            .map(|(i, _)| i)
    }
}
