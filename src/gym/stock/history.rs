use serde::{Deserialize, Serialize};

use crate::gym::{
    Reward,
    stock::domain::{Cashflow, Growth, Indicator, Position, Price, Transaction},
};

/// Append-only record of a simulation, one entry per period.
///
/// `price` and `indicator` start with the initial market state, so after `n`
/// periods they hold `n + 1` entries while the other sequences hold `n`.
/// Only used for reporting; no decision logic reads it back except the hold
/// reward, which needs the previous period's price.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryLog {
    price: Vec<Price>,
    indicator: Vec<Indicator>,
    growth: Vec<Growth>,
    transaction: Vec<Transaction>,
    /// Net position right after each transaction.
    position: Vec<Position>,
    reward: Vec<Reward>,
    cashflow: Vec<Cashflow>,
}

impl HistoryLog {
    pub fn new(initial_price: Price, initial_indicator: Indicator) -> Self {
        Self {
            price: vec![initial_price],
            indicator: vec![initial_indicator],
            ..Self::default()
        }
    }

    /// Forgets everything and starts over from the given market state.
    pub fn clear_to(&mut self, initial_price: Price, initial_indicator: Indicator) {
        *self = Self::new(initial_price, initial_indicator);
    }

    pub(crate) fn record_transaction(
        &mut self,
        transaction: Transaction,
        position: Position,
        reward: Reward,
        cashflow: Cashflow,
    ) {
        self.transaction.push(transaction);
        self.position.push(position);
        self.reward.push(reward);
        self.cashflow.push(cashflow);
    }

    pub(crate) fn record_transition(&mut self, growth: Growth, price: Price, indicator: Indicator) {
        self.growth.push(growth);
        self.price.push(price);
        self.indicator.push(indicator);
    }

    /// Price one transition before the current one.
    ///
    /// Before the first transition this is the initial price itself.
    pub fn previous_price(&self) -> Option<Price> {
        match self.price.len() {
            0 => None,
            1 => self.price.first().copied(),
            n => self.price.get(n - 2).copied(),
        }
    }

    pub fn price_history(&self) -> &[Price] {
        &self.price
    }

    pub fn indicator_history(&self) -> &[Indicator] {
        &self.indicator
    }

    pub fn growth_history(&self) -> &[Growth] {
        &self.growth
    }

    pub fn transaction_history(&self) -> &[Transaction] {
        &self.transaction
    }

    pub fn position_history(&self) -> &[Position] {
        &self.position
    }

    pub fn reward_history(&self) -> &[Reward] {
        &self.reward
    }

    pub fn cashflow_history(&self) -> &[Cashflow] {
        &self.cashflow
    }

    /// Number of processed transactions.
    pub fn periods(&self) -> usize {
        self.transaction.len()
    }

    pub fn total_reward(&self) -> Reward {
        self.reward.iter().copied().sum()
    }

    pub fn total_cashflow(&self) -> Cashflow {
        self.cashflow.iter().copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_initial_market_state() {
        let log = HistoryLog::new(Price(50), Indicator(0));
        assert_eq!(log.price_history(), &[Price(50)]);
        assert_eq!(log.indicator_history(), &[Indicator(0)]);
        assert_eq!(log.periods(), 0);
        assert_eq!(log.previous_price(), Some(Price(50)));
    }

    #[test]
    fn previous_price_lags_one_transition() {
        let mut log = HistoryLog::new(Price(50), Indicator(0));
        log.record_transition(Growth(1), Price(51), Indicator(1));
        assert_eq!(log.previous_price(), Some(Price(50)));
        log.record_transition(Growth(2), Price(53), Indicator(2));
        assert_eq!(log.previous_price(), Some(Price(51)));
    }

    #[test]
    fn totals_sum_recorded_entries() {
        let mut log = HistoryLog::new(Price(50), Indicator(0));
        log.record_transaction(Transaction(2), Position(2), Reward(0), Cashflow(-100));
        log.record_transaction(Transaction(-2), Position(0), Reward(6), Cashflow(106));
        assert_eq!(log.total_reward(), Reward(6));
        assert_eq!(log.total_cashflow(), Cashflow(6));
        assert_eq!(log.periods(), 2);
        assert_eq!(log.position_history(), &[Position(2), Position(0)]);

        log.clear_to(Price(40), Indicator(-1));
        assert_eq!(log, HistoryLog::new(Price(40), Indicator(-1)));
    }
}
