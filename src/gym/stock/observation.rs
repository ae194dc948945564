use itertools::iproduct;
use serde::{Deserialize, Serialize};

use crate::gym::stock::domain::{Indicator, Position, Price};

/// What a trader observes each period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockState {
    pub indicator: Indicator,
    pub price: Price,
    pub position: Position,
}

impl StockState {
    pub fn new(indicator: Indicator, price: Price, position: Position) -> Self {
        Self {
            indicator,
            price,
            position,
        }
    }
}

/// Every observable state: indicator x price range x position range.
///
/// Positions are stepped by the transaction increment, starting at the lower
/// bound. States are laid out row-major in that order, so the index of a state
/// is computed arithmetically instead of through a lookup map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSpace {
    indicators: Vec<Indicator>,
    price_bounds: (Price, Price),
    position_bounds: (Position, Position),
    increment: i64,
}

impl StateSpace {
    pub fn new(
        indicators: Vec<Indicator>,
        price_bounds: (Price, Price),
        position_bounds: (Position, Position),
        increment: i64,
    ) -> Self {
        Self {
            indicators,
            price_bounds,
            position_bounds,
            increment: increment.max(1),
        }
    }

    fn n_prices(&self) -> usize {
        let (min, max) = self.price_bounds;
        if max < min {
            return 0;
        }
        (max.0 - min.0 + 1) as usize
    }

    fn n_positions(&self) -> usize {
        let (min, max) = self.position_bounds;
        if max < min {
            return 0;
        }
        ((max.0 - min.0) / self.increment + 1) as usize
    }

    pub fn len(&self) -> usize {
        self.indicators.len() * self.n_prices() * self.n_positions()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dense index of `state`, or `None` if the state lies outside the space.
    pub fn index_of(&self, state: &StockState) -> Option<usize> {
        let i = self.indicators.iter().position(|x| *x == state.indicator)?;

        let (price_min, price_max) = self.price_bounds;
        if state.price < price_min || state.price > price_max {
            return None;
        }
        let p = (state.price.0 - price_min.0) as usize;

        let (pos_min, pos_max) = self.position_bounds;
        let offset = state.position.0 - pos_min.0;
        if state.position > pos_max || offset < 0 || offset % self.increment != 0 {
            return None;
        }
        let q = (offset / self.increment) as usize;

        Some((i * self.n_prices() + p) * self.n_positions() + q)
    }

    /// Inverse of [`StateSpace::index_of`].
    pub fn state_at(&self, index: usize) -> Option<StockState> {
        if index >= self.len() {
            return None;
        }
        let q = index % self.n_positions();
        let p = (index / self.n_positions()) % self.n_prices();
        let i = index / (self.n_positions() * self.n_prices());

        Some(StockState {
            indicator: self.indicators[i],
            price: Price(self.price_bounds.0.0 + p as i64),
            position: Position(self.position_bounds.0.0 + q as i64 * self.increment),
        })
    }

    /// All states in index order.
    pub fn iter(&self) -> impl Iterator<Item = StockState> + '_ {
        let (price_min, price_max) = self.price_bounds;
        let (pos_min, pos_max) = self.position_bounds;
        iproduct!(
            self.indicators.iter().copied(),
            price_min.0..=price_max.0,
            (pos_min.0..=pos_max.0).step_by(self.increment as usize)
        )
        .map(|(indicator, price, position)| {
            StockState::new(indicator, Price(price), Position(position))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> StateSpace {
        StateSpace::new(
            vec![Indicator(-1), Indicator(0), Indicator(1)],
            (Price(30), Price(34)),
            (Position(-2), Position(2)),
            1,
        )
    }

    #[test]
    fn len_matches_enumeration() {
        let space = space();
        assert_eq!(space.len(), 3 * 5 * 5);
        assert_eq!(space.iter().count(), space.len());
    }

    #[test]
    fn index_agrees_with_enumeration_order() {
        let space = space();
        for (i, state) in space.iter().enumerate() {
            assert_eq!(space.index_of(&state), Some(i), "{state:?}");
            assert_eq!(space.state_at(i), Some(state));
        }
        assert_eq!(space.state_at(space.len()), None);
    }

    #[test]
    fn out_of_space_states_have_no_index() {
        let space = space();
        let outside = [
            StockState::new(Indicator(5), Price(30), Position(0)),
            StockState::new(Indicator(0), Price(35), Position(0)),
            StockState::new(Indicator(0), Price(30), Position(-3)),
        ];
        for state in outside {
            assert_eq!(space.index_of(&state), None, "{state:?}");
        }
    }

    #[test]
    fn positions_follow_the_increment() {
        let space = StateSpace::new(
            vec![Indicator(0)],
            (Price(40), Price(41)),
            (Position(0), Position(10)),
            2,
        );
        assert_eq!(space.len(), 2 * 6);
        assert_eq!(
            space.index_of(&StockState::new(Indicator(0), Price(41), Position(4))),
            Some(6 + 2)
        );
        assert_eq!(
            space.index_of(&StockState::new(Indicator(0), Price(41), Position(3))),
            None
        );
    }
}
