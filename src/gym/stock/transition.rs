use rand::{
    Rng,
    distr::{Distribution, weighted::WeightedIndex},
};

use crate::{
    error::{EnvError, StockGymResult, SystemError},
    gym::stock::{
        config::StockConfig,
        domain::{Growth, Indicator},
    },
};

/// Tolerance for a row of probabilities to count as summing to one.
const ROW_SUM_TOLERANCE: f64 = 1e-9;

// ================================================================================================
// Stochastic Matrix
// ================================================================================================

/// A dense row-stochastic matrix with one pre-built sampler per row.
///
/// Row `i` is the distribution over column outcomes given the `i`-th
/// conditioning value. Rows are validated once at construction, so sampling
/// never fails afterwards.
#[derive(Debug, Clone)]
pub struct StochasticMatrix {
    rows: Vec<Vec<f64>>,
    samplers: Vec<WeightedIndex<f64>>,
}

impl StochasticMatrix {
    /// Validates `rows` against the expected shape and builds the samplers.
    ///
    /// `name` is only used in error messages.
    pub fn new(
        name: &str,
        rows: &[Vec<f64>],
        expected_rows: usize,
        expected_cols: usize,
    ) -> StockGymResult<Self> {
        let invalid = |msg: String| EnvError::InvalidMatrix {
            name: name.to_string(),
            msg,
        };

        if rows.len() != expected_rows {
            return Err(invalid(format!("expected {expected_rows} rows, found {}", rows.len())).into());
        }

        let mut samplers = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.len() != expected_cols {
                return Err(invalid(format!(
                    "row {i}: expected {expected_cols} columns, found {}",
                    row.len()
                ))
                .into());
            }
            if row.iter().any(|p| !p.is_finite() || *p < 0.0) {
                return Err(invalid(format!("row {i}: probabilities must be finite and >= 0")).into());
            }
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(invalid(format!("row {i}: probabilities sum to {sum}, expected 1")).into());
            }
            let sampler =
                WeightedIndex::new(row.iter().copied()).map_err(|e| invalid(format!("row {i}: {e}")))?;
            samplers.push(sampler);
        }

        Ok(Self {
            rows: rows.to_vec(),
            samplers,
        })
    }

    pub fn row(&self, i: usize) -> Option<&[f64]> {
        self.rows.get(i).map(Vec::as_slice)
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Draws a column index from row `i`.
    pub fn sample<R: Rng + ?Sized>(&self, i: usize, rng: &mut R) -> StockGymResult<usize> {
        let sampler = self.samplers.get(i).ok_or_else(|| {
            SystemError::IndexOutOfBounds(format!(
                "row {i} requested from a matrix with {} rows",
                self.samplers.len()
            ))
        })?;
        Ok(sampler.sample(rng))
    }
}

// ================================================================================================
// Markov Model
// ================================================================================================

/// The discrete-time Markov chain driving the stock.
///
/// Both draws condition on the current indicator only:
/// - `growth_probabilities[indicator]` gives the next price increment,
/// - `indicator_transition[indicator]` gives the next indicator value.
#[derive(Debug, Clone)]
pub struct MarkovModel {
    indicators: Vec<Indicator>,
    growths: Vec<Growth>,
    indicator_transition: StochasticMatrix,
    growth_probabilities: StochasticMatrix,
}

impl MarkovModel {
    pub fn from_config(config: &StockConfig) -> StockGymResult<Self> {
        let indicators = config.indicators().to_vec();
        let growths = config.growths().to_vec();

        let indicator_transition = StochasticMatrix::new(
            "indicator_transition",
            config.indicator_transition(),
            indicators.len(),
            indicators.len(),
        )?;
        let growth_probabilities = StochasticMatrix::new(
            "growth_probabilities",
            config.growth_probabilities(),
            indicators.len(),
            growths.len(),
        )?;

        Ok(Self {
            indicators,
            growths,
            indicator_transition,
            growth_probabilities,
        })
    }

    pub fn indicators(&self) -> &[Indicator] {
        &self.indicators
    }

    pub fn growths(&self) -> &[Growth] {
        &self.growths
    }

    /// Row index of `indicator` in both matrices.
    pub fn indicator_index(&self, indicator: Indicator) -> StockGymResult<usize> {
        self.indicators
            .iter()
            .position(|i| *i == indicator)
            .ok_or_else(|| {
                SystemError::InvariantViolation(format!(
                    "indicator {indicator} is not part of the model ({:?})",
                    self.indicators
                ))
                .into()
            })
    }

    pub fn sample_growth<R: Rng + ?Sized>(
        &self,
        indicator: Indicator,
        rng: &mut R,
    ) -> StockGymResult<Growth> {
        let row = self.indicator_index(indicator)?;
        let col = self.growth_probabilities.sample(row, rng)?;
        Ok(self.growths[col])
    }

    pub fn sample_indicator<R: Rng + ?Sized>(
        &self,
        indicator: Indicator,
        rng: &mut R,
    ) -> StockGymResult<Indicator> {
        let row = self.indicator_index(indicator)?;
        let col = self.indicator_transition.sample(row, rng)?;
        Ok(self.indicators[col])
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn identity(n: usize) -> Vec<Vec<f64>> {
        (0..n)
            .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
            .collect()
    }

    #[test]
    fn rejects_rows_not_summing_to_one() {
        let rows = vec![vec![0.5, 0.4], vec![0.0, 1.0]];
        let err = StochasticMatrix::new("m", &rows, 2, 2).unwrap_err();
        assert!(err.to_string().contains("row 0"), "{err}");
    }

    #[test]
    fn rejects_wrong_shape_and_negative_entries() {
        assert!(StochasticMatrix::new("m", &identity(2), 3, 2).is_err());
        assert!(StochasticMatrix::new("m", &[vec![1.0, 0.0, 0.0]], 1, 2).is_err());
        assert!(StochasticMatrix::new("m", &[vec![1.5, -0.5]], 1, 2).is_err());
    }

    #[test]
    fn degenerate_rows_always_sample_their_support() {
        let m = StochasticMatrix::new("m", &identity(3), 3, 3).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for i in 0..3 {
            for _ in 0..50 {
                assert_eq!(m.sample(i, &mut rng).unwrap(), i);
            }
        }
        assert!(m.sample(3, &mut rng).is_err());
    }

    #[test]
    fn default_model_follows_its_matrices() {
        let model = MarkovModel::from_config(&StockConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        // Indicator -2 always yields growth -2; indicator 2 always yields +2.
        for _ in 0..100 {
            assert_eq!(model.sample_growth(Indicator(-2), &mut rng).unwrap(), Growth(-2));
            assert_eq!(model.sample_growth(Indicator(2), &mut rng).unwrap(), Growth(2));
        }

        // From indicator -2 the chain can only stay or move to -1.
        for _ in 0..100 {
            let next = model.sample_indicator(Indicator(-2), &mut rng).unwrap();
            assert!(next == Indicator(-2) || next == Indicator(-1), "{next}");
        }

        assert!(model.sample_growth(Indicator(9), &mut rng).is_err());
    }
}
