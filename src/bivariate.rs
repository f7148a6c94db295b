// Histogram bivariate distributions: a primary grid with one secondary
// univariate distribution per grid point. There is no interpolation between
// neighbouring grid points.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{PhaseSpaceError, Result};
use crate::random::RandomSource;
use crate::univariate::UnivariateDistribution;

/// Whether every secondary distribution supports CDF evaluation and
/// bin-indexed sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tabularity {
    Fully,
    Partially,
}

/// A secondary sample together with the bins that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinIndexedSample {
    pub value: f64,
    pub primary_bin_index: usize,
    pub secondary_bin_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistogramBivariateData {
    primary_grid: Vec<f64>,
    secondary_distributions: Vec<Arc<UnivariateDistribution>>,
    tabularity: Tabularity,
    extend_beyond_primary_limits: bool,
}

/// P(secondary | primary) with histogram semantics on the primary axis.
///
/// A grid of `N` points carries `N` secondary distributions. The distribution
/// at index `k < N - 1` covers `[g_k, g_{k+1})`, except that the last bin also
/// owns the upper grid point. The distribution at index `N - 1` is only used
/// for primary values above the grid when the grid is extended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "HistogramBivariateData", into = "HistogramBivariateData")]
pub struct HistogramBivariateDistribution {
    primary_grid: Vec<f64>,
    secondary_distributions: Vec<Arc<UnivariateDistribution>>,
    tabularity: Tabularity,
    extend_beyond_primary_limits: bool,
}

// Restored distributions go through the same checks as new ones
impl TryFrom<HistogramBivariateData> for HistogramBivariateDistribution {
    type Error = PhaseSpaceError;

    fn try_from(data: HistogramBivariateData) -> Result<Self> {
        let mut distribution = match data.tabularity {
            Tabularity::Fully => {
                Self::fully_tabular(data.primary_grid, data.secondary_distributions)?
            }
            Tabularity::Partially => {
                Self::partially_tabular(data.primary_grid, data.secondary_distributions)?
            }
        };
        distribution.extend_beyond_primary_limits = data.extend_beyond_primary_limits;
        Ok(distribution)
    }
}

impl From<HistogramBivariateDistribution> for HistogramBivariateData {
    fn from(dist: HistogramBivariateDistribution) -> Self {
        Self {
            primary_grid: dist.primary_grid,
            secondary_distributions: dist.secondary_distributions,
            tabularity: dist.tabularity,
            extend_beyond_primary_limits: dist.extend_beyond_primary_limits,
        }
    }
}

impl HistogramBivariateDistribution {
    /// Every secondary distribution must be tabular.
    pub fn fully_tabular(
        primary_grid: Vec<f64>,
        secondary_distributions: Vec<Arc<UnivariateDistribution>>,
    ) -> Result<Self> {
        if let Some(dist) = secondary_distributions.iter().find(|d| !d.is_tabular()) {
            return Err(PhaseSpaceError::InvalidDistribution(format!(
                "a fully tabular bivariate distribution cannot hold a {}",
                dist.type_name()
            )));
        }
        Self::build(primary_grid, secondary_distributions, Tabularity::Fully)
    }

    pub fn partially_tabular(
        primary_grid: Vec<f64>,
        secondary_distributions: Vec<Arc<UnivariateDistribution>>,
    ) -> Result<Self> {
        Self::build(primary_grid, secondary_distributions, Tabularity::Partially)
    }

    fn build(
        primary_grid: Vec<f64>,
        mut secondary_distributions: Vec<Arc<UnivariateDistribution>>,
        tabularity: Tabularity,
    ) -> Result<Self> {
        let n = primary_grid.len();
        if n < 2 {
            return Err(PhaseSpaceError::InvalidDistribution(
                "the primary grid needs at least two points".to_string(),
            ));
        }
        if primary_grid.iter().any(|g| !g.is_finite()) {
            return Err(PhaseSpaceError::InvalidDistribution(
                "the primary grid must be finite".to_string(),
            ));
        }
        if primary_grid.windows(2).any(|w| w[0] > w[1]) {
            return Err(PhaseSpaceError::InvalidDistribution(
                "the primary grid must be sorted".to_string(),
            ));
        }
        if primary_grid[0] == primary_grid[n - 1] {
            return Err(PhaseSpaceError::InvalidDistribution(
                "the primary grid must span a non-empty range".to_string(),
            ));
        }

        // One distribution per bin is accepted; the last bin's distribution
        // then also serves primary values beyond the upper limit.
        if secondary_distributions.len() == n - 1 {
            let last = Arc::clone(&secondary_distributions[n - 2]);
            secondary_distributions.push(last);
        }
        if secondary_distributions.len() != n {
            return Err(PhaseSpaceError::InvalidDistribution(format!(
                "{} secondary distributions were given for a primary grid of {} points",
                secondary_distributions.len(),
                n
            )));
        }

        Ok(Self {
            primary_grid,
            secondary_distributions,
            tabularity,
            extend_beyond_primary_limits: Config::global().extend_beyond_primary_limits,
        })
    }

    pub fn primary_grid(&self) -> &[f64] {
        &self.primary_grid
    }

    pub fn secondary_distributions(&self) -> &[Arc<UnivariateDistribution>] {
        &self.secondary_distributions
    }

    pub fn tabularity(&self) -> Tabularity {
        self.tabularity
    }

    pub fn lower_bound_of_primary_indep_var(&self) -> f64 {
        self.primary_grid[0]
    }

    pub fn upper_bound_of_primary_indep_var(&self) -> f64 {
        self.primary_grid[self.primary_grid.len() - 1]
    }

    /// Primary values outside of the grid use the nearest edge distribution.
    pub fn extend_beyond_primary_indep_limits(&mut self) {
        self.extend_beyond_primary_limits = true;
    }

    /// Primary values outside of the grid evaluate to zero and cannot be sampled.
    pub fn limit_to_primary_indep_limits(&mut self) {
        self.extend_beyond_primary_limits = false;
    }

    pub fn is_primary_range_extended(&self) -> bool {
        self.extend_beyond_primary_limits
    }

    pub fn is_primary_dimension_tabular(&self) -> bool {
        true
    }

    pub fn is_primary_dimension_continuous(&self) -> bool {
        true
    }

    pub fn type_name(&self) -> &'static str {
        "BasicBivariateDistribution"
    }

    pub fn has_same_primary_bounds(&self, other: &HistogramBivariateDistribution) -> bool {
        self.lower_bound_of_primary_indep_var() == other.lower_bound_of_primary_indep_var()
            && self.upper_bound_of_primary_indep_var() == other.upper_bound_of_primary_indep_var()
    }

    /// Index of the secondary distribution that governs `primary`, if any.
    /// NaN is never in bounds.
    pub fn primary_bin_index(&self, primary: f64) -> Option<usize> {
        let n = self.primary_grid.len();
        let lower = self.primary_grid[0];
        let upper = self.primary_grid[n - 1];

        if primary.is_nan() {
            None
        } else if primary < lower {
            self.extend_beyond_primary_limits.then_some(0)
        } else if primary > upper {
            self.extend_beyond_primary_limits.then_some(n - 1)
        } else if primary == upper {
            Some(self.primary_grid.partition_point(|&g| g < primary) - 1)
        } else {
            // Largest k with g_k <= primary: a boundary belongs to the following bin
            Some(self.primary_grid.partition_point(|&g| g <= primary) - 1)
        }
    }

    fn bin_distribution(&self, primary: f64) -> Option<&UnivariateDistribution> {
        self.primary_bin_index(primary)
            .map(|index| self.secondary_distributions[index].as_ref())
    }

    fn sampling_distribution(&self, primary: f64) -> Result<(usize, &UnivariateDistribution)> {
        match self.primary_bin_index(primary) {
            Some(index) => Ok((index, self.secondary_distributions[index].as_ref())),
            None => Err(PhaseSpaceError::PrimaryOutOfBounds {
                primary,
                lower: self.lower_bound_of_primary_indep_var(),
                upper: self.upper_bound_of_primary_indep_var(),
            }),
        }
    }

    fn require_fully_tabular(&self, operation: &'static str) -> Result<()> {
        match self.tabularity {
            Tabularity::Fully => Ok(()),
            Tabularity::Partially => Err(PhaseSpaceError::UnsupportedOperation {
                operation,
                distribution: "a partially tabular bivariate distribution".to_string(),
            }),
        }
    }

    pub fn evaluate(&self, primary: f64, secondary: f64) -> f64 {
        self.bin_distribution(primary)
            .map_or(0.0, |dist| dist.evaluate(secondary))
    }

    pub fn evaluate_secondary_conditional_pdf(&self, primary: f64, secondary: f64) -> f64 {
        self.bin_distribution(primary)
            .map_or(0.0, |dist| dist.evaluate_pdf(secondary))
    }

    pub fn evaluate_secondary_conditional_cdf(&self, primary: f64, secondary: f64) -> Result<f64> {
        self.require_fully_tabular("CDF evaluation")?;
        match self.bin_distribution(primary) {
            Some(dist) => dist.evaluate_cdf(secondary),
            None => Ok(0.0),
        }
    }

    pub fn sample_secondary_conditional<R: RandomSource + ?Sized>(
        &self,
        primary: f64,
        rng: &mut R,
    ) -> Result<f64> {
        let (_, dist) = self.sampling_distribution(primary)?;
        dist.sample(rng)
    }

    /// Counts one trial per call, whatever the outcome.
    pub fn sample_secondary_conditional_and_record_trials<R: RandomSource + ?Sized>(
        &self,
        primary: f64,
        rng: &mut R,
        trials: &mut u64,
    ) -> Result<f64> {
        *trials += 1;
        self.sample_secondary_conditional(primary, rng)
    }

    pub fn sample_secondary_conditional_and_record_bin_indices<R: RandomSource + ?Sized>(
        &self,
        primary: f64,
        rng: &mut R,
    ) -> Result<BinIndexedSample> {
        self.require_fully_tabular("bin-indexed sampling")?;
        let (primary_bin_index, dist) = self.sampling_distribution(primary)?;
        let (value, secondary_bin_index) = dist.sample_and_record_bin_index(rng)?;
        Ok(BinIndexedSample {
            value,
            primary_bin_index,
            secondary_bin_index,
        })
    }

    pub fn sample_secondary_conditional_with_random_number(
        &self,
        primary: f64,
        random_number: f64,
    ) -> Result<f64> {
        let (_, dist) = self.sampling_distribution(primary)?;
        dist.sample_with_random_number(random_number)
    }

    pub fn sample_secondary_conditional_in_subrange<R: RandomSource + ?Sized>(
        &self,
        primary: f64,
        rng: &mut R,
        max_secondary: f64,
    ) -> Result<f64> {
        let (_, dist) = self.sampling_distribution(primary)?;
        dist.sample_in_subrange(rng, max_secondary)
    }

    pub fn sample_secondary_conditional_with_random_number_in_subrange(
        &self,
        primary: f64,
        random_number: f64,
        max_secondary: f64,
    ) -> Result<f64> {
        let (_, dist) = self.sampling_distribution(primary)?;
        dist.sample_with_random_number_in_subrange(random_number, max_secondary)
    }

    /// Returns 0 for primary values that are out of bounds.
    pub fn upper_bound_of_secondary_conditional_indep_var(&self, primary: f64) -> f64 {
        self.bin_distribution(primary)
            .map_or(0.0, |dist| dist.upper_bound())
    }

    /// Returns 0 for primary values that are out of bounds.
    pub fn lower_bound_of_secondary_conditional_indep_var(&self, primary: f64) -> f64 {
        self.bin_distribution(primary)
            .map_or(0.0, |dist| dist.lower_bound())
    }
}
