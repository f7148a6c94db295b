// Per-dimension distributions of a particle source.
//
// Each variant reads and writes exactly one dimension of a PhaseSpacePoint.
// Dependent variants also read the current value of their parent dimension,
// which must already have been set by the caller.

use std::sync::Arc;

use log::{trace, warn};
use serde::{Deserialize, Serialize};

use crate::bivariate::HistogramBivariateDistribution;
use crate::dimension::{PhaseSpaceDimension, PhaseSpaceDimensionClass};
use crate::error::{PhaseSpaceError, Result};
use crate::phase_space_point::PhaseSpacePoint;
use crate::random::RandomSource;
use crate::univariate::{UnivariateDistribution, UnivariateDistributionForm};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndependentDimensionDistribution {
    pub dimension: PhaseSpaceDimension,
    pub distribution: Arc<UnivariateDistribution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependentDimensionDistribution {
    pub dimension: PhaseSpaceDimension,
    pub parent_dimension: PhaseSpaceDimension,
    pub distribution: Arc<HistogramBivariateDistribution>,
}

/// Samples from `importance_distribution` and weights each sample by the
/// ratio of the true density to the importance density.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportanceSampledIndependentDimensionDistribution {
    pub dimension: PhaseSpaceDimension,
    pub distribution: Arc<UnivariateDistribution>,
    pub importance_distribution: Arc<UnivariateDistribution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportanceSampledDependentDimensionDistribution {
    pub dimension: PhaseSpaceDimension,
    pub parent_dimension: PhaseSpaceDimension,
    pub distribution: Arc<HistogramBivariateDistribution>,
    pub importance_distribution: Arc<HistogramBivariateDistribution>,
}

/// The distribution of a single phase-space dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PhaseSpaceDimensionDistribution {
    Independent(IndependentDimensionDistribution),
    Dependent(DependentDimensionDistribution),
    ImportanceSampledIndependent(ImportanceSampledIndependentDimensionDistribution),
    ImportanceSampledDependent(ImportanceSampledDependentDimensionDistribution),
}

fn check_parent(parent: PhaseSpaceDimension, dimension: PhaseSpaceDimension) -> Result<()> {
    if parent == dimension {
        return Err(PhaseSpaceError::InvalidDistribution(format!(
            "the {} dimension cannot depend on itself",
            dimension
        )));
    }
    Ok(())
}

// Weight of a sample drawn from an importance distribution
fn importance_weight(
    dimension: PhaseSpaceDimension,
    sample: f64,
    true_pdf: f64,
    importance_pdf: f64,
) -> Result<f64> {
    if importance_pdf > 0.0 {
        let weight = true_pdf / importance_pdf;
        if weight == 0.0 {
            warn!(
                "distribution evaluated to 0.0 for {} sample {}, resulting in a 0.0 sample weight",
                dimension, sample
            );
        }
        Ok(weight)
    } else if true_pdf > 0.0 {
        Err(PhaseSpaceError::ZeroImportanceDensity {
            dimension,
            value: sample,
        })
    } else {
        warn!(
            "both the distribution and the importance distribution evaluated to 0.0 for {} sample {}; using a weight of 1.0",
            dimension, sample
        );
        Ok(1.0)
    }
}

// Weight of a value forced onto a dimension
fn forced_value_weight(dimension: PhaseSpaceDimension, value: f64, pdf: f64) -> Result<f64> {
    if pdf > 0.0 {
        Ok(pdf)
    } else {
        Err(PhaseSpaceError::NonPositiveWeight {
            dimension,
            value,
            weight: pdf,
        })
    }
}

fn check_parent_in_bounds(
    distribution: &HistogramBivariateDistribution,
    parent_value: f64,
) -> Result<()> {
    match distribution.primary_bin_index(parent_value) {
        Some(_) => Ok(()),
        None => Err(PhaseSpaceError::PrimaryOutOfBounds {
            primary: parent_value,
            lower: distribution.lower_bound_of_primary_indep_var(),
            upper: distribution.upper_bound_of_primary_indep_var(),
        }),
    }
}

impl PhaseSpaceDimensionDistribution {
    pub fn independent(
        dimension: PhaseSpaceDimension,
        distribution: Arc<UnivariateDistribution>,
    ) -> Self {
        PhaseSpaceDimensionDistribution::Independent(IndependentDimensionDistribution {
            dimension,
            distribution,
        })
    }

    pub fn dependent(
        parent_dimension: PhaseSpaceDimension,
        dimension: PhaseSpaceDimension,
        distribution: Arc<HistogramBivariateDistribution>,
    ) -> Result<Self> {
        check_parent(parent_dimension, dimension)?;
        Ok(PhaseSpaceDimensionDistribution::Dependent(
            DependentDimensionDistribution {
                dimension,
                parent_dimension,
                distribution,
            },
        ))
    }

    pub fn importance_sampled_independent(
        dimension: PhaseSpaceDimension,
        distribution: Arc<UnivariateDistribution>,
        importance_distribution: Arc<UnivariateDistribution>,
    ) -> Self {
        PhaseSpaceDimensionDistribution::ImportanceSampledIndependent(
            ImportanceSampledIndependentDimensionDistribution {
                dimension,
                distribution,
                importance_distribution,
            },
        )
    }

    /// The importance distribution must cover the same primary range as the
    /// true distribution.
    pub fn importance_sampled_dependent(
        parent_dimension: PhaseSpaceDimension,
        dimension: PhaseSpaceDimension,
        distribution: Arc<HistogramBivariateDistribution>,
        importance_distribution: Arc<HistogramBivariateDistribution>,
    ) -> Result<Self> {
        check_parent(parent_dimension, dimension)?;
        if !importance_distribution.has_same_primary_bounds(&distribution) {
            return Err(PhaseSpaceError::MismatchedPrimaryBounds);
        }
        Ok(PhaseSpaceDimensionDistribution::ImportanceSampledDependent(
            ImportanceSampledDependentDimensionDistribution {
                dimension,
                parent_dimension,
                distribution,
                importance_distribution,
            },
        ))
    }

    pub fn dimension(&self) -> PhaseSpaceDimension {
        match self {
            PhaseSpaceDimensionDistribution::Independent(d) => d.dimension,
            PhaseSpaceDimensionDistribution::Dependent(d) => d.dimension,
            PhaseSpaceDimensionDistribution::ImportanceSampledIndependent(d) => d.dimension,
            PhaseSpaceDimensionDistribution::ImportanceSampledDependent(d) => d.dimension,
        }
    }

    pub fn dimension_class(&self) -> PhaseSpaceDimensionClass {
        self.dimension().class()
    }

    /// `None` for independent distributions.
    pub fn parent_dimension(&self) -> Option<PhaseSpaceDimension> {
        match self {
            PhaseSpaceDimensionDistribution::Dependent(d) => Some(d.parent_dimension),
            PhaseSpaceDimensionDistribution::ImportanceSampledDependent(d) => {
                Some(d.parent_dimension)
            }
            _ => None,
        }
    }

    pub fn parent_dimension_class(&self) -> Option<PhaseSpaceDimensionClass> {
        self.parent_dimension().map(|d| d.class())
    }

    pub fn is_independent(&self) -> bool {
        self.parent_dimension().is_none()
    }

    pub fn is_dependent_on_dimension(&self, dimension: PhaseSpaceDimension) -> bool {
        self.parent_dimension() == Some(dimension)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PhaseSpaceDimensionDistribution::Independent(d) => d.distribution.type_name(),
            PhaseSpaceDimensionDistribution::ImportanceSampledIndependent(d) => {
                d.distribution.type_name()
            }
            PhaseSpaceDimensionDistribution::Dependent(d) => d.distribution.type_name(),
            PhaseSpaceDimensionDistribution::ImportanceSampledDependent(d) => {
                d.distribution.type_name()
            }
        }
    }

    pub fn is_continuous(&self) -> bool {
        match self {
            PhaseSpaceDimensionDistribution::Independent(d) => d.distribution.is_continuous(),
            PhaseSpaceDimensionDistribution::ImportanceSampledIndependent(d) => {
                d.distribution.is_continuous()
            }
            PhaseSpaceDimensionDistribution::Dependent(d) => {
                d.distribution.is_primary_dimension_continuous()
            }
            PhaseSpaceDimensionDistribution::ImportanceSampledDependent(d) => {
                d.distribution.is_primary_dimension_continuous()
            }
        }
    }

    pub fn is_tabular(&self) -> bool {
        match self {
            PhaseSpaceDimensionDistribution::Independent(d) => d.distribution.is_tabular(),
            PhaseSpaceDimensionDistribution::ImportanceSampledIndependent(d) => {
                d.distribution.is_tabular()
            }
            PhaseSpaceDimensionDistribution::Dependent(d) => {
                d.distribution.is_primary_dimension_tabular()
            }
            PhaseSpaceDimensionDistribution::ImportanceSampledDependent(d) => {
                d.distribution.is_primary_dimension_tabular()
            }
        }
    }

    /// Always false for dependent distributions, whatever their bins hold.
    pub fn is_uniform(&self) -> bool {
        match self {
            PhaseSpaceDimensionDistribution::Independent(d) => d.distribution.is_uniform(),
            PhaseSpaceDimensionDistribution::ImportanceSampledIndependent(d) => {
                d.distribution.is_uniform()
            }
            _ => false,
        }
    }

    /// Always false for dependent distributions, whatever their bins hold.
    pub fn has_form(&self, form: UnivariateDistributionForm) -> bool {
        match self {
            PhaseSpaceDimensionDistribution::Independent(d) => d.distribution.has_form(form),
            PhaseSpaceDimensionDistribution::ImportanceSampledIndependent(d) => {
                d.distribution.has_form(form)
            }
            _ => false,
        }
    }

    /// Density of the current coordinate, using whatever parent value the
    /// point already holds.
    pub fn evaluate_without_cascade(&self, point: &PhaseSpacePoint) -> f64 {
        let value = point.coordinate(self.dimension());
        match self {
            PhaseSpaceDimensionDistribution::Independent(d) => d.distribution.evaluate(value),
            PhaseSpaceDimensionDistribution::ImportanceSampledIndependent(d) => {
                d.distribution.evaluate(value)
            }
            PhaseSpaceDimensionDistribution::Dependent(d) => d
                .distribution
                .evaluate(point.coordinate(d.parent_dimension), value),
            PhaseSpaceDimensionDistribution::ImportanceSampledDependent(d) => d
                .distribution
                .evaluate(point.coordinate(d.parent_dimension), value),
        }
    }

    /// Sample this dimension's coordinate and set its coordinate weight.
    pub fn sample_without_cascade<R: RandomSource + ?Sized>(
        &self,
        point: &mut PhaseSpacePoint,
        rng: &mut R,
    ) -> Result<()> {
        self.sample_into(point, rng, None)
    }

    /// As [`Self::sample_without_cascade`], adding the trials used to `trials`.
    pub fn sample_and_record_trials_without_cascade<R: RandomSource + ?Sized>(
        &self,
        point: &mut PhaseSpacePoint,
        rng: &mut R,
        trials: &mut u64,
    ) -> Result<()> {
        self.sample_into(point, rng, Some(trials))
    }

    fn sample_into<R: RandomSource + ?Sized>(
        &self,
        point: &mut PhaseSpacePoint,
        rng: &mut R,
        trials: Option<&mut u64>,
    ) -> Result<()> {
        let (sample, weight) = match self {
            PhaseSpaceDimensionDistribution::Independent(d) => {
                let sample = match trials {
                    Some(trials) => d.distribution.sample_and_record_trials(rng, trials)?,
                    None => d.distribution.sample(rng)?,
                };
                (sample, 1.0)
            }
            PhaseSpaceDimensionDistribution::Dependent(d) => {
                let parent_value = point.coordinate(d.parent_dimension);
                let sample = match trials {
                    Some(trials) => d
                        .distribution
                        .sample_secondary_conditional_and_record_trials(parent_value, rng, trials)?,
                    None => d
                        .distribution
                        .sample_secondary_conditional(parent_value, rng)?,
                };
                (sample, 1.0)
            }
            PhaseSpaceDimensionDistribution::ImportanceSampledIndependent(d) => {
                let sample = match trials {
                    Some(trials) => d
                        .importance_distribution
                        .sample_and_record_trials(rng, trials)?,
                    None => d.importance_distribution.sample(rng)?,
                };
                let weight = importance_weight(
                    d.dimension,
                    sample,
                    d.distribution.evaluate_pdf(sample),
                    d.importance_distribution.evaluate_pdf(sample),
                )?;
                (sample, weight)
            }
            PhaseSpaceDimensionDistribution::ImportanceSampledDependent(d) => {
                let parent_value = point.coordinate(d.parent_dimension);
                let sample = match trials {
                    Some(trials) => d
                        .importance_distribution
                        .sample_secondary_conditional_and_record_trials(parent_value, rng, trials)?,
                    None => d
                        .importance_distribution
                        .sample_secondary_conditional(parent_value, rng)?,
                };
                let weight = importance_weight(
                    d.dimension,
                    sample,
                    d.distribution
                        .evaluate_secondary_conditional_pdf(parent_value, sample),
                    d.importance_distribution
                        .evaluate_secondary_conditional_pdf(parent_value, sample),
                )?;
                (sample, weight)
            }
        };

        let dimension = self.dimension();
        trace!("sampled {} = {} (weight {})", dimension, sample, weight);
        point.set_coordinate(dimension, sample);
        point.set_coordinate_weight(dimension, weight);
        Ok(())
    }

    /// Force this dimension's coordinate to `value` and set its coordinate
    /// weight to the density of the true distribution at that value.
    pub fn set_dimension_value_and_apply_weight(
        &self,
        point: &mut PhaseSpacePoint,
        value: f64,
    ) -> Result<()> {
        let dimension = self.dimension();
        let pdf = match self {
            PhaseSpaceDimensionDistribution::Independent(d) => d.distribution.evaluate_pdf(value),
            PhaseSpaceDimensionDistribution::ImportanceSampledIndependent(d) => {
                d.distribution.evaluate_pdf(value)
            }
            PhaseSpaceDimensionDistribution::Dependent(d) => {
                let parent_value = point.coordinate(d.parent_dimension);
                check_parent_in_bounds(&d.distribution, parent_value)?;
                d.distribution
                    .evaluate_secondary_conditional_pdf(parent_value, value)
            }
            PhaseSpaceDimensionDistribution::ImportanceSampledDependent(d) => {
                let parent_value = point.coordinate(d.parent_dimension);
                check_parent_in_bounds(&d.distribution, parent_value)?;
                d.distribution
                    .evaluate_secondary_conditional_pdf(parent_value, value)
            }
        };
        let weight = forced_value_weight(dimension, value, pdf)?;

        point.set_coordinate(dimension, value);
        point.set_coordinate_weight(dimension, weight);
        Ok(())
    }
}
