// Phase-space sampling core of a Monte Carlo particle source.
//
// Source particles are described by nine phase-space dimensions (three
// spatial, three directional, energy, time and weight). Each dimension has a
// distribution that is either independent or conditioned on one parent
// dimension through a histogram bivariate distribution, and a
// ParticleDistribution samples them in dependency order.

pub mod archive;
pub mod bivariate;
pub mod config;
pub mod coordinates;
pub mod dimension;
pub mod dimension_distribution;
pub mod error;
pub mod particle;
pub mod particle_distribution;
pub mod phase_space_point;
pub mod random;
pub mod univariate;

pub use archive::Archive;
pub use bivariate::{BinIndexedSample, HistogramBivariateDistribution, Tabularity};
pub use config::Config;
pub use coordinates::{
    DirectionalCoordinateConversionPolicy, DirectionalCoordinateSystem,
    SpatialCoordinateConversionPolicy, SpatialCoordinateSystem,
};
pub use dimension::{DimensionCounterMap, PhaseSpaceDimension, PhaseSpaceDimensionClass};
pub use dimension_distribution::PhaseSpaceDimensionDistribution;
pub use error::{PhaseSpaceError, Result};
pub use particle::ParticleState;
pub use particle_distribution::ParticleDistribution;
pub use phase_space_point::PhaseSpacePoint;
pub use random::{FakeStream, RandomSource};
pub use univariate::{UnivariateDistribution, UnivariateDistributionForm};
