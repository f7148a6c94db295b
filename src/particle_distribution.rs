// Joint phase-space distribution of source particles.
//
// A particle distribution owns one dimension distribution per phase-space
// dimension. Dependent dimension distributions form trees rooted at the
// independent ones; the trees fix the order in which dimensions are sampled so
// that a parent is always set before the dimensions that depend on it.

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::PI;
use std::sync::Arc;

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::coordinates::{
    normalize, DirectionalCoordinateConversionPolicy, DirectionalCoordinateSystem,
    SpatialCoordinateConversionPolicy, SpatialCoordinateSystem,
};
use crate::dimension::{DimensionCounterMap, PhaseSpaceDimension};
use crate::dimension_distribution::PhaseSpaceDimensionDistribution;
use crate::error::{PhaseSpaceError, Result};
use crate::particle::ParticleState;
use crate::phase_space_point::PhaseSpacePoint;
use crate::random::RandomSource;
use crate::univariate::{UniformDistribution, UnivariateDistribution, UnivariateDistributionForm};

/// A source particle distribution built from per-dimension distributions.
///
/// Every dimension starts with a default distribution (see
/// [`ParticleDistribution::reset`]), giving a point source at the origin with
/// unit energy, zero time and unit weight. Replacing or removing a dimension
/// distribution invalidates the dependency tree, which must be rebuilt with
/// [`ParticleDistribution::construct_dimension_distribution_dependency_tree`]
/// before the distribution can be sampled or evaluated again.
///
/// Once the tree is built the distribution is read-only during sampling and
/// can be shared between threads behind an `Arc`.
///
/// Archives record whether the tree was constructed rather than the sampling
/// order itself; the order is rebuilt on restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ParticleDistributionData", into = "ParticleDistributionData")]
pub struct ParticleDistribution {
    id: u32,
    name: String,
    spatial_policy: SpatialCoordinateConversionPolicy,
    directional_policy: DirectionalCoordinateConversionPolicy,
    distributions: BTreeMap<PhaseSpaceDimension, Arc<PhaseSpaceDimensionDistribution>>,
    sampling_order: Option<Vec<PhaseSpaceDimension>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ParticleDistributionData {
    id: u32,
    name: String,
    spatial_policy: SpatialCoordinateConversionPolicy,
    directional_policy: DirectionalCoordinateConversionPolicy,
    distributions: BTreeMap<PhaseSpaceDimension, Arc<PhaseSpaceDimensionDistribution>>,
    dependency_tree_constructed: bool,
}

impl TryFrom<ParticleDistributionData> for ParticleDistribution {
    type Error = PhaseSpaceError;

    fn try_from(data: ParticleDistributionData) -> Result<Self> {
        if let Some((dimension, distribution)) = data
            .distributions
            .iter()
            .find(|(dimension, distribution)| distribution.dimension() != **dimension)
        {
            return Err(PhaseSpaceError::InvalidDistribution(format!(
                "a {} distribution is registered for the {} dimension",
                distribution.dimension(),
                dimension
            )));
        }

        let mut distribution = Self {
            id: data.id,
            name: data.name,
            spatial_policy: data.spatial_policy,
            directional_policy: data.directional_policy,
            distributions: data.distributions,
            sampling_order: None,
        };
        if data.dependency_tree_constructed {
            distribution.construct_dimension_distribution_dependency_tree()?;
        }
        Ok(distribution)
    }
}

impl From<ParticleDistribution> for ParticleDistributionData {
    fn from(distribution: ParticleDistribution) -> Self {
        Self {
            id: distribution.id,
            name: distribution.name,
            spatial_policy: distribution.spatial_policy,
            directional_policy: distribution.directional_policy,
            distributions: distribution.distributions,
            dependency_tree_constructed: distribution.sampling_order.is_some(),
        }
    }
}

impl ParticleDistribution {
    /// Create a distribution using the globally configured coordinate systems.
    pub fn new(id: u32, name: &str) -> Self {
        let (spatial_system, directional_system) = {
            let config = Config::global();
            (
                config.spatial_coordinate_system,
                config.directional_coordinate_system,
            )
        };
        Self::with_policies(
            id,
            name,
            SpatialCoordinateConversionPolicy::new(spatial_system),
            DirectionalCoordinateConversionPolicy::new(directional_system),
        )
    }

    pub fn with_policies(
        id: u32,
        name: &str,
        spatial_policy: SpatialCoordinateConversionPolicy,
        directional_policy: DirectionalCoordinateConversionPolicy,
    ) -> Self {
        let mut distribution = Self {
            id,
            name: name.to_string(),
            spatial_policy,
            directional_policy,
            distributions: BTreeMap::new(),
            sampling_order: None,
        };
        distribution.reset();
        distribution
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spatial_policy(&self) -> &SpatialCoordinateConversionPolicy {
        &self.spatial_policy
    }

    pub fn directional_policy(&self) -> &DirectionalCoordinateConversionPolicy {
        &self.directional_policy
    }

    /// Restore the default distribution of every dimension and rebuild the
    /// dependency tree.
    ///
    /// Spatial dimensions default to a point at the origin, energy to 1, time
    /// to 0 and weight to 1. Directional defaults depend on the directional
    /// coordinate system: Cartesian components are each uniform on [-1, 1],
    /// while spherical coordinates give an isotropic distribution.
    pub fn reset(&mut self) {
        self.distributions.clear();
        self.sampling_order = None;

        let origin = Arc::new(UnivariateDistribution::delta(0.0));
        for dimension in PhaseSpaceDimension::SPATIAL {
            self.install(PhaseSpaceDimensionDistribution::independent(
                dimension,
                origin.clone(),
            ));
        }

        for (dimension, distribution) in PhaseSpaceDimension::DIRECTIONAL
            .into_iter()
            .zip(default_directional_distributions(self.directional_policy.system()))
        {
            self.install(PhaseSpaceDimensionDistribution::independent(
                dimension,
                Arc::new(distribution),
            ));
        }

        self.install(PhaseSpaceDimensionDistribution::independent(
            PhaseSpaceDimension::Energy,
            Arc::new(UnivariateDistribution::delta(1.0)),
        ));
        self.install(PhaseSpaceDimensionDistribution::independent(
            PhaseSpaceDimension::Time,
            Arc::new(UnivariateDistribution::delta(0.0)),
        ));
        self.install(PhaseSpaceDimensionDistribution::independent(
            PhaseSpaceDimension::Weight,
            Arc::new(UnivariateDistribution::delta(1.0)),
        ));

        // Every default is independent, so the tree is one root per dimension
        self.sampling_order = Some(PhaseSpaceDimension::ALL.to_vec());
    }

    fn install(&mut self, distribution: PhaseSpaceDimensionDistribution) {
        self.distributions
            .insert(distribution.dimension(), Arc::new(distribution));
    }

    /// Register the distribution of its dimension, replacing any previous one.
    ///
    /// The dependency tree must be constructed again afterwards. When several
    /// distributions are set, construct the tree once after setting all of them.
    pub fn set_dimension_distribution(&mut self, distribution: PhaseSpaceDimensionDistribution) {
        self.set_shared_dimension_distribution(Arc::new(distribution));
    }

    /// As [`Self::set_dimension_distribution`], for a distribution that is
    /// shared with other particle distributions.
    pub fn set_shared_dimension_distribution(
        &mut self,
        distribution: Arc<PhaseSpaceDimensionDistribution>,
    ) {
        self.distributions
            .insert(distribution.dimension(), distribution);
        self.sampling_order = None;
    }

    /// Remove the distribution of a dimension. An unregistered dimension is
    /// neither sampled nor evaluated, and no dimension may depend on it.
    pub fn remove_dimension_distribution(
        &mut self,
        dimension: PhaseSpaceDimension,
    ) -> Option<Arc<PhaseSpaceDimensionDistribution>> {
        let removed = self.distributions.remove(&dimension);
        if removed.is_some() {
            self.sampling_order = None;
        }
        removed
    }

    /// Mono-energetic source.
    pub fn set_energy(&mut self, energy: f64) {
        self.set_dimension_distribution(PhaseSpaceDimensionDistribution::independent(
            PhaseSpaceDimension::Energy,
            Arc::new(UnivariateDistribution::delta(energy)),
        ));
    }

    pub fn set_time(&mut self, time: f64) {
        self.set_dimension_distribution(PhaseSpaceDimensionDistribution::independent(
            PhaseSpaceDimension::Time,
            Arc::new(UnivariateDistribution::delta(time)),
        ));
    }

    /// Point source at a global Cartesian position.
    pub fn set_position(&mut self, position: [f64; 3]) {
        let coords = self.spatial_policy.from_cartesian(position);
        for (dimension, coord) in PhaseSpaceDimension::SPATIAL.into_iter().zip(coords) {
            self.set_dimension_distribution(PhaseSpaceDimensionDistribution::independent(
                dimension,
                Arc::new(UnivariateDistribution::delta(coord)),
            ));
        }
    }

    /// Mono-directional source. The direction is normalized first.
    pub fn set_direction(&mut self, direction: [f64; 3]) -> Result<()> {
        let direction = normalize(direction)?;
        let coords = self.directional_policy.from_cartesian(direction);
        for (dimension, coord) in PhaseSpaceDimension::DIRECTIONAL.into_iter().zip(coords) {
            self.set_dimension_distribution(PhaseSpaceDimensionDistribution::independent(
                dimension,
                Arc::new(UnivariateDistribution::delta(coord)),
            ));
        }
        Ok(())
    }

    pub fn dimension_distribution(
        &self,
        dimension: PhaseSpaceDimension,
    ) -> Option<&Arc<PhaseSpaceDimensionDistribution>> {
        self.distributions.get(&dimension)
    }

    pub fn dimension_distribution_type_name(
        &self,
        dimension: PhaseSpaceDimension,
    ) -> Option<&'static str> {
        self.distributions.get(&dimension).map(|d| d.type_name())
    }

    pub fn is_dependency_tree_constructed(&self) -> bool {
        self.sampling_order.is_some()
    }

    /// The order in which dimensions are sampled, if the tree is constructed.
    pub fn sampling_order(&self) -> Option<&[PhaseSpaceDimension]> {
        self.sampling_order.as_deref()
    }

    /// Build the dimension dependency tree and the sampling order derived from it.
    ///
    /// Independent dimensions are the roots, visited in declaration order of
    /// [`PhaseSpaceDimension`]; each root is followed by its dependents in a
    /// depth-first preorder. Fails if a dependent dimension's parent has no
    /// distribution, or if some dimensions are not reachable from any root,
    /// which can only happen through a dependency cycle.
    pub fn construct_dimension_distribution_dependency_tree(&mut self) -> Result<()> {
        if self.sampling_order.is_some() {
            warn!(
                "the dependency tree for particle distribution {} has already been constructed",
                self.name
            );
            return Ok(());
        }

        let mut roots = Vec::new();
        let mut children: BTreeMap<PhaseSpaceDimension, Vec<PhaseSpaceDimension>> =
            BTreeMap::new();
        for (dimension, distribution) in &self.distributions {
            match distribution.parent_dimension() {
                None => roots.push(*dimension),
                Some(parent) => {
                    if !self.distributions.contains_key(&parent) {
                        return Err(PhaseSpaceError::MissingParentDistribution {
                            dimension: *dimension,
                            parent,
                        });
                    }
                    children.entry(parent).or_default().push(*dimension);
                }
            }
        }

        let mut order = Vec::with_capacity(self.distributions.len());
        // Reversed so that the first root is popped first
        let mut stack: Vec<PhaseSpaceDimension> = roots.into_iter().rev().collect();
        while let Some(dimension) = stack.pop() {
            order.push(dimension);
            if let Some(dependents) = children.get(&dimension) {
                stack.extend(dependents.iter().rev());
            }
        }

        if order.len() != self.distributions.len() {
            let visited: BTreeSet<_> = order.iter().copied().collect();
            let unreachable = self
                .distributions
                .keys()
                .filter(|d| !visited.contains(*d))
                .copied()
                .collect();
            return Err(PhaseSpaceError::CyclicDependency(unreachable));
        }

        debug!(
            "sampling order for particle distribution {}: {:?}",
            self.name, order
        );
        self.sampling_order = Some(order);
        Ok(())
    }

    fn ready_sampling_order(&self) -> Result<&[PhaseSpaceDimension]> {
        self.sampling_order
            .as_deref()
            .ok_or(PhaseSpaceError::DependencyTreeNotConstructed)
    }

    /// True if the spatial dimension distributions describe particles spread
    /// uniformly over some region.
    ///
    /// In cylindrical and spherical coordinates the radial distribution only
    /// has to be a power distribution.
    pub fn is_spatially_uniform(&self) -> bool {
        let [primary, secondary, tertiary] = PhaseSpaceDimension::SPATIAL;
        let primary_ok = match self.spatial_policy.system() {
            SpatialCoordinateSystem::Cartesian => self.dimension_is_uniform(primary),
            SpatialCoordinateSystem::Cylindrical | SpatialCoordinateSystem::Spherical => self
                .distributions
                .get(&primary)
                .map_or(false, |d| d.has_form(UnivariateDistributionForm::Power)),
        };
        primary_ok && self.dimension_is_uniform(secondary) && self.dimension_is_uniform(tertiary)
    }

    /// True if the directional dimension distributions are isotropic over
    /// some solid angle. Directions in Cartesian coordinates never are.
    pub fn is_directionally_uniform(&self) -> bool {
        match self.directional_policy.system() {
            DirectionalCoordinateSystem::Spherical => {
                self.dimension_is_uniform(PhaseSpaceDimension::SecondaryDirectional)
                    && self.dimension_is_uniform(PhaseSpaceDimension::TertiaryDirectional)
            }
            DirectionalCoordinateSystem::Cartesian => false,
        }
    }

    fn dimension_is_uniform(&self, dimension: PhaseSpaceDimension) -> bool {
        self.distributions
            .get(&dimension)
            .map_or(false, |d| d.is_uniform())
    }

    /// Set a zero trial counter for every dimension.
    pub fn initialize_dimension_counters(&self, trials: &mut DimensionCounterMap) {
        for dimension in PhaseSpaceDimension::ALL {
            trials.insert(dimension, 0);
        }
    }

    /// Density of the distribution at the particle's state. The weight
    /// dimension does not contribute.
    pub fn evaluate(&self, particle: &ParticleState) -> Result<f64> {
        self.ready_sampling_order()?;

        let point =
            PhaseSpacePoint::from_particle_state(particle, self.spatial_policy, self.directional_policy);

        Ok(self
            .distributions
            .values()
            .filter(|d| d.dimension() != PhaseSpaceDimension::Weight)
            .map(|d| d.evaluate_without_cascade(&point))
            .product())
    }

    /// Sample a new state for the particle.
    pub fn sample<R: RandomSource + ?Sized>(
        &self,
        particle: &mut ParticleState,
        rng: &mut R,
    ) -> Result<()> {
        let point = self.sample_point(rng, None, None)?;
        point.set_particle_state(particle)
    }

    /// Sample a new state for the particle, adding the trials used for each
    /// dimension to `trials`.
    pub fn sample_and_record_trials<R: RandomSource + ?Sized>(
        &self,
        particle: &mut ParticleState,
        trials: &mut DimensionCounterMap,
        rng: &mut R,
    ) -> Result<()> {
        let point = self.sample_point(rng, Some(trials), None)?;
        point.set_particle_state(particle)
    }

    /// Sample a new state for the particle with `dimension` fixed to `value`.
    /// The fixed dimension is weighted by its density at `value`.
    pub fn sample_with_dimension_value<R: RandomSource + ?Sized>(
        &self,
        particle: &mut ParticleState,
        dimension: PhaseSpaceDimension,
        value: f64,
        rng: &mut R,
    ) -> Result<()> {
        let point = self.sample_point(rng, None, Some((dimension, value)))?;
        point.set_particle_state(particle)
    }

    /// The fixed dimension does not count a trial.
    pub fn sample_with_dimension_value_and_record_trials<R: RandomSource + ?Sized>(
        &self,
        particle: &mut ParticleState,
        trials: &mut DimensionCounterMap,
        dimension: PhaseSpaceDimension,
        value: f64,
        rng: &mut R,
    ) -> Result<()> {
        let point = self.sample_point(rng, Some(trials), Some((dimension, value)))?;
        point.set_particle_state(particle)
    }

    fn sample_point<R: RandomSource + ?Sized>(
        &self,
        rng: &mut R,
        mut trials: Option<&mut DimensionCounterMap>,
        fixed: Option<(PhaseSpaceDimension, f64)>,
    ) -> Result<PhaseSpacePoint> {
        let order = self.ready_sampling_order()?;
        let mut point = PhaseSpacePoint::new(self.spatial_policy, self.directional_policy);

        for dimension in order {
            let distribution = match self.distributions.get(dimension) {
                Some(distribution) => distribution,
                None => return Err(PhaseSpaceError::DependencyTreeNotConstructed),
            };

            match (fixed, trials.as_deref_mut()) {
                (Some((fixed_dimension, value)), _) if fixed_dimension == *dimension => {
                    trace!("fixing {} to {}", dimension, value);
                    distribution.set_dimension_value_and_apply_weight(&mut point, value)?;
                }
                (_, Some(trials)) => {
                    let counter = trials.entry(*dimension).or_insert(0);
                    distribution.sample_and_record_trials_without_cascade(
                        &mut point, rng, counter,
                    )?;
                }
                (_, None) => distribution.sample_without_cascade(&mut point, rng)?,
            }
        }

        Ok(point)
    }
}

fn default_directional_distributions(
    system: DirectionalCoordinateSystem,
) -> [UnivariateDistribution; 3] {
    match system {
        DirectionalCoordinateSystem::Cartesian => {
            let component = UnivariateDistribution::Uniform(UniformDistribution {
                min: -1.0,
                max: 1.0,
                height: 1.0,
            });
            [component.clone(), component.clone(), component]
        }
        DirectionalCoordinateSystem::Spherical => [
            UnivariateDistribution::delta(1.0),
            UnivariateDistribution::Uniform(UniformDistribution {
                min: 0.0,
                max: 2.0 * PI,
                height: 1.0,
            }),
            UnivariateDistribution::Uniform(UniformDistribution {
                min: -1.0,
                max: 1.0,
                height: 1.0,
            }),
        ],
    }
}
