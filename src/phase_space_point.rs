use crate::coordinates::{DirectionalCoordinateConversionPolicy, SpatialCoordinateConversionPolicy};
use crate::dimension::PhaseSpaceDimension;
use crate::error::Result;
use crate::particle::ParticleState;

/// Coordinate values and coordinate weights of one particle being sampled.
///
/// Every kinematic dimension has a value and a weight (default 1). The weight
/// dimension only has a value, the weight coordinate, which scales the
/// product of the kinematic coordinate weights.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSpacePoint {
    spatial_policy: SpatialCoordinateConversionPolicy,
    directional_policy: DirectionalCoordinateConversionPolicy,
    coordinates: [f64; 9],
    weights: [f64; 9],
}

impl PhaseSpacePoint {
    pub fn new(
        spatial_policy: SpatialCoordinateConversionPolicy,
        directional_policy: DirectionalCoordinateConversionPolicy,
    ) -> Self {
        let mut coordinates = [0.0; 9];
        coordinates[PhaseSpaceDimension::Weight.index()] = 1.0;
        Self {
            spatial_policy,
            directional_policy,
            coordinates,
            weights: [1.0; 9],
        }
    }

    /// Read a particle state through the conversion policies. All coordinate
    /// weights start at 1 and the weight coordinate is the particle weight.
    pub fn from_particle_state(
        state: &ParticleState,
        spatial_policy: SpatialCoordinateConversionPolicy,
        directional_policy: DirectionalCoordinateConversionPolicy,
    ) -> Self {
        let mut point = Self::new(spatial_policy, directional_policy);

        let spatial = spatial_policy.from_cartesian(state.position);
        let directional = directional_policy.from_cartesian(state.direction);
        for (i, dimension) in PhaseSpaceDimension::SPATIAL.iter().enumerate() {
            point.set_coordinate(*dimension, spatial[i]);
        }
        for (i, dimension) in PhaseSpaceDimension::DIRECTIONAL.iter().enumerate() {
            point.set_coordinate(*dimension, directional[i]);
        }
        point.set_coordinate(PhaseSpaceDimension::Energy, state.energy);
        point.set_coordinate(PhaseSpaceDimension::Time, state.time);
        point.set_coordinate(PhaseSpaceDimension::Weight, state.weight);
        point
    }

    pub fn spatial_policy(&self) -> &SpatialCoordinateConversionPolicy {
        &self.spatial_policy
    }

    pub fn directional_policy(&self) -> &DirectionalCoordinateConversionPolicy {
        &self.directional_policy
    }

    pub fn coordinate(&self, dimension: PhaseSpaceDimension) -> f64 {
        self.coordinates[dimension.index()]
    }

    pub fn set_coordinate(&mut self, dimension: PhaseSpaceDimension, value: f64) {
        self.coordinates[dimension.index()] = value;
    }

    /// Always 1 for the weight dimension.
    pub fn coordinate_weight(&self, dimension: PhaseSpaceDimension) -> f64 {
        self.weights[dimension.index()]
    }

    /// Ignored for the weight dimension, which has no coordinate weight.
    pub fn set_coordinate_weight(&mut self, dimension: PhaseSpaceDimension, weight: f64) {
        if dimension != PhaseSpaceDimension::Weight {
            self.weights[dimension.index()] = weight;
        }
    }

    pub fn weight_coordinate(&self) -> f64 {
        self.coordinate(PhaseSpaceDimension::Weight)
    }

    pub fn set_weight_coordinate(&mut self, weight: f64) {
        self.set_coordinate(PhaseSpaceDimension::Weight, weight);
    }

    pub fn weight_of_spatial_coordinates(&self) -> f64 {
        PhaseSpaceDimension::SPATIAL
            .iter()
            .map(|d| self.coordinate_weight(*d))
            .product()
    }

    pub fn weight_of_directional_coordinates(&self) -> f64 {
        PhaseSpaceDimension::DIRECTIONAL
            .iter()
            .map(|d| self.coordinate_weight(*d))
            .product()
    }

    /// Product of every coordinate weight and the weight coordinate.
    pub fn weight_of_coordinates(&self) -> f64 {
        self.weight_of_spatial_coordinates()
            * self.weight_of_directional_coordinates()
            * self.coordinate_weight(PhaseSpaceDimension::Energy)
            * self.coordinate_weight(PhaseSpaceDimension::Time)
            * self.weight_coordinate()
    }

    pub fn spatial_coordinates_in_cartesian(&self) -> [f64; 3] {
        self.spatial_policy.to_cartesian([
            self.coordinate(PhaseSpaceDimension::PrimarySpatial),
            self.coordinate(PhaseSpaceDimension::SecondarySpatial),
            self.coordinate(PhaseSpaceDimension::TertiarySpatial),
        ])
    }

    /// Normalized Cartesian direction.
    pub fn direction_in_cartesian(&self) -> Result<[f64; 3]> {
        self.directional_policy.to_cartesian([
            self.coordinate(PhaseSpaceDimension::PrimaryDirectional),
            self.coordinate(PhaseSpaceDimension::SecondaryDirectional),
            self.coordinate(PhaseSpaceDimension::TertiaryDirectional),
        ])
    }

    /// Write the point onto a particle. The particle weight becomes the
    /// weight of the coordinates.
    pub fn set_particle_state(&self, state: &mut ParticleState) -> Result<()> {
        let direction = self.direction_in_cartesian()?;
        state.position = self.spatial_coordinates_in_cartesian();
        state.direction = direction;

        let energy = self.coordinate(PhaseSpaceDimension::Energy);
        state.energy = energy;
        state.source_energy = energy;

        let time = self.coordinate(PhaseSpaceDimension::Time);
        state.time = time;
        state.source_time = time;

        let weight = self.weight_of_coordinates();
        state.weight = weight;
        state.source_weight = weight;
        Ok(())
    }
}

impl Default for PhaseSpacePoint {
    fn default() -> Self {
        Self::new(
            SpatialCoordinateConversionPolicy::default(),
            DirectionalCoordinateConversionPolicy::default(),
        )
    }
}
