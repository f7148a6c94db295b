// Archived particle distributions sample exactly like the originals

use std::f64::consts::PI;
use std::sync::Arc;

use phase_space_source::{
    Archive, DirectionalCoordinateConversionPolicy, DirectionalCoordinateSystem, FakeStream,
    HistogramBivariateDistribution, ParticleDistribution, ParticleState, PhaseSpaceDimension,
    PhaseSpaceDimensionDistribution, SpatialCoordinateConversionPolicy, SpatialCoordinateSystem,
    UnivariateDistribution,
};

fn distribution() -> ParticleDistribution {
    let mut distribution = ParticleDistribution::with_policies(
        5,
        "archived",
        SpatialCoordinateConversionPolicy::general(
            SpatialCoordinateSystem::Spherical,
            [2.0, -1.0, 0.1],
            [1.0, 1.0, 1.0],
        )
        .unwrap(),
        DirectionalCoordinateConversionPolicy::rotated(
            DirectionalCoordinateSystem::Spherical,
            [0.0, 1.0, 0.0],
        )
        .unwrap(),
    );
    distribution.set_dimension_distribution(PhaseSpaceDimensionDistribution::independent(
        PhaseSpaceDimension::PrimarySpatial,
        Arc::new(UnivariateDistribution::power(2.0, 1.0, 0.0, 2.0).unwrap()),
    ));
    distribution.set_dimension_distribution(PhaseSpaceDimensionDistribution::independent(
        PhaseSpaceDimension::SecondarySpatial,
        Arc::new(UnivariateDistribution::uniform(0.0, 2.0 * PI, 1.0).unwrap()),
    ));
    distribution.set_dimension_distribution(PhaseSpaceDimensionDistribution::independent(
        PhaseSpaceDimension::TertiarySpatial,
        Arc::new(UnivariateDistribution::uniform(-1.0, 1.0, 1.0).unwrap()),
    ));

    let mut energy = HistogramBivariateDistribution::partially_tabular(
        vec![0.0, 1.0],
        vec![
            Arc::new(UnivariateDistribution::exponential(1.0, 2.0, 0.0, Some(10.0)).unwrap()),
            Arc::new(UnivariateDistribution::histogram(vec![1.0, 2.0, 4.0], vec![1.0, 3.0]).unwrap()),
        ],
    )
    .unwrap();
    energy.extend_beyond_primary_indep_limits();
    distribution.set_dimension_distribution(
        PhaseSpaceDimensionDistribution::importance_sampled_dependent(
            PhaseSpaceDimension::PrimarySpatial,
            PhaseSpaceDimension::Energy,
            Arc::new(energy.clone()),
            Arc::new(energy),
        )
        .unwrap(),
    );
    distribution.set_dimension_distribution(
        PhaseSpaceDimensionDistribution::importance_sampled_independent(
            PhaseSpaceDimension::Time,
            Arc::new(UnivariateDistribution::exponential(1.0, 1.0, 0.0, Some(5.0)).unwrap()),
            Arc::new(UnivariateDistribution::uniform(0.0, 5.0, 1.0).unwrap()),
        ),
    );
    distribution.set_dimension_distribution(PhaseSpaceDimensionDistribution::independent(
        PhaseSpaceDimension::Weight,
        Arc::new(
            UnivariateDistribution::discrete(vec![0.5, 1.0, 2.0], vec![1.0, 2.0, 1.0]).unwrap(),
        ),
    ));
    distribution
        .construct_dimension_distribution_dependency_tree()
        .unwrap();
    distribution
}

fn random_numbers() -> Vec<f64> {
    let mut numbers = Vec::new();
    for i in 0..64 {
        numbers.push(((i * 37 + 11) % 100) as f64 / 100.0);
    }
    numbers
}

#[test]
fn test_archived_distribution_replays_samples() {
    let original = distribution();
    let restored = ParticleDistribution::from_json(&original.to_json().unwrap()).unwrap();

    assert_eq!(restored.id(), 5);
    assert_eq!(restored.name(), "archived");
    assert_eq!(restored.spatial_policy(), original.spatial_policy());
    assert_eq!(restored.directional_policy(), original.directional_policy());
    assert_eq!(restored.sampling_order(), original.sampling_order());
    assert!(restored.is_spatially_uniform());
    assert!(restored.is_directionally_uniform());
    for dimension in PhaseSpaceDimension::ALL {
        assert_eq!(
            restored.dimension_distribution_type_name(dimension),
            original.dimension_distribution_type_name(dimension)
        );
    }

    let mut stream = FakeStream::new(random_numbers());
    let mut restored_stream = FakeStream::new(random_numbers());
    let mut particle = ParticleState::default();
    let mut restored_particle = ParticleState::default();
    for _ in 0..8 {
        original.sample(&mut particle, &mut stream).unwrap();
        restored
            .sample(&mut restored_particle, &mut restored_stream)
            .unwrap();
        assert_eq!(particle, restored_particle);
    }
    assert_eq!(stream.consumed(), restored_stream.consumed());

    let evaluated = original.evaluate(&particle).unwrap();
    assert_eq!(restored.evaluate(&particle).unwrap(), evaluated);
}

#[test]
fn test_archive_bytes_round_trip() {
    let original = distribution();
    let bytes = original.to_json_bytes().unwrap();
    let restored = ParticleDistribution::from_json_bytes(&bytes).unwrap();
    assert_eq!(restored.to_json().unwrap(), original.to_json().unwrap());
}

#[test]
fn test_stale_tree_survives_archive() {
    let mut original = distribution();
    original.set_energy(3.0);
    let restored = ParticleDistribution::from_json(&original.to_json().unwrap()).unwrap();
    assert!(!restored.is_dependency_tree_constructed());
}

fn archived_value() -> serde_json::Value {
    serde_json::from_str(&distribution().to_json().unwrap()).unwrap()
}

fn restore(value: &serde_json::Value) -> phase_space_source::Result<ParticleDistribution> {
    ParticleDistribution::from_json(&value.to_string())
}

#[test]
fn test_restore_rebuilds_sampling_order() {
    let value = archived_value();
    assert!(value.get("sampling_order").is_none());
    assert_eq!(value["dependency_tree_constructed"], true);

    let restored = restore(&value).unwrap();
    let order = restored.sampling_order().unwrap();
    let position = |d: PhaseSpaceDimension| order.iter().position(|o| *o == d).unwrap();
    assert!(position(PhaseSpaceDimension::PrimarySpatial) < position(PhaseSpaceDimension::Energy));
}

#[test]
fn test_restore_rejects_invalid_archives() {
    // Empty primary grid in a nested bivariate distribution
    let mut value = archived_value();
    value["distributions"]["Energy"]["distribution"]["primary_grid"] = serde_json::json!([]);
    assert!(restore(&value).is_err());

    // Secondary distribution count that does not match the grid
    let mut value = archived_value();
    value["distributions"]["Energy"]["importance_distribution"]["primary_grid"] =
        serde_json::json!([0.0, 1.0, 2.0, 3.0]);
    assert!(restore(&value).is_err());

    // Uniform bounds out of order
    let mut value = archived_value();
    value["distributions"]["SecondarySpatial"]["distribution"]["min"] = serde_json::json!(10.0);
    assert!(restore(&value).is_err());

    // A distribution filed under another dimension
    let mut value = archived_value();
    let time = value["distributions"]["Time"].clone();
    value["distributions"]["Weight"] = time;
    assert!(restore(&value).is_err());

    // A dimension depending on itself can never be ordered
    let mut value = archived_value();
    value["distributions"]["Energy"]["parent_dimension"] = serde_json::json!("Energy");
    assert!(restore(&value).is_err());

    // The same archive restores if it does not claim a constructed tree
    value["dependency_tree_constructed"] = serde_json::json!(false);
    let mut restored = restore(&value).unwrap();
    assert!(!restored.is_dependency_tree_constructed());
    assert!(restored
        .construct_dimension_distribution_dependency_tree()
        .is_err());
}
