// Dependency tree construction and conditioning across every pair of dimensions

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use phase_space_source::{
    DirectionalCoordinateConversionPolicy, DirectionalCoordinateSystem, FakeStream,
    HistogramBivariateDistribution, ParticleDistribution, ParticleState, PhaseSpaceDimension,
    PhaseSpaceDimensionDistribution, PhaseSpaceError, SpatialCoordinateConversionPolicy,
    SpatialCoordinateSystem, UnivariateDistribution,
};

fn cartesian_distribution() -> ParticleDistribution {
    ParticleDistribution::with_policies(
        0,
        "pairs",
        SpatialCoordinateConversionPolicy::new(SpatialCoordinateSystem::Cartesian),
        DirectionalCoordinateConversionPolicy::new(DirectionalCoordinateSystem::Cartesian),
    )
}

fn bivariate() -> Arc<HistogramBivariateDistribution> {
    let first = Arc::new(UnivariateDistribution::uniform(0.5, 0.9, 0.5).unwrap());
    Arc::new(
        HistogramBivariateDistribution::fully_tabular(
            vec![0.1, 0.5, 0.9],
            vec![
                first.clone(),
                Arc::new(UnivariateDistribution::uniform(0.6, 0.8, 0.4).unwrap()),
                first,
            ],
        )
        .unwrap(),
    )
}

fn dependent(
    parent: PhaseSpaceDimension,
    child: PhaseSpaceDimension,
) -> PhaseSpaceDimensionDistribution {
    PhaseSpaceDimensionDistribution::dependent(parent, child, bivariate()).unwrap()
}

fn delta(dimension: PhaseSpaceDimension, location: f64) -> PhaseSpaceDimensionDistribution {
    PhaseSpaceDimensionDistribution::independent(
        dimension,
        Arc::new(UnivariateDistribution::delta(location)),
    )
}

fn assert_sound_order(distribution: &ParticleDistribution) {
    let order = distribution.sampling_order().unwrap();
    assert_eq!(order.len(), PhaseSpaceDimension::ALL.len());
    for dimension in PhaseSpaceDimension::ALL {
        let position = order.iter().position(|d| *d == dimension).unwrap();
        assert_eq!(order.iter().filter(|d| **d == dimension).count(), 1);

        let parent = distribution
            .dimension_distribution(dimension)
            .unwrap()
            .parent_dimension();
        if let Some(parent) = parent {
            let parent_position = order.iter().position(|d| *d == parent).unwrap();
            assert!(
                parent_position < position,
                "{} sampled before its parent {}",
                dimension,
                parent
            );
        }
    }
}

#[test]
fn test_every_pair_is_ordered_parent_first() {
    for parent in PhaseSpaceDimension::ALL {
        for child in PhaseSpaceDimension::ALL {
            if parent == child {
                continue;
            }
            let mut distribution = cartesian_distribution();
            distribution.set_dimension_distribution(dependent(parent, child));
            distribution
                .construct_dimension_distribution_dependency_tree()
                .unwrap();
            assert_sound_order(&distribution);
        }
    }
}

#[test]
fn test_random_forests_are_ordered_parent_first() {
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..200 {
        let mut dimensions = PhaseSpaceDimension::ALL.to_vec();
        dimensions.shuffle(&mut rng);

        // Each dimension may depend on one that precedes it in the shuffle
        let mut distribution = cartesian_distribution();
        for i in 1..dimensions.len() {
            if rng.gen_bool(0.6) {
                let parent = dimensions[rng.gen_range(0..i)];
                distribution.set_dimension_distribution(dependent(parent, dimensions[i]));
            }
        }
        distribution
            .construct_dimension_distribution_dependency_tree()
            .unwrap();
        assert_sound_order(&distribution);
    }
}

#[test]
fn test_longest_chain() {
    let mut distribution = cartesian_distribution();
    for pair in PhaseSpaceDimension::ALL.windows(2).rev() {
        distribution.set_dimension_distribution(dependent(pair[1], pair[0]));
    }
    distribution
        .construct_dimension_distribution_dependency_tree()
        .unwrap();

    let mut reversed = PhaseSpaceDimension::ALL.to_vec();
    reversed.reverse();
    assert_eq!(distribution.sampling_order().unwrap(), &reversed[..]);
}

#[test]
fn test_cycles_fail_before_sampling() {
    let mut rng = StdRng::seed_from_u64(3);
    for length in 2..=PhaseSpaceDimension::ALL.len() {
        let mut dimensions = PhaseSpaceDimension::ALL.to_vec();
        dimensions.shuffle(&mut rng);
        let cycle = &dimensions[..length];

        let mut distribution = cartesian_distribution();
        for i in 0..length {
            distribution.set_dimension_distribution(dependent(cycle[(i + 1) % length], cycle[i]));
        }

        match distribution.construct_dimension_distribution_dependency_tree() {
            Err(PhaseSpaceError::CyclicDependency(unreachable)) => {
                assert_eq!(unreachable.len(), length);
                assert!(cycle.iter().all(|d| unreachable.contains(d)));
            }
            other => panic!("expected a cyclic dependency error, got {:?}", other),
        }

        let mut particle = ParticleState::default();
        let mut stream = FakeStream::new(vec![0.5; 16]);
        assert!(matches!(
            distribution.sample(&mut particle, &mut stream),
            Err(PhaseSpaceError::DependencyTreeNotConstructed)
        ));
        assert_eq!(stream.consumed(), 0);
    }
}

#[test]
fn test_missing_parent_for_every_pair() {
    for parent in PhaseSpaceDimension::ALL {
        for child in PhaseSpaceDimension::ALL {
            if parent == child {
                continue;
            }
            let mut distribution = cartesian_distribution();
            distribution.set_dimension_distribution(dependent(parent, child));
            distribution.remove_dimension_distribution(parent);

            let err = distribution
                .construct_dimension_distribution_dependency_tree()
                .unwrap_err();
            match err {
                PhaseSpaceError::MissingParentDistribution {
                    dimension,
                    parent: missing,
                } => {
                    assert_eq!(dimension, child);
                    assert_eq!(missing, parent);
                }
                other => panic!("expected a missing parent error, got {:?}", other),
            }
        }
    }
}

#[test]
fn test_parent_out_of_support_for_every_pair() {
    for parent in PhaseSpaceDimension::ALL {
        for child in PhaseSpaceDimension::ALL {
            if parent == child {
                continue;
            }
            for parent_value in [0.05, 1.0] {
                let mut distribution = cartesian_distribution();
                distribution.set_dimension_distribution(delta(parent, parent_value));
                distribution.set_dimension_distribution(dependent(parent, child));
                distribution
                    .construct_dimension_distribution_dependency_tree()
                    .unwrap();

                let mut particle = ParticleState::default();
                let mut stream = FakeStream::new(vec![0.5; 16]);
                assert!(matches!(
                    distribution.sample(&mut particle, &mut stream),
                    Err(PhaseSpaceError::PrimaryOutOfBounds { .. })
                ));

                let mut stream = FakeStream::new(vec![0.5; 16]);
                assert!(matches!(
                    distribution.sample_with_dimension_value(&mut particle, child, 0.7, &mut stream),
                    Err(PhaseSpaceError::PrimaryOutOfBounds { .. })
                ));
            }
        }
    }
}

#[test]
fn test_parent_in_support_for_every_pair() {
    for parent in PhaseSpaceDimension::ALL {
        for child in PhaseSpaceDimension::ALL {
            if parent == child {
                continue;
            }
            let mut distribution = cartesian_distribution();
            distribution.set_dimension_distribution(delta(parent, 0.5));
            distribution.set_dimension_distribution(dependent(parent, child));
            distribution
                .construct_dimension_distribution_dependency_tree()
                .unwrap();

            // The 0.5 boundary belongs to the second bin, [0.6, 0.8]. Sampled
            // direction components are 0.5, which keeps the direction nonzero.
            let mut particle = ParticleState::default();
            let mut stream = FakeStream::new(vec![0.75; 16]);
            distribution
                .sample_with_dimension_value(&mut particle, child, 0.7, &mut stream)
                .unwrap();
            let expected_weight = if child == PhaseSpaceDimension::Weight {
                0.7
            } else if parent == PhaseSpaceDimension::Weight {
                5.0 * 0.5
            } else {
                5.0
            };
            assert!(
                (particle.weight - expected_weight).abs() < 1e-12,
                "{} given {}: weight {}",
                child,
                parent,
                particle.weight
            );
        }
    }
}

#[test]
fn test_spatial_uniformity_combinations() {
    let uniform = Arc::new(UnivariateDistribution::uniform(-1.0, 1.0, 0.5).unwrap());

    for mask in 0..8u32 {
        let mut distribution = cartesian_distribution();
        for (bit, dimension) in PhaseSpaceDimension::SPATIAL.into_iter().enumerate() {
            if mask & (1 << bit) != 0 {
                distribution.set_dimension_distribution(delta(dimension, 0.0));
            } else {
                distribution.set_dimension_distribution(
                    PhaseSpaceDimensionDistribution::independent(dimension, uniform.clone()),
                );
            }
        }
        assert_eq!(distribution.is_spatially_uniform(), mask == 0, "mask {:03b}", mask);
    }
}

#[test]
fn test_dependent_spatial_dimension_is_not_uniform() {
    let mut distribution = cartesian_distribution();
    let uniform = Arc::new(UnivariateDistribution::uniform(-1.0, 1.0, 0.5).unwrap());
    for dimension in PhaseSpaceDimension::SPATIAL {
        distribution.set_dimension_distribution(PhaseSpaceDimensionDistribution::independent(
            dimension,
            uniform.clone(),
        ));
    }
    assert!(distribution.is_spatially_uniform());

    distribution.set_dimension_distribution(dependent(
        PhaseSpaceDimension::Energy,
        PhaseSpaceDimension::TertiarySpatial,
    ));
    assert!(!distribution.is_spatially_uniform());
}
