// JSON archives of distribution objects.
//
// Every distribution type derives serde; this trait gives them one uniform
// save/restore surface. Shared `Arc` distributions are written out by value,
// so a restored object owns its own copies.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub trait Archive: Sized {
    fn to_json(&self) -> Result<String>;

    fn from_json(json: &str) -> Result<Self>;

    fn to_json_bytes(&self) -> Result<Vec<u8>>;

    fn from_json_bytes(bytes: &[u8]) -> Result<Self>;
}

impl<T: Serialize + DeserializeOwned> Archive for T {
    fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bivariate::HistogramBivariateDistribution;
    use crate::dimension::PhaseSpaceDimension;
    use crate::dimension_distribution::PhaseSpaceDimensionDistribution;
    use crate::error::PhaseSpaceError;
    use crate::phase_space_point::PhaseSpacePoint;
    use crate::random::FakeStream;
    use crate::univariate::UnivariateDistribution;
    use std::sync::Arc;

    fn bivariate() -> HistogramBivariateDistribution {
        let first = Arc::new(UnivariateDistribution::uniform(0.5, 0.9, 0.5).unwrap());
        HistogramBivariateDistribution::fully_tabular(
            vec![0.1, 0.5, 0.9],
            vec![
                first.clone(),
                Arc::new(UnivariateDistribution::uniform(0.6, 0.8, 0.4).unwrap()),
                first,
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_univariate_archive() {
        let dist = UnivariateDistribution::histogram(vec![0.0, 1.0, 3.0], vec![2.0, 1.0]).unwrap();
        let restored = UnivariateDistribution::from_json(&dist.to_json().unwrap()).unwrap();
        assert_eq!(restored, dist);

        let restored =
            UnivariateDistribution::from_json_bytes(&dist.to_json_bytes().unwrap()).unwrap();
        assert_eq!(restored, dist);
    }

    #[test]
    fn test_bivariate_archive_keeps_extension_policy() {
        let mut dist = bivariate();
        dist.extend_beyond_primary_indep_limits();

        let restored = HistogramBivariateDistribution::from_json(&dist.to_json().unwrap()).unwrap();
        assert!(restored.is_primary_range_extended());
        assert_eq!(restored.primary_grid(), dist.primary_grid());
        assert_eq!(restored.evaluate(1.0, 0.7), 0.5);
        assert_eq!(restored.evaluate(0.5, 0.7), 0.4);
    }

    #[test]
    fn test_dimension_distribution_archive_replays_samples() {
        let dist = PhaseSpaceDimensionDistribution::dependent(
            PhaseSpaceDimension::PrimarySpatial,
            PhaseSpaceDimension::Energy,
            Arc::new(bivariate()),
        )
        .unwrap();
        let restored = PhaseSpaceDimensionDistribution::from_json(&dist.to_json().unwrap()).unwrap();
        assert_eq!(restored.type_name(), "BasicBivariateDistribution");
        assert_eq!(
            restored.parent_dimension(),
            Some(PhaseSpaceDimension::PrimarySpatial)
        );

        let mut point = PhaseSpacePoint::default();
        let mut restored_point = PhaseSpacePoint::default();
        point.set_coordinate(PhaseSpaceDimension::PrimarySpatial, 0.5);
        restored_point.set_coordinate(PhaseSpaceDimension::PrimarySpatial, 0.5);

        let mut stream = FakeStream::new(vec![0.0, 0.5, 1.0 - 1e-15]);
        let mut restored_stream = stream.clone();
        for _ in 0..3 {
            dist.sample_without_cascade(&mut point, &mut stream).unwrap();
            restored
                .sample_without_cascade(&mut restored_point, &mut restored_stream)
                .unwrap();
            assert_eq!(point, restored_point);
        }
    }

    #[test]
    fn test_invalid_archive() {
        let err = UnivariateDistribution::from_json(r#"{"type": "Uniform", "min": 1.0}"#)
            .unwrap_err();
        assert!(matches!(err, PhaseSpaceError::Serialization(_)));

        // Cached tables are rebuilt and validated on restore
        let err = UnivariateDistribution::from_json(
            r#"{"type": "Histogram", "bin_boundaries": [1.0, 0.0], "bin_values": [1.0]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, PhaseSpaceError::Serialization(_)));
    }
}
