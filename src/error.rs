use thiserror::Error;

use crate::dimension::PhaseSpaceDimension;

/// Errors raised while building, sampling or archiving phase-space distributions.
#[derive(Error, Debug)]
pub enum PhaseSpaceError {
    /// A sample was requested for a primary value the bivariate grid does not cover.
    #[error("primary value {primary} is outside of the primary grid [{lower}, {upper}]")]
    PrimaryOutOfBounds { primary: f64, lower: f64, upper: f64 },

    #[error("random number {0} is outside of [0, 1)")]
    InvalidRandomNumber(f64),

    #[error("subrange upper bound {max} must be greater than the lower bound {lower}")]
    InvalidSubrange { max: f64, lower: f64 },

    #[error("the fake random number stream was exhausted after {consumed} numbers")]
    FakeStreamExhausted { consumed: usize },

    #[error("invalid distribution: {0}")]
    InvalidDistribution(String),

    #[error("{operation} is not supported by {distribution}")]
    UnsupportedOperation {
        operation: &'static str,
        distribution: String,
    },

    #[error("the {dimension} distribution depends on {parent}, which has no distribution")]
    MissingParentDistribution {
        dimension: PhaseSpaceDimension,
        parent: PhaseSpaceDimension,
    },

    #[error("dimension distributions {0:?} are not reachable from an independent dimension (cyclic dependency)")]
    CyclicDependency(Vec<PhaseSpaceDimension>),

    #[error("the dimension distribution dependency tree has not been constructed")]
    DependencyTreeNotConstructed,

    #[error("the {dimension} value {value} has a weight of {weight}, which is not positive")]
    NonPositiveWeight {
        dimension: PhaseSpaceDimension,
        value: f64,
        weight: f64,
    },

    #[error("the importance distribution for {dimension} has zero density at {value} where the true distribution does not")]
    ZeroImportanceDensity {
        dimension: PhaseSpaceDimension,
        value: f64,
    },

    #[error("the importance distribution does not have the same primary bounds as the true distribution")]
    MismatchedPrimaryBounds,

    #[error("invalid direction [{0}, {1}, {2}]")]
    InvalidDirection(f64, f64, f64),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PhaseSpaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PhaseSpaceError::PrimaryOutOfBounds {
            primary: 1.0,
            lower: 0.1,
            upper: 0.9,
        };
        assert_eq!(
            err.to_string(),
            "primary value 1 is outside of the primary grid [0.1, 0.9]"
        );

        let err = PhaseSpaceError::MissingParentDistribution {
            dimension: PhaseSpaceDimension::Energy,
            parent: PhaseSpaceDimension::Time,
        };
        assert_eq!(
            err.to_string(),
            "the energy distribution depends on time, which has no distribution"
        );
    }

    #[test]
    fn test_serde_json_errors_convert() {
        let json_err = serde_json::from_str::<f64>("not a number").unwrap_err();
        let err: PhaseSpaceError = json_err.into();
        assert!(matches!(err, PhaseSpaceError::Serialization(_)));
    }

    #[test]
    fn test_send_sync_bounds() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<PhaseSpaceError>();
        assert_sync::<PhaseSpaceError>();
    }
}
