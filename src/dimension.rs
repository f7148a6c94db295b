use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The phase-space dimensions a particle source distribution is defined over.
///
/// The declaration order is the order in which independent dimensions are
/// visited when a sampling order is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhaseSpaceDimension {
    PrimarySpatial,
    SecondarySpatial,
    TertiarySpatial,
    PrimaryDirectional,
    SecondaryDirectional,
    TertiaryDirectional,
    Energy,
    Time,
    Weight,
}

/// Coarse grouping of the phase-space dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseSpaceDimensionClass {
    Spatial,
    Directional,
    Energy,
    Time,
    Weight,
}

/// Per-dimension trial counters, owned by the caller and accumulated across samples.
pub type DimensionCounterMap = BTreeMap<PhaseSpaceDimension, u64>;

impl PhaseSpaceDimension {
    pub const ALL: [PhaseSpaceDimension; 9] = [
        PhaseSpaceDimension::PrimarySpatial,
        PhaseSpaceDimension::SecondarySpatial,
        PhaseSpaceDimension::TertiarySpatial,
        PhaseSpaceDimension::PrimaryDirectional,
        PhaseSpaceDimension::SecondaryDirectional,
        PhaseSpaceDimension::TertiaryDirectional,
        PhaseSpaceDimension::Energy,
        PhaseSpaceDimension::Time,
        PhaseSpaceDimension::Weight,
    ];

    pub const SPATIAL: [PhaseSpaceDimension; 3] = [
        PhaseSpaceDimension::PrimarySpatial,
        PhaseSpaceDimension::SecondarySpatial,
        PhaseSpaceDimension::TertiarySpatial,
    ];

    pub const DIRECTIONAL: [PhaseSpaceDimension; 3] = [
        PhaseSpaceDimension::PrimaryDirectional,
        PhaseSpaceDimension::SecondaryDirectional,
        PhaseSpaceDimension::TertiaryDirectional,
    ];

    pub fn class(&self) -> PhaseSpaceDimensionClass {
        match self {
            PhaseSpaceDimension::PrimarySpatial
            | PhaseSpaceDimension::SecondarySpatial
            | PhaseSpaceDimension::TertiarySpatial => PhaseSpaceDimensionClass::Spatial,
            PhaseSpaceDimension::PrimaryDirectional
            | PhaseSpaceDimension::SecondaryDirectional
            | PhaseSpaceDimension::TertiaryDirectional => PhaseSpaceDimensionClass::Directional,
            PhaseSpaceDimension::Energy => PhaseSpaceDimensionClass::Energy,
            PhaseSpaceDimension::Time => PhaseSpaceDimensionClass::Time,
            PhaseSpaceDimension::Weight => PhaseSpaceDimensionClass::Weight,
        }
    }

    /// Position of the dimension in [`PhaseSpaceDimension::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            PhaseSpaceDimension::PrimarySpatial => "primary spatial",
            PhaseSpaceDimension::SecondarySpatial => "secondary spatial",
            PhaseSpaceDimension::TertiarySpatial => "tertiary spatial",
            PhaseSpaceDimension::PrimaryDirectional => "primary directional",
            PhaseSpaceDimension::SecondaryDirectional => "secondary directional",
            PhaseSpaceDimension::TertiaryDirectional => "tertiary directional",
            PhaseSpaceDimension::Energy => "energy",
            PhaseSpaceDimension::Time => "time",
            PhaseSpaceDimension::Weight => "weight",
        }
    }
}

impl fmt::Display for PhaseSpaceDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for PhaseSpaceDimensionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhaseSpaceDimensionClass::Spatial => "spatial",
            PhaseSpaceDimensionClass::Directional => "directional",
            PhaseSpaceDimensionClass::Energy => "energy",
            PhaseSpaceDimensionClass::Time => "time",
            PhaseSpaceDimensionClass::Weight => "weight",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_classes() {
        for dimension in PhaseSpaceDimension::SPATIAL {
            assert_eq!(dimension.class(), PhaseSpaceDimensionClass::Spatial);
        }
        for dimension in PhaseSpaceDimension::DIRECTIONAL {
            assert_eq!(dimension.class(), PhaseSpaceDimensionClass::Directional);
        }
        assert_eq!(PhaseSpaceDimension::Energy.class(), PhaseSpaceDimensionClass::Energy);
        assert_eq!(PhaseSpaceDimension::Time.class(), PhaseSpaceDimensionClass::Time);
        assert_eq!(PhaseSpaceDimension::Weight.class(), PhaseSpaceDimensionClass::Weight);
    }

    #[test]
    fn test_index_matches_all() {
        for (i, dimension) in PhaseSpaceDimension::ALL.iter().enumerate() {
            assert_eq!(dimension.index(), i);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(PhaseSpaceDimension::TertiaryDirectional.to_string(), "tertiary directional");
        assert_eq!(PhaseSpaceDimensionClass::Directional.to_string(), "directional");
    }

    #[test]
    fn test_dimension_serializes_as_map_key() {
        let mut counters = DimensionCounterMap::new();
        counters.insert(PhaseSpaceDimension::Energy, 3);
        let json = serde_json::to_string(&counters).unwrap();
        assert_eq!(json, r#"{"Energy":3}"#);
        let back: DimensionCounterMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back[&PhaseSpaceDimension::Energy], 3);
    }
}
