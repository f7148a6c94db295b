// Global defaults for building source distributions
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::coordinates::{DirectionalCoordinateSystem, SpatialCoordinateSystem};
use crate::error::{PhaseSpaceError, Result};

// Global configuration read when distributions are constructed
pub static CONFIG: Lazy<Mutex<Config>> = Lazy::new(|| Mutex::new(Config::new()));

/// Global configuration container for source distribution construction.
///
/// The values here are only consulted when a new object is built: a
/// histogram bivariate distribution takes its initial extension policy from
/// `extend_beyond_primary_limits`, and [`crate::ParticleDistribution::new`]
/// takes its coordinate systems from the two coordinate system fields.
/// Changing the configuration never alters objects that already exist.
///
/// Constructors read these defaults through [`Config::global`], which
/// recovers the guard even if another thread panicked while holding it.
/// Tests and applications that want different defaults edit the fields
/// through the same guard before building any distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Whether new histogram bivariate distributions extend beyond their primary grid
    pub extend_beyond_primary_limits: bool,
    /// Spatial coordinate system of new particle distributions
    pub spatial_coordinate_system: SpatialCoordinateSystem,
    /// Directional coordinate system of new particle distributions
    pub directional_coordinate_system: DirectionalCoordinateSystem,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Config {
            extend_beyond_primary_limits: false,
            spatial_coordinate_system: SpatialCoordinateSystem::Cartesian,
            directional_coordinate_system: DirectionalCoordinateSystem::Spherical,
        }
    }

    /// Parse a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| PhaseSpaceError::InvalidConfig(e.to_string()))
    }

    /// Restore the default values
    pub fn clear(&mut self) {
        *self = Config::new();
    }
}

impl Config {
    /// Get the global configuration instance
    pub fn global() -> std::sync::MutexGuard<'static, Self> {
        CONFIG
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
