use serde::{Deserialize, Serialize};

/// Native kinematic state of a source particle.
///
/// The `source_*` fields record the values the particle was born with and are
/// set together with their running counterparts when a source samples it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleState {
    pub position: [f64; 3],
    pub direction: [f64; 3],
    pub energy: f64,
    pub time: f64,
    pub weight: f64,
    pub source_energy: f64,
    pub source_time: f64,
    pub source_weight: f64,
}

impl ParticleState {
    pub fn new(position: [f64; 3], direction: [f64; 3], energy: f64) -> Self {
        Self {
            position,
            direction,
            energy,
            time: 0.0,
            weight: 1.0,
            source_energy: energy,
            source_time: 0.0,
            source_weight: 1.0,
        }
    }
}

impl Default for ParticleState {
    fn default() -> Self {
        Self::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], 1.0)
    }
}
