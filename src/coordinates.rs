// Coordinate conversion policies between the native Cartesian particle state
// and the coordinates that phase-space dimensions are sampled in.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{PhaseSpaceError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpatialCoordinateSystem {
    /// (x, y, z)
    Cartesian,
    /// (r, azimuthal angle, z)
    Cylindrical,
    /// (r, azimuthal angle, polar angle cosine)
    Spherical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DirectionalCoordinateSystem {
    /// (u, v, w)
    Cartesian,
    /// (r, azimuthal angle, polar angle cosine)
    Spherical,
}

/// Orthonormal frame whose third axis is a given unit vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct LocalFrame {
    x_axis: [f64; 3],
    y_axis: [f64; 3],
    z_axis: [f64; 3],
}

impl LocalFrame {
    const IDENTITY: LocalFrame = LocalFrame {
        x_axis: [1.0, 0.0, 0.0],
        y_axis: [0.0, 1.0, 0.0],
        z_axis: [0.0, 0.0, 1.0],
    };

    fn with_z_axis(axis: [f64; 3]) -> Result<Self> {
        let [u, v, w] = normalize(axis)?;
        let sin_polar = (1.0 - w * w).max(0.0).sqrt();

        if sin_polar < 1e-12 {
            if w > 0.0 {
                return Ok(Self::IDENTITY);
            }
            return Ok(LocalFrame {
                x_axis: [1.0, 0.0, 0.0],
                y_axis: [0.0, -1.0, 0.0],
                z_axis: [0.0, 0.0, -1.0],
            });
        }

        Ok(LocalFrame {
            x_axis: [u * w / sin_polar, v * w / sin_polar, -sin_polar],
            y_axis: [-v / sin_polar, u / sin_polar, 0.0],
            z_axis: [u, v, w],
        })
    }

    fn to_global(&self, local: [f64; 3]) -> [f64; 3] {
        let mut global = [0.0; 3];
        for (i, g) in global.iter_mut().enumerate() {
            *g = local[0] * self.x_axis[i] + local[1] * self.y_axis[i] + local[2] * self.z_axis[i];
        }
        global
    }

    fn to_local(&self, global: [f64; 3]) -> [f64; 3] {
        [
            dot(self.x_axis, global),
            dot(self.y_axis, global),
            dot(self.z_axis, global),
        ]
    }
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Normalize a vector, failing for zero-length or non-finite input.
pub fn normalize(vector: [f64; 3]) -> Result<[f64; 3]> {
    let mag = dot(vector, vector).sqrt();
    if !(mag > 0.0) || !mag.is_finite() {
        return Err(PhaseSpaceError::InvalidDirection(vector[0], vector[1], vector[2]));
    }
    Ok([vector[0] / mag, vector[1] / mag, vector[2] / mag])
}

fn azimuthal_angle(x: f64, y: f64) -> f64 {
    if x == 0.0 && y == 0.0 {
        return 0.0;
    }
    let angle = y.atan2(x);
    if angle < 0.0 {
        angle + 2.0 * PI
    } else {
        angle
    }
}

fn spherical_to_cartesian(coords: [f64; 3]) -> [f64; 3] {
    let [r, azimuth, mu] = coords;
    let sin_polar = (1.0 - mu * mu).max(0.0).sqrt();
    [
        r * sin_polar * azimuth.cos(),
        r * sin_polar * azimuth.sin(),
        r * mu,
    ]
}

fn cartesian_to_spherical(point: [f64; 3]) -> [f64; 3] {
    let r = dot(point, point).sqrt();
    if r == 0.0 {
        return [0.0, 0.0, 1.0];
    }
    [
        r,
        azimuthal_angle(point[0], point[1]),
        (point[2] / r).clamp(-1.0, 1.0),
    ]
}

/// Converts spatial coordinates to and from global Cartesian positions.
///
/// The local coordinate system is centred on `origin` and its z axis points
/// along `axis`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialCoordinateConversionPolicy {
    system: SpatialCoordinateSystem,
    origin: [f64; 3],
    frame: LocalFrame,
}

impl SpatialCoordinateConversionPolicy {
    /// Policy located at the global origin with the global z axis.
    pub fn new(system: SpatialCoordinateSystem) -> Self {
        Self {
            system,
            origin: [0.0; 3],
            frame: LocalFrame::IDENTITY,
        }
    }

    pub fn general(
        system: SpatialCoordinateSystem,
        origin: [f64; 3],
        axis: [f64; 3],
    ) -> Result<Self> {
        Ok(Self {
            system,
            origin,
            frame: LocalFrame::with_z_axis(axis)?,
        })
    }

    pub fn system(&self) -> SpatialCoordinateSystem {
        self.system
    }

    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    pub fn to_cartesian(&self, coords: [f64; 3]) -> [f64; 3] {
        let local = match self.system {
            SpatialCoordinateSystem::Cartesian => coords,
            SpatialCoordinateSystem::Cylindrical => {
                let [r, azimuth, z] = coords;
                [r * azimuth.cos(), r * azimuth.sin(), z]
            }
            SpatialCoordinateSystem::Spherical => spherical_to_cartesian(coords),
        };
        let offset = self.frame.to_global(local);
        [
            self.origin[0] + offset[0],
            self.origin[1] + offset[1],
            self.origin[2] + offset[2],
        ]
    }

    pub fn from_cartesian(&self, position: [f64; 3]) -> [f64; 3] {
        let local = self.frame.to_local([
            position[0] - self.origin[0],
            position[1] - self.origin[1],
            position[2] - self.origin[2],
        ]);
        match self.system {
            SpatialCoordinateSystem::Cartesian => local,
            SpatialCoordinateSystem::Cylindrical => [
                local[0].hypot(local[1]),
                azimuthal_angle(local[0], local[1]),
                local[2],
            ],
            SpatialCoordinateSystem::Spherical => cartesian_to_spherical(local),
        }
    }
}

impl Default for SpatialCoordinateConversionPolicy {
    fn default() -> Self {
        Self::new(SpatialCoordinateSystem::Cartesian)
    }
}

/// Converts directional coordinates to and from global Cartesian unit vectors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalCoordinateConversionPolicy {
    system: DirectionalCoordinateSystem,
    frame: LocalFrame,
}

impl DirectionalCoordinateConversionPolicy {
    pub fn new(system: DirectionalCoordinateSystem) -> Self {
        Self {
            system,
            frame: LocalFrame::IDENTITY,
        }
    }

    /// Directions are measured relative to a local z axis along `axis`.
    pub fn rotated(system: DirectionalCoordinateSystem, axis: [f64; 3]) -> Result<Self> {
        Ok(Self {
            system,
            frame: LocalFrame::with_z_axis(axis)?,
        })
    }

    pub fn system(&self) -> DirectionalCoordinateSystem {
        self.system
    }

    /// The returned direction is always normalized.
    pub fn to_cartesian(&self, coords: [f64; 3]) -> Result<[f64; 3]> {
        let local = match self.system {
            DirectionalCoordinateSystem::Cartesian => coords,
            DirectionalCoordinateSystem::Spherical => spherical_to_cartesian(coords),
        };
        normalize(self.frame.to_global(local))
    }

    pub fn from_cartesian(&self, direction: [f64; 3]) -> [f64; 3] {
        let local = self.frame.to_local(direction);
        match self.system {
            DirectionalCoordinateSystem::Cartesian => local,
            DirectionalCoordinateSystem::Spherical => cartesian_to_spherical(local),
        }
    }
}

impl Default for DirectionalCoordinateConversionPolicy {
    fn default() -> Self {
        Self::new(DirectionalCoordinateSystem::Cartesian)
    }
}
