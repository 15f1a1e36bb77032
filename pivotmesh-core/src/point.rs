//! Point types and related functionality

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// A point with normal vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct NormalPoint3f {
    pub position: Point3f,
    pub normal: Vector3f,
}

/// A double precision point with normal vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalPoint3d {
    pub position: Point3d,
    pub normal: Vector3d,
}

impl Default for NormalPoint3f {
    fn default() -> Self {
        Self {
            position: Point3f::origin(),
            normal: Vector3f::new(0.0, 0.0, 1.0),
        }
    }
}

impl Default for NormalPoint3d {
    fn default() -> Self {
        Self {
            position: Point3d::origin(),
            normal: Vector3d::new(0.0, 0.0, 1.0),
        }
    }
}

impl From<NormalPoint3f> for NormalPoint3d {
    fn from(p: NormalPoint3f) -> Self {
        Self {
            position: p.position.cast::<f64>(),
            normal: p.normal.cast::<f64>(),
        }
    }
}

impl NormalPoint3d {
    /// Create an oriented point from a position and a normal
    pub fn new(position: Point3d, normal: Vector3d) -> Self {
        Self { position, normal }
    }

    /// Whether both the position and the normal are finite and the normal is non-zero
    pub fn is_valid(&self) -> bool {
        self.position.iter().all(|c| c.is_finite())
            && self.normal.iter().all(|c| c.is_finite())
            && self.normal.norm_squared() > 0.0
    }
}
