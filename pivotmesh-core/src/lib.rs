//! Core data structures and traits for pivotmesh
//!
//! This crate provides the fundamental types shared by the reconstruction
//! crates: oriented points, point clouds, triangle meshes, the nearest
//! neighbor search contract and the common error type.

pub mod point;
pub mod point_cloud;
pub mod mesh;
pub mod traits;
pub mod error;

pub use point::*;
pub use point_cloud::*;
pub use mesh::*;
pub use traits::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3};
