//! # pivotmesh Reconstruction
//!
//! Ball pivoting surface reconstruction for oriented 3D point clouds.
//!
//! The engine turns points with outward normals and a schedule of ball radii
//! into a triangle mesh over the input points, together with statistics about
//! the boundary it could not close.

pub mod ball_pivoting;

// Re-export commonly used items
pub use ball_pivoting::*;
