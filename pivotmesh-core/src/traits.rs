//! Core traits for pivotmesh

use crate::point::*;

/// Trait for nearest neighbor search functionality
///
/// Results are `(index, distance)` pairs where `index` refers to the point
/// set the searcher was built from.
pub trait NearestNeighborSearch {
    /// Find the k nearest neighbors to a query point, closest first
    fn find_k_nearest(&self, query: &Point3d, k: usize) -> Vec<(usize, f64)>;

    /// Find all neighbors within a given radius (inclusive)
    fn find_radius_neighbors(&self, query: &Point3d, radius: f64) -> Vec<(usize, f64)>;
}
