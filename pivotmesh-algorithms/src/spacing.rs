//! Point spacing estimation
//!
//! The average nearest-neighbor distance of a cloud is the natural length
//! scale for ball pivoting: it drives the default radius and the
//! perimeter threshold used when classifying boundary loops.

use crate::nearest_neighbor::PointIndex;
use pivotmesh_core::{NearestNeighborSearch, Point3d};
use rayon::prelude::*;
use tracing::debug;

/// Average distance from each point to its `k` nearest other points.
///
/// Returns `None` when fewer than two points are available or `k` is zero,
/// since no spacing is defined in that case. Per-point sums are computed in
/// parallel but accumulated in index order, so the result is deterministic.
pub fn average_spacing(index: &PointIndex, points: &[Point3d], k: usize) -> Option<f64> {
    if points.len() < 2 || k == 0 {
        return None;
    }
    let k = k.min(points.len() - 1);

    let per_point: Vec<(f64, usize)> = points
        .par_iter()
        .enumerate()
        .map(|(i, p)| {
            // Ask for one extra neighbor; the point itself is normally the first hit
            let neighbors = index.find_k_nearest(p, k + 1);
            neighbors
                .iter()
                .filter(|(idx, _)| *idx != i)
                .take(k)
                .fold((0.0, 0), |(sum, count), (_, d)| (sum + d, count + 1))
        })
        .collect();

    let (total, count) = per_point
        .iter()
        .fold((0.0, 0usize), |(sum, count), (s, c)| (sum + s, count + c));

    if count == 0 {
        return None;
    }
    let spacing = total / count as f64;
    debug!(points = points.len(), k, spacing, "estimated average point spacing");
    Some(spacing)
}

/// Default ball radius: `factor` times the average spacing over `k` neighbors.
pub fn default_radius(
    index: &PointIndex,
    points: &[Point3d],
    k: usize,
    factor: f64,
) -> Option<f64> {
    average_spacing(index, points, k)
        .map(|spacing| spacing * factor)
        .filter(|r| r.is_finite() && *r > 0.0)
}
