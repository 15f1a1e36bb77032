//! Nearest neighbor search implementations

use pivotmesh_core::{NearestNeighborSearch, Point3d};
use rstar::primitives::GeomWithData;
use rstar::RTree;
use std::cmp::Ordering;

/// A point with its index for spatial data structures
type IndexedPoint = GeomWithData<[f64; 3], usize>;

/// Orders neighbor lists by distance, then by index, so that equal-distance
/// neighbors always come back in the same order.
fn sort_neighbors(neighbors: &mut [(usize, f64)]) {
    neighbors.sort_by(|a, b| match a.1.total_cmp(&b.1) {
        Ordering::Equal => a.0.cmp(&b.0),
        other => other,
    });
}

/// R*-tree backed spatial index over a fixed point set
///
/// Built once from the input positions; every query result refers to indices
/// into that slice and is sorted closest first.
pub struct PointIndex {
    rtree: RTree<IndexedPoint>,
    len: usize,
}

impl PointIndex {
    pub fn new(points: &[Point3d]) -> Self {
        let indexed: Vec<IndexedPoint> = points
            .iter()
            .enumerate()
            .map(|(i, p)| GeomWithData::new([p.x, p.y, p.z], i))
            .collect();

        Self {
            rtree: RTree::bulk_load(indexed),
            len: points.len(),
        }
    }

    /// Index over the points listed in `members` only.
    ///
    /// Query results still refer to indices into `points`.
    pub fn from_subset(points: &[Point3d], members: &[usize]) -> Self {
        let indexed: Vec<IndexedPoint> = members
            .iter()
            .map(|&i| {
                let p = &points[i];
                GeomWithData::new([p.x, p.y, p.z], i)
            })
            .collect();

        Self {
            len: indexed.len(),
            rtree: RTree::bulk_load(indexed),
        }
    }

    /// Number of indexed points
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Indices of all points within `radius` of `query`, closest first
    pub fn radius_indices(&self, query: &Point3d, radius: f64) -> Vec<usize> {
        self.find_radius_neighbors(query, radius)
            .into_iter()
            .map(|(idx, _)| idx)
            .collect()
    }
}

impl NearestNeighborSearch for PointIndex {
    fn find_k_nearest(&self, query: &Point3d, k: usize) -> Vec<(usize, f64)> {
        if k == 0 {
            return Vec::new();
        }
        let mut neighbors: Vec<(usize, f64)> = self
            .rtree
            .nearest_neighbor_iter_with_distance_2(&[query.x, query.y, query.z])
            .take(k)
            .map(|(p, dist2)| (p.data, dist2.sqrt()))
            .collect();
        sort_neighbors(&mut neighbors);
        neighbors
    }

    fn find_radius_neighbors(&self, query: &Point3d, radius: f64) -> Vec<(usize, f64)> {
        if radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }
        let mut neighbors: Vec<(usize, f64)> = self
            .rtree
            .locate_within_distance([query.x, query.y, query.z], radius * radius)
            .map(|p| {
                let [x, y, z] = *p.geom();
                let distance = (Point3d::new(x, y, z) - query).norm();
                (p.data, distance)
            })
            .collect();
        sort_neighbors(&mut neighbors);
        neighbors
    }
}

/// Simple brute force nearest neighbor search for small datasets
pub struct BruteForceSearch {
    points: Vec<Point3d>,
}

impl BruteForceSearch {
    pub fn new(points: &[Point3d]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }
}

impl NearestNeighborSearch for BruteForceSearch {
    fn find_k_nearest(&self, query: &Point3d, k: usize) -> Vec<(usize, f64)> {
        let mut distances: Vec<(usize, f64)> = self
            .points
            .iter()
            .enumerate()
            .map(|(idx, point)| (idx, (point - query).norm()))
            .collect();

        sort_neighbors(&mut distances);
        distances.truncate(k);
        distances
    }

    fn find_radius_neighbors(&self, query: &Point3d, radius: f64) -> Vec<(usize, f64)> {
        let radius_squared = radius * radius;
        let mut neighbors: Vec<(usize, f64)> = self
            .points
            .iter()
            .enumerate()
            .filter_map(|(idx, point)| {
                let distance_squared = (point - query).norm_squared();
                (distance_squared <= radius_squared).then(|| (idx, distance_squared.sqrt()))
            })
            .collect();
        sort_neighbors(&mut neighbors);
        neighbors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    fn grid(n: usize, spacing: f64) -> Vec<Point3d> {
        let mut points = Vec::new();
        for i in 0..n {
            for j in 0..n {
                points.push(Point3d::new(i as f64 * spacing, j as f64 * spacing, 0.0));
            }
        }
        points
    }

    #[test]
    fn test_radius_query_on_flat_grid() {
        let points = grid(5, 1.0);
        let index = PointIndex::new(&points);
        assert_eq!(index.len(), 25);

        // Center of the grid: itself plus its four axis neighbors
        let neighbors = index.find_radius_neighbors(&Point3d::new(2.0, 2.0, 0.0), 1.0);
        assert_eq!(neighbors.len(), 5);
        assert_eq!(neighbors[0], (12, 0.0));
        // Equal distances come back in index order
        let rest: Vec<usize> = neighbors[1..].iter().map(|n| n.0).collect();
        assert_eq!(rest, vec![7, 11, 13, 17]);
    }

    #[test]
    fn test_k_nearest_excludes_nothing() {
        let points = grid(3, 0.5);
        let index = PointIndex::new(&points);
        let nearest = index.find_k_nearest(&points[0], 3);
        assert_eq!(nearest.len(), 3);
        assert_eq!(nearest[0].0, 0);
        assert_relative_eq!(nearest[1].1, 0.5);
        assert_relative_eq!(nearest[2].1, 0.5);
        assert!(index.find_k_nearest(&points[0], 0).is_empty());
    }

    #[test]
    fn test_rtree_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(7);
        let points: Vec<Point3d> = (0..200)
            .map(|_| Point3d::new(rng.gen(), rng.gen(), rng.gen()))
            .collect();
        let index = PointIndex::new(&points);
        let brute = BruteForceSearch::new(&points);

        for query in points.iter().step_by(17) {
            let a = index.find_radius_neighbors(query, 0.2);
            let b = brute.find_radius_neighbors(query, 0.2);
            assert_eq!(a.len(), b.len());
            for (x, y) in a.iter().zip(b.iter()) {
                assert_eq!(x.0, y.0);
                assert_relative_eq!(x.1, y.1, epsilon = 1e-12);
            }

            let a = index.find_k_nearest(query, 6);
            let b = brute.find_k_nearest(query, 6);
            let a_idx: Vec<usize> = a.iter().map(|n| n.0).collect();
            let b_idx: Vec<usize> = b.iter().map(|n| n.0).collect();
            assert_eq!(a_idx, b_idx);
        }
    }

    #[test]
    fn test_subset_keeps_original_indices() {
        let points = grid(3, 1.0);
        let index = PointIndex::from_subset(&points, &[0, 4, 8]);
        assert_eq!(index.len(), 3);

        // Point 1 is not indexed, so the nearest hit from it is point 0 or 4
        let nearest = index.find_k_nearest(&points[1], 1);
        assert_eq!(nearest[0].0, 0);
        assert_eq!(index.radius_indices(&points[4], 1.0), vec![4]);
        assert_eq!(index.radius_indices(&points[4], 1.5), vec![4, 0, 8]);
    }

    #[test]
    fn test_negative_radius_is_empty() {
        let index = PointIndex::new(&grid(2, 1.0));
        assert!(index.find_radius_neighbors(&Point3d::origin(), -1.0).is_empty());
        assert!(index.radius_indices(&Point3d::origin(), 0.0) == vec![0]);
    }
}
