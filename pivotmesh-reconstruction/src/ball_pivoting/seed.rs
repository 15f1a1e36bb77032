//! Seed triangle search

use super::{BallPivoting, VertexClass, VertexId};
use itertools::Itertools;
use pivotmesh_core::{NearestNeighborSearch, Point3d};
use tracing::trace;

impl BallPivoting {
    /// Seed from every orphan vertex in index order, expanding the front
    /// after each seed. Dropped duplicates never seed. Returns the number of
    /// seeds placed.
    pub(super) fn find_seeds(&mut self, radius: f64) -> usize {
        let mut seeds = 0;
        for i in 0..self.graph.vertex_count() {
            let v = VertexId(i);
            if self.graph.vertex_class(v) != VertexClass::Orphan || self.is_duplicate(v) {
                continue;
            }
            let Some((a, b, center)) = self.find_seed_triangle(v, radius) else {
                continue;
            };
            match self.graph.make_face(v, a, b, center, radius) {
                Ok(face) => {
                    if self.config.verbose {
                        trace!(v = v.0, a = a.0, b = b.0, radius, "seed triangle");
                    }
                    seeds += 1;
                    self.queue_face_edges(face);
                    self.expand_front(radius);
                }
                Err(err) => {
                    if self.config.verbose {
                        trace!(v = v.0, error = %err, "seed rejected");
                    }
                }
            }
        }
        self.counters.seeds += seeds;
        seeds
    }

    /// First pair of orphan neighbors of `v` that forms a valid seed with it
    fn find_seed_triangle(
        &self,
        v: VertexId,
        radius: f64,
    ) -> Option<(VertexId, VertexId, Point3d)> {
        let neighbors = self
            .index
            .find_radius_neighbors(self.position(v), 2.0 * radius);
        if neighbors.len() < 3 {
            return None;
        }

        let orphans: Vec<VertexId> = neighbors
            .iter()
            .map(|&(i, _)| VertexId(i))
            .filter(|&n| n != v && self.graph.vertex_class(n) == VertexClass::Orphan)
            .collect();

        orphans
            .iter()
            .tuple_combinations()
            .find_map(|(&a, &b)| {
                let open = self.link_is_open(v, b)
                    && self.link_is_open(a, b)
                    && self.link_is_open(v, a);
                if !open {
                    return None;
                }
                if !self.compatible(v, a, b) {
                    return None;
                }
                let center = self.ball_center_for(v, a, b, radius, None)?;
                self.ball_is_empty(&center, radius, &neighbors, [v, a, b])
                    .then_some((a, b, center))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::super::{BallPivotingConfig, EdgeClass, FaceId};
    use super::*;
    use pivotmesh_core::Vector3d;

    fn engine(points: &[Point3d]) -> BallPivoting {
        let normals = vec![Vector3d::new(0.0, 0.0, 1.0); points.len()];
        BallPivoting::new(points, &normals, BallPivotingConfig::new(vec![1.0])).unwrap()
    }

    #[test]
    fn test_seed_uses_nearest_pair() {
        let bpa = engine(&[
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(0.6, 0.0, 0.0),
            Point3d::new(0.0, 0.7, 0.0),
            Point3d::new(1.4, 1.4, 0.0),
        ]);
        let (a, b, center) = bpa.find_seed_triangle(VertexId(0), 1.0).unwrap();
        assert_eq!((a, b), (VertexId(1), VertexId(2)));
        assert!(center.z > 0.0);
    }

    #[test]
    fn test_no_seed_when_radius_too_small() {
        let mut bpa = engine(&[
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(10.0, 0.0, 0.0),
            Point3d::new(0.0, 10.0, 0.0),
        ]);
        assert!(bpa.find_seed_triangle(VertexId(0), 1.0).is_none());
        assert_eq!(bpa.find_seeds(1.0), 0);
        assert_eq!(bpa.graph().face_count(), 0);
    }

    #[test]
    fn test_seed_skips_occupied_ball() {
        // A point right above the triangle sits inside every resting ball
        let points = vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(0.0, 1.0, 0.0),
            Point3d::new(0.3, 0.3, 0.5),
        ];
        let normals = vec![Vector3d::new(0.0, 0.0, 1.0); 4];
        let bpa =
            BallPivoting::new(&points, &normals, BallPivotingConfig::new(vec![1.0])).unwrap();
        if let Some((a, b, center)) = bpa.find_seed_triangle(VertexId(0), 1.0) {
            let corners = [VertexId(0), a, b];
            for (i, p) in points.iter().enumerate() {
                if !corners.contains(&VertexId(i)) {
                    assert!((p - center).norm() >= 1.0 - 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_duplicates_never_seed() {
        // Vertex 3 repeats vertex 0 and is dropped
        let mut bpa = engine(&[
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(0.5, 0.9, 0.0),
            Point3d::new(0.0, 0.0, 0.0),
        ]);
        assert!(!bpa.is_duplicate(VertexId(0)));
        assert!(bpa.is_duplicate(VertexId(3)));
        assert_eq!(bpa.find_seeds(1.0), 1);

        let corners = bpa.graph().face(FaceId(0)).vertices();
        assert!(!corners.contains(&VertexId(3)));
        assert_eq!(bpa.graph().vertex_class(VertexId(3)), VertexClass::Orphan);
    }

    #[test]
    fn test_find_seeds_grows_front() {
        let mut bpa = engine(&[
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(0.5, 0.9, 0.0),
        ]);
        assert_eq!(bpa.find_seeds(1.0), 1);
        assert_eq!(bpa.graph().face_count(), 1);
        // Nothing to pivot onto, so every edge ends up on the border
        assert!(bpa.front.is_empty());
        assert_eq!(bpa.graph().edges_with_class(EdgeClass::Border).count(), 3);
        assert_eq!(bpa.border_edges().len(), 3);
    }
}
