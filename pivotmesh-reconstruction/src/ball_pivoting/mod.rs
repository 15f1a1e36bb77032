//! Ball Pivoting Algorithm
//!
//! A ball of radius `r` is rolled over an oriented point cloud. Whenever it
//! rests on three points without containing any other, those points form a
//! triangle. Starting from seed triangles the ball pivots around each open
//! edge until it touches a new point, growing the mesh front by front.
//!
//! Several radii can be given. Before each larger radius the edges where
//! pivoting stalled are revisited: loops lying on the true boundary of the
//! sampled surface are sealed, and the rest are reopened where the larger
//! ball can now close them. A final pass makes the triangle winding
//! consistent within each connected component.
//!
//! Points lying almost on top of an earlier point are dropped before any
//! pivoting, so that doubled scans do not produce slivers.
//!
//! ```
//! use pivotmesh_core::{Point3d, Vector3d};
//! use pivotmesh_reconstruction::{BallPivoting, BallPivotingConfig};
//!
//! let points = vec![
//!     Point3d::new(0.0, 0.0, 0.0),
//!     Point3d::new(1.0, 0.0, 0.0),
//!     Point3d::new(1.0, 1.0, 0.0),
//!     Point3d::new(0.0, 1.0, 0.0),
//! ];
//! let normals = vec![Vector3d::new(0.0, 0.0, 1.0); 4];
//!
//! let config = BallPivotingConfig::new(vec![1.5]);
//! let mut bpa = BallPivoting::new(&points, &normals, config).unwrap();
//! let result = bpa.reconstruct().unwrap();
//! assert_eq!(result.surface.triangle_count(), 2);
//! ```

mod border;
mod config;
mod front;
pub mod geometry;
mod graph;
mod orientation;
mod result;
mod seed;

pub use border::{BorderLoop, LoopClass};
pub use config::{BallPivotingConfig, TriangleWinding};
pub use graph::{
    Edge, EdgeClass, EdgeId, EdgeOrientation, Face, FaceId, MeshGraph, Vertex, VertexClass,
    VertexId,
};
pub use result::{ReconstructedSurface, Reconstruction, ReconstructionStats};

use config::check_radius;
use geometry::{ball_center, inside_ball, normals_compatible, ContinuityHint};
use pivotmesh_algorithms::{average_spacing, default_radius, PointIndex};
use pivotmesh_core::{
    Error, NearestNeighborSearch, NormalPoint3d, NormalPoint3f, Point3d, Point3f, PointCloud,
    Result, TriangleMesh, Vector3d,
};
use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, info};

/// Minimum number of input points
const MIN_POINTS: usize = 3;

/// Ball pivoting reconstruction engine
///
/// Owns the mesh graph and the pivoting state for one point cloud. Radii are
/// processed with [`reconstruct`](Self::reconstruct), or one at a time with
/// [`run_pass`](Self::run_pass).
pub struct BallPivoting {
    config: BallPivotingConfig,
    index: PointIndex,
    graph: MeshGraph,
    /// Edges waiting to be pivoted, most recent first
    front: VecDeque<EdgeId>,
    /// Stalled edges that may be reopened at a larger radius
    border: BTreeSet<EdgeId>,
    /// Stalled edges on the true boundary, never reopened
    sealed: BTreeSet<EdgeId>,
    /// Input points left out of the index as near copies of earlier points
    duplicates: Vec<bool>,
    average_spacing: Option<f64>,
    default_radius: Option<f64>,
    counters: ReconstructionStats,
}

impl BallPivoting {
    /// Create an engine over `points` and their `normals`.
    ///
    /// Normals are renormalized and near duplicate points are dropped.
    /// Fails on mismatched lengths, fewer than three points, non-finite
    /// data, zero normals or an invalid config.
    pub fn new(
        points: &[Point3d],
        normals: &[Vector3d],
        config: BallPivotingConfig,
    ) -> Result<Self> {
        config.validate()?;
        if points.len() != normals.len() {
            return Err(Error::LengthMismatch {
                points: points.len(),
                normals: normals.len(),
            });
        }
        if points.len() < MIN_POINTS {
            return Err(Error::InsufficientPoints {
                found: points.len(),
                required: MIN_POINTS,
            });
        }

        let mut unit_normals = Vec::with_capacity(normals.len());
        for (i, (p, n)) in points.iter().zip(normals.iter()).enumerate() {
            if !NormalPoint3d::new(*p, *n).is_valid() {
                return Err(Error::InvalidData(format!(
                    "point {} is not finite or has a zero normal",
                    i
                )));
            }
            let unit = n
                .try_normalize(0.0)
                .ok_or_else(|| Error::InvalidData(format!("normal {} is too short", i)))?;
            unit_normals.push(unit);
        }

        let k = config.spacing_neighbors;
        let full = PointIndex::new(points);
        let reference = match config.sorted_radii()?.first() {
            Some(&r) => Some(r),
            None => default_radius(&full, points, k, config.default_radius_factor),
        };
        let duplicates = match reference {
            Some(r) => find_duplicates(&full, points, &unit_normals, r, &config),
            None => vec![false; points.len()],
        };

        let dropped = duplicates.iter().filter(|&&d| d).count();
        let (index, spacing) = if dropped == 0 {
            let spacing = average_spacing(&full, points, k);
            (full, spacing)
        } else {
            let kept: Vec<usize> = (0..points.len()).filter(|&i| !duplicates[i]).collect();
            let kept_points: Vec<Point3d> = kept.iter().map(|&i| points[i]).collect();
            let spacing = average_spacing(&PointIndex::new(&kept_points), &kept_points, k);
            debug!(dropped, kept = kept.len(), "dropped duplicate points");
            (PointIndex::from_subset(points, &kept), spacing)
        };
        let fallback = if config.radii.is_empty() {
            spacing
                .map(|s| s * config.default_radius_factor)
                .filter(|r| r.is_finite() && *r > 0.0)
        } else {
            None
        };

        Ok(Self {
            graph: MeshGraph::new(points, &unit_normals),
            index,
            config,
            front: VecDeque::new(),
            border: BTreeSet::new(),
            sealed: BTreeSet::new(),
            duplicates,
            average_spacing: spacing,
            default_radius: fallback,
            counters: ReconstructionStats::default(),
        })
    }

    /// Create an engine from a single precision oriented point cloud
    pub fn from_cloud(
        cloud: &PointCloud<NormalPoint3f>,
        config: BallPivotingConfig,
    ) -> Result<Self> {
        let (points, normals) = cloud.to_positions_and_normals();
        Self::new(&points, &normals, config)
    }

    /// Create an engine from a double precision oriented point cloud
    pub fn from_cloud_f64(
        cloud: &PointCloud<NormalPoint3d>,
        config: BallPivotingConfig,
    ) -> Result<Self> {
        let (points, normals) = cloud.to_positions_and_normals();
        Self::new(&points, &normals, config)
    }

    pub fn config(&self) -> &BallPivotingConfig {
        &self.config
    }

    pub fn graph(&self) -> &MeshGraph {
        &self.graph
    }

    /// Average distance to the nearest neighbors, if defined
    pub fn average_spacing(&self) -> Option<f64> {
        self.average_spacing
    }

    /// Whether `v` was dropped as a near copy of an earlier point
    pub fn is_duplicate(&self, v: VertexId) -> bool {
        self.duplicates.get(v.0).copied().unwrap_or(false)
    }

    /// Border edges that may still be reopened
    pub fn border_edges(&self) -> &BTreeSet<EdgeId> {
        &self.border
    }

    /// Border edges sealed as true boundary
    pub fn sealed_edges(&self) -> &BTreeSet<EdgeId> {
        &self.sealed
    }

    /// The radius schedule: configured radii sorted and deduplicated, or the
    /// spacing-derived default when none are configured.
    pub fn resolve_radii(&self) -> Result<Vec<f64>> {
        let radii = self.config.sorted_radii()?;
        if !radii.is_empty() {
            return Ok(radii);
        }
        self.default_radius.map(|r| vec![r]).ok_or_else(|| {
            Error::InvalidData(
                "no radii given and the average point spacing is undefined".to_string(),
            )
        })
    }

    /// Run every radius of the schedule, then make the winding consistent
    pub fn reconstruct(&mut self) -> Result<Reconstruction> {
        let radii = self.resolve_radii()?;
        info!(
            points = self.graph.vertex_count(),
            radii = ?radii,
            "starting ball pivoting"
        );

        for &radius in &radii {
            self.run_pass(radius)?;
        }
        self.consolidate_orientation();

        let stats = self.stats();
        info!(
            triangles = stats.triangles,
            border_edges = stats.border_edges,
            orphans = stats.orphan_vertices,
            "ball pivoting finished"
        );
        Ok(Reconstruction {
            surface: self.surface(),
            stats,
        })
    }

    /// Process a single radius.
    ///
    /// Stalled edges are revisited first, then the front is expanded and
    /// finally new seeds are searched among the remaining orphan vertices.
    pub fn run_pass(&mut self, radius: f64) -> Result<()> {
        check_radius(radius)?;
        let faces_before = self.graph.face_count();
        let seeds_before = self.counters.seeds;

        let (reactivated, escalated) = if self.border.is_empty() {
            (0, 0)
        } else {
            self.reopen_border(radius)
        };
        self.expand_front(radius);
        self.find_seeds(radius);
        self.counters.radii.push(radius);

        debug!(
            radius,
            reactivated,
            escalated,
            seeds = self.counters.seeds - seeds_before,
            triangles = self.graph.face_count() - faces_before,
            border = self.border.len(),
            "finished radius pass"
        );
        Ok(())
    }

    /// Make the winding consistent within each connected component.
    ///
    /// Returns the number of triangles flipped.
    pub fn consolidate_orientation(&mut self) -> usize {
        let flipped = orientation::consolidate(&mut self.graph);
        self.counters.flipped_triangles += flipped;
        flipped
    }

    /// Current triangles and normals, wound as configured
    pub fn surface(&self) -> ReconstructedSurface {
        let faces = self.graph.faces();
        let winding = self.config.winding;
        ReconstructedSurface {
            triangles: faces
                .iter()
                .map(|f| {
                    let [a, b, c] = f.vertices().map(|v| v.0);
                    match winding {
                        TriangleWinding::CounterClockwise => [a, b, c],
                        TriangleWinding::Clockwise => [a, c, b],
                    }
                })
                .collect(),
            normals: faces.iter().map(|f| f.normal()).collect(),
        }
    }

    /// Counters accumulated so far together with the current graph state
    pub fn stats(&self) -> ReconstructionStats {
        let orphan_vertices = (0..self.graph.vertex_count())
            .map(VertexId)
            .filter(|&v| {
                self.graph.vertex_class(v) == VertexClass::Orphan && !self.is_duplicate(v)
            })
            .count();
        ReconstructionStats {
            triangles: self.graph.face_count(),
            orphan_vertices,
            duplicate_vertices: self.duplicates.iter().filter(|&&d| d).count(),
            border_edges: self.graph.edges_with_class(EdgeClass::Border).count(),
            sealed_edges: self.sealed.len(),
            inner_edges: self.graph.edges_with_class(EdgeClass::Inner).count(),
            ..self.counters.clone()
        }
    }

    fn position(&self, v: VertexId) -> &Point3d {
        self.graph.position(v)
    }

    fn compatible(&self, a: VertexId, b: VertexId, c: VertexId) -> bool {
        self.agrees(a, b, c, self.config.normal_cos_threshold())
    }

    fn agrees(&self, a: VertexId, b: VertexId, c: VertexId, cos_threshold: f64) -> bool {
        normals_compatible(
            self.position(a),
            self.position(b),
            self.position(c),
            self.graph.normal(a),
            self.graph.normal(b),
            self.graph.normal(c),
            cos_threshold,
        )
    }

    fn ball_center_for(
        &self,
        a: VertexId,
        b: VertexId,
        c: VertexId,
        radius: f64,
        hint: Option<&ContinuityHint>,
    ) -> Option<Point3d> {
        ball_center(
            self.position(a),
            self.position(b),
            self.position(c),
            self.graph.normal(a),
            self.graph.normal(b),
            self.graph.normal(c),
            radius,
            hint,
        )
    }

    /// Whether no neighbor other than the three corners lies inside the ball
    fn ball_is_empty(
        &self,
        center: &Point3d,
        radius: f64,
        neighbors: &[(usize, f64)],
        corners: [VertexId; 3],
    ) -> bool {
        neighbors
            .iter()
            .map(|&(i, _)| VertexId(i))
            .filter(|v| !corners.contains(v))
            .all(|v| {
                !inside_ball(center, radius, self.position(v), self.config.empty_ball_tolerance)
            })
    }

    /// Whether `a` and `b` are unlinked or linked by a `Front` edge
    fn link_is_open(&self, a: VertexId, b: VertexId) -> bool {
        self.graph
            .edge_between(a, b)
            .map_or(true, |e| self.graph.edge(e).class() == EdgeClass::Front)
    }

    /// Queue the `Front` edges of a new face for pivoting
    fn queue_face_edges(&mut self, face: FaceId) {
        let [a, b, c] = self.graph.face(face).vertices();
        for (u, v) in [(a, b), (b, c), (c, a)] {
            if let Some(e) = self.graph.edge_between(u, v) {
                if self.graph.edge(e).class() == EdgeClass::Front {
                    self.front.push_front(e);
                }
            }
        }
    }
}

/// Flags every point closer than the duplicate distances, scaled by
/// `radius`, to an earlier point that was itself kept.
fn find_duplicates(
    index: &PointIndex,
    points: &[Point3d],
    normals: &[Vector3d],
    radius: f64,
    config: &BallPivotingConfig,
) -> Vec<bool> {
    let soft = config.duplicate_distance_soft * radius;
    let hard = config.duplicate_distance_hard * radius;
    let mut duplicates = vec![false; points.len()];
    if soft <= 0.0 {
        return duplicates;
    }
    for (i, p) in points.iter().enumerate() {
        let is_duplicate = index
            .find_radius_neighbors(p, soft)
            .into_iter()
            .filter(|&(j, d)| j < i && !duplicates[j] && d < soft)
            .any(|(j, d)| {
                d < hard || normals[i].dot(&normals[j]) > config.duplicate_normal_agreement
            });
        duplicates[i] = is_duplicate;
    }
    duplicates
}

/// Ball Pivoting Algorithm for surface reconstruction
///
/// This function reconstructs a triangle mesh from an oriented point cloud
/// using a single ball radius.
///
/// # Arguments
/// * `cloud` - Point cloud with normal information
/// * `ball_radius` - Radius of the ball used for reconstruction
///
/// # Returns
/// * `Result<TriangleMesh>` - Reconstructed triangle mesh over the input points
pub fn ball_pivoting_algorithm(
    cloud: &PointCloud<NormalPoint3f>,
    ball_radius: f32,
) -> Result<TriangleMesh> {
    if !(ball_radius.is_finite() && ball_radius > 0.0) {
        return Err(Error::InvalidData("Ball radius must be positive".to_string()));
    }
    let config = BallPivotingConfig::new(vec![ball_radius as f64]);
    ball_pivoting_algorithm_with_config(cloud, &config)
}

/// Ball Pivoting Algorithm with configuration
///
/// # Arguments
/// * `cloud` - Point cloud with normal information
/// * `config` - Configuration parameters, including the radius schedule
///
/// # Returns
/// * `Result<TriangleMesh>` - Reconstructed triangle mesh over the input points
pub fn ball_pivoting_algorithm_with_config(
    cloud: &PointCloud<NormalPoint3f>,
    config: &BallPivotingConfig,
) -> Result<TriangleMesh> {
    if cloud.is_empty() {
        return Err(Error::InvalidData("Point cloud is empty".to_string()));
    }

    let mut bpa = BallPivoting::from_cloud(cloud, config.clone())?;
    let reconstruction = bpa.reconstruct()?;

    let vertices: Vec<Point3f> = cloud.points.iter().map(|p| p.position).collect();
    reconstruction.surface.to_triangle_mesh(vertices)
}

/// Ball Pivoting Algorithm with a radius derived from the point spacing
pub fn ball_pivoting_auto(cloud: &PointCloud<NormalPoint3f>) -> Result<TriangleMesh> {
    ball_pivoting_algorithm_with_config(cloud, &BallPivotingConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pivotmesh_core::Vector3f;

    fn square_points() -> (Vec<Point3d>, Vec<Vector3d>) {
        let points = vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(1.0, 1.0, 0.0),
            Point3d::new(0.0, 1.0, 0.0),
        ];
        (points, vec![Vector3d::new(0.0, 0.0, 1.0); 4])
    }

    fn square_engine(config: BallPivotingConfig) -> BallPivoting {
        let (points, normals) = square_points();
        BallPivoting::new(&points, &normals, config).unwrap()
    }

    #[test]
    fn test_input_validation() {
        let (points, normals) = square_points();
        let config = BallPivotingConfig::new(vec![1.0]);

        assert!(matches!(
            BallPivoting::new(&points, &normals[..3], config.clone()),
            Err(Error::LengthMismatch { points: 4, normals: 3 })
        ));
        assert!(matches!(
            BallPivoting::new(&points[..2], &normals[..2], config.clone()),
            Err(Error::InsufficientPoints { found: 2, required: 3 })
        ));

        let mut zero = normals.clone();
        zero[2] = Vector3d::zeros();
        assert!(BallPivoting::new(&points, &zero, config.clone()).is_err());

        let mut nan = points.clone();
        nan[1].x = f64::NAN;
        assert!(BallPivoting::new(&nan, &normals, config).is_err());

        let negative = BallPivotingConfig::new(vec![-1.0]);
        assert!(BallPivoting::new(&points, &normals, negative).is_err());
    }

    #[test]
    fn test_normals_are_renormalized() {
        let (points, mut normals) = square_points();
        normals[0] = Vector3d::new(0.0, 0.0, 5.0);
        let bpa = BallPivoting::new(&points, &normals, BallPivotingConfig::new(vec![1.0])).unwrap();
        assert_eq!(*bpa.graph().normal(VertexId(0)), Vector3d::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_default_radius_from_spacing() {
        let bpa = square_engine(BallPivotingConfig::default());
        assert_eq!(bpa.average_spacing(), Some(1.0));
        assert_eq!(bpa.resolve_radii().unwrap(), vec![1.5]);

        // Coincident points have no usable spacing
        let coincident = vec![Point3d::origin(); 3];
        let normals = vec![Vector3d::new(0.0, 0.0, 1.0); 3];
        let bpa = BallPivoting::new(&coincident, &normals, BallPivotingConfig::default()).unwrap();
        assert!(bpa.resolve_radii().is_err());
        assert_eq!(bpa.stats().duplicate_vertices, 0);
    }

    #[test]
    fn test_square_reconstruction() {
        let mut bpa = square_engine(BallPivotingConfig::new(vec![1.5]));
        let result = bpa.reconstruct().unwrap();

        assert_eq!(result.surface.triangle_count(), 2);
        assert_eq!(result.stats.border_edges, 4);
        assert_eq!(result.stats.inner_edges, 1);
        assert_eq!(result.stats.orphan_vertices, 0);
        for n in &result.surface.normals {
            assert!(n.z > 0.99);
        }
        assert!(bpa.graph().validate().is_ok());
    }

    #[test]
    fn test_edge_orientation_tracks_face_winding() {
        let mut bpa = square_engine(BallPivotingConfig::new(vec![1.5]));
        bpa.reconstruct().unwrap();
        assert_eq!(bpa.stats().flipped_triangles, 0);

        let graph = bpa.graph();
        let orientations: Vec<EdgeOrientation> =
            graph.edges().iter().map(|e| e.orientation()).collect();
        assert!(orientations.contains(&EdgeOrientation::Forward));
        assert!(orientations.contains(&EdgeOrientation::Reversed));

        for edge in graph.edges_with_class(EdgeClass::Border) {
            let edge = graph.edge(edge);
            let [a, b] = edge.vertices();
            assert!(a < b);
            let face = edge.faces()[0].map(|f| graph.face(f).vertices()).unwrap();
            let (source, target) = (edge.source(), edge.target());
            assert!(
                (0..3).any(|k| face[k] == source && face[(k + 1) % 3] == target),
                "edge {:?} does not follow face {:?}",
                [source, target],
                face
            );
        }
    }

    #[test]
    fn test_run_pass_rejects_bad_radius() {
        let mut bpa = square_engine(BallPivotingConfig::new(vec![1.5]));
        assert!(bpa.run_pass(0.0).is_err());
        assert!(bpa.run_pass(f64::NAN).is_err());
        assert!(bpa.stats().radii.is_empty());
    }

    #[test]
    fn test_near_copies_are_dropped() {
        let (mut points, mut normals) = square_points();
        points.push(Point3d::new(1.0, 1.01, 0.0));
        normals.push(Vector3d::new(0.0, 0.0, 1.0));

        let mut bpa = BallPivoting::new(&points, &normals, BallPivotingConfig::new(vec![1.5]))
            .unwrap();
        assert!(bpa.is_duplicate(VertexId(4)));
        assert!(!(0..4).any(|i| bpa.is_duplicate(VertexId(i))));
        assert_eq!(bpa.average_spacing(), Some(1.0));

        let result = bpa.reconstruct().unwrap();
        assert_eq!(result.surface.triangle_count(), 2);
        assert_eq!(result.stats.duplicate_vertices, 1);
        assert_eq!(result.stats.orphan_vertices, 0);
    }

    #[test]
    fn test_duplicate_needs_agreeing_normals_unless_very_close() {
        let (mut points, mut normals) = square_points();
        let down = Vector3d::new(0.0, 0.0, -1.0);
        // Within the soft distance but facing the other way: kept
        points.push(Point3d::new(0.05, 0.0, 0.0));
        normals.push(down);
        // Within the hard distance: dropped whatever its normal
        points.push(Point3d::new(1.0, 0.001, 0.0));
        normals.push(down);

        let bpa = BallPivoting::new(&points, &normals, BallPivotingConfig::new(vec![1.5])).unwrap();
        assert!(!bpa.is_duplicate(VertexId(4)));
        assert!(bpa.is_duplicate(VertexId(5)));

        let keep_all = BallPivotingConfig::new(vec![1.5]).with_duplicate_culling(0.0, 0.0, 0.6);
        let bpa = BallPivoting::new(&points, &normals, keep_all).unwrap();
        assert_eq!(bpa.stats().duplicate_vertices, 0);
    }

    #[test]
    fn test_clockwise_output_reverses_triangles() {
        let mut ccw = square_engine(BallPivotingConfig::new(vec![1.5]));
        let mut cw = square_engine(
            BallPivotingConfig::new(vec![1.5]).with_winding(TriangleWinding::Clockwise),
        );
        let ccw = ccw.reconstruct().unwrap().surface;
        let cw = cw.reconstruct().unwrap().surface;

        assert_eq!(ccw.normals, cw.normals);
        for (a, b) in ccw.triangles.iter().zip(cw.triangles.iter()) {
            assert_eq!(*b, [a[0], a[2], a[1]]);
            // Counter-clockwise seen from the normal side
            let [p, q, r] = a.map(|i| square_points().0[i]);
            assert!((q - p).cross(&(r - p)).z > 0.0);
        }
    }

    #[test]
    fn test_convenience_functions() {
        let normal = Vector3f::new(0.0, 0.0, 1.0);
        let cloud: PointCloud<NormalPoint3f> = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
            .iter()
            .map(|&(x, y)| NormalPoint3f {
                position: Point3f::new(x, y, 0.0),
                normal,
            })
            .collect();

        let mesh = ball_pivoting_algorithm(&cloud, 1.5).unwrap();
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.vertex_count(), 4);
        for n in mesh.normals.as_ref().unwrap() {
            assert!((n.z - 1.0).abs() < 1e-6);
        }

        let mesh = ball_pivoting_auto(&cloud).unwrap();
        assert_eq!(mesh.face_count(), 2);

        assert!(ball_pivoting_algorithm(&cloud, -0.1).is_err());
        assert!(ball_pivoting_algorithm(&PointCloud::new(), 0.1).is_err());
    }

    #[test]
    fn test_double_precision_cloud() {
        let (points, normals) = square_points();
        let cloud: PointCloud<NormalPoint3d> = points
            .iter()
            .zip(normals.iter())
            .map(|(p, n)| NormalPoint3d::new(*p, *n))
            .collect();
        let mut bpa = BallPivoting::from_cloud_f64(&cloud, BallPivotingConfig::new(vec![1.5]))
            .unwrap();
        assert_eq!(bpa.reconstruct().unwrap().surface.triangle_count(), 2);
    }
}
