//! Reconstruction output and run statistics

use pivotmesh_core::{Error, Point3f, Result, TriangleMesh, Vector3d, Vector3f};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Triangles emitted by ball pivoting, indexing into the input points
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconstructedSurface {
    pub triangles: Vec<[usize; 3]>,
    /// One unit normal per triangle, on the side the input normals point to
    pub normals: Vec<Vector3d>,
}

impl ReconstructedSurface {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// `3 * triangle_count` vertex indices, triangle after triangle
    pub fn flat_indices(&self) -> Vec<usize> {
        self.triangles.iter().flatten().copied().collect()
    }

    /// Smoothed per-vertex normals over `vertex_count` vertices.
    ///
    /// Each vertex gets the normalized sum of the unit normals of its
    /// triangles. Vertices outside every triangle get a zero normal.
    pub fn vertex_normals(&self, vertex_count: usize) -> Vec<Vector3d> {
        let mut sums = vec![Vector3d::zeros(); vertex_count];
        for (triangle, normal) in self.triangles.iter().zip(self.normals.iter()) {
            for &i in triangle {
                if let Some(sum) = sums.get_mut(i) {
                    *sum += normal;
                }
            }
        }
        sums.into_iter()
            .map(|sum| sum.try_normalize(0.0).unwrap_or_else(Vector3d::zeros))
            .collect()
    }

    /// Build a mesh over `vertices`, which must be the input positions.
    ///
    /// The mesh carries the triangle normals and the smoothed vertex normals.
    pub fn to_triangle_mesh(&self, vertices: Vec<Point3f>) -> Result<TriangleMesh> {
        if let Some(bad) = self.flat_indices().into_iter().find(|&i| i >= vertices.len()) {
            return Err(Error::InvalidData(format!(
                "triangle references vertex {} but only {} vertices were given",
                bad,
                vertices.len()
            )));
        }
        let face_normals: Vec<Vector3f> = self.normals.iter().map(|n| n.cast::<f32>()).collect();
        let vertex_normals: Vec<Vector3f> = self
            .vertex_normals(vertices.len())
            .iter()
            .map(|n| n.cast::<f32>())
            .collect();
        let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, self.triangles.clone());
        mesh.set_face_normals(face_normals);
        mesh.set_normals(vertex_normals);
        Ok(mesh)
    }
}

/// Counters describing a reconstruction run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionStats {
    /// Radii processed, in order
    pub radii: Vec<f64>,
    pub triangles: usize,
    /// Vertices never reached by any triangle, duplicates excluded
    pub orphan_vertices: usize,
    /// Input points dropped as duplicates of a nearby point
    pub duplicate_vertices: usize,
    /// Single-face edges left open, sealed ones included
    pub border_edges: usize,
    /// Border edges identified as lying on the true surface boundary
    pub sealed_edges: usize,
    pub inner_edges: usize,
    pub seeds: usize,
    pub true_boundary_loops: usize,
    pub closeable_loops: usize,
    pub unknown_loops: usize,
    /// Border edges reopened by the empty-ball test at a larger radius
    pub reactivated_edges: usize,
    /// Border edges reopened by the boundary probe
    pub escalated_edges: usize,
    /// Triangles whose winding was reversed during orientation consolidation
    pub flipped_triangles: usize,
}

impl fmt::Display for ReconstructionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Ball pivoting over {} radii: {:?}", self.radii.len(), self.radii)?;
        writeln!(f, "  triangles:        {} ({} seeds)", self.triangles, self.seeds)?;
        writeln!(
            f,
            "  orphan vertices:  {} ({} duplicates dropped)",
            self.orphan_vertices, self.duplicate_vertices
        )?;
        writeln!(
            f,
            "  edges:            {} inner, {} border ({} sealed)",
            self.inner_edges, self.border_edges, self.sealed_edges
        )?;
        writeln!(
            f,
            "  boundary loops:   {} true, {} closeable, {} unknown",
            self.true_boundary_loops, self.closeable_loops, self.unknown_loops
        )?;
        writeln!(
            f,
            "  reopened edges:   {} reactivated, {} escalated",
            self.reactivated_edges, self.escalated_edges
        )?;
        write!(f, "  flipped:          {}", self.flipped_triangles)
    }
}

/// Surface plus statistics of a full run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconstruction {
    pub surface: ReconstructedSurface,
    pub stats: ReconstructionStats,
}
