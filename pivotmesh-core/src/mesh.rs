//! Mesh data structures and functionality

use crate::point::*;
use serde::{Deserialize, Serialize};

/// A triangle mesh with vertices and faces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    /// Per-vertex normals
    pub normals: Option<Vec<Vector3f>>,
    /// Per-face normals
    pub face_normals: Option<Vec<Vector3f>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
            face_normals: None,
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
            face_normals: None,
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Set vertex normals
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }

    /// Set face normals
    pub fn set_face_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.faces.len() {
            self.face_normals = Some(normals);
        }
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corner_triangle() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn test_set_normals() {
        let mut mesh = corner_triangle();
        mesh.set_normals(vec![Vector3f::z(); 3]);
        mesh.set_face_normals(vec![Vector3f::z()]);
        assert_eq!(mesh.normals.as_ref().map(|n| n.len()), Some(3));
        assert_eq!(mesh.face_normals.as_ref().map(|n| n[0]), Some(Vector3f::z()));
    }

    #[test]
    fn test_normal_length_mismatch_is_ignored() {
        let mut mesh = corner_triangle();
        mesh.set_normals(vec![Vector3f::z()]);
        mesh.set_face_normals(vec![Vector3f::z(); 2]);
        assert!(mesh.normals.is_none());
        assert!(mesh.face_normals.is_none());
        assert!(!mesh.is_empty());
        assert!(TriangleMesh::new().is_empty());
    }
}
