//! Mesh graph built up during ball pivoting
//!
//! Vertices, edges and faces live in flat tables and refer to each other by
//! index. Vertex classification is derived from the incident edges on demand;
//! edge classification is stored and kept in step with the face count.

use super::geometry::face_normal;
use pivotmesh_core::{Error, Point3d, Result, Vector3d};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VertexId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EdgeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FaceId(pub usize);

/// Role of a vertex in the growing mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VertexClass {
    /// Not touched by any edge yet
    Orphan,
    /// Has at least one edge that can still grow
    Front,
    /// Completely surrounded by faces
    Inner,
}

/// Role of an edge in the growing mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EdgeClass {
    /// One face, pivoting failed
    Border,
    /// One face, waiting to be pivoted
    Front,
    /// Two faces
    Inner,
}

/// Which way the ball rolls over an edge, fixed when its first face is attached.
///
/// Edge endpoints are stored lowest id first; the orientation says whether
/// the rolling direction agrees with that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EdgeOrientation {
    /// Source is `vertices[0]`
    Forward,
    /// Source is `vertices[1]`
    Reversed,
}

#[derive(Debug, Clone, Serialize)]
pub struct Vertex {
    pub position: Point3d,
    pub normal: Vector3d,
    edges: Vec<EdgeId>,
}

impl Vertex {
    /// Incident edges in creation order
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Edge {
    vertices: [VertexId; 2],
    faces: [Option<FaceId>; 2],
    class: EdgeClass,
    orientation: EdgeOrientation,
}

impl Edge {
    pub fn vertices(&self) -> [VertexId; 2] {
        self.vertices
    }

    pub fn faces(&self) -> [Option<FaceId>; 2] {
        self.faces
    }

    pub fn class(&self) -> EdgeClass {
        self.class
    }

    pub fn orientation(&self) -> EdgeOrientation {
        self.orientation
    }

    /// Number of adjacent faces
    pub fn face_count(&self) -> usize {
        self.faces.iter().filter(|f| f.is_some()).count()
    }

    pub fn contains(&self, v: VertexId) -> bool {
        self.vertices[0] == v || self.vertices[1] == v
    }

    /// The endpoint that is not `v`
    pub fn other(&self, v: VertexId) -> VertexId {
        if self.vertices[0] == v {
            self.vertices[1]
        } else {
            self.vertices[0]
        }
    }

    /// Start of the edge in pivoting direction
    pub fn source(&self) -> VertexId {
        match self.orientation {
            EdgeOrientation::Forward => self.vertices[0],
            EdgeOrientation::Reversed => self.vertices[1],
        }
    }

    /// End of the edge in pivoting direction
    pub fn target(&self) -> VertexId {
        match self.orientation {
            EdgeOrientation::Forward => self.vertices[1],
            EdgeOrientation::Reversed => self.vertices[0],
        }
    }
}

/// A triangle together with the ball that found it
#[derive(Debug, Clone, Serialize)]
pub struct Face {
    vertices: [VertexId; 3],
    ball_center: Point3d,
    radius: f64,
    normal: Vector3d,
}

impl Face {
    pub fn vertices(&self) -> [VertexId; 3] {
        self.vertices
    }

    pub fn ball_center(&self) -> Point3d {
        self.ball_center
    }

    /// Ball radius active when the face was created
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Unit normal following the stored winding
    pub fn normal(&self) -> Vector3d {
        self.normal
    }

    /// Whether `v` is one of the corners
    pub fn contains(&self, v: VertexId) -> bool {
        self.vertices.contains(&v)
    }
}

/// Vertex, edge and face tables with their incidence relations
#[derive(Debug, Clone, Serialize)]
pub struct MeshGraph {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    faces: Vec<Face>,
}

impl MeshGraph {
    /// One orphan vertex per position/normal pair
    pub fn new(positions: &[Point3d], normals: &[Vector3d]) -> Self {
        let vertices = positions
            .iter()
            .zip(normals.iter())
            .map(|(&position, &normal)| Vertex {
                position,
                normal,
                edges: Vec::new(),
            })
            .collect();

        Self {
            vertices,
            edges: Vec::new(),
            faces: Vec::new(),
        }
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn vertex(&self, v: VertexId) -> &Vertex {
        &self.vertices[v.0]
    }

    pub fn edge(&self, e: EdgeId) -> &Edge {
        &self.edges[e.0]
    }

    pub fn face(&self, f: FaceId) -> &Face {
        &self.faces[f.0]
    }

    pub fn position(&self, v: VertexId) -> &Point3d {
        &self.vertices[v.0].position
    }

    pub fn normal(&self, v: VertexId) -> &Vector3d {
        &self.vertices[v.0].normal
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Adjacent face count of an edge
    pub fn edge_face_count(&self, e: EdgeId) -> usize {
        self.edges[e.0].face_count()
    }

    pub fn vertex_class(&self, v: VertexId) -> VertexClass {
        let edges = &self.vertices[v.0].edges;
        if edges.is_empty() {
            VertexClass::Orphan
        } else if edges.iter().any(|e| self.edges[e.0].class != EdgeClass::Inner) {
            VertexClass::Front
        } else {
            VertexClass::Inner
        }
    }

    /// Ids of all edges currently in `class`, ascending
    pub fn edges_with_class(&self, class: EdgeClass) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(move |(_, edge)| edge.class == class)
            .map(|(i, _)| EdgeId(i))
    }

    /// The edge joining `a` and `b`, if one exists
    pub fn edge_between(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        let (from, to) = if self.vertices[a.0].edges.len() <= self.vertices[b.0].edges.len() {
            (a, b)
        } else {
            (b, a)
        };
        self.vertices[from.0]
            .edges
            .iter()
            .copied()
            .find(|e| self.edges[e.0].contains(to))
    }

    /// Third corner of the single face on `e`; `None` unless exactly one face is attached
    pub fn opposite_vertex(&self, e: EdgeId) -> Option<VertexId> {
        let edge = &self.edges[e.0];
        match edge.faces {
            [Some(face), None] => self.faces[face.0]
                .vertices
                .iter()
                .copied()
                .find(|&v| !edge.contains(v)),
            _ => None,
        }
    }

    pub fn edge_source(&self, e: EdgeId) -> VertexId {
        self.edges[e.0].source()
    }

    pub fn edge_target(&self, e: EdgeId) -> VertexId {
        self.edges[e.0].target()
    }

    /// Reclassify an edge between `Border` and `Front`.
    ///
    /// Only single-face edges may be reclassified; inner edges are final.
    pub fn set_edge_class(&mut self, e: EdgeId, class: EdgeClass) {
        let edge = &mut self.edges[e.0];
        debug_assert_eq!(edge.face_count(), 1, "only single-face edges change class");
        debug_assert_ne!(class, EdgeClass::Inner);
        edge.class = class;
    }

    /// Create a triangle and wire up its edges.
    ///
    /// The stored winding follows the vertex normals: when the raw normal of
    /// `v0 v1 v2` points away from their summed normals, `v1` and `v2` swap.
    /// Fails without touching the graph if the corners repeat or if any of
    /// the three edges already has two faces.
    pub fn make_face(
        &mut self,
        v0: VertexId,
        v1: VertexId,
        v2: VertexId,
        ball_center: Point3d,
        radius: f64,
    ) -> Result<FaceId> {
        if v0 == v1 || v1 == v2 || v0 == v2 {
            return Err(Error::Topology(format!(
                "face with repeated vertex ({}, {}, {})",
                v0.0, v1.0, v2.0
            )));
        }
        for (a, b) in [(v0, v1), (v1, v2), (v2, v0)] {
            if let Some(e) = self.edge_between(a, b) {
                if self.edges[e.0].face_count() >= 2 {
                    return Err(Error::Topology(format!(
                        "edge ({}, {}) already has two faces",
                        a.0, b.0
                    )));
                }
            }
        }

        let raw = face_normal(self.position(v0), self.position(v1), self.position(v2));
        let summed = self.normal(v0) + self.normal(v1) + self.normal(v2);
        let (vertices, normal) = if raw.dot(&summed) < 0.0 {
            ([v0, v2, v1], -raw)
        } else {
            ([v0, v1, v2], raw)
        };

        let face = FaceId(self.faces.len());
        self.faces.push(Face {
            vertices,
            ball_center,
            radius,
            normal,
        });

        let [a, b, c] = vertices;
        self.get_or_create_edge(a, b, c, face)?;
        self.get_or_create_edge(b, c, a, face)?;
        self.get_or_create_edge(c, a, b, face)?;
        Ok(face)
    }

    /// Attach `face` to the edge `v0 v1`, creating the edge on first use.
    ///
    /// A new edge is `Front` and stores its endpoints in ascending order.
    /// Its orientation records which endpoint leads when `face` is walked
    /// with its normal up, judged against `opposite`, the third corner. A
    /// second face makes the edge `Inner`.
    pub fn get_or_create_edge(
        &mut self,
        v0: VertexId,
        v1: VertexId,
        opposite: VertexId,
        face: FaceId,
    ) -> Result<EdgeId> {
        if let Some(e) = self.edge_between(v0, v1) {
            let edge = &mut self.edges[e.0];
            match edge.faces {
                [Some(first), None] if first != face => {
                    edge.faces[1] = Some(face);
                    edge.class = EdgeClass::Inner;
                    Ok(e)
                }
                [Some(first), _] if first == face => Ok(e),
                _ => Err(Error::Topology(format!(
                    "third face on edge ({}, {})",
                    v0.0, v1.0
                ))),
            }
        } else {
            let p0 = self.position(v0);
            let p1 = self.position(v1);
            let popp = self.position(opposite);
            let winding = (p1 - p0).cross(&(popp - p0));
            let summed = self.normal(v0) + self.normal(v1) + self.normal(opposite);
            let source = if winding.dot(&summed) < 0.0 { v1 } else { v0 };

            let vertices = if v0 < v1 { [v0, v1] } else { [v1, v0] };
            let orientation = if source == vertices[0] {
                EdgeOrientation::Forward
            } else {
                EdgeOrientation::Reversed
            };

            let e = EdgeId(self.edges.len());
            self.edges.push(Edge {
                vertices,
                faces: [Some(face), None],
                class: EdgeClass::Front,
                orientation,
            });
            self.vertices[v0.0].edges.push(e);
            self.vertices[v1.0].edges.push(e);
            Ok(e)
        }
    }

    pub fn flip_face(&mut self, f: FaceId) {
        let face = &mut self.faces[f.0];
        face.vertices.swap(1, 2);
        face.normal = -face.normal;
    }

    /// Check the incidence invariants of the whole graph
    pub fn validate(&self) -> Result<()> {
        for (i, edge) in self.edges.iter().enumerate() {
            let count = edge.face_count();
            let consistent = match edge.class {
                EdgeClass::Border | EdgeClass::Front => count == 1,
                EdgeClass::Inner => count == 2,
            };
            if !consistent {
                return Err(Error::Topology(format!(
                    "edge {} is {:?} with {} faces",
                    i, edge.class, count
                )));
            }
            for face in edge.faces.iter().flatten() {
                let corners = &self.faces[face.0];
                if !edge.vertices.iter().all(|&v| corners.contains(v)) {
                    return Err(Error::Topology(format!(
                        "edge {} lists face {} that does not contain it",
                        i, face.0
                    )));
                }
            }
        }
        for (i, face) in self.faces.iter().enumerate() {
            let [a, b, c] = face.vertices;
            if a == b || b == c || a == c {
                return Err(Error::Topology(format!("face {} is degenerate", i)));
            }
        }
        Ok(())
    }
}
