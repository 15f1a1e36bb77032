//! Consistent triangle winding per connected component

use super::{FaceId, MeshGraph, VertexId};
use std::collections::{HashMap, VecDeque};

fn edge_key(a: VertexId, b: VertexId) -> (VertexId, VertexId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn face_edge_keys(corners: [VertexId; 3]) -> [(VertexId, VertexId); 3] {
    let [a, b, c] = corners;
    [edge_key(a, b), edge_key(b, c), edge_key(c, a)]
}

/// Breadth-first walk over each connected component, starting from its
/// lowest face, flipping every newly reached face whose normal points away
/// from the face it was reached from. Returns the number of flips.
pub(super) fn consolidate(graph: &mut MeshGraph) -> usize {
    let mut by_edge: HashMap<(VertexId, VertexId), Vec<FaceId>> = HashMap::new();
    for (i, face) in graph.faces().iter().enumerate() {
        for key in face_edge_keys(face.vertices()) {
            by_edge.entry(key).or_default().push(FaceId(i));
        }
    }

    // Built face by face from the per-edge lists, so neighbor order is fixed
    let adjacency: Vec<Vec<FaceId>> = graph
        .faces()
        .iter()
        .enumerate()
        .map(|(i, face)| {
            face_edge_keys(face.vertices())
                .iter()
                .filter_map(|key| by_edge.get(key))
                .flatten()
                .copied()
                .filter(|g| g.0 != i)
                .collect()
        })
        .collect();

    let mut visited = vec![false; adjacency.len()];
    let mut queue = VecDeque::new();
    let mut flipped = 0;

    for start in 0..adjacency.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        queue.push_back(FaceId(start));

        while let Some(f) = queue.pop_front() {
            let normal = graph.face(f).normal();
            for &g in &adjacency[f.0] {
                if visited[g.0] {
                    continue;
                }
                if normal.dot(&graph.face(g).normal()) < 0.0 {
                    graph.flip_face(g);
                    flipped += 1;
                }
                visited[g.0] = true;
                queue.push_back(g);
            }
        }
    }
    flipped
}
