//! Front expansion: pivoting the ball around open edges

use super::geometry::{pivot_angle, segment_segment_distance_sq, ContinuityHint};
use super::{BallPivoting, BallPivotingConfig, EdgeClass, EdgeId, VertexClass, VertexId};
use pivotmesh_algorithms::points_coplanar;
use pivotmesh_core::{NearestNeighborSearch, Point3d};
use tracing::trace;

/// Restricts which neighbors are considered as pivot candidates.
///
/// The empty-ball test always uses the full `2r` neighborhood; only the
/// candidate list is narrowed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct SearchLimits {
    /// Candidate distance from the edge midpoint, relative to `2r`
    pub radius_factor: f64,
    /// Keep at most this many of the nearest candidates
    pub candidate_cap: Option<usize>,
}

impl SearchLimits {
    pub const FULL: Self = Self {
        radius_factor: 1.0,
        candidate_cap: None,
    };

    /// The cheaper search used when probing border edges
    pub fn probe(config: &BallPivotingConfig) -> Self {
        Self {
            radius_factor: config.probe_radius_factor,
            candidate_cap: Some(config.probe_candidate_cap),
        }
    }
}

/// Where the ball lands after pivoting around an edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Pivot {
    pub candidate: VertexId,
    pub center: Point3d,
    pub angle: f64,
}

impl BallPivoting {
    /// Pivot around front edges until the queue is empty.
    ///
    /// Returns the number of faces created.
    pub(super) fn expand_front(&mut self, radius: f64) -> usize {
        let mut created = 0;
        while let Some(e) = self.front.pop_front() {
            if self.graph.edge(e).class() != EdgeClass::Front {
                continue;
            }

            let pivot = self
                .find_next_vertex(e, radius, SearchLimits::FULL)
                .filter(|pivot| self.pivot_admissible(e, pivot));
            let Some(pivot) = pivot else {
                self.demote(e, radius);
                continue;
            };

            let source = self.graph.edge_source(e);
            let target = self.graph.edge_target(e);
            match self
                .graph
                .make_face(source, target, pivot.candidate, pivot.center, radius)
            {
                Ok(_) => {
                    created += 1;
                    if self.config.verbose {
                        trace!(
                            edge = e.0,
                            candidate = pivot.candidate.0,
                            angle = pivot.angle,
                            "pivoted"
                        );
                    }
                    for end in [source, target] {
                        if let Some(new_edge) = self.graph.edge_between(pivot.candidate, end) {
                            if self.graph.edge(new_edge).class() == EdgeClass::Front {
                                self.front.push_front(new_edge);
                            }
                        }
                    }
                }
                Err(err) => {
                    if self.config.verbose {
                        trace!(edge = e.0, error = %err, "pivot rejected");
                    }
                    self.demote(e, radius);
                }
            }
        }
        created
    }

    /// Move a stalled front edge to the border set
    fn demote(&mut self, e: EdgeId, radius: f64) {
        if self.config.verbose {
            trace!(edge = e.0, radius, "edge stalled");
        }
        self.graph.set_edge_class(e, EdgeClass::Border);
        self.border.insert(e);
    }

    /// Smallest-angle pivot around `e` that lands on an empty ball.
    ///
    /// Candidates come from the `2r` neighborhood of the edge midpoint,
    /// narrowed by `limits`. Candidates coplanar with the edge's face whose
    /// connection to the midpoint crosses that face are skipped, as are
    /// candidates with disagreeing normals or no resting ball. Candidates
    /// that only meet the fallback agreement are used when no other
    /// candidate lands.
    pub(super) fn find_next_vertex(
        &self,
        e: EdgeId,
        radius: f64,
        limits: SearchLimits,
    ) -> Option<Pivot> {
        let edge = self.graph.edge(e);
        let source = edge.source();
        let target = edge.target();
        let opposite = self.graph.opposite_vertex(e)?;
        let face = self.graph.face(edge.faces()[0]?);

        let ps = self.position(source);
        let pt = self.position(target);
        let po = self.position(opposite);
        let midpoint = nalgebra::center(ps, pt);
        let axis = pt - ps;
        let hint = ContinuityHint {
            midpoint,
            center: face.ball_center(),
        };

        let neighbors = self.index.find_radius_neighbors(&midpoint, 2.0 * radius);
        let reach = limits.radius_factor * 2.0 * radius;
        let crossing_limit = self.config.crossing_tolerance * radius * radius;

        let candidates = neighbors
            .iter()
            .filter(|&&(_, distance)| distance <= reach)
            .map(|&(i, _)| VertexId(i))
            .filter(|&v| v != source && v != target && v != opposite)
            .take(limits.candidate_cap.unwrap_or(usize::MAX));

        let fallback_cos = self.config.fallback_cos_threshold();
        let mut best: Option<Pivot> = None;
        let mut fallback: Option<Pivot> = None;
        for candidate in candidates {
            let pc = self.position(candidate);
            if points_coplanar(ps, pt, pc, po, self.config.coplanar_tolerance)
                && (segment_segment_distance_sq(&midpoint, pc, ps, po) < crossing_limit
                    || segment_segment_distance_sq(&midpoint, pc, pt, po) < crossing_limit)
            {
                continue;
            }
            let strict = self.compatible(source, target, candidate);
            let loose = fallback_cos.is_some_and(|cos| self.agrees(source, target, candidate, cos));
            if !strict && !loose {
                continue;
            }
            let Some(center) = self.ball_center_for(source, target, candidate, radius, Some(&hint))
            else {
                continue;
            };

            let angle = pivot_angle(&midpoint, &face.ball_center(), &center, &axis);
            let slot = if strict { &mut best } else { &mut fallback };
            if slot.is_some_and(|b| angle >= b.angle) {
                continue;
            }
            if self.ball_is_empty(&center, radius, &neighbors, [source, target, candidate]) {
                *slot = Some(Pivot {
                    candidate,
                    center,
                    angle,
                });
            }
        }
        best.or(fallback)
    }

    /// Whether a pivot can become a face without breaking the mesh: the
    /// candidate is not surrounded yet and both new sides are free or `Front`.
    pub(super) fn pivot_admissible(&self, e: EdgeId, pivot: &Pivot) -> bool {
        if self.graph.vertex_class(pivot.candidate) == VertexClass::Inner {
            return false;
        }
        let edge = self.graph.edge(e);
        self.link_is_open(pivot.candidate, edge.source())
            && self.link_is_open(pivot.candidate, edge.target())
    }
}
