//! Border reactivation and boundary loop classification
//!
//! Edges where pivoting stalled are kept in the border set. Before each
//! larger radius they are traced into loops and chains. Loops that lie on the
//! true boundary of the sampled surface are sealed for good; the remaining
//! edges are reopened when the larger ball either rests on their face without
//! touching other points, or a cheap pivot probe finds a landing point.

use super::front::SearchLimits;
use super::geometry::inside_ball;
use super::{BallPivoting, EdgeClass, EdgeId, VertexId};
use pivotmesh_core::NearestNeighborSearch;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// Verdict on a boundary loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LoopClass {
    /// Lies on the boundary of the sampled surface; never reopened
    TrueBoundary,
    /// Probing succeeded on every sampled edge
    Closeable,
    /// Neither of the above; each edge is still escalated on its own
    Unknown,
}

/// Connected run of border edges
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BorderLoop {
    pub edges: Vec<EdgeId>,
    /// Vertices in walking order; an open chain lists both ends, a closed
    /// loop lists its start once.
    pub vertices: Vec<VertexId>,
    pub closed: bool,
}

impl BorderLoop {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl BallPivoting {
    /// Border edges traced into chains and loops.
    ///
    /// Open chains are walked first, starting at vertices with a single
    /// border edge, then the remaining edges are walked as closed loops.
    pub fn border_loops(&self) -> Vec<BorderLoop> {
        let edges: Vec<EdgeId> = self
            .border
            .iter()
            .copied()
            .filter(|&e| self.graph.edge(e).class() == EdgeClass::Border)
            .collect();

        let mut incident: BTreeMap<VertexId, Vec<EdgeId>> = BTreeMap::new();
        for &e in &edges {
            for v in self.graph.edge(e).vertices() {
                incident.entry(v).or_default().push(e);
            }
        }

        let mut visited = BTreeSet::new();
        let mut loops = Vec::new();
        let chain_starts: Vec<(VertexId, EdgeId)> = incident
            .iter()
            .filter(|(_, es)| es.len() == 1)
            .map(|(&v, es)| (v, es[0]))
            .collect();
        for (v, e) in chain_starts {
            if !visited.contains(&e) {
                loops.push(self.walk_border(v, e, &incident, &mut visited));
            }
        }
        for &e in &edges {
            if !visited.contains(&e) {
                let start = self.graph.edge(e).vertices()[0];
                loops.push(self.walk_border(start, e, &incident, &mut visited));
            }
        }
        loops
    }

    fn walk_border(
        &self,
        start: VertexId,
        first: EdgeId,
        incident: &BTreeMap<VertexId, Vec<EdgeId>>,
        visited: &mut BTreeSet<EdgeId>,
    ) -> BorderLoop {
        let mut edges = Vec::new();
        let mut vertices = vec![start];
        let mut closed = false;
        let mut current = start;
        let mut next = Some(first);

        while let Some(e) = next {
            visited.insert(e);
            edges.push(e);
            current = self.graph.edge(e).other(current);
            if current == start {
                closed = true;
                break;
            }
            vertices.push(current);
            next = incident
                .get(&current)
                .and_then(|es| es.iter().copied().find(|x| !visited.contains(x)));
        }

        BorderLoop {
            edges,
            vertices,
            closed,
        }
    }

    /// Classify a loop for the pass at `radius`
    pub fn classify_loop(&self, border_loop: &BorderLoop, radius: f64) -> LoopClass {
        if self.is_one_sided(border_loop, radius) || self.exceeds_perimeter(border_loop) {
            LoopClass::TrueBoundary
        } else if self.sample_probe_succeeds(border_loop, radius) {
            LoopClass::Closeable
        } else {
            LoopClass::Unknown
        }
    }

    /// Whether the neighbors around the loop all sit on the inner side of
    /// its edges.
    ///
    /// Each neighbor within `2r` of an edge midpoint is counted by the sign
    /// of its offset along the edge's outward direction, which lies in the
    /// face plane and points away from the face. Neighbors inside the
    /// `boundary_band` wedge around the edge line are not counted, so
    /// samples scattered along a noisy boundary do not land on either side.
    /// A loop with no counted neighbors at all is one-sided too.
    fn is_one_sided(&self, border_loop: &BorderLoop, radius: f64) -> bool {
        let eps = 1e-9 * radius;
        let band = self.config.boundary_band;
        let (mut outside, mut inside) = (0usize, 0usize);

        for &e in &border_loop.edges {
            let edge = self.graph.edge(e);
            let (Some(face), Some(opposite)) = (edge.faces()[0], self.graph.opposite_vertex(e))
            else {
                continue;
            };
            let [a, b] = edge.vertices();
            let pa = self.position(a);
            let pb = self.position(b);
            let midpoint = nalgebra::center(pa, pb);

            let Some(mut outward) = (pb - pa)
                .cross(&self.graph.face(face).normal())
                .try_normalize(0.0)
            else {
                continue;
            };
            if outward.dot(&(self.position(opposite) - midpoint)) > 0.0 {
                outward = -outward;
            }

            for (i, _) in self.index.find_radius_neighbors(&midpoint, 2.0 * radius) {
                if i == a.0 || i == b.0 {
                    continue;
                }
                let relative = self.position(VertexId(i)) - midpoint;
                let offset = relative.dot(&outward);
                let tolerance = eps.max(band * relative.norm());
                if offset > tolerance {
                    outside += 1;
                } else if offset < -tolerance {
                    inside += 1;
                }
            }
        }

        let total = outside + inside;
        if total == 0 {
            return true;
        }
        let (major, minor) = if inside >= outside {
            (inside, outside)
        } else {
            (outside, inside)
        };
        let total = total as f64;
        major as f64 / total >= self.config.one_sided_majority
            && (minor as f64 / total) < self.config.one_sided_minority
    }

    fn exceeds_perimeter(&self, border_loop: &BorderLoop) -> bool {
        let Some(spacing) = self.average_spacing.filter(|s| *s > 0.0) else {
            return false;
        };
        let perimeter: f64 = border_loop
            .edges
            .iter()
            .map(|&e| {
                let [a, b] = self.graph.edge(e).vertices();
                (self.position(b) - self.position(a)).norm()
            })
            .sum();
        perimeter > self.config.boundary_perimeter_factor * spacing
    }

    /// Probe evenly spaced edges of the loop; all of them must succeed
    fn sample_probe_succeeds(&self, border_loop: &BorderLoop, radius: f64) -> bool {
        let len = border_loop.len();
        if len == 0 {
            return false;
        }
        let count = self.config.loop_sample_count.min(len);
        (0..count)
            .map(|i| border_loop.edges[i * len / count])
            .all(|e| self.probe_edge(e, radius))
    }

    /// Cheap pivot attempt around a border edge, without changing anything
    pub(super) fn probe_edge(&self, e: EdgeId, radius: f64) -> bool {
        self.find_next_vertex(e, radius, SearchLimits::probe(&self.config))
            .is_some_and(|pivot| self.pivot_admissible(e, &pivot))
    }

    /// Whether a ball of `radius` resting on the face of `e` is empty
    fn reactivation_ball_empty(&self, e: EdgeId, radius: f64) -> bool {
        let Some(face) = self.graph.edge(e).faces()[0] else {
            return false;
        };
        let corners = self.graph.face(face).vertices();
        let [a, b, c] = corners;
        let Some(center) = self.ball_center_for(a, b, c, radius, None) else {
            return false;
        };
        self.index
            .radius_indices(&center, radius)
            .into_iter()
            .map(VertexId)
            .filter(|v| !corners.contains(v))
            .all(|v| {
                !inside_ball(&center, radius, self.position(v), self.config.empty_ball_tolerance)
            })
    }

    /// Revisit the border set before the pass at `radius`.
    ///
    /// True boundary loops are sealed, then unsealed edges whose face ball
    /// is empty at the new radius are reopened, then every remaining edge of
    /// the other loops that passes the probe is reopened. Reopened edges are
    /// queued at the back of the front. Returns the reactivated and
    /// escalated counts.
    pub(super) fn reopen_border(&mut self, radius: f64) -> (usize, usize) {
        let loops = self.border_loops();
        let mut escalation = Vec::new();
        for border_loop in &loops {
            let class = self.classify_loop(border_loop, radius);
            if self.config.verbose {
                trace!(
                    edges = border_loop.len(),
                    closed = border_loop.closed,
                    ?class,
                    "border loop"
                );
            }
            match class {
                LoopClass::TrueBoundary => {
                    self.counters.true_boundary_loops += 1;
                    for e in &border_loop.edges {
                        self.border.remove(e);
                        self.sealed.insert(*e);
                    }
                }
                LoopClass::Closeable => {
                    self.counters.closeable_loops += 1;
                    escalation.extend_from_slice(&border_loop.edges);
                }
                LoopClass::Unknown => {
                    self.counters.unknown_loops += 1;
                    escalation.extend_from_slice(&border_loop.edges);
                }
            }
        }

        let mut reactivated = 0;
        let open: Vec<EdgeId> = self.border.iter().copied().collect();
        for e in open {
            if self.reactivation_ball_empty(e, radius) {
                self.promote(e);
                reactivated += 1;
            }
        }

        let mut escalated = 0;
        for e in escalation {
            if self.graph.edge(e).class() == EdgeClass::Border && self.probe_edge(e, radius) {
                self.promote(e);
                escalated += 1;
            }
        }

        self.counters.reactivated_edges += reactivated;
        self.counters.escalated_edges += escalated;
        debug!(
            radius,
            loops = loops.len(),
            sealed = self.sealed.len(),
            reactivated,
            escalated,
            "revisited border edges"
        );
        (reactivated, escalated)
    }

    fn promote(&mut self, e: EdgeId) {
        self.border.remove(&e);
        self.graph.set_edge_class(e, EdgeClass::Front);
        self.front.push_back(e);
    }
}
