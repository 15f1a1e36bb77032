//! Geometric kernel for ball pivoting
//!
//! Pure functions over positions and normals: the circumscribed ball of a
//! triangle, face normals, the normal agreement test, segment distances and
//! the pivot angle between two ball positions.

use pivotmesh_core::{Point3d, Vector3d};
use std::f64::consts::PI;

/// Relative threshold on `16 * area²` below which a triangle is degenerate.
const DEGENERATE_AREA_RATIO: f64 = 1e-12;

/// Squared length under which a segment is treated as a point.
const DEGENERATE_SEGMENT_SQ: f64 = 1e-24;

/// Preferred ball position carried over from the previous pivot.
///
/// `midpoint` is the midpoint of the hinge edge and `center` the center of
/// the ball that created the face on the other side of that edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContinuityHint {
    pub midpoint: Point3d,
    pub center: Point3d,
}

/// Center of a ball of radius `radius` resting on `p0`, `p1`, `p2`.
///
/// Two such centers exist, mirrored through the triangle plane. With a
/// continuity hint the one whose direction from the hint midpoint is closer
/// to the hint's ball direction wins; otherwise the one on the side of the
/// summed vertex normals. Returns `None` for degenerate triangles and when
/// the radius is smaller than the triangle's circumradius.
#[allow(clippy::too_many_arguments)]
pub fn ball_center(
    p0: &Point3d,
    p1: &Point3d,
    p2: &Point3d,
    n0: &Vector3d,
    n1: &Vector3d,
    n2: &Vector3d,
    radius: f64,
    hint: Option<&ContinuityHint>,
) -> Option<Point3d> {
    // Squared side lengths, each opposite the vertex of the same letter
    let a = (p2 - p1).norm_squared();
    let b = (p0 - p2).norm_squared();
    let c = (p1 - p0).norm_squared();

    // Barycentric weights of the circumcenter; their sum is 16 * area²
    let alpha = a * (b + c - a);
    let beta = b * (a + c - b);
    let gamma = c * (a + b - c);
    let abg = alpha + beta + gamma;
    let perimeter_sq = (a + b + c) * (a + b + c);
    if abg.is_nan() || abg <= DEGENERATE_AREA_RATIO * perimeter_sq {
        return None;
    }

    let circumcenter = Point3d::from(
        (p0.coords * alpha + p1.coords * beta + p2.coords * gamma) / abg,
    );
    let circumradius_sq = a * b * c / abg;
    let height_sq = radius * radius - circumradius_sq;
    if height_sq < 0.0 {
        return None;
    }

    let mut axis = face_normal(p0, p1, p2);
    if axis == Vector3d::zeros() {
        return None;
    }
    if axis.dot(&(n0 + n1 + n2)) < 0.0 {
        axis = -axis;
    }
    let height = height_sq.sqrt();
    let along_normals = circumcenter + axis * height;
    let against_normals = circumcenter - axis * height;

    if let Some(hint) = hint {
        if let Some(preferred) = (hint.center - hint.midpoint).try_normalize(0.0) {
            let score = |center: &Point3d| {
                (center - hint.midpoint)
                    .try_normalize(0.0)
                    .map_or(-2.0, |dir| dir.dot(&preferred))
            };
            let (s_along, s_against) = (score(&along_normals), score(&against_normals));
            if s_against > s_along {
                return Some(against_normals);
            }
        }
    }
    Some(along_normals)
}

/// Unit normal of the triangle following its winding, or the zero vector
/// when the triangle is degenerate.
pub fn face_normal(p0: &Point3d, p1: &Point3d, p2: &Point3d) -> Vector3d {
    let normal = (p1 - p0).cross(&(p2 - p0));
    let length = normal.norm();
    if length > 0.0 && length.is_finite() {
        normal / length
    } else {
        Vector3d::zeros()
    }
}

/// Whether the triangle plane agrees with the vertex normals.
///
/// The geometric normal (either sign) must be within the angle whose cosine
/// is `cos_threshold` of the normalized sum of the three vertex normals.
#[allow(clippy::too_many_arguments)]
pub fn normals_compatible(
    p0: &Point3d,
    p1: &Point3d,
    p2: &Point3d,
    n0: &Vector3d,
    n1: &Vector3d,
    n2: &Vector3d,
    cos_threshold: f64,
) -> bool {
    let normal = face_normal(p0, p1, p2);
    if normal == Vector3d::zeros() {
        return false;
    }
    match (n0 + n1 + n2).try_normalize(1e-12) {
        Some(average) => normal.dot(&average).abs() >= cos_threshold,
        None => false,
    }
}

/// Minimum squared distance between segments `p0p1` and `q0q1`.
pub fn segment_segment_distance_sq(p0: &Point3d, p1: &Point3d, q0: &Point3d, q1: &Point3d) -> f64 {
    let d1 = p1 - p0;
    let d2 = q1 - q0;
    let r = p0 - q0;
    let a = d1.norm_squared();
    let e = d2.norm_squared();
    let f = d2.dot(&r);

    let (s, t) = if a <= DEGENERATE_SEGMENT_SQ && e <= DEGENERATE_SEGMENT_SQ {
        (0.0, 0.0)
    } else if a <= DEGENERATE_SEGMENT_SQ {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e <= DEGENERATE_SEGMENT_SQ {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            // Parallel segments: any s works, start from p0
            let mut s = if denom > 0.0 {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    let closest_p = p0 + d1 * s;
    let closest_q = q0 + d2 * t;
    (closest_p - closest_q).norm_squared()
}

/// Rotation angle in `[0, 2π)` from the ball at `from` to the ball at `to`,
/// both seen from the hinge midpoint, measured around `axis`.
///
/// Rotations running against `axis` wrap around to `2π - θ`.
pub fn pivot_angle(midpoint: &Point3d, from: &Point3d, to: &Point3d, axis: &Vector3d) -> f64 {
    let (Some(a), Some(b)) = (
        (from - midpoint).try_normalize(0.0),
        (to - midpoint).try_normalize(0.0),
    ) else {
        return 0.0;
    };
    let angle = a.dot(&b).clamp(-1.0, 1.0).acos();
    if a.cross(&b).dot(axis) < 0.0 {
        2.0 * PI - angle
    } else {
        angle
    }
}

/// Whether `point` lies strictly inside the ball, shrunk by the relative
/// `tolerance` so that cospherical samples count as outside.
pub fn inside_ball(center: &Point3d, radius: f64, point: &Point3d, tolerance: f64) -> bool {
    let shrunk = radius * (1.0 - tolerance);
    (point - center).norm_squared() < shrunk * shrunk
}
