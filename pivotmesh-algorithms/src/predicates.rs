//! Orientation predicate
//!
//! Thin adapter over Shewchuk's adaptive-precision `orient3d` from the
//! `robust` crate, used as a sign oracle for coplanarity decisions.

use pivotmesh_core::Point3d;
use robust::{orient3d, Coord3D};

fn coord(p: &Point3d) -> Coord3D<f64> {
    Coord3D {
        x: p.x,
        y: p.y,
        z: p.z,
    }
}

/// Sign of the signed volume of the tetrahedron `abcd`, i.e. of
/// `((b - a) × (c - a)) · (d - a)`.
///
/// Returns `-1`, `0` or `1`. Zero means the four points are exactly coplanar.
pub fn orientation_sign(a: &Point3d, b: &Point3d, c: &Point3d, d: &Point3d) -> i8 {
    // orient3d is positive when d lies below the counterclockwise plane abc
    let det = orient3d(coord(a), coord(b), coord(c), coord(d));
    if det > 0.0 {
        -1
    } else if det < 0.0 {
        1
    } else {
        0
    }
}

/// Whether `abcd` is coplanar or nearly so.
///
/// Exact coplanarity is decided by [`orientation_sign`]; otherwise the signed
/// volume is compared against `tolerance` times the product of the three edge
/// lengths leaving `a`, which makes the test scale-invariant.
pub fn points_coplanar(a: &Point3d, b: &Point3d, c: &Point3d, d: &Point3d, tolerance: f64) -> bool {
    if orientation_sign(a, b, c, d) == 0 {
        return true;
    }
    let ab = b - a;
    let ac = c - a;
    let ad = d - a;
    let volume = ab.cross(&ac).dot(&ad).abs();
    let scale = ab.norm() * ac.norm() * ad.norm();
    volume <= tolerance * scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_orientation_sign_convention() {
        let a = Point3d::new(0.0, 0.0, 0.0);
        let b = Point3d::new(1.0, 0.0, 0.0);
        let c = Point3d::new(0.0, 1.0, 0.0);

        assert_eq!(orientation_sign(&a, &b, &c, &Point3d::new(0.0, 0.0, 1.0)), 1);
        assert_eq!(orientation_sign(&a, &b, &c, &Point3d::new(0.0, 0.0, -1.0)), -1);
        assert_eq!(orientation_sign(&a, &b, &c, &Point3d::new(0.3, 0.7, 0.0)), 0);
    }

    #[test]
    fn test_near_coplanar() {
        let a = Point3d::new(0.0, 0.0, 0.0);
        let b = Point3d::new(1.0, 0.0, 0.0);
        let c = Point3d::new(0.0, 1.0, 0.0);
        let d = Point3d::new(1.0, 1.0, 1e-14);

        assert_ne!(orientation_sign(&a, &b, &c, &d), 0);
        assert!(points_coplanar(&a, &b, &c, &d, 1e-10));
        assert!(!points_coplanar(&a, &b, &c, &Point3d::new(1.0, 1.0, 0.1), 1e-10));
    }

    proptest! {
        #[test]
        fn prop_swapping_two_points_flips_sign(
            coords in prop::array::uniform12(-10.0f64..10.0)
        ) {
            let a = Point3d::new(coords[0], coords[1], coords[2]);
            let b = Point3d::new(coords[3], coords[4], coords[5]);
            let c = Point3d::new(coords[6], coords[7], coords[8]);
            let d = Point3d::new(coords[9], coords[10], coords[11]);
            prop_assert_eq!(orientation_sign(&a, &b, &c, &d), -orientation_sign(&b, &a, &c, &d));
        }
    }
}
