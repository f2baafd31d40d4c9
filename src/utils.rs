use cgmath::{InnerSpace, Matrix3, SquareMatrix, Vector3};

use crate::types::Rotation;

/// Skew-symmetric cross-product matrix `[n]x`, so that `[n]x * v == n.cross(v)`.
pub(crate) fn skew(n: Vector3<f64>) -> Matrix3<f64> {
    // cgmath takes columns
    Matrix3::new(
        0.0, n.z, -n.y, //
        -n.z, 0.0, n.x, //
        n.y, -n.x, 0.0,
    )
}

/// Convert an exponential-map rotation vector to a rotation matrix (Rodrigues).
///
/// `R = I + sin(theta) [n]x + (1 - cos(theta)) [n]x^2` with `theta = |r|`, `n = r / theta`.
/// A zero-length vector yields the identity.
pub fn expmap_to_rotmat(r: Vector3<f64>) -> Rotation {
    let theta = r.magnitude();
    if theta < f64::EPSILON {
        return Rotation::identity();
    }
    let k = skew(r / theta);
    Rotation::identity() + k * theta.sin() + (k * k) * (1.0 - theta.cos())
}

/// Read an exponential-map triple out of a flat parameter vector.
pub(crate) fn expmap_at(frame: &[f64], indices: [usize; 3]) -> Vector3<f64> {
    Vector3::new(frame[indices[0]], frame[indices[1]], frame[indices[2]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Matrix;
    use proptest::prelude::*;
    use std::f64::consts::FRAC_PI_2;

    fn assert_close(a: Rotation, b: Rotation, tol: f64) {
        for c in 0..3 {
            for r in 0..3 {
                assert!(
                    (a[c][r] - b[c][r]).abs() < tol,
                    "mismatch at col {c} row {r}: {a:?} vs {b:?}"
                );
            }
        }
    }

    #[test]
    fn test_zero_vector_is_identity() {
        let r = expmap_to_rotmat(Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(r, Rotation::identity());
    }

    #[test]
    fn test_tiny_vector_is_finite() {
        let r = expmap_to_rotmat(Vector3::new(1e-20, 0.0, 0.0));
        assert_close(r, Rotation::identity(), 1e-12);
    }

    #[test]
    fn test_skew_matches_cross_product() {
        let n = Vector3::new(0.3, -1.2, 2.0);
        let v = Vector3::new(-0.5, 0.25, 4.0);
        let lhs = skew(n) * v;
        let rhs = n.cross(v);
        assert!((lhs - rhs).magnitude() < 1e-12);
    }

    #[test]
    fn test_quarter_turn_about_y() {
        let r = expmap_to_rotmat(Vector3::new(0.0, FRAC_PI_2, 0.0));
        // columns of the rotation about +y by 90 degrees
        let expected = Matrix3::new(
            0.0, 0.0, -1.0, //
            0.0, 1.0, 0.0, //
            1.0, 0.0, 0.0,
        );
        assert_close(r, expected, 1e-12);
        let v = r * Vector3::new(1.0, 0.0, 0.0);
        assert!((v - Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-12);
    }

    #[test]
    fn test_full_turn_is_identity() {
        let r = expmap_to_rotmat(Vector3::new(0.0, 0.0, 2.0 * std::f64::consts::PI));
        assert_close(r, Rotation::identity(), 1e-12);
    }

    proptest! {
        #[test]
        fn rotation_is_orthonormal(x in -10.0f64..10.0, y in -10.0f64..10.0, z in -10.0f64..10.0) {
            let r = expmap_to_rotmat(Vector3::new(x, y, z));
            let rtr = r.transpose() * r;
            for c in 0..3 {
                for row in 0..3 {
                    let expected = if c == row { 1.0 } else { 0.0 };
                    prop_assert!((rtr[c][row] - expected).abs() < 1e-9);
                }
            }
            prop_assert!((r.determinant() - 1.0).abs() < 1e-9);
        }

        #[test]
        fn rotation_fixes_its_axis(x in -3.0f64..3.0, y in -3.0f64..3.0, z in -3.0f64..3.0) {
            let axis = Vector3::new(x, y, z);
            let r = expmap_to_rotmat(axis);
            prop_assert!((r * axis - axis).magnitude() < 1e-9);
        }
    }
}
