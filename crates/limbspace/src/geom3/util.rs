//! Small utilities: distances, Euler/quaternion conversion, point dedup.

use nalgebra::{Vector2, Vector3};

use crate::error::WorkspaceError;

/// Squared Euclidean distance between two equal-length rows.
pub fn distance_squared(a: &[f64], b: &[f64]) -> Result<f64, WorkspaceError> {
    if a.len() != b.len() {
        return Err(WorkspaceError::DimensionMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }
    Ok(a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum())
}

/// Static x-y-z Euler angles `(roll, pitch, yaw)` of a quaternion `(x, y, z, w)`.
///
/// The input is not normalised. Callers pass unit quaternions; anything else
/// yields meaningless angles but never panics (the pitch argument is clamped
/// before `asin`).
pub fn euler_from_quaternion(x: f64, y: f64, z: f64, w: f64) -> (f64, f64, f64) {
    let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));
    let pitch = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0).asin();
    let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));
    (roll, pitch, yaw)
}

/// Inverse of [`euler_from_quaternion`]; returns `(x, y, z, w)`.
pub fn quaternion_from_euler(roll: f64, pitch: f64, yaw: f64) -> (f64, f64, f64, f64) {
    let (sr, cr) = (roll * 0.5).sin_cos();
    let (sp, cp) = (pitch * 0.5).sin_cos();
    let (sy, cy) = (yaw * 0.5).sin_cos();
    (
        sr * cp * cy - cr * sp * sy,
        cr * sp * cy + sr * cp * sy,
        cr * cp * sy - sr * sp * cy,
        cr * cp * cy + sr * sp * sy,
    )
}

pub(crate) fn dedup_points_in_place(points: &mut Vec<Vector3<f64>>, tol: f64) {
    if points.len() < 2 {
        return;
    }
    points.sort_by(|a, b| {
        a[0].partial_cmp(&b[0])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a[1].partial_cmp(&b[1]).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| a[2].partial_cmp(&b[2]).unwrap_or(std::cmp::Ordering::Equal))
    });
    points.dedup_by(|a, b| (*a - *b).norm() < tol);
}

pub(crate) fn centroid(points: &[Vector3<f64>]) -> Vector3<f64> {
    let sum = points.iter().fold(Vector3::zeros(), |acc, p| acc + p);
    sum / points.len().max(1) as f64
}

/// Andrew's monotone chain on tagged 2D points; returns tags in CCW order.
///
/// Collinear points on hull edges are dropped.
pub(crate) fn convex_hull_2d(points: &[(Vector2<f64>, usize)]) -> Vec<usize> {
    let mut pts: Vec<_> = points.to_vec();
    pts.sort_by(|a, b| {
        a.0.x
            .partial_cmp(&b.0.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.y.partial_cmp(&b.0.y).unwrap_or(std::cmp::Ordering::Equal))
    });
    if pts.len() < 3 {
        return pts.into_iter().map(|(_, tag)| tag).collect();
    }
    let mut lower: Vec<(Vector2<f64>, usize)> = Vec::with_capacity(pts.len());
    for p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2].0, lower[lower.len() - 1].0, p.0) <= 0.0
        {
            lower.pop();
        }
        lower.push(*p);
    }
    let mut upper: Vec<(Vector2<f64>, usize)> = Vec::with_capacity(pts.len());
    for p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2].0, upper[upper.len() - 1].0, p.0) <= 0.0
        {
            upper.pop();
        }
        upper.push(*p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower.into_iter().map(|(_, tag)| tag).collect()
}

#[inline]
fn cross(a: Vector2<f64>, b: Vector2<f64>, c: Vector2<f64>) -> f64 {
    let ab = b - a;
    let ac = c - a;
    ab.x * ac.y - ab.y * ac.x
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn distance_rejects_length_mismatch() {
        let err = distance_squared(&[0.0; 6], &[0.0; 7]).unwrap_err();
        assert!(matches!(
            err,
            WorkspaceError::DimensionMismatch {
                expected: 6,
                found: 7
            }
        ));
    }

    #[test]
    fn distance_of_known_rows() {
        let a = [1.0, 2.0, 3.0, 0.0, 0.0, 0.0];
        let b = [1.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        assert!((distance_squared(&a, &b).unwrap() - 14.0).abs() < 1e-12);
    }

    #[test]
    fn euler_of_axis_rotations() {
        let h = std::f64::consts::FRAC_PI_4;
        // 90° about z
        let (r, p, y) = euler_from_quaternion(0.0, 0.0, h.sin(), h.cos());
        assert!(r.abs() < 1e-12 && p.abs() < 1e-12);
        assert!((y - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        // identity
        let (r, p, y) = euler_from_quaternion(0.0, 0.0, 0.0, 1.0);
        assert_eq!((r, p, y), (0.0, 0.0, 0.0));
    }

    #[test]
    fn euler_matches_nalgebra_convention() {
        let q = nalgebra::UnitQuaternion::from_euler_angles(0.3, -0.4, 1.2);
        let c = q.quaternion().coords;
        let (r, p, y) = euler_from_quaternion(c.x, c.y, c.z, c.w);
        assert!((r - 0.3).abs() < 1e-12);
        assert!((p + 0.4).abs() < 1e-12);
        assert!((y - 1.2).abs() < 1e-12);
    }

    #[test]
    fn malformed_quaternion_does_not_panic() {
        let (r, p, y) = euler_from_quaternion(3.0, -2.0, 5.0, 0.0);
        assert!(p.is_finite());
        let _ = (r, y);
        let (_, p, _) = euler_from_quaternion(f64::NAN, 0.0, 0.0, 1.0);
        assert!(p.is_nan());
    }

    #[test]
    fn hull_2d_drops_interior_and_collinear() {
        let pts = vec![
            (Vector2::new(0.0, 0.0), 0),
            (Vector2::new(1.0, 0.0), 1),
            (Vector2::new(1.0, 1.0), 2),
            (Vector2::new(0.0, 1.0), 3),
            (Vector2::new(0.5, 0.5), 4),
            (Vector2::new(0.5, 0.0), 5),
        ];
        let ring = convex_hull_2d(&pts);
        assert_eq!(ring, vec![0, 1, 2, 3]);
    }

    proptest! {
        #[test]
        fn distance_is_symmetric_and_nonnegative(
            a in proptest::collection::vec(-10.0f64..10.0, 6),
            b in proptest::collection::vec(-10.0f64..10.0, 6),
        ) {
            let ab = distance_squared(&a, &b).unwrap();
            let ba = distance_squared(&b, &a).unwrap();
            prop_assert_eq!(ab, ba);
            prop_assert!(ab >= 0.0);
            prop_assert_eq!(ab == 0.0, a == b);
        }

        #[test]
        fn euler_quaternion_round_trip(
            roll in -3.0f64..3.0,
            pitch in -1.5f64..1.5,
            yaw in -3.0f64..3.0,
        ) {
            let (x, y, z, w) = quaternion_from_euler(roll, pitch, yaw);
            let (r2, p2, y2) = euler_from_quaternion(x, y, z, w);
            prop_assert!((roll - r2).abs() < 1e-9);
            prop_assert!((pitch - p2).abs() < 1e-9);
            prop_assert!((yaw - y2).abs() < 1e-9);
        }
    }
}
