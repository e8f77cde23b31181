use super::*;
use crate::error::WorkspaceError;
use nalgebra::{vector, Vector3, Vector4};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn unit_cube() -> Vec<Vector3<f64>> {
    let mut pts = Vec::new();
    for x in [0.0, 1.0] {
        for y in [0.0, 1.0] {
            for z in [0.0, 1.0] {
                pts.push(vector![x, y, z]);
            }
        }
    }
    pts
}

#[test]
fn tetrahedron_centroid_inside_far_point_outside() {
    let pts = vec![
        vector![0.0, 0.0, 0.0],
        vector![1.0, 0.0, 0.0],
        vector![0.0, 1.0, 0.0],
        vector![0.0, 0.0, 1.0],
    ];
    let hull = WorkspaceHull::build(&pts).unwrap();
    let c = pts.iter().fold(Vector3::zeros(), |acc, p| acc + p) / 4.0;
    assert!(hull.contains(c));
    assert!(hull.find_simplex(c).is_some());
    assert!(!hull.contains(vector![100.0, -50.0, 20.0]));
    assert!(hull.find_simplex(vector![100.0, -50.0, 20.0]).is_none());
    assert_eq!(hull.facets().len(), 4);
    assert!((hull.volume() - 1.0 / 6.0).abs() < 1e-12);
}

#[test]
fn cube_tiles_into_twelve_simplices() {
    let hull = WorkspaceHull::build(&unit_cube()).unwrap();
    assert_eq!(hull.facets().len(), 6);
    assert_eq!(hull.simplices().len(), 12);
    assert_eq!(hull.vertices().len(), 8);
    assert!((hull.volume() - 1.0).abs() < 1e-12);
    let (lo, hi) = hull.bounds();
    assert_eq!(lo, vector![0.0, 0.0, 0.0]);
    assert_eq!(hi, vector![1.0, 1.0, 1.0]);
    assert!((hull.centroid() - vector![0.5, 0.5, 0.5]).norm() < 1e-12);
}

#[test]
fn boundary_points_count_as_inside() {
    let hull = WorkspaceHull::build(&unit_cube()).unwrap();
    assert!(hull.contains(vector![0.5, 0.5, 1.0]));
    assert!(hull.contains(vector![1.0, 1.0, 1.0]));
    assert!(hull.find_simplex(vector![0.5, 0.5, 1.0]).is_some());
    assert!(!hull.contains(vector![0.5, 0.5, 1.0 + 1e-6]));
}

#[test]
fn interior_and_duplicate_points_are_not_vertices() {
    let mut pts = unit_cube();
    pts.push(vector![0.5, 0.5, 0.5]);
    pts.push(vector![0.2, 0.7, 0.4]);
    pts.push(vector![1.0, 1.0, 1.0]);
    // point on a face, inside an existing facet polygon
    pts.push(vector![0.5, 0.5, 0.0]);
    let hull = WorkspaceHull::build(&pts).unwrap();
    assert_eq!(hull.vertices().len(), 8);
    assert_eq!(hull.facets().len(), 6);
    assert!((hull.volume() - 1.0).abs() < 1e-12);
}

#[test]
fn contains_agrees_with_simplex_lookup() {
    let mut rng = StdRng::seed_from_u64(7);
    let pts: Vec<Vector3<f64>> = (0..20)
        .map(|_| {
            vector![
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(0.0..0.5)
            ]
        })
        .collect();
    let hull = WorkspaceHull::build(&pts).unwrap();
    for p in &pts {
        assert!(hull.contains(*p));
    }
    let mut inside = 0;
    for _ in 0..2000 {
        let q = vector![
            rng.gen_range(-1.2..1.2),
            rng.gen_range(-1.2..1.2),
            rng.gen_range(-0.2..0.7)
        ];
        let by_facets = hull.contains(q);
        // Skip points within rounding distance of the boundary.
        let margin = hull
            .facets()
            .iter()
            .map(|f| f.plane.signed_distance(q).abs())
            .fold(f64::INFINITY, f64::min);
        if margin < 1e-7 {
            continue;
        }
        assert_eq!(by_facets, hull.find_simplex(q).is_some(), "query {q:?}");
        inside += by_facets as usize;
    }
    assert!(inside > 0);
}

#[test]
fn degenerate_inputs_are_rejected() {
    let few = vec![vector![0.0, 0.0, 0.0], vector![1.0, 0.0, 0.0], vector![0.0, 1.0, 0.0]];
    assert!(matches!(
        WorkspaceHull::build(&few),
        Err(WorkspaceError::DegenerateGeometry { .. })
    ));

    let mut dup = few.clone();
    dup.push(vector![1.0, 0.0, 0.0]);
    assert!(matches!(
        WorkspaceHull::build(&dup),
        Err(WorkspaceError::DegenerateGeometry { .. })
    ));

    let coplanar = vec![
        vector![0.0, 0.0, 0.3],
        vector![1.0, 0.0, 0.3],
        vector![0.0, 1.0, 0.3],
        vector![1.0, 1.0, 0.3],
        vector![0.4, 0.2, 0.3],
    ];
    assert!(matches!(
        WorkspaceHull::build(&coplanar),
        Err(WorkspaceError::DegenerateGeometry { .. })
    ));

    let collinear: Vec<_> = (0..5).map(|i| vector![i as f64, 2.0 * i as f64, 0.0]).collect();
    assert!(matches!(
        WorkspaceHull::build(&collinear),
        Err(WorkspaceError::DegenerateGeometry { .. })
    ));

    let mut nan = unit_cube();
    nan[3].y = f64::NAN;
    assert!(matches!(
        WorkspaceHull::build(&nan),
        Err(WorkspaceError::DegenerateGeometry { .. })
    ));
}

#[test]
fn non_finite_queries_are_outside() {
    let hull = WorkspaceHull::build(&unit_cube()).unwrap();
    assert!(!hull.contains(vector![f64::NAN, 0.5, 0.5]));
    assert!(hull.find_simplex(vector![0.5, f64::INFINITY, 0.5]).is_none());
}

#[test]
fn pose_rows_and_kind_conversion() {
    let euler = Pose::from_row(&[0.1, 0.2, 0.3, 0.4, -0.5, 0.6]).unwrap();
    assert_eq!(euler.kind(), PoseKind::Euler);
    let quat = euler.to_kind(PoseKind::Quaternion);
    assert_eq!(quat.kind(), PoseKind::Quaternion);
    assert_eq!(quat.to_row().len(), 7);
    let back = quat.to_kind(PoseKind::Euler).to_row();
    for (a, b) in back.iter().zip(euler.to_row()) {
        assert!((a - b).abs() < 1e-12);
    }
    let (dp, da) = euler.deviation(&quat);
    assert!(dp < 1e-15 && da < 1e-6);

    assert!(matches!(
        Pose::from_row(&[0.0; 5]),
        Err(WorkspaceError::DimensionMismatch { found: 5, .. })
    ));
}

#[test]
fn quaternion_pose_from_isometry() {
    let pose = Pose::quaternion(vector![1.0, 2.0, 3.0], Vector4::new(0.0, 0.0, 0.0, 1.0));
    let iso = pose.to_isometry();
    let again = Pose::from_isometry(&iso);
    assert_eq!(again.to_row(), vec![1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 1.0]);
}

#[test]
fn bumped_face_vertex_stays_inside_its_hull() {
    for h in [1e-8, 3e-8, 5e-8, 8e-8, 9.9e-8] {
        for (x, y) in [(0.1, 0.9), (0.5, 0.5), (0.9, 0.2), (0.3, 0.3)] {
            let mut pts = unit_cube();
            pts.push(vector![x, y, 1.0 + h]);
            let hull = WorkspaceHull::build(&pts).unwrap();
            for &p in &pts {
                assert!(hull.contains(p), "h={h} ({x},{y}): {p:?} rejected");
                assert!(hull.find_simplex(p).is_some(), "h={h} ({x},{y}): no simplex for {p:?}");
            }
            assert!((hull.volume() - 1.0).abs() < 1e-6, "volume {}", hull.volume());
            let above = vector![0.5, 0.5, 1.0 + 1e-5];
            assert!(!hull.contains(above));
            assert!(hull.find_simplex(above).is_none());
        }
    }
}

#[test]
fn lookup_agrees_with_membership_near_a_bumped_face() {
    let mut pts = unit_cube();
    pts.push(vector![0.1, 0.9, 1.0 + 5e-8]);
    let hull = WorkspaceHull::build(&pts).unwrap();
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..2000 {
        let p = vector![rng.gen::<f64>(), rng.gen::<f64>(), 1.0 + rng.gen_range(-2e-7..2e-7)];
        assert_eq!(hull.contains(p), hull.find_simplex(p).is_some(), "{p:?}");
    }
}
