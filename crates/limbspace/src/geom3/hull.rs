//! Convex workspace hull over recorded endpoint positions.
//!
//! Construction
//! - Merge duplicate points, then pick four affinely independent points as a
//!   seed tetrahedron (otherwise the hull has no interior and we refuse to
//!   build it).
//! - Grow a closed, outward-wound triangle surface: each remaining point that
//!   sees some triangle replaces the visible patch by a cone from its horizon.
//! - Fanning the surface triangles from the vertex centroid tiles the hull with
//!   tetrahedra. Coplanar triangles are grouped into polygon facets (CCW rings
//!   via monotone chain) that back `contains`.
//!
//! Complexity: O(P^2) build for P distinct points.
//!
//! Tolerance
//! - A point sees a triangle when it lies more than `1e-9` above it; points
//!   within that band are absorbed by the current surface.
//! - Triangles whose planes agree within `1e-7` form one facet. Each facet
//!   offset is lifted to the largest `n·p` over the input, so every input point
//!   satisfies every facet exactly.
//! - `contains` accepts signed facet distance `<= 1e-9`. `find_simplex` answers
//!   only for points `contains` accepts; inside the thin band between the lifted
//!   facets and the triangle surface it returns the least-violated tetrahedron.

use std::collections::HashSet;

use nalgebra::{Matrix3, Vector2, Vector3};

use super::cfg::{BARY_EPS, DEDUP_EPS, FEAS_EPS, TIGHT_EPS};
use super::types::Hs3;
use super::util::{centroid, convex_hull_2d, dedup_points_in_place};
use crate::error::WorkspaceError;

/// Outward facet: supporting plane plus its vertex ring (CCW seen from outside).
#[derive(Clone, Debug)]
pub struct Facet {
    pub plane: Hs3,
    pub ring: Vec<usize>,
}

/// Tetrahedron `corners[0..4]` with a cached inverse of its edge matrix.
#[derive(Clone, Debug)]
pub struct Simplex {
    pub corners: [Vector3<f64>; 4],
    inv_edges: Matrix3<f64>,
}

impl Simplex {
    fn new(corners: [Vector3<f64>; 4]) -> Option<Self> {
        let edges = Matrix3::from_columns(&[
            corners[1] - corners[0],
            corners[2] - corners[0],
            corners[3] - corners[0],
        ]);
        let inv_edges = edges.try_inverse()?;
        Some(Self { corners, inv_edges })
    }

    /// Barycentric coordinates `(λ0, λ1, λ2, λ3)` of `p`.
    pub fn barycentric(&self, p: Vector3<f64>) -> [f64; 4] {
        let l = self.inv_edges * (p - self.corners[0]);
        [1.0 - l.x - l.y - l.z, l.x, l.y, l.z]
    }

    pub fn contains(&self, p: Vector3<f64>) -> bool {
        self.barycentric(p).iter().all(|&l| l >= -BARY_EPS)
    }

    pub fn volume(&self) -> f64 {
        let a = self.corners[1] - self.corners[0];
        let b = self.corners[2] - self.corners[0];
        let c = self.corners[3] - self.corners[0];
        a.dot(&b.cross(&c)).abs() / 6.0
    }
}

/// Read-only convex hull of a recorded workspace.
///
/// Invariants:
/// - At least four facets; every stored point satisfies every facet.
/// - `simplices` tile the triangle surface's interior (disjoint interiors).
#[derive(Clone, Debug)]
pub struct WorkspaceHull {
    points: Vec<Vector3<f64>>,
    facets: Vec<Facet>,
    simplices: Vec<Simplex>,
    center: Vector3<f64>,
    lower: Vector3<f64>,
    upper: Vector3<f64>,
}

impl WorkspaceHull {
    /// Build the hull of `positions`; fails with `DegenerateGeometry` for fewer
    /// than four distinct points, coplanar input, or non-finite coordinates.
    pub fn build(positions: &[Vector3<f64>]) -> Result<Self, WorkspaceError> {
        if let Some(bad) = positions.iter().position(|p| !p.iter().all(|x| x.is_finite())) {
            return Err(WorkspaceError::degenerate(format!(
                "position {bad} has non-finite coordinates"
            )));
        }
        let mut points = positions.to_vec();
        dedup_points_in_place(&mut points, DEDUP_EPS);
        if points.len() < 4 {
            return Err(WorkspaceError::degenerate(format!(
                "need at least 4 distinct points, got {}",
                points.len()
            )));
        }
        let seed = seed_tetrahedron(&points)?;
        let surface = triangulate_surface(&points, seed);
        let facets = merge_coplanar(&points, &surface);
        if facets.len() < 4 {
            return Err(WorkspaceError::degenerate(format!(
                "only {} supporting facets found",
                facets.len()
            )));
        }

        let used: Vec<Vector3<f64>> = {
            let mut idx: Vec<usize> = surface.iter().flat_map(|t| t.v).collect();
            idx.sort_unstable();
            idx.dedup();
            idx.into_iter().map(|i| points[i]).collect()
        };
        let center = centroid(&used);

        let simplices: Vec<Simplex> = surface
            .iter()
            .filter(|t| t.plane.is_some())
            .filter_map(|t| Simplex::new([center, points[t.v[0]], points[t.v[1]], points[t.v[2]]]))
            .collect();
        if simplices.is_empty() {
            return Err(WorkspaceError::degenerate("hull has no non-flat tetrahedra"));
        }

        let lower = used.iter().fold(Vector3::repeat(f64::INFINITY), |acc, p| acc.inf(p));
        let upper = used
            .iter()
            .fold(Vector3::repeat(f64::NEG_INFINITY), |acc, p| acc.sup(p));

        tracing::debug!(
            points = points.len(),
            vertices = used.len(),
            facets = facets.len(),
            simplices = simplices.len(),
            "workspace hull built"
        );
        Ok(Self {
            points,
            facets,
            simplices,
            center,
            lower,
            upper,
        })
    }

    /// Inside-or-boundary test against all facet inequalities.
    pub fn contains(&self, p: Vector3<f64>) -> bool {
        p.iter().all(|x| x.is_finite()) && self.facets.iter().all(|f| f.plane.satisfies(p))
    }

    /// Index of a tetrahedron containing `p`; `Some` exactly when `contains(p)`.
    pub fn find_simplex(&self, p: Vector3<f64>) -> Option<usize> {
        if !self.contains(p) {
            return None;
        }
        if let Some(i) = self.simplices.iter().position(|s| s.contains(p)) {
            return Some(i);
        }
        // Between a lifted facet and the triangle surface.
        self.simplices
            .iter()
            .map(|s| s.barycentric(p).into_iter().fold(f64::INFINITY, f64::min))
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
    }

    /// Hull vertices (points that appear on some facet ring).
    pub fn vertices(&self) -> Vec<Vector3<f64>> {
        let mut idx: Vec<usize> = self
            .facets
            .iter()
            .flat_map(|f| f.ring.iter().copied())
            .collect();
        idx.sort_unstable();
        idx.dedup();
        idx.into_iter().map(|i| self.points[i]).collect()
    }

    pub fn facets(&self) -> &[Facet] {
        &self.facets
    }

    pub fn simplices(&self) -> &[Simplex] {
        &self.simplices
    }

    /// Distinct input points the hull was built from (sorted, deduplicated).
    pub fn points(&self) -> &[Vector3<f64>] {
        &self.points
    }

    pub fn volume(&self) -> f64 {
        self.simplices.iter().map(Simplex::volume).sum()
    }

    /// Vertex centroid; an interior point of the hull.
    pub fn centroid(&self) -> Vector3<f64> {
        self.center
    }

    /// Axis-aligned bounding box `(lower, upper)`.
    pub fn bounds(&self) -> (Vector3<f64>, Vector3<f64>) {
        (self.lower, self.upper)
    }
}

/// Indices of four affinely independent points; rejects flat input.
fn seed_tetrahedron(points: &[Vector3<f64>]) -> Result<[usize; 4], WorkspaceError> {
    let p0 = points[0];
    let (i1, span) = farthest(points, |p| (p - p0).norm());
    if span <= TIGHT_EPS {
        return Err(WorkspaceError::degenerate("all points coincide"));
    }
    let axis = points[i1] - p0;
    let (i2, area) = farthest(points, |p| axis.cross(&(p - p0)).norm());
    if area <= TIGHT_EPS * span {
        return Err(WorkspaceError::degenerate("points are collinear"));
    }
    let normal = axis.cross(&(points[i2] - p0)).normalize();
    let (i3, height) = farthest(points, |p| normal.dot(&(p - p0)).abs());
    if height <= TIGHT_EPS {
        return Err(WorkspaceError::degenerate("points are coplanar"));
    }
    Ok([0, i1, i2, i3])
}

fn farthest(points: &[Vector3<f64>], score: impl Fn(&Vector3<f64>) -> f64) -> (usize, f64) {
    points
        .iter()
        .map(score)
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or((0, 0.0))
}

/// Surface triangle, wound CCW seen from outside.
#[derive(Clone, Copy, Debug)]
struct Tri {
    v: [usize; 3],
    /// `None` for a zero-area triangle.
    plane: Option<Hs3>,
}

impl Tri {
    fn new(points: &[Vector3<f64>], v: [usize; 3]) -> Self {
        let [a, b, c] = v;
        let n = (points[b] - points[a]).cross(&(points[c] - points[a]));
        let norm = n.norm();
        let plane = (norm > 0.0 && norm.is_finite())
            .then(|| Hs3::new(n / norm, n.dot(&points[a]) / norm));
        Self { v, plane }
    }

    fn sees(&self, p: Vector3<f64>) -> bool {
        self.plane.is_some_and(|h| h.signed_distance(p) > FEAS_EPS)
    }

    fn edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.v;
        [(a, b), (b, c), (c, a)]
    }
}

/// Incremental hull: closed triangle surface over `points`.
fn triangulate_surface(points: &[Vector3<f64>], seed: [usize; 4]) -> Vec<Tri> {
    let [a, b, c, d] = seed;
    let mut faces = [[a, b, c], [a, c, d], [a, d, b], [b, d, c]];
    // `d` must lie below `abc`.
    if Tri::new(points, faces[0])
        .plane
        .is_some_and(|h| h.signed_distance(points[d]) > 0.0)
    {
        for f in &mut faces {
            f.swap(1, 2);
        }
    }
    let mut tris: Vec<Tri> = faces.iter().map(|&f| Tri::new(points, f)).collect();

    for (idx, &p) in points.iter().enumerate() {
        if seed.contains(&idx) {
            continue;
        }
        let visible: Vec<bool> = tris.iter().map(|t| t.sees(p)).collect();
        if !visible.contains(&true) {
            continue;
        }
        let lit: HashSet<(usize, usize)> = tris
            .iter()
            .zip(&visible)
            .filter(|(_, &v)| v)
            .flat_map(|(t, _)| t.edges())
            .collect();
        let mut horizon = Vec::new();
        for (t, _) in tris.iter().zip(&visible).filter(|(_, &v)| v) {
            horizon.extend(t.edges().into_iter().filter(|&(a, b)| !lit.contains(&(b, a))));
        }
        tris = tris
            .into_iter()
            .zip(visible)
            .filter(|(_, v)| !v)
            .map(|(t, _)| t)
            .chain(horizon.into_iter().map(|(a, b)| Tri::new(points, [a, b, idx])))
            .collect();
    }
    tris
}

/// Group coplanar surface triangles into facets with lifted offsets.
fn merge_coplanar(points: &[Vector3<f64>], surface: &[Tri]) -> Vec<Facet> {
    let mut groups: Vec<(Hs3, Vec<usize>)> = Vec::new();
    for t in surface {
        let Some(plane) = t.plane else { continue };
        match groups
            .iter_mut()
            .find(|(g, _)| (g.n - plane.n).norm() <= TIGHT_EPS && (g.c - plane.c).abs() <= TIGHT_EPS)
        {
            Some((_, verts)) => verts.extend(t.v),
            None => groups.push((plane, t.v.to_vec())),
        }
    }
    groups
        .into_iter()
        .filter_map(|(mut plane, mut verts)| {
            verts.sort_unstable();
            verts.dedup();
            // Every input point satisfies the facet exactly.
            plane.c = points
                .iter()
                .map(|p| plane.n.dot(p))
                .fold(f64::NEG_INFINITY, f64::max);
            let ring = order_facet_ring(points, &plane, &verts);
            (ring.len() >= 3).then_some(Facet { plane, ring })
        })
        .collect()
}

/// Project facet points into the facet plane and return their CCW hull ring,
/// counter-clockwise when viewed from outside (along `-n`).
fn order_facet_ring(points: &[Vector3<f64>], plane: &Hs3, tight: &[usize]) -> Vec<usize> {
    let origin = points[tight[0]];
    let u = tight
        .iter()
        .map(|&t| points[t] - origin)
        .find(|d| d.norm() > TIGHT_EPS)
        .map(|d| d.normalize())
        .unwrap_or_else(Vector3::x);
    let v = plane.n.cross(&u);
    let projected: Vec<(Vector2<f64>, usize)> = tight
        .iter()
        .map(|&t| {
            let d = points[t] - origin;
            (Vector2::new(d.dot(&u), d.dot(&v)), t)
        })
        .collect();
    convex_hull_2d(&projected)
}
