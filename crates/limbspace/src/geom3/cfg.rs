//! Tolerance defaults for 3D workspace geometry (internal).
//!
//! Policy
//! - Fixed constants, scale-agnostic. Workspace coordinates are metres, so the
//!   values below are far below sensor noise of a recorded endpoint pose.

/// Membership slack for `Hs3::satisfies` (`n·x <= c + FEAS_EPS`); also the
/// height above a surface triangle at which a point sees it.
pub(crate) const FEAS_EPS: f64 = 1e-9;
/// Coplanar triangles merge into one facet when normals and offsets agree
/// within this; also the flatness cut for the seed tetrahedron.
pub(crate) const TIGHT_EPS: f64 = 1e-7;
/// Slack on barycentric coordinates for simplex lookup.
pub(crate) const BARY_EPS: f64 = 1e-9;
/// Points closer than this are merged before the hull is built.
pub(crate) const DEDUP_EPS: f64 = 1e-12;
