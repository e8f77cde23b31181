//! 3D workspace geometry: poses, distances and the convex workspace hull.
//!
//! Purpose
//! - Represent recorded endpoint poses (Euler or quaternion orientation) and the
//!   7-joint configurations that produced them.
//! - Approximate the reachable workspace by the convex hull of recorded
//!   positions and answer point-in-hull queries for the rejection sampler.
//!
//! Assumptions and conventions
//! - Half-spaces use `n·x <= c` with unit `n`; membership slack `1e-9`.
//! - Euler angles are static x-y-z (roll about x, then pitch about y, then yaw
//!   about z), matching `nalgebra::UnitQuaternion::from_euler_angles`.
//! - Quaternion rows are `(qx, qy, qz, qw)`.
//!
//! Code cross-refs: `WorkspaceHull`, `Pose`, `distance_squared`

mod cfg;
pub mod hull;
mod types;
mod util;

pub use hull::{Facet, Simplex, WorkspaceHull};
pub use types::{Configuration, Hs3, Orientation, Pose, PoseKind, JOINT_COUNT};
pub use util::{distance_squared, euler_from_quaternion, quaternion_from_euler};

#[cfg(test)]
mod tests;
