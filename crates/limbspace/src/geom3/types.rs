//! Core 3D types: poses, joint configurations and half-spaces.

use nalgebra::{Isometry3, Quaternion, SVector, Translation3, UnitQuaternion, Vector3, Vector4};

use super::cfg::FEAS_EPS;
use super::util::{euler_from_quaternion, quaternion_from_euler};
use crate::error::WorkspaceError;

/// Number of joints per arm.
pub const JOINT_COUNT: usize = 7;

/// Joint angles of one arm, ordered by the arm's joint-name list.
pub type Configuration = SVector<f64, JOINT_COUNT>;

/// Orientation encoding of a pose row; fixed per table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoseKind {
    /// `x, y, z, roll, pitch, yaw`
    Euler,
    /// `x, y, z, qx, qy, qz, qw`
    Quaternion,
}

impl PoseKind {
    #[inline]
    pub fn dim(self) -> usize {
        match self {
            Self::Euler => 6,
            Self::Quaternion => 7,
        }
    }

    pub fn from_dim(dim: usize) -> Option<Self> {
        match dim {
            6 => Some(Self::Euler),
            7 => Some(Self::Quaternion),
            _ => None,
        }
    }

    /// Column header written above pose rows.
    pub fn header(self) -> &'static str {
        match self {
            Self::Euler => "x y z a b c",
            Self::Quaternion => "px, py, pz, ox, oy, oz, ow",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Orientation {
    /// Static x-y-z Euler angles `(roll, pitch, yaw)`.
    Euler(Vector3<f64>),
    /// Quaternion stored as `(qx, qy, qz, qw)`; not renormalised.
    Quaternion(Vector4<f64>),
}

/// Cartesian endpoint pose.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: Vector3<f64>,
    pub orientation: Orientation,
}

impl Pose {
    #[inline]
    pub fn euler(position: Vector3<f64>, rpy: Vector3<f64>) -> Self {
        Self {
            position,
            orientation: Orientation::Euler(rpy),
        }
    }

    #[inline]
    pub fn quaternion(position: Vector3<f64>, xyzw: Vector4<f64>) -> Self {
        Self {
            position,
            orientation: Orientation::Quaternion(xyzw),
        }
    }

    pub fn from_isometry(iso: &Isometry3<f64>) -> Self {
        // nalgebra stores quaternion coordinates as (i, j, k, w).
        Self::quaternion(iso.translation.vector, iso.rotation.quaternion().coords)
    }

    pub fn kind(&self) -> PoseKind {
        match self.orientation {
            Orientation::Euler(_) => PoseKind::Euler,
            Orientation::Quaternion(_) => PoseKind::Quaternion,
        }
    }

    /// Flat row in table column order.
    pub fn to_row(&self) -> Vec<f64> {
        let p = self.position;
        match self.orientation {
            Orientation::Euler(r) => vec![p.x, p.y, p.z, r.x, r.y, r.z],
            Orientation::Quaternion(q) => vec![p.x, p.y, p.z, q.x, q.y, q.z, q.w],
        }
    }

    /// Parse a 6- (Euler) or 7-entry (quaternion) row.
    pub fn from_row(row: &[f64]) -> Result<Self, WorkspaceError> {
        match PoseKind::from_dim(row.len()) {
            Some(PoseKind::Euler) => Ok(Self::euler(
                Vector3::new(row[0], row[1], row[2]),
                Vector3::new(row[3], row[4], row[5]),
            )),
            Some(PoseKind::Quaternion) => Ok(Self::quaternion(
                Vector3::new(row[0], row[1], row[2]),
                Vector4::new(row[3], row[4], row[5], row[6]),
            )),
            None => Err(WorkspaceError::DimensionMismatch {
                expected: PoseKind::Euler.dim(),
                found: row.len(),
            }),
        }
    }

    pub fn to_kind(&self, kind: PoseKind) -> Self {
        match (kind, self.orientation) {
            (PoseKind::Euler, Orientation::Quaternion(q)) => {
                let (r, p, y) = euler_from_quaternion(q.x, q.y, q.z, q.w);
                Self::euler(self.position, Vector3::new(r, p, y))
            }
            (PoseKind::Quaternion, Orientation::Euler(e)) => {
                let (x, y, z, w) = quaternion_from_euler(e.x, e.y, e.z);
                Self::quaternion(self.position, Vector4::new(x, y, z, w))
            }
            _ => *self,
        }
    }

    /// Unit rotation of this pose (quaternions are normalised here).
    pub fn rotation(&self) -> UnitQuaternion<f64> {
        match self.orientation {
            Orientation::Euler(e) => UnitQuaternion::from_euler_angles(e.x, e.y, e.z),
            Orientation::Quaternion(q) => {
                UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
            }
        }
    }

    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.position), self.rotation())
    }

    /// Position distance and rotation angle between two poses of any kind.
    pub fn deviation(&self, other: &Pose) -> (f64, f64) {
        let dp = (self.position - other.position).norm();
        let da = self.rotation().angle_to(&other.rotation());
        (dp, da)
    }
}

/// Closed half-space `n · x <= c` in R^3.
///
/// Invariants:
/// - `n` is unit length when produced by the hull builder.
/// - Membership uses `<= c + FEAS_EPS`.
#[derive(Clone, Copy, Debug)]
pub struct Hs3 {
    pub n: Vector3<f64>,
    pub c: f64,
}

impl Hs3 {
    #[inline]
    pub fn new(n: Vector3<f64>, c: f64) -> Self {
        Self { n, c }
    }
    #[inline]
    pub fn signed_distance(&self, p: Vector3<f64>) -> f64 {
        self.n.dot(&p) - self.c
    }
    #[inline]
    pub fn satisfies(&self, p: Vector3<f64>) -> bool {
        self.signed_distance(p) <= FEAS_EPS
    }
}
