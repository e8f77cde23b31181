//! Recorded fixture: a pose table standing in for a robot.
//!
//! - FK returns the pose of the nearest recorded configuration.
//! - IK returns the configuration of the nearest recorded pose when it matches
//!   within tolerance, else `IkFailure`.
//! - The limb sits on one table row (`cursor`); `move_to` snaps to the nearest
//!   recorded configuration and `advance` steps to the next row, imitating an
//!   operator walking the arm through the recorded set.

use super::{ForwardKinematics, InverseKinematics, Limb};
use crate::error::WorkspaceError;
use crate::geom3::{Configuration, Pose, PoseKind};
use crate::limits::Arm;
use crate::table::PoseTable;

const MATCH_TOL: f64 = 1e-6;

#[derive(Clone, Debug)]
pub struct RecordedFixture {
    arm: Arm,
    table: PoseTable,
    cursor: usize,
}

impl RecordedFixture {
    pub fn new(arm: Arm, table: PoseTable) -> Result<Self, WorkspaceError> {
        if table.is_empty() {
            return Err(WorkspaceError::EmptyTable);
        }
        Ok(Self {
            arm,
            table,
            cursor: 0,
        })
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Step to the next recorded row (wrapping); returns the new cursor.
    pub fn advance(&mut self) -> usize {
        self.cursor = (self.cursor + 1) % self.table.len();
        self.cursor
    }

    fn nearest_configuration(&self, q: &Configuration) -> usize {
        let mut best = (0, f64::INFINITY);
        for (i, c) in self.table.configurations().iter().enumerate() {
            let d = (c - q).norm_squared();
            if d < best.1 {
                best = (i, d);
            }
        }
        best.0
    }
}

impl ForwardKinematics for RecordedFixture {
    fn forward(&self, q: &Configuration) -> Pose {
        let i = self.nearest_configuration(q);
        self.table.poses()[i].to_kind(PoseKind::Quaternion)
    }
}

impl InverseKinematics for RecordedFixture {
    fn inverse(&self, pose: &Pose, arm: Arm) -> Result<Configuration, WorkspaceError> {
        if arm != self.arm {
            return Err(WorkspaceError::ik(format!(
                "fixture recorded for the {} arm, not {arm}",
                self.arm
            )));
        }
        let query = pose.to_kind(self.table.kind()).to_row();
        let i = self.table.nearest_pose(&query)?;
        let (dp, da) = self.table.poses()[i].deviation(pose);
        if dp <= MATCH_TOL && da <= MATCH_TOL {
            Ok(self.table.configurations()[i])
        } else {
            Err(WorkspaceError::ik(format!(
                "pose is {dp:.3e} m from the closest recorded pose {i}"
            )))
        }
    }
}

impl Limb for RecordedFixture {
    fn arm(&self) -> Arm {
        self.arm
    }

    fn endpoint_pose(&self) -> Pose {
        self.table.poses()[self.cursor]
    }

    fn joint_angles(&self) -> Configuration {
        self.table.configurations()[self.cursor]
    }

    fn move_to(&mut self, q: &Configuration) -> Result<(), WorkspaceError> {
        self.cursor = self.nearest_configuration(q);
        Ok(())
    }
}
