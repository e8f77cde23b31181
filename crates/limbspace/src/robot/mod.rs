//! Robot collaborator capabilities.
//!
//! The crate never talks to hardware directly. Hosts inject:
//! - a limb (`Limb`): read endpoint pose / joint angles, move to a configuration;
//! - inverse kinematics (`InverseKinematics`): pose → configuration, may fail;
//! - forward kinematics (`ForwardKinematics`): configuration → pose.
//!
//! Two in-crate implementations keep everything testable without a robot:
//! `SimulatedRobot` (analytic 7-joint chain) and `RecordedFixture` (lookup over
//! a recorded table). A real driver implements the same traits in the host.

mod fixture;
mod simulated;

pub use fixture::RecordedFixture;
pub use simulated::{ChainJoint, SerialChain, SimulatedRobot};

use crate::error::WorkspaceError;
use crate::geom3::{Configuration, Pose};
use crate::limits::Arm;

/// Configuration → endpoint pose.
pub trait ForwardKinematics {
    fn forward(&self, q: &Configuration) -> Pose;
}

impl<F> ForwardKinematics for F
where
    F: Fn(&Configuration) -> Pose,
{
    fn forward(&self, q: &Configuration) -> Pose {
        self(q)
    }
}

/// Pose → configuration; `IkFailure` when the pose is unreachable.
pub trait InverseKinematics {
    fn inverse(&self, pose: &Pose, arm: Arm) -> Result<Configuration, WorkspaceError>;
}

/// One physical (or simulated) arm.
pub trait Limb {
    fn arm(&self) -> Arm;
    fn endpoint_pose(&self) -> Pose;
    fn joint_angles(&self) -> Configuration;
    /// Blocks until the motion completes.
    fn move_to(&mut self, q: &Configuration) -> Result<(), WorkspaceError>;
}
