//! Simulated arm: analytic forward kinematics of a 7-joint serial chain.
//!
//! The default chain approximates Baxter's link layout (shoulder s0/s1, elbow
//! e0/e1, wrist w0/w1/w2); it is good enough to produce a plausible workspace,
//! not a calibrated model.
//!
//! Inverse kinematics is lookup-only: a pose is solved by the current joint
//! state or by any configuration the limb has previously been moved to,
//! provided its forward image matches within tolerance. There is no numeric
//! solver.

use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion, Vector3};

use super::{ForwardKinematics, InverseKinematics, Limb};
use crate::error::WorkspaceError;
use crate::geom3::{Configuration, Pose, JOINT_COUNT};
use crate::limits::Arm;

const POSITION_TOL: f64 = 1e-6;
const ANGLE_TOL: f64 = 1e-6;

/// Revolute joint: fixed translation from the previous frame, then rotation.
#[derive(Clone, Debug)]
pub struct ChainJoint {
    pub offset: Vector3<f64>,
    pub axis: Unit<Vector3<f64>>,
}

#[derive(Clone, Debug)]
pub struct SerialChain {
    pub base: Isometry3<f64>,
    pub joints: [ChainJoint; JOINT_COUNT],
    pub tool: Vector3<f64>,
}

impl SerialChain {
    /// Baxter-like geometry mounted on the torso, per arm.
    pub fn baxter_like(arm: Arm) -> Self {
        let side = match arm {
            Arm::Left => 1.0,
            Arm::Right => -1.0,
        };
        let base = Isometry3::from_parts(
            Translation3::new(0.064, side * 0.259, 0.129),
            UnitQuaternion::from_euler_angles(0.0, 0.0, side * std::f64::consts::FRAC_PI_4),
        );
        let joint = |x: f64, z: f64, axis: Unit<Vector3<f64>>| ChainJoint {
            offset: Vector3::new(x, 0.0, z),
            axis,
        };
        Self {
            base,
            joints: [
                joint(0.0, 0.27, Vector3::z_axis()),
                joint(0.069, 0.0, Vector3::y_axis()),
                joint(0.102, 0.0, Vector3::x_axis()),
                joint(0.262, 0.0, Vector3::y_axis()),
                joint(0.104, 0.0, Vector3::x_axis()),
                joint(0.271, 0.0, Vector3::y_axis()),
                joint(0.116, 0.0, Vector3::x_axis()),
            ],
            tool: Vector3::new(0.11, 0.0, 0.0),
        }
    }

    pub fn transform(&self, q: &Configuration) -> Isometry3<f64> {
        let mut t = self.base;
        for (joint, &angle) in self.joints.iter().zip(q.iter()) {
            t *= Isometry3::from_parts(
                Translation3::from(joint.offset),
                UnitQuaternion::from_axis_angle(&joint.axis, angle),
            );
        }
        t * Translation3::from(self.tool)
    }
}

impl ForwardKinematics for SerialChain {
    fn forward(&self, q: &Configuration) -> Pose {
        Pose::from_isometry(&self.transform(q))
    }
}

/// In-memory arm driven by `SerialChain` kinematics.
#[derive(Clone, Debug)]
pub struct SimulatedRobot {
    arm: Arm,
    chain: SerialChain,
    state: Configuration,
    visited: Vec<Configuration>,
}

impl SimulatedRobot {
    pub fn new(arm: Arm) -> Self {
        Self::with_chain(arm, SerialChain::baxter_like(arm))
    }

    pub fn with_chain(arm: Arm, chain: SerialChain) -> Self {
        Self {
            arm,
            chain,
            state: Configuration::zeros(),
            visited: vec![Configuration::zeros()],
        }
    }

    pub fn chain(&self) -> &SerialChain {
        &self.chain
    }

    /// Operator moves the arm by hand; same effect as a commanded motion.
    pub fn guide(&mut self, q: Configuration) {
        self.state = q;
        self.visited.push(q);
    }

    fn reaches(&self, q: &Configuration, pose: &Pose) -> bool {
        let (dp, da) = self.chain.forward(q).deviation(pose);
        dp <= POSITION_TOL && da <= ANGLE_TOL
    }
}

impl ForwardKinematics for SimulatedRobot {
    fn forward(&self, q: &Configuration) -> Pose {
        self.chain.forward(q)
    }
}

impl InverseKinematics for SimulatedRobot {
    fn inverse(&self, pose: &Pose, arm: Arm) -> Result<Configuration, WorkspaceError> {
        if arm != self.arm {
            return Err(WorkspaceError::ik(format!(
                "simulated {} arm cannot solve for the {arm} arm",
                self.arm
            )));
        }
        std::iter::once(&self.state)
            .chain(self.visited.iter().rev())
            .find(|q| self.reaches(q, pose))
            .copied()
            .ok_or_else(|| WorkspaceError::ik("no known configuration reaches the pose"))
    }
}

impl Limb for SimulatedRobot {
    fn arm(&self) -> Arm {
        self.arm
    }

    fn endpoint_pose(&self) -> Pose {
        self.chain.forward(&self.state)
    }

    fn joint_angles(&self) -> Configuration {
        self.state
    }

    fn move_to(&mut self, q: &Configuration) -> Result<(), WorkspaceError> {
        if !q.iter().all(|v| v.is_finite()) {
            return Err(WorkspaceError::invalid("joint command contains non-finite angles"));
        }
        self.guide(*q);
        Ok(())
    }
}
