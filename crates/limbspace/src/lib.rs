//! Pose recording, replay and workspace sampling for a 7-joint arm.
//!
//! Layers, bottom-up:
//! - `geom3`: poses, distances, Euler/quaternion conversion, the convex
//!   `WorkspaceHull` with membership and simplex queries.
//! - `table`: `PoseTable` and its comma-separated text codec.
//! - `limits`: arms, joint names and joint ranges.
//! - `sampler`: seeded rejection sampling inside the hull.
//! - `robot`: collaborator traits (limb, forward/inverse kinematics) plus a
//!   simulated arm and a recorded fixture.
//! - `handler`: the operator actions (record, replay, sample) and the
//!   recording state machine, run under a `session::Session`.
//!
//! API Policy
//! - This crate is project-internal. There is no stable public API.

pub mod error;
pub mod geom3;
pub mod handler;
pub mod limits;
pub mod robot;
pub mod sampler;
pub mod session;
pub mod table;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::WorkspaceError;
pub use geom3::{Configuration, Pose, PoseKind, WorkspaceHull};
pub use handler::PoseHandler;
pub use table::PoseTable;

/// Common exports for callers driving the handler.
pub mod prelude {
    pub use crate::error::WorkspaceError;
    pub use crate::geom3::{
        distance_squared, Configuration, Orientation, Pose, PoseKind, WorkspaceHull, JOINT_COUNT,
    };
    pub use crate::handler::{
        OperatorCommand, OperatorInput, PoseHandler, Recorder, RecorderState, ReplayReport,
        ScriptedInput,
    };
    pub use crate::limits::{Arm, JointLimit, JointLimits};
    pub use crate::robot::{
        ForwardKinematics, InverseKinematics, Limb, RecordedFixture, SerialChain, SimulatedRobot,
    };
    pub use crate::sampler::{RejectionSampler, SampleStats, SamplerParams};
    pub use crate::session::Session;
    pub use crate::table::{table_file_names, PoseTable};
}
