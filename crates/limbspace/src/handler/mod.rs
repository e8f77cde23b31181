//! Operator-facing actions over one arm's pose table.
//!
//! Purpose
//! - `PoseHandler` owns a `PoseTable` and a lazily built `WorkspaceHull` and
//!   exposes the three actions: record, replay, sample.
//!
//! Assumptions and conventions
//! - The hull is derived from the table positions and dropped whenever the
//!   table changes.
//! - Every long action takes a `Session` and stops at the next safe point once
//!   shutdown is requested (between operator prompts, replay steps, draws).
//! - Replay treats IK failures per row: the row is reported and replay moves
//!   on. Anything else aborts the action.
//!
//! Code cross-refs: `recorder::Recorder`, `sampler::RejectionSampler`,
//! `robot::{Limb, InverseKinematics, ForwardKinematics}`.

mod recorder;

pub use recorder::{OperatorCommand, OperatorInput, Recorder, RecorderState, ScriptedInput};

use std::path::Path;

use crate::error::WorkspaceError;
use crate::geom3::{Configuration, Pose, PoseKind, WorkspaceHull};
use crate::limits::{Arm, JointLimits};
use crate::robot::{ForwardKinematics, InverseKinematics, Limb};
use crate::sampler::{RejectionSampler, SampleStats};
use crate::session::Session;
use crate::table::PoseTable;

/// Outcome of one replay pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Row indices the limb reached, in order.
    pub visited: Vec<usize>,
    /// Rows skipped because IK failed, with the reason.
    pub failed: Vec<(usize, String)>,
    /// Shutdown was requested before the last row.
    pub cancelled: bool,
}

#[derive(Clone, Debug)]
pub struct PoseHandler {
    arm: Arm,
    table: PoseTable,
    hull: Option<WorkspaceHull>,
}

impl PoseHandler {
    pub fn new(arm: Arm, table: PoseTable) -> Self {
        Self {
            arm,
            table,
            hull: None,
        }
    }

    /// Load a recorded table. A missing file surfaces as `Io`, which callers
    /// take as the cue to record instead.
    pub fn open(arm: Arm, poses: &Path, configurations: &Path) -> Result<Self, WorkspaceError> {
        let table = PoseTable::load(poses, configurations)?;
        tracing::info!(
            %arm,
            rows = table.len(),
            kind = ?table.kind(),
            poses = %poses.display(),
            "pose table loaded"
        );
        Ok(Self::new(arm, table))
    }

    pub fn arm(&self) -> Arm {
        self.arm
    }

    pub fn table(&self) -> &PoseTable {
        &self.table
    }

    pub fn into_table(self) -> PoseTable {
        self.table
    }

    pub fn append(&mut self, pose: Pose, q: Configuration) -> Result<(), WorkspaceError> {
        self.table.append(pose, q)?;
        self.hull = None;
        Ok(())
    }

    /// Run the capture loop and add the recorded rows; returns how many were
    /// added. An empty handler adopts the recorder's Euler table.
    pub fn record<R, I>(
        &mut self,
        robot: &R,
        input: &mut I,
        session: &Session,
    ) -> Result<usize, WorkspaceError>
    where
        R: Limb + InverseKinematics + ?Sized,
        I: OperatorInput + ?Sized,
    {
        if robot.arm() != self.arm {
            return Err(WorkspaceError::invalid(format!(
                "handler is for the {} arm, robot drives the {}",
                self.arm,
                robot.arm()
            )));
        }
        let recorded = Recorder::new(self.arm).run(robot, input, session)?;
        let added = recorded.len();
        if self.table.is_empty() {
            self.table = recorded;
        } else {
            for (pose, q) in recorded.iter() {
                self.table.append(pose.to_kind(self.table.kind()), *q)?;
            }
        }
        if added > 0 {
            self.hull = None;
        }
        Ok(added)
    }

    /// Hull of the table positions, built on first use.
    pub fn hull(&mut self) -> Result<&WorkspaceHull, WorkspaceError> {
        if self.table.is_empty() {
            return Err(WorkspaceError::EmptyTable);
        }
        let hull = match self.hull.take() {
            Some(hull) => hull,
            None => WorkspaceHull::build(&self.table.positions())?,
        };
        let hull: &WorkspaceHull = self.hull.insert(hull);
        Ok(hull)
    }

    /// Row closest to `query`, compared in the table's pose kind.
    pub fn closest_pose(
        &self,
        query: &Pose,
    ) -> Result<(usize, &Pose, &Configuration), WorkspaceError> {
        let row = query.to_kind(self.table.kind()).to_row();
        let index = self.table.nearest_pose(&row)?;
        let (pose, q) = self
            .table
            .get(index)
            .ok_or(WorkspaceError::EmptyTable)?;
        Ok((index, pose, q))
    }

    /// Drive the limb through every row in order.
    pub fn replay<R>(&self, robot: &mut R, session: &Session) -> Result<ReplayReport, WorkspaceError>
    where
        R: Limb + InverseKinematics + ?Sized,
    {
        if self.table.is_empty() {
            return Err(WorkspaceError::EmptyTable);
        }
        let mut report = ReplayReport::default();
        for (index, (pose, _)) in self.table.iter().enumerate() {
            if session.is_shutdown() {
                report.cancelled = true;
                tracing::warn!(index, "replay interrupted by shutdown");
                break;
            }
            match robot.inverse(pose, self.arm) {
                Ok(q) => {
                    robot.move_to(&q)?;
                    report.visited.push(index);
                }
                Err(WorkspaceError::IkFailure { reason }) => {
                    tracing::warn!(index, %reason, "replay step skipped");
                    report.failed.push((index, reason));
                }
                Err(e) => return Err(e),
            }
        }
        tracing::info!(
            visited = report.visited.len(),
            failed = report.failed.len(),
            cancelled = report.cancelled,
            "replay finished"
        );
        Ok(report)
    }

    /// Draw `n` configurations whose FK position lies inside the recorded
    /// workspace. The result is a new quaternion table; this handler's table
    /// is unchanged.
    pub fn sample<K>(
        &mut self,
        fk: &K,
        limits: &JointLimits,
        sampler: &RejectionSampler,
        n: usize,
        session: &Session,
    ) -> Result<(PoseTable, SampleStats), WorkspaceError>
    where
        K: ForwardKinematics + Sync + ?Sized,
    {
        let hull = self.hull()?;
        tracing::info!(
            vertices = hull.vertices().len(),
            facets = hull.facets().len(),
            volume = hull.volume(),
            "workspace hull ready"
        );
        let (samples, stats) = sampler.sample_n(n, limits, fk, hull, session)?;
        let table = PoseTable::from_pairs(
            PoseKind::Quaternion,
            samples
                .into_iter()
                .map(|(pose, q)| (pose.to_kind(PoseKind::Quaternion), q)),
        )?;
        Ok((table, stats))
    }
}
