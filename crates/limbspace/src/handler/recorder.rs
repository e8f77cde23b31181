//! Interactive capture loop as an explicit state machine.
//!
//! ```text
//!   Idle --Start--> AwaitingDecision --Record--> Recording --(captured|skipped)--> AwaitingDecision
//!   Idle|AwaitingDecision --Stop--> Stopped
//! ```
//!
//! Commands arrive one at a time through `handle`, so a host can move the arm
//! between prompts; `run` drains an `OperatorInput` for the common case.
//! Commands that make no sense in the current state are logged and ignored.

use std::collections::VecDeque;

use crate::error::WorkspaceError;
use crate::geom3::PoseKind;
use crate::limits::Arm;
use crate::robot::{InverseKinematics, Limb};
use crate::session::Session;
use crate::table::PoseTable;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    AwaitingDecision,
    Recording,
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorCommand {
    Start,
    Record,
    Stop,
}

impl OperatorCommand {
    /// Operator key: `y` records the current pose, `n` stops.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim() {
            "y" | "Y" => Some(Self::Record),
            "n" | "N" => Some(Self::Stop),
            _ => None,
        }
    }
}

/// Source of operator decisions. `None` means the input is exhausted and is
/// treated as `Stop`.
pub trait OperatorInput {
    fn next_command(&mut self) -> Option<OperatorCommand>;
}

/// Pre-recorded command sequence.
#[derive(Clone, Debug, Default)]
pub struct ScriptedInput {
    commands: VecDeque<OperatorCommand>,
}

impl ScriptedInput {
    pub fn new(commands: impl IntoIterator<Item = OperatorCommand>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
        }
    }

    /// Parse operator keys; anything other than `y`/`n` is dropped.
    pub fn from_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(keys.into_iter().filter_map(OperatorCommand::from_key))
    }
}

impl OperatorInput for ScriptedInput {
    fn next_command(&mut self) -> Option<OperatorCommand> {
        self.commands.pop_front()
    }
}

/// Accumulates recorded rows (Euler poses) for one arm.
#[derive(Clone, Debug)]
pub struct Recorder {
    arm: Arm,
    state: RecorderState,
    table: PoseTable,
    skipped: usize,
}

impl Recorder {
    pub fn new(arm: Arm) -> Self {
        Self {
            arm,
            state: RecorderState::Idle,
            table: PoseTable::new(PoseKind::Euler),
            skipped: 0,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn table(&self) -> &PoseTable {
        &self.table
    }

    /// Captures rejected by inverse kinematics so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn finish(self) -> PoseTable {
        self.table
    }

    /// Apply one operator command; returns the resulting state.
    ///
    /// Only non-recoverable robot errors propagate; an IK failure on `Record`
    /// skips the capture and re-prompts.
    pub fn handle<R>(
        &mut self,
        command: OperatorCommand,
        robot: &R,
    ) -> Result<RecorderState, WorkspaceError>
    where
        R: Limb + InverseKinematics + ?Sized,
    {
        use OperatorCommand as C;
        use RecorderState as S;
        match (self.state, command) {
            (S::Idle, C::Start) => self.state = S::AwaitingDecision,
            (S::AwaitingDecision, C::Record) => {
                self.state = S::Recording;
                let captured = self.capture(robot);
                self.state = S::AwaitingDecision;
                captured?;
            }
            (S::Idle | S::AwaitingDecision, C::Stop) => {
                self.state = S::Stopped;
                tracing::info!(
                    arm = %self.arm,
                    recorded = self.table.len(),
                    skipped = self.skipped,
                    "recording stopped"
                );
            }
            (state, command) => {
                tracing::warn!(?state, ?command, "operator command ignored");
            }
        }
        Ok(self.state)
    }

    fn capture<R>(&mut self, robot: &R) -> Result<(), WorkspaceError>
    where
        R: Limb + InverseKinematics + ?Sized,
    {
        let pose = robot.endpoint_pose().to_kind(PoseKind::Euler);
        let current = robot.joint_angles();
        tracing::info!(joints = ?current.as_slice(), "joint angles at capture");
        match robot.inverse(&pose, self.arm) {
            Ok(q) => {
                self.table.append(pose, q)?;
                tracing::debug!(row = self.table.len() - 1, "pose recorded");
                Ok(())
            }
            Err(WorkspaceError::IkFailure { reason }) => {
                self.skipped += 1;
                tracing::warn!(%reason, "no IK solution, pose not recorded");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Drive the machine from `input` until `Stop`, input exhaustion or
    /// session shutdown. Shutdown keeps what was recorded so far.
    pub fn run<R, I>(
        mut self,
        robot: &R,
        input: &mut I,
        session: &Session,
    ) -> Result<PoseTable, WorkspaceError>
    where
        R: Limb + InverseKinematics + ?Sized,
        I: OperatorInput + ?Sized,
    {
        if self.state == RecorderState::Idle {
            self.handle(OperatorCommand::Start, robot)?;
        }
        while self.state != RecorderState::Stopped {
            if session.is_shutdown() {
                tracing::warn!(recorded = self.table.len(), "recording interrupted by shutdown");
                break;
            }
            let command = input.next_command().unwrap_or(OperatorCommand::Stop);
            self.handle(command, robot)?;
        }
        Ok(self.finish())
    }
}
