//! Error type shared by the table, hull, sampler and orchestrator.
//!
//! Recoverable variants (`OutOfWorkspace`, `IkFailure`) drive retry/skip
//! decisions inside the crate; everything else ends the current action and is
//! surfaced to the operator.

use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum WorkspaceError {
    /// A pose or configuration file is missing or unreadable.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Malformed table contents. `line` is 1-based when a single row is at fault.
    Format {
        path: PathBuf,
        line: Option<usize>,
        reason: String,
    },
    DimensionMismatch {
        expected: usize,
        found: usize,
    },
    EmptyTable,
    /// Hull construction impossible (too few, coplanar or non-finite points).
    DegenerateGeometry {
        reason: String,
    },
    /// A sampled pose fell outside the workspace hull. Expected; callers retry.
    OutOfWorkspace,
    IkFailure {
        reason: String,
    },
    /// The sampler exhausted its attempt budget before collecting enough samples.
    RetryLimit {
        accepted: usize,
        attempts: u64,
    },
    /// The sampler exceeded its wall-clock budget.
    Timeout {
        accepted: usize,
        attempts: u64,
    },
    /// The session was shut down while an action was running.
    Cancelled,
    InvalidParams {
        reason: String,
    },
}

impl WorkspaceError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn format(path: &Path, line: Option<usize>, reason: impl Into<String>) -> Self {
        Self::Format {
            path: path.to_path_buf(),
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateGeometry {
            reason: reason.into(),
        }
    }

    pub(crate) fn ik(reason: impl Into<String>) -> Self {
        Self::IkFailure {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            reason: reason.into(),
        }
    }

    /// True for failures the crate itself retries or skips.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::OutOfWorkspace | Self::IkFailure { .. })
    }
}

impl fmt::Display for WorkspaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            Self::Format {
                path,
                line: Some(line),
                reason,
            } => write!(f, "{}:{line}: {reason}", path.display()),
            Self::Format {
                path,
                line: None,
                reason,
            } => write!(f, "{}: {reason}", path.display()),
            Self::DimensionMismatch { expected, found } => {
                write!(f, "dimension mismatch: expected {expected} entries, got {found}")
            }
            Self::EmptyTable => write!(f, "pose table is empty"),
            Self::DegenerateGeometry { reason } => write!(f, "degenerate workspace: {reason}"),
            Self::OutOfWorkspace => write!(f, "sampled pose does not lie in workspace"),
            Self::IkFailure { reason } => write!(f, "inverse kinematics failed: {reason}"),
            Self::RetryLimit { accepted, attempts } => write!(
                f,
                "gave up after {attempts} attempts with {accepted} accepted samples"
            ),
            Self::Timeout { accepted, attempts } => write!(
                f,
                "sampling timed out after {attempts} attempts with {accepted} accepted samples"
            ),
            Self::Cancelled => write!(f, "action cancelled by session shutdown"),
            Self::InvalidParams { reason } => write!(f, "invalid params: {reason}"),
        }
    }
}

impl std::error::Error for WorkspaceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
