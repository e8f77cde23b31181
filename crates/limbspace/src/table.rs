//! Pose tables: parallel (pose, configuration) rows and their flat-file codec.
//!
//! File format
//! - UTF-8 text, one comma-separated numeric row per sample.
//! - Lines starting with `#` are comments (the writer emits a single header line
//!   naming the columns); blank lines are ignored.
//! - Poses carry 6 (Euler) or 7 (quaternion) columns, consistently per file;
//!   configurations carry 7 joint angles.
//! - Values are written with 18 fractional digits in scientific notation, which
//!   round-trips every `f64` exactly and stays readable by `numpy.loadtxt`.

use std::fs;
use std::path::Path;

use nalgebra::Vector3;

use crate::error::WorkspaceError;
use crate::geom3::{distance_squared, Configuration, Pose, PoseKind, JOINT_COUNT};

/// File names used by the recorder (`poses.txt`) and sampler (`poses2.txt`).
pub fn table_file_names(suffix: &str) -> (String, String) {
    (
        format!("poses{suffix}.txt"),
        format!("configurations{suffix}.txt"),
    )
}

/// Ordered (pose, configuration) pairs with a fixed pose kind.
///
/// Invariants:
/// - `poses.len() == configs.len()`.
/// - Every pose has kind `kind`.
#[derive(Clone, Debug, PartialEq)]
pub struct PoseTable {
    kind: PoseKind,
    poses: Vec<Pose>,
    configs: Vec<Configuration>,
}

impl PoseTable {
    pub fn new(kind: PoseKind) -> Self {
        Self {
            kind,
            poses: Vec::new(),
            configs: Vec::new(),
        }
    }

    pub fn from_pairs(
        kind: PoseKind,
        pairs: impl IntoIterator<Item = (Pose, Configuration)>,
    ) -> Result<Self, WorkspaceError> {
        let mut table = Self::new(kind);
        for (pose, q) in pairs {
            table.append(pose, q)?;
        }
        Ok(table)
    }

    #[inline]
    pub fn kind(&self) -> PoseKind {
        self.kind
    }
    #[inline]
    pub fn len(&self) -> usize {
        self.poses.len()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn poses(&self) -> &[Pose] {
        &self.poses
    }

    pub fn configurations(&self) -> &[Configuration] {
        &self.configs
    }

    pub fn get(&self, index: usize) -> Option<(&Pose, &Configuration)> {
        Some((self.poses.get(index)?, self.configs.get(index)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Pose, &Configuration)> {
        self.poses.iter().zip(self.configs.iter())
    }

    /// Add one row. Duplicates are allowed; the pose kind must match.
    pub fn append(&mut self, pose: Pose, q: Configuration) -> Result<(), WorkspaceError> {
        if pose.kind() != self.kind {
            return Err(WorkspaceError::DimensionMismatch {
                expected: self.kind.dim(),
                found: pose.kind().dim(),
            });
        }
        self.poses.push(pose);
        self.configs.push(q);
        Ok(())
    }

    /// Position columns, in row order, for hull construction.
    pub fn positions(&self) -> Vec<Vector3<f64>> {
        self.poses.iter().map(|p| p.position).collect()
    }

    /// Index of the stored pose closest to `query` (squared Euclidean distance
    /// over full rows). Ties resolve to the lowest index.
    pub fn nearest_pose(&self, query: &[f64]) -> Result<usize, WorkspaceError> {
        if query.len() != self.kind.dim() {
            return Err(WorkspaceError::DimensionMismatch {
                expected: self.kind.dim(),
                found: query.len(),
            });
        }
        if self.is_empty() {
            return Err(WorkspaceError::EmptyTable);
        }
        let mut best = (0, f64::INFINITY);
        for (i, pose) in self.poses.iter().enumerate() {
            let d = distance_squared(&pose.to_row(), query)?;
            if d < best.1 {
                best = (i, d);
            }
        }
        Ok(best.0)
    }

    /// Read a table from two parallel files.
    pub fn load(poses_path: &Path, configs_path: &Path) -> Result<Self, WorkspaceError> {
        let pose_rows = read_rows(poses_path)?;
        let config_rows = read_rows(configs_path)?;
        if pose_rows.len() != config_rows.len() {
            return Err(WorkspaceError::format(
                configs_path,
                None,
                format!(
                    "{} configuration rows do not match {} pose rows in {}",
                    config_rows.len(),
                    pose_rows.len(),
                    poses_path.display()
                ),
            ));
        }

        let kind = match pose_rows.first() {
            Some((line, row)) => PoseKind::from_dim(row.len()).ok_or_else(|| {
                WorkspaceError::format(
                    poses_path,
                    Some(*line),
                    format!("pose rows need 6 or 7 columns, got {}", row.len()),
                )
            })?,
            None => PoseKind::Euler,
        };

        let mut table = Self::new(kind);
        for ((pose_line, pose_row), (cfg_line, cfg_row)) in pose_rows.iter().zip(&config_rows) {
            if pose_row.len() != kind.dim() {
                return Err(WorkspaceError::format(
                    poses_path,
                    Some(*pose_line),
                    format!("expected {} columns, got {}", kind.dim(), pose_row.len()),
                ));
            }
            if cfg_row.len() != JOINT_COUNT {
                return Err(WorkspaceError::format(
                    configs_path,
                    Some(*cfg_line),
                    format!("expected {JOINT_COUNT} columns, got {}", cfg_row.len()),
                ));
            }
            let pose = Pose::from_row(pose_row)?;
            table.append(pose, Configuration::from_column_slice(cfg_row))?;
        }
        Ok(table)
    }

    /// Write both files, creating parent directories. `joint_names` label the
    /// configuration columns.
    pub fn save(
        &self,
        poses_path: &Path,
        configs_path: &Path,
        joint_names: &[&str],
    ) -> Result<(), WorkspaceError> {
        if joint_names.len() != JOINT_COUNT {
            return Err(WorkspaceError::invalid(format!(
                "expected {JOINT_COUNT} joint names, got {}",
                joint_names.len()
            )));
        }
        let pose_rows: Vec<Vec<f64>> = self.poses.iter().map(Pose::to_row).collect();
        let cfg_rows: Vec<Vec<f64>> = self.configs.iter().map(|q| q.iter().copied().collect()).collect();
        write_rows(poses_path, self.kind.header(), &pose_rows)?;
        write_rows(configs_path, &joint_names.join(", "), &cfg_rows)?;
        tracing::debug!(
            rows = self.len(),
            poses = %poses_path.display(),
            configurations = %configs_path.display(),
            "pose table saved"
        );
        Ok(())
    }

    /// Write `poses{suffix}.txt` and `configurations{suffix}.txt` into `dir`.
    pub fn save_dir(
        &self,
        dir: &Path,
        suffix: &str,
        joint_names: &[&str],
    ) -> Result<(std::path::PathBuf, std::path::PathBuf), WorkspaceError> {
        let (poses_name, configs_name) = table_file_names(suffix);
        let poses_path = dir.join(poses_name);
        let configs_path = dir.join(configs_name);
        self.save(&poses_path, &configs_path, joint_names)?;
        Ok((poses_path, configs_path))
    }
}

/// Parse numeric rows, returning each with its 1-based line number.
fn read_rows(path: &Path) -> Result<Vec<(usize, Vec<f64>)>, WorkspaceError> {
    let text = fs::read_to_string(path).map_err(|e| WorkspaceError::io(path, e))?;
    let mut rows = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = line
            .split(',')
            .map(|field| field.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| WorkspaceError::format(path, Some(idx + 1), format!("bad number: {e}")))?;
        rows.push((idx + 1, row));
    }
    Ok(rows)
}

fn write_rows(path: &Path, header: &str, rows: &[Vec<f64>]) -> Result<(), WorkspaceError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| WorkspaceError::io(parent, e))?;
        }
    }
    let mut out = format!("# {header}\n");
    for row in rows {
        let fields: Vec<String> = row.iter().map(|v| format!("{v:.18e}")).collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    fs::write(path, out).map_err(|e| WorkspaceError::io(path, e))
}
