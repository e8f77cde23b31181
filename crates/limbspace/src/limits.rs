//! Arms, joint names and joint limits.

use std::fmt;
use std::str::FromStr;

use crate::error::WorkspaceError;
use crate::geom3::{Configuration, JOINT_COUNT};

/// One arm of a dual-arm robot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Arm {
    Left,
    Right,
}

impl Arm {
    pub fn name(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Arm {
    type Err = WorkspaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(WorkspaceError::invalid(format!(
                "arm must be 'left' or 'right', got '{other}'"
            ))),
        }
    }
}

/// Joint short names in configuration order.
pub const JOINT_SHORT_NAMES: [&str; JOINT_COUNT] = ["s0", "s1", "e0", "e1", "w0", "w1", "w2"];

// Baxter joint ranges in radians, same for both arms.
const BAXTER_RANGES: [(f64, f64); JOINT_COUNT] = [
    (-1.7016, 1.7016),
    (-2.147, 1.047),
    (-3.0541, 3.0541),
    (-0.05, 2.618),
    (-3.059, 3.059),
    (-1.5707, 2.094),
    (-3.059, 3.059),
];

#[derive(Clone, Debug, PartialEq)]
pub struct JointLimit {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

impl JointLimit {
    #[inline]
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Ordered `name -> [min, max]` table for the seven joints of one arm.
///
/// Invariants:
/// - exactly `JOINT_COUNT` entries, all bounds finite, `min <= max`.
#[derive(Clone, Debug, PartialEq)]
pub struct JointLimits {
    joints: Vec<JointLimit>,
}

impl JointLimits {
    pub fn new(joints: Vec<JointLimit>) -> Result<Self, WorkspaceError> {
        if joints.len() != JOINT_COUNT {
            return Err(WorkspaceError::invalid(format!(
                "expected {JOINT_COUNT} joint limits, got {}",
                joints.len()
            )));
        }
        for j in &joints {
            if !(j.min.is_finite() && j.max.is_finite()) {
                return Err(WorkspaceError::invalid(format!(
                    "joint {} has non-finite limits",
                    j.name
                )));
            }
            if j.min > j.max {
                return Err(WorkspaceError::invalid(format!(
                    "joint {}: min {} exceeds max {}",
                    j.name, j.min, j.max
                )));
            }
        }
        Ok(Self { joints })
    }

    /// Factory limits of a Baxter arm; names carry the arm prefix (`left_s0`).
    pub fn baxter(arm: Arm) -> Self {
        let joints = JOINT_SHORT_NAMES
            .iter()
            .zip(BAXTER_RANGES)
            .map(|(short, (min, max))| JointLimit {
                name: format!("{}_{short}", arm.name()),
                min,
                max,
            })
            .collect();
        Self { joints }
    }

    /// Same range for every joint; names `j0..j6`.
    pub fn uniform(min: f64, max: f64) -> Result<Self, WorkspaceError> {
        Self::new(
            (0..JOINT_COUNT)
                .map(|i| JointLimit {
                    name: format!("j{i}"),
                    min,
                    max,
                })
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &JointLimit> {
        self.joints.iter()
    }

    pub fn get(&self, index: usize) -> Option<&JointLimit> {
        self.joints.get(index)
    }

    pub fn names(&self) -> Vec<&str> {
        self.joints.iter().map(|j| j.name.as_str()).collect()
    }

    /// Names with any `left_`/`right_` prefix removed, used as file headers.
    pub fn short_names(&self) -> Vec<&str> {
        self.joints
            .iter()
            .map(|j| {
                let n = j.name.as_str();
                n.strip_prefix("left_")
                    .or_else(|| n.strip_prefix("right_"))
                    .unwrap_or(n)
            })
            .collect()
    }

    pub fn contains(&self, q: &Configuration) -> bool {
        self.joints
            .iter()
            .zip(q.iter())
            .all(|(j, &v)| v >= j.min && v <= j.max)
    }

    /// Map unit-interval draws `u` to joint angles `u * (max - min) + min`.
    pub fn scale(&self, unit: &Configuration) -> Configuration {
        Configuration::from_fn(|i, _| {
            let j = &self.joints[i];
            (unit[i] * j.span() + j.min).min(j.max)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_parsing() {
        assert_eq!("left".parse::<Arm>().unwrap(), Arm::Left);
        assert_eq!(" right\n".parse::<Arm>().unwrap(), Arm::Right);
        assert!(matches!(
            "up".parse::<Arm>(),
            Err(WorkspaceError::InvalidParams { .. })
        ));
    }

    #[test]
    fn baxter_names_and_prefixes() {
        let lim = JointLimits::baxter(Arm::Right);
        assert_eq!(lim.names()[0], "right_s0");
        assert_eq!(lim.short_names(), JOINT_SHORT_NAMES.to_vec());
        assert!(lim.iter().all(|j| j.min < j.max));
    }

    #[test]
    fn scale_maps_unit_cube_onto_limits() {
        let lim = JointLimits::baxter(Arm::Left);
        let lo = lim.scale(&Configuration::zeros());
        let mid = lim.scale(&Configuration::repeat(0.5));
        for (i, j) in lim.iter().enumerate() {
            assert_eq!(lo[i], j.min);
            assert!((mid[i] - 0.5 * (j.min + j.max)).abs() < 1e-12);
        }
        assert!(lim.contains(&mid));
        let mut out = mid;
        out[3] = 10.0;
        assert!(!lim.contains(&out));
    }

    #[test]
    fn invalid_limits_are_rejected() {
        assert!(JointLimits::uniform(1.0, -1.0).is_err());
        assert!(JointLimits::uniform(f64::NEG_INFINITY, 0.0).is_err());
        assert!(JointLimits::new(Vec::new()).is_err());
    }
}
