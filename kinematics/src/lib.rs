use std::fmt;
use std::ops::Index;

use nalgebra::SVector;

pub mod limits;
pub mod profile;

pub use limits::{
    DEFAULT_MAX_JOINT_VELOCITY, InvalidMoveError, VelocityCheck, safe_duration, velocity_check,
};
pub use profile::quintic;

/// Number of joints on the manipulator.
pub const JOINT_COUNT: usize = 7;

/// Joint angles in radians, one per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointConfiguration(SVector<f64, JOINT_COUNT>);

impl Default for JointConfiguration {
    fn default() -> Self {
        Self::zeros()
    }
}

impl From<[f64; JOINT_COUNT]> for JointConfiguration {
    fn from(joints: [f64; JOINT_COUNT]) -> Self {
        Self::new(joints)
    }
}

impl JointConfiguration {
    pub fn new(joints: [f64; JOINT_COUNT]) -> Self {
        Self(SVector::from(joints))
    }

    pub fn zeros() -> Self {
        Self(SVector::zeros())
    }

    /// Builds a configuration from a slice, which must hold exactly
    /// `JOINT_COUNT` values.
    pub fn from_slice(joints: &[f64]) -> Option<Self> {
        if joints.len() != JOINT_COUNT {
            return None;
        }
        Some(Self(SVector::from_column_slice(joints)))
    }

    pub fn to_array(&self) -> [f64; JOINT_COUNT] {
        let mut joints = [0.0; JOINT_COUNT];
        joints.copy_from_slice(self.0.as_slice());
        joints
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }

    /// Index of the first non-finite joint, if any.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.0.iter().position(|q| !q.is_finite())
    }

    /// Blends towards `target`: `self + fraction * (target - self)` on every axis.
    pub fn interpolate(&self, target: &JointConfiguration, fraction: f64) -> JointConfiguration {
        JointConfiguration(self.0 + (target.0 - self.0) * fraction)
    }

    /// The axis with the largest absolute displacement towards `target` and
    /// that displacement. Ties resolve to the lowest axis index.
    pub fn largest_displacement(&self, target: &JointConfiguration) -> (usize, f64) {
        let mut axis = 0;
        let mut max_delta = 0.0;
        for (i, (from, to)) in self.0.iter().zip(target.0.iter()).enumerate() {
            let delta = (to - from).abs();
            if delta > max_delta {
                max_delta = delta;
                axis = i;
            }
        }
        (axis, max_delta)
    }
}

impl Index<usize> for JointConfiguration {
    type Output = f64;

    fn index(&self, axis: usize) -> &f64 {
        &self.0[axis]
    }
}

impl fmt::Display for JointConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, q) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:.4}", q)?;
        }
        write!(f, "]")
    }
}
