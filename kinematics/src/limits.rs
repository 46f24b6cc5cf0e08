//! Joint velocity limits for point-to-point moves.
//!
//! A move is given a desired duration. If the joint travelling furthest would
//! need to exceed the velocity cap to make it in time, the duration is
//! stretched to the shortest one that keeps that joint at the cap.

use log::warn;
use thiserror::Error;

use crate::JointConfiguration;

/// Default per-joint velocity cap in rad/s.
pub const DEFAULT_MAX_JOINT_VELOCITY: f64 = 2.0;

/// A move that cannot be planned.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InvalidMoveError {
    #[error("move duration must be a positive number of seconds, got {0}")]
    NonPositiveDuration(f64),
    #[error("joint velocity limit must be positive, got {0} rad/s")]
    NonPositiveVelocityLimit(f64),
    #[error("joint {} of the {which} configuration is not a finite angle", .axis + 1)]
    NonFiniteJoint { which: &'static str, axis: usize },
}

/// Outcome of checking a move against the velocity cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityCheck {
    /// Axis with the largest displacement (first one on ties).
    pub critical_axis: usize,
    /// Largest absolute displacement in radians.
    pub max_delta: f64,
    /// Speed the critical axis would need to finish in the desired time.
    pub required_velocity: f64,
    /// Shortest duration that respects the cap and the desired duration.
    pub safe_duration: f64,
}

impl VelocityCheck {
    pub fn is_extended(&self, desired_duration: f64) -> bool {
        self.safe_duration > desired_duration
    }
}

/// Checks a move against `max_joint_velocity` without logging.
pub fn velocity_check(
    start: &JointConfiguration,
    target: &JointConfiguration,
    desired_duration: f64,
    max_joint_velocity: f64,
) -> Result<VelocityCheck, InvalidMoveError> {
    if !desired_duration.is_finite() || desired_duration <= 0.0 {
        return Err(InvalidMoveError::NonPositiveDuration(desired_duration));
    }
    if !max_joint_velocity.is_finite() || max_joint_velocity <= 0.0 {
        return Err(InvalidMoveError::NonPositiveVelocityLimit(max_joint_velocity));
    }
    if let Some(axis) = start.first_non_finite() {
        return Err(InvalidMoveError::NonFiniteJoint { which: "start", axis });
    }
    if let Some(axis) = target.first_non_finite() {
        return Err(InvalidMoveError::NonFiniteJoint { which: "target", axis });
    }

    let (critical_axis, max_delta) = start.largest_displacement(target);
    let required_velocity = max_delta / desired_duration;

    let safe_duration = if required_velocity <= max_joint_velocity {
        desired_duration
    } else {
        // Rounding must never push the result below what was asked for.
        (max_delta / max_joint_velocity).max(desired_duration)
    };

    Ok(VelocityCheck {
        critical_axis,
        max_delta,
        required_velocity,
        safe_duration,
    })
}

/// Returns the shortest duration no less than `desired_duration` under which
/// no joint exceeds `max_joint_velocity`, warning when the move had to be
/// slowed down.
pub fn safe_duration(
    start: &JointConfiguration,
    target: &JointConfiguration,
    desired_duration: f64,
    max_joint_velocity: f64,
) -> Result<f64, InvalidMoveError> {
    let check = velocity_check(start, target, desired_duration, max_joint_velocity)?;

    if check.is_extended(desired_duration) {
        warn!(
            "Requested time {:.3}s is too fast: joint {} would need {:.3} rad/s (limit {:.3} rad/s), using {:.3}s",
            desired_duration,
            check.critical_axis + 1,
            check.required_velocity,
            max_joint_velocity,
            check.safe_duration
        );
    }

    Ok(check.safe_duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JOINT_COUNT;
    use proptest::prelude::*;

    fn unit_first_axis() -> JointConfiguration {
        JointConfiguration::new([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])
    }

    #[test]
    fn test_slow_move_keeps_desired_duration() {
        let start = JointConfiguration::zeros();
        let check = velocity_check(&start, &unit_first_axis(), 10.0, DEFAULT_MAX_JOINT_VELOCITY).unwrap();

        assert_eq!(check.critical_axis, 0);
        assert_eq!(check.max_delta, 1.0);
        assert!((check.required_velocity - 0.1).abs() < 1e-12);
        assert_eq!(check.safe_duration, 10.0);
        assert!(!check.is_extended(10.0));
    }

    #[test]
    fn test_fast_move_is_stretched_to_the_cap() {
        let start = JointConfiguration::zeros();
        let safe = safe_duration(&start, &unit_first_axis(), 0.1, DEFAULT_MAX_JOINT_VELOCITY).unwrap();
        assert_eq!(safe, 0.5);

        let check = velocity_check(&start, &unit_first_axis(), 0.1, DEFAULT_MAX_JOINT_VELOCITY).unwrap();
        assert!((check.required_velocity - 10.0).abs() < 1e-9);
        assert!(check.is_extended(0.1));
    }

    #[test]
    fn test_critical_axis_is_largest_displacement() {
        let start = JointConfiguration::new([0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let target = JointConfiguration::new([0.0, 0.0, 0.0, 0.0, 0.0, -3.0, 0.0]);
        let check = velocity_check(&start, &target, 1.0, 2.0).unwrap();

        assert_eq!(check.critical_axis, 5);
        assert_eq!(check.safe_duration, 1.5);
    }

    #[test]
    fn test_identical_configurations_keep_desired_duration() {
        let q = JointConfiguration::new([0.3; JOINT_COUNT]);
        assert_eq!(safe_duration(&q, &q, 0.001, 2.0).unwrap(), 0.001);
    }

    #[test]
    fn test_velocity_limit_is_configurable() {
        let start = JointConfiguration::zeros();
        assert_eq!(safe_duration(&start, &unit_first_axis(), 0.1, 0.5).unwrap(), 2.0);
    }

    #[test]
    fn test_rejects_non_positive_duration() {
        let start = JointConfiguration::zeros();
        for desired in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                safe_duration(&start, &unit_first_axis(), desired, 2.0),
                Err(InvalidMoveError::NonPositiveDuration(_))
            ));
        }
    }

    #[test]
    fn test_rejects_bad_limit_and_joints() {
        let start = JointConfiguration::zeros();
        assert_eq!(
            safe_duration(&start, &unit_first_axis(), 1.0, 0.0),
            Err(InvalidMoveError::NonPositiveVelocityLimit(0.0))
        );

        let mut joints = [0.0; JOINT_COUNT];
        joints[3] = f64::INFINITY;
        let target = JointConfiguration::new(joints);
        assert_eq!(
            safe_duration(&start, &target, 1.0, 2.0),
            Err(InvalidMoveError::NonFiniteJoint { which: "target", axis: 3 })
        );
    }

    fn configuration() -> impl Strategy<Value = JointConfiguration> {
        prop::array::uniform7(-3.0f64..3.0).prop_map(JointConfiguration::new)
    }

    proptest! {
        #[test]
        fn prop_never_shorter_and_within_cap(
            start in configuration(),
            target in configuration(),
            desired in 0.001f64..20.0,
            limit in 0.1f64..5.0,
        ) {
            let safe = safe_duration(&start, &target, desired, limit).unwrap();
            let (_, max_delta) = start.largest_displacement(&target);

            prop_assert!(safe >= desired);
            prop_assert!(max_delta / safe <= limit + 1e-9);
        }

        #[test]
        fn prop_minimal(
            start in configuration(),
            target in configuration(),
            desired in 0.001f64..20.0,
            limit in 0.1f64..5.0,
        ) {
            let safe = safe_duration(&start, &target, desired, limit).unwrap();
            let (_, max_delta) = start.largest_displacement(&target);

            // Anything noticeably shorter either undercuts the request or breaks the cap.
            let shorter = safe * (1.0 - 1e-6);
            prop_assert!(shorter < desired || max_delta / shorter > limit);
        }
    }
}
