use std::time::Duration;

use kinematics::{DEFAULT_MAX_JOINT_VELOCITY, InvalidMoveError};

/// A move is finished once its elapsed time reaches this multiple of the
/// planned duration.
pub const DEFAULT_COMPLETION_TOLERANCE: f64 = 1.01;
pub const DEFAULT_SETTLE_TIME: Duration = Duration::from_millis(100);
pub const DEFAULT_RECOVERY_BACKOFF: Duration = Duration::from_secs(5);
/// First try plus one retry.
pub const DEFAULT_MAX_ATTEMPTS: u8 = 2;

/// Tunables for executing moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionConfig {
    /// Per-joint velocity cap in rad/s used to stretch fast moves.
    pub max_joint_velocity: f64,
    /// Multiple of the planned duration after which a move reports finished.
    pub completion_tolerance: f64,
    /// Pause after each completed move, outside the control loop.
    pub settle_time: Duration,
    /// Wait applied when automatic error recovery itself fails.
    pub recovery_backoff: Duration,
    /// Attempts per move, including the first one.
    pub max_attempts: u8,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            max_joint_velocity: DEFAULT_MAX_JOINT_VELOCITY,
            completion_tolerance: DEFAULT_COMPLETION_TOLERANCE,
            settle_time: DEFAULT_SETTLE_TIME,
            recovery_backoff: DEFAULT_RECOVERY_BACKOFF,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl MotionConfig {
    pub fn with_max_joint_velocity(mut self, max_joint_velocity: f64) -> Self {
        self.max_joint_velocity = max_joint_velocity;
        self
    }

    /// Values below 1.0 are raised to 1.0 so a move never stops short.
    pub fn with_completion_tolerance(mut self, completion_tolerance: f64) -> Self {
        self.completion_tolerance = completion_tolerance.max(1.0);
        self
    }

    pub fn with_settle_time(mut self, settle_time: Duration) -> Self {
        self.settle_time = settle_time;
        self
    }

    pub fn with_recovery_backoff(mut self, recovery_backoff: Duration) -> Self {
        self.recovery_backoff = recovery_backoff;
        self
    }

    /// At least one attempt is always made.
    pub fn with_max_attempts(mut self, max_attempts: u8) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Rejects a velocity cap no move could be planned under.
    pub fn validated(self) -> Result<Self, InvalidMoveError> {
        if !self.max_joint_velocity.is_finite() || self.max_joint_velocity <= 0.0 {
            return Err(InvalidMoveError::NonPositiveVelocityLimit(self.max_joint_velocity));
        }
        Ok(self)
    }
}
