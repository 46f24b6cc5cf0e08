//! Per-move trajectory controller.
//!
//! Holds one straight joint-space segment and turns elapsed time into a
//! joint command using the quintic profile. `step` is the real-time path: it
//! does a fixed amount of arithmetic and nothing else.

use std::time::Duration;

use kinematics::{InvalidMoveError, JointConfiguration, quintic, safe_duration};

use crate::config::MotionConfig;
use crate::robot::{ControlOutput, MotionGenerator};

/// A single move from `start` to `target` over `safe_duration` seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectorySegment {
    pub start: JointConfiguration,
    pub target: JointConfiguration,
    pub safe_duration: f64,
}

impl TrajectorySegment {
    /// Plans a segment, stretching `desired_duration` if a joint would
    /// exceed the configured velocity cap.
    pub fn plan(
        start: JointConfiguration,
        target: JointConfiguration,
        desired_duration: f64,
        config: &MotionConfig,
    ) -> Result<Self, InvalidMoveError> {
        let safe_duration = safe_duration(&start, &target, desired_duration, config.max_joint_velocity)?;
        Ok(Self {
            start,
            target,
            safe_duration,
        })
    }

    /// Commanded configuration `elapsed` seconds into the segment.
    pub fn sample(&self, elapsed: f64) -> JointConfiguration {
        let fraction = quintic(elapsed, self.safe_duration);
        self.start.interpolate(&self.target, fraction)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrajectoryState {
    Running,
    Completed,
    Faulted,
}

#[derive(Debug, Clone)]
pub struct TrajectoryController {
    segment: TrajectorySegment,
    /// Elapsed time at which the move reports finished.
    finish_after: Duration,
    elapsed: Duration,
    state: TrajectoryState,
}

impl TrajectoryController {
    pub fn new(segment: TrajectorySegment, completion_tolerance: f64) -> Self {
        // Rounded to whole nanoseconds once so completion is decided on the
        // same integer clock the cycles are summed on.
        let threshold = segment.safe_duration * completion_tolerance * 1e9;
        Self {
            finish_after: Duration::from_nanos(threshold.round().max(0.0) as u64),
            segment,
            elapsed: Duration::ZERO,
            state: TrajectoryState::Running,
        }
    }

    /// Plans the segment from `start` and wraps it in a running controller.
    pub fn plan(
        start: JointConfiguration,
        target: JointConfiguration,
        desired_duration: f64,
        config: &MotionConfig,
    ) -> Result<Self, InvalidMoveError> {
        let segment = TrajectorySegment::plan(start, target, desired_duration, config)?;
        Ok(Self::new(segment, config.completion_tolerance))
    }

    pub fn segment(&self) -> &TrajectorySegment {
        &self.segment
    }

    pub fn state(&self) -> TrajectoryState {
        self.state
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Marks the motion as aborted by the runtime.
    pub fn fault(&mut self) {
        if self.state == TrajectoryState::Running {
            self.state = TrajectoryState::Faulted;
        }
    }

    /// Advances by one control cycle.
    ///
    /// Once completed or faulted the controller holds the last commanded
    /// configuration and keeps reporting finished.
    pub fn step(&mut self, dt: Duration) -> ControlOutput {
        if self.state != TrajectoryState::Running {
            return ControlOutput::finished(self.segment.sample(self.elapsed.as_secs_f64()));
        }

        self.elapsed = self.elapsed.saturating_add(dt);
        let command = self.segment.sample(self.elapsed.as_secs_f64());

        if self.elapsed >= self.finish_after {
            self.state = TrajectoryState::Completed;
            ControlOutput::finished(command)
        } else {
            ControlOutput::running(command)
        }
    }
}

impl MotionGenerator for TrajectoryController {
    fn step(&mut self, dt: Duration) -> ControlOutput {
        TrajectoryController::step(self, dt)
    }
}
