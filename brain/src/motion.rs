//! One attempt at one move.

use std::time::Duration;

use kinematics::{InvalidMoveError, JointConfiguration};
use log::{debug, error};
use tokio::time::{Instant, sleep};

use crate::config::MotionConfig;
use crate::controller::TrajectoryController;
use crate::robot::{ControlFault, Robot};

/// Result of a single attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptResult {
    /// Move finished; wall-clock time from start of motion to finish.
    Done(Duration),
    /// The runtime aborted the motion; recovery and a retry may help.
    Retryable(ControlFault),
    /// The move itself is unplannable; retrying cannot help.
    Fatal(InvalidMoveError),
}

/// Moves from wherever the robot is now to `target`.
///
/// The start configuration is read from the robot, the segment is planned
/// under the velocity cap, and the controller is handed to the runtime.
/// After a finished move the settling pause is observed before returning.
pub async fn attempt_move<R: Robot>(
    robot: &mut R,
    target: &JointConfiguration,
    desired_duration: f64,
    config: &MotionConfig,
) -> AttemptResult {
    let start = match robot.read_joints().await {
        Ok(q) => q,
        Err(fault) => {
            error!("Failed to read joint state: {}", fault);
            return AttemptResult::Retryable(fault);
        }
    };

    let mut controller = match TrajectoryController::plan(start, *target, desired_duration, config) {
        Ok(controller) => controller,
        Err(e) => return AttemptResult::Fatal(e),
    };
    debug!(
        "Moving {} -> {} over {:.3}s",
        start,
        target,
        controller.segment().safe_duration
    );

    let started = Instant::now();
    if let Err(fault) = robot.control(&mut controller).await {
        controller.fault();
        error!("Control fault during joint motion: {}", fault);
        return AttemptResult::Retryable(fault);
    }
    let actual = started.elapsed();

    sleep(config.settle_time).await;
    AttemptResult::Done(actual)
}
