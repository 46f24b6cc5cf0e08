//! Fault recovery around a single move.
//!
//! A faulted attempt triggers the robot's automatic error recovery and is
//! retried, up to `max_attempts` attempts in total. A failed recovery is
//! waited out with a fixed backoff and the retry goes ahead anyway.

use std::time::Duration;

use kinematics::{InvalidMoveError, JointConfiguration};
use log::{error, info, warn};
use tokio::time::sleep;

use crate::config::MotionConfig;
use crate::motion::{AttemptResult, attempt_move};
use crate::robot::{ControlFault, RecoveryFailure, Robot};

/// How a move ended once recovery has had its say.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// Finished on the first attempt.
    Completed { actual: Duration },
    /// Finished after at least one fault and retry.
    Recovered { actual: Duration, attempts: u8 },
    /// Every attempt faulted.
    Failed { fault: ControlFault, attempts: u8 },
}

impl MoveOutcome {
    pub fn actual(&self) -> Option<Duration> {
        match self {
            MoveOutcome::Completed { actual } | MoveOutcome::Recovered { actual, .. } => Some(*actual),
            MoveOutcome::Failed { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.actual().is_some()
    }

    pub fn attempts(&self) -> u8 {
        match self {
            MoveOutcome::Completed { .. } => 1,
            MoveOutcome::Recovered { attempts, .. } | MoveOutcome::Failed { attempts, .. } => *attempts,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecoveryManager {
    config: MotionConfig,
}

impl RecoveryManager {
    pub fn new(config: MotionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Runs automatic error recovery. On failure, waits out the backoff
    /// before handing the failure back.
    pub async fn recover<R: Robot>(&self, robot: &mut R) -> Result<(), RecoveryFailure> {
        info!("Attempting to recover robot from error state...");
        match robot.automatic_error_recovery().await {
            Ok(()) => {
                info!("Robot recovery successful");
                Ok(())
            }
            Err(failure) => {
                error!("{}", failure);
                warn!(
                    "Waiting {:.1}s before continuing...",
                    self.config.recovery_backoff.as_secs_f64()
                );
                sleep(self.config.recovery_backoff).await;
                Err(failure)
            }
        }
    }

    /// Executes one move, recovering and retrying after faults.
    ///
    /// Only an unplannable move is an error; faults are reported through
    /// [`MoveOutcome::Failed`] once the attempts are used up.
    pub async fn execute_move<R: Robot>(
        &self,
        robot: &mut R,
        target: &JointConfiguration,
        desired_duration: f64,
    ) -> Result<MoveOutcome, InvalidMoveError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match attempt_move(robot, target, desired_duration, &self.config).await {
                AttemptResult::Done(actual) if attempts == 1 => {
                    return Ok(MoveOutcome::Completed { actual });
                }
                AttemptResult::Done(actual) => {
                    return Ok(MoveOutcome::Recovered { actual, attempts });
                }
                AttemptResult::Fatal(e) => return Err(e),
                AttemptResult::Retryable(fault) => {
                    if attempts >= max_attempts {
                        return Ok(MoveOutcome::Failed { fault, attempts });
                    }
                    info!("Attempting to recover and retry ({}/{})...", attempts + 1, max_attempts);
                    if self.recover(robot).await.is_err() {
                        warn!("Retrying move although recovery failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRobot;
    use tokio::time::Instant;

    fn target() -> JointConfiguration {
        JointConfiguration::new([0.0, 0.4, 0.0, 0.0, 0.0, 0.0, 0.0])
    }

    fn manager() -> RecoveryManager {
        RecoveryManager::new(MotionConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_move_needs_no_recovery() {
        let mut robot = ScriptedRobot::new();

        let outcome = manager().execute_move(&mut robot, &target(), 0.5).await.unwrap();
        assert!(matches!(outcome, MoveOutcome::Completed { .. }));
        assert_eq!(outcome.attempts(), 1);
        assert_eq!(robot.recovery_calls, 0);
        assert_eq!(robot.control_calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fault_then_successful_retry() {
        let mut robot = ScriptedRobot::new();
        robot.fail_next_controls(1);

        let outcome = manager().execute_move(&mut robot, &target(), 0.5).await.unwrap();
        assert!(matches!(outcome, MoveOutcome::Recovered { attempts: 2, .. }));
        assert!(outcome.is_success());
        assert_eq!(robot.recovery_calls, 1);
        assert_eq!(robot.control_calls, 2);
        assert_eq!(robot.joints, target());
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_fault_fails_after_one_retry() {
        let mut robot = ScriptedRobot::new();
        robot.fail_next_controls(5);

        let outcome = manager().execute_move(&mut robot, &target(), 0.5).await.unwrap();
        match &outcome {
            MoveOutcome::Failed { fault, attempts } => {
                assert_eq!(*attempts, 2);
                assert_eq!(fault.message, "scripted fault");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(outcome.actual(), None);
        assert_eq!(robot.control_calls, 2);
        assert_eq!(robot.recovery_calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_recovery_backs_off_then_retries() {
        let mut robot = ScriptedRobot::new();
        robot.fail_next_controls(1);
        robot.script_recoveries([Err(RecoveryFailure("still in reflex".to_string()))]);

        let before = Instant::now();
        let outcome = manager().execute_move(&mut robot, &target(), 0.5).await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(robot.control_calls, 2);
        assert!(before.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recover_backoff_is_configurable() {
        let mut robot = ScriptedRobot::new();
        robot.script_recoveries([Err(RecoveryFailure("busy".to_string()))]);
        let manager = RecoveryManager::new(MotionConfig::default().with_recovery_backoff(Duration::from_millis(250)));

        let before = Instant::now();
        assert!(manager.recover(&mut robot).await.is_err());
        let waited = before.elapsed();
        assert!(waited >= Duration::from_millis(250));
        assert!(waited < Duration::from_secs(1));

        let before = Instant::now();
        assert!(manager.recover(&mut robot).await.is_ok());
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_never_recovers() {
        let mut robot = ScriptedRobot::new();
        robot.fail_next_controls(1);
        let manager = RecoveryManager::new(MotionConfig::default().with_max_attempts(1));

        let outcome = manager.execute_move(&mut robot, &target(), 0.5).await.unwrap();
        assert!(matches!(outcome, MoveOutcome::Failed { attempts: 1, .. }));
        assert_eq!(robot.recovery_calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_move_is_not_retried() {
        let mut robot = ScriptedRobot::new();

        let result = manager().execute_move(&mut robot, &target(), 0.0).await;
        assert_eq!(result.unwrap_err(), InvalidMoveError::NonPositiveDuration(0.0));
        assert_eq!(robot.control_calls, 0);
        assert_eq!(robot.recovery_calls, 0);
    }
}
