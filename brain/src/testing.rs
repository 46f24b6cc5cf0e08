//! Scripted robot for exercising the engine without hardware.

use std::collections::VecDeque;
use std::time::Duration;

use kinematics::JointConfiguration;
use tokio::time::sleep;

use crate::robot::{ControlFault, MotionGenerator, RecoveryFailure, Robot};

pub struct ScriptedRobot {
    pub joints: JointConfiguration,
    pub period: Duration,
    pub control_calls: usize,
    pub recovery_calls: usize,
    failing_controls: usize,
    recovery_results: VecDeque<Result<(), RecoveryFailure>>,
}

impl ScriptedRobot {
    pub fn new() -> Self {
        Self {
            joints: JointConfiguration::zeros(),
            period: Duration::from_millis(1),
            control_calls: 0,
            recovery_calls: 0,
            failing_controls: 0,
            recovery_results: VecDeque::new(),
        }
    }

    /// The next `count` motions fault a few cycles in.
    pub fn fail_next_controls(&mut self, count: usize) {
        self.failing_controls = count;
    }

    /// Queues recovery outcomes; once drained, recovery succeeds.
    pub fn script_recoveries(&mut self, results: impl IntoIterator<Item = Result<(), RecoveryFailure>>) {
        self.recovery_results.extend(results);
    }
}

impl Robot for ScriptedRobot {
    async fn read_joints(&mut self) -> Result<JointConfiguration, ControlFault> {
        Ok(self.joints)
    }

    async fn control<G: MotionGenerator>(&mut self, generator: &mut G) -> Result<(), ControlFault> {
        self.control_calls += 1;
        let faulting = self.failing_controls > 0;
        if faulting {
            self.failing_controls -= 1;
        }

        let mut dt = Duration::ZERO;
        let mut cycles = 0;
        loop {
            let output = generator.step(dt);
            self.joints = output.command;
            cycles += 1;
            if faulting && cycles == 3 {
                return Err(ControlFault::reflex("scripted fault"));
            }
            if output.is_finished() {
                return Ok(());
            }
            sleep(self.period).await;
            dt = self.period;
        }
    }

    async fn automatic_error_recovery(&mut self) -> Result<(), RecoveryFailure> {
        self.recovery_calls += 1;
        self.recovery_results.pop_front().unwrap_or(Ok(()))
    }
}
