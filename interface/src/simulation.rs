//! Stand-in robot for running the dance without hardware.
//!
//! Commands are applied instantly at a fixed control period. An optional
//! joint velocity envelope mimics the robot's own safety reflex: crossing it
//! aborts the motion and leaves the robot in an error state until recovery.

use std::time::Duration;

use brain::{ControlFault, MotionGenerator, RecoveryFailure, Robot};
use kinematics::JointConfiguration;
use log::debug;
use tokio::time::{MissedTickBehavior, interval};

pub struct SimulatedRobot {
    joints: JointConfiguration,
    period: Duration,
    velocity_limit: Option<f64>,
    in_error: bool,
}

impl SimulatedRobot {
    pub fn new(period: Duration) -> Self {
        Self {
            joints: JointConfiguration::zeros(),
            period,
            velocity_limit: None,
            in_error: false,
        }
    }

    pub fn with_velocity_limit(mut self, velocity_limit: Option<f64>) -> Self {
        self.velocity_limit = velocity_limit;
        self
    }

    fn check_velocity(&self, command: &JointConfiguration, dt: Duration) -> Result<(), ControlFault> {
        let (Some(limit), false) = (self.velocity_limit, dt.is_zero()) else {
            return Ok(());
        };
        let (axis, delta) = self.joints.largest_displacement(command);
        let velocity = delta / dt.as_secs_f64();
        if velocity > limit {
            return Err(ControlFault::reflex(format!(
                "joint {} velocity {:.3} rad/s exceeds {:.3} rad/s",
                axis + 1,
                velocity,
                limit
            )));
        }
        Ok(())
    }
}

impl Robot for SimulatedRobot {
    async fn read_joints(&mut self) -> Result<JointConfiguration, ControlFault> {
        Ok(self.joints)
    }

    async fn control<G: MotionGenerator>(&mut self, generator: &mut G) -> Result<(), ControlFault> {
        if self.in_error {
            return Err(ControlFault::rejected("robot is in error state"));
        }

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        let mut dt = Duration::ZERO;
        loop {
            let output = generator.step(dt);
            if let Err(fault) = self.check_velocity(&output.command, dt) {
                self.in_error = true;
                return Err(fault);
            }
            self.joints = output.command;
            if output.is_finished() {
                debug!("Simulated motion finished at {}", self.joints);
                return Ok(());
            }

            ticker.tick().await;
            dt = self.period;
        }
    }

    async fn automatic_error_recovery(&mut self) -> Result<(), RecoveryFailure> {
        self.in_error = false;
        Ok(())
    }
}
