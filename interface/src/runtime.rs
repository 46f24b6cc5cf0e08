//! Robot runtime backed by the zenoh joint state / joint command topics.

use std::time::Duration;

use brain::{ControlFault, MotionGenerator, RecoveryFailure, Robot};
use kinematics::JointConfiguration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval, timeout};

use crate::communication::CommunicationLayer;

/// Shortest time to wait for the driver to answer an error recovery request.
const MIN_RECOVERY_TIMEOUT: Duration = Duration::from_secs(1);

/// Outbound side of the robot connection: where commands go and who is
/// asked to clear a fault.
#[allow(async_fn_in_trait)]
pub trait RobotLink {
    async fn publish_joint_command(&self, command: &JointConfiguration) -> Result<(), Box<dyn std::error::Error>>;
    async fn request_error_recovery(&self, timeout: Duration) -> Result<(), String>;
}

impl RobotLink for CommunicationLayer {
    async fn publish_joint_command(&self, command: &JointConfiguration) -> Result<(), Box<dyn std::error::Error>> {
        CommunicationLayer::publish_joint_command(self, command).await
    }

    async fn request_error_recovery(&self, timeout: Duration) -> Result<(), String> {
        CommunicationLayer::request_error_recovery(self, timeout).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MeasuredJoints {
    joints: JointConfiguration,
    received: Instant,
}

impl MeasuredJoints {
    pub fn now(joints: JointConfiguration) -> Self {
        Self {
            joints,
            received: Instant::now(),
        }
    }
}

pub struct ZenohRobot<L = CommunicationLayer> {
    link: L,
    state: watch::Receiver<Option<MeasuredJoints>>,
    period: Duration,
    state_timeout: Duration,
}

impl ZenohRobot {
    pub async fn connect(
        host: &str,
        port: u16,
        period: Duration,
        state_timeout: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let endpoint = format!("tcp/{}:{}", host, port);
        let comms = CommunicationLayer::connect(Some(&endpoint)).await?;

        let (tx, state) = watch::channel(None);
        comms
            .subscribe_joint_state(move |joints| {
                tx.send_replace(Some(MeasuredJoints::now(joints)));
            })
            .await?;

        Ok(Self::with_link(comms, state, period, state_timeout))
    }
}

impl<L: RobotLink> ZenohRobot<L> {
    /// Runs against `link`, reading joint state from `state`.
    pub fn with_link(
        link: L,
        state: watch::Receiver<Option<MeasuredJoints>>,
        period: Duration,
        state_timeout: Duration,
    ) -> Self {
        Self {
            link,
            state,
            period,
            state_timeout,
        }
    }

    /// Latest joint state, provided it is fresh enough to control against.
    fn latest(&self) -> Result<JointConfiguration, ControlFault> {
        check_fresh(*self.state.borrow(), self.state_timeout)
    }
}

fn check_fresh(measured: Option<MeasuredJoints>, state_timeout: Duration) -> Result<JointConfiguration, ControlFault> {
    match measured {
        Some(m) if m.received.elapsed() <= state_timeout => Ok(m.joints),
        Some(m) => Err(ControlFault::communication(format!(
            "joint state stalled for {} ms",
            m.received.elapsed().as_millis()
        ))),
        None => Err(ControlFault::communication("no joint state received")),
    }
}

impl<L: RobotLink> Robot for ZenohRobot<L> {
    async fn read_joints(&mut self) -> Result<JointConfiguration, ControlFault> {
        match timeout(self.state_timeout, self.state.wait_for(Option::is_some)).await {
            Ok(Ok(_)) => {}
            Ok(Err(_)) => return Err(ControlFault::communication("joint state subscription closed")),
            Err(_) => return Err(ControlFault::communication("no joint state received")),
        }
        self.latest()
    }

    async fn control<G: MotionGenerator>(&mut self, generator: &mut G) -> Result<(), ControlFault> {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        let mut last = Instant::now();
        let mut dt = Duration::ZERO;
        loop {
            self.latest()?;
            let output = generator.step(dt);
            self.link
                .publish_joint_command(&output.command)
                .await
                .map_err(|e| ControlFault::communication(e.to_string()))?;
            if output.is_finished() {
                return Ok(());
            }

            ticker.tick().await;
            let now = Instant::now();
            dt = now - last;
            last = now;
        }
    }

    async fn automatic_error_recovery(&mut self) -> Result<(), RecoveryFailure> {
        self.link
            .request_error_recovery(self.state_timeout.max(MIN_RECOVERY_TIMEOUT))
            .await
            .map_err(RecoveryFailure)
    }
}
