//! Contract between the motion engine and the robot control runtime.
//!
//! The runtime owns the real-time loop. Once per control cycle it hands the
//! active [`MotionGenerator`] the duration of the previous cycle and applies
//! the command it gets back, until the generator reports
//! [`ControlStatus::Finished`] or the runtime detects a fault.

use std::fmt;
use std::time::Duration;

use kinematics::JointConfiguration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlStatus {
    Continue,
    Finished,
}

/// What a generator returns for one control cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlOutput {
    pub status: ControlStatus,
    pub command: JointConfiguration,
}

impl ControlOutput {
    pub fn running(command: JointConfiguration) -> Self {
        Self {
            status: ControlStatus::Continue,
            command,
        }
    }

    pub fn finished(command: JointConfiguration) -> Self {
        Self {
            status: ControlStatus::Finished,
            command,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == ControlStatus::Finished
    }
}

/// Called once per control cycle with the previous cycle's duration.
///
/// Implementations run inside the runtime's real-time loop: no blocking, no
/// I/O, no unbounded allocation.
pub trait MotionGenerator {
    fn step(&mut self, dt: Duration) -> ControlOutput;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Link to the robot lost or stalled.
    Communication,
    /// The robot's own safety envelope stopped the motion.
    Reflex,
    /// The runtime refused to start or continue the motion.
    Rejected,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::Communication => write!(f, "communication"),
            FaultKind::Reflex => write!(f, "reflex"),
            FaultKind::Rejected => write!(f, "rejected"),
        }
    }
}

/// Motion aborted by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} fault: {message}")]
pub struct ControlFault {
    pub kind: FaultKind,
    pub message: String,
}

impl ControlFault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn communication(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Communication, message)
    }

    pub fn reflex(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Reflex, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Rejected, message)
    }
}

/// Automatic error recovery did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("error recovery failed: {0}")]
pub struct RecoveryFailure(pub String);

/// A robot the engine can move.
#[allow(async_fn_in_trait)]
pub trait Robot {
    /// Current measured joint configuration.
    async fn read_joints(&mut self) -> Result<JointConfiguration, ControlFault>;

    /// Runs `generator` once per control cycle until it finishes or the
    /// motion faults. Only one motion runs at a time.
    async fn control<G: MotionGenerator>(&mut self, generator: &mut G) -> Result<(), ControlFault>;

    /// Clears the robot's error state so motions can be commanded again.
    async fn automatic_error_recovery(&mut self) -> Result<(), RecoveryFailure>;
}
