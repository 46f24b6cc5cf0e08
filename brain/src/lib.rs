//! Motion execution for a 7-joint arm dancing through a cyclic list of poses.
//!
//! Moves are loaded from a move file ([`moves`]), each one planned under a
//! joint velocity cap and played back with a quintic profile by a
//! [`TrajectoryController`] that the robot runtime steps once per control
//! cycle. Faults are handled by the [`RecoveryManager`] and the
//! [`MoveSequencer`] keeps the dance going pass after pass.

pub mod config;
pub mod controller;
pub mod motion;
pub mod moves;
pub mod recovery;
pub mod robot;
pub mod sequencer;

#[cfg(test)]
mod testing;

pub use config::MotionConfig;
pub use controller::{TrajectoryController, TrajectorySegment, TrajectoryState};
pub use motion::{AttemptResult, attempt_move};
pub use moves::{ConfigParseError, LineError, Move, MoveSequence, load_moves, parse_moves};
pub use recovery::{MoveOutcome, RecoveryManager};
pub use robot::{
    ControlFault, ControlOutput, ControlStatus, FaultKind, MotionGenerator, RecoveryFailure, Robot,
};
pub use sequencer::{CycleGate, FixedCycles, MoveReport, MoveSequencer, RunSummary, SequencerError};
