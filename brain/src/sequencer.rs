//! Cyclic execution of a move sequence.

use std::fmt;

use kinematics::InvalidMoveError;
use log::{error, info, warn};
use thiserror::Error;

use crate::config::MotionConfig;
use crate::moves::{Move, MoveSequence};
use crate::recovery::{MoveOutcome, RecoveryManager};
use crate::robot::Robot;

/// Decides after each full pass whether to keep going.
#[allow(async_fn_in_trait)]
pub trait CycleGate {
    async fn should_continue(&mut self, completed_passes: u64) -> bool;
}

/// Stops after a fixed number of passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedCycles(pub u64);

impl CycleGate for FixedCycles {
    async fn should_continue(&mut self, completed_passes: u64) -> bool {
        completed_passes < self.0
    }
}

/// A run that could not go on.
#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("failed to move to initial pose (move {index})")]
    InitialMoveFailed { index: i32 },
    #[error(transparent)]
    InvalidMove(#[from] InvalidMoveError),
}

/// One row of the run report.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveReport {
    pub from: i32,
    pub to: i32,
    pub desired_duration: f64,
    pub outcome: MoveOutcome,
}

impl fmt::Display for MoveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "| {} | {} | {}s | ", self.from, self.to, self.desired_duration)?;
        match self.outcome.actual() {
            Some(actual) => write!(f, "{:.3}s |", actual.as_secs_f64()),
            None => write!(f, "FAILED |"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub passes: u64,
    pub completed: u64,
    pub recovered: u64,
    pub failed: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: &MoveOutcome) {
        match outcome {
            MoveOutcome::Completed { .. } => self.completed += 1,
            MoveOutcome::Recovered { .. } => self.recovered += 1,
            MoveOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passes, {} moves completed, {} recovered, {} failed",
            self.passes, self.completed, self.recovered, self.failed
        )
    }
}

/// Drives a robot through a move sequence, pass after pass.
pub struct MoveSequencer<R: Robot> {
    robot: R,
    moves: MoveSequence,
    recovery: RecoveryManager,
    summary: RunSummary,
}

impl<R: Robot> MoveSequencer<R> {
    pub fn new(robot: R, moves: MoveSequence, config: MotionConfig) -> Self {
        Self {
            robot,
            moves,
            recovery: RecoveryManager::new(config),
            summary: RunSummary::default(),
        }
    }

    pub fn robot(&self) -> &R {
        &self.robot
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    pub fn into_robot(self) -> R {
        self.robot
    }

    /// Moves to the first pose of the sequence.
    pub async fn move_to_start(&mut self) -> Result<MoveOutcome, SequencerError> {
        let first = *self.moves.first();
        info!("Moving to initial pose (move {})...", first.index());

        let outcome = self
            .recovery
            .execute_move(&mut self.robot, first.target(), first.desired_duration())
            .await?;
        if !outcome.is_success() {
            error!("Failed to move to initial pose");
            return Err(SequencerError::InitialMoveFailed { index: first.index() });
        }
        Ok(outcome)
    }

    /// One transition, with an extra recovery if the move failed outright.
    async fn transition(&mut self, from: Move, to: Move) -> Result<MoveReport, InvalidMoveError> {
        info!(
            "Moving from pose {} to pose {} (target: {}s)...",
            from.index(),
            to.index(),
            to.desired_duration()
        );
        let outcome = self
            .recovery
            .execute_move(&mut self.robot, to.target(), to.desired_duration())
            .await?;

        let report = MoveReport {
            from: from.index(),
            to: to.index(),
            desired_duration: to.desired_duration(),
            outcome,
        };
        info!("{}", report);
        self.summary.record(&report.outcome);

        if !report.outcome.is_success() {
            // The robot is left faulted; clear it before the next move. A
            // failed recovery has already backed off and the next move goes ahead.
            if let Err(failure) = self.recovery.recover(&mut self.robot).await {
                warn!("Continuing after failed move {} -> {}: {}", from.index(), to.index(), failure);
            }
        }
        Ok(report)
    }

    /// Runs every transition once, ending back at the first pose.
    pub async fn run_pass(&mut self) -> Result<Vec<MoveReport>, InvalidMoveError> {
        let transitions: Vec<(Move, Move)> = self.moves.transitions().map(|(from, to)| (*from, *to)).collect();

        let mut reports = Vec::with_capacity(transitions.len());
        for (from, to) in transitions {
            reports.push(self.transition(from, to).await?);
        }
        self.summary.passes += 1;
        Ok(reports)
    }

    /// Positions the robot, then repeats passes until `gate` says stop.
    pub async fn run<G: CycleGate>(&mut self, gate: &mut G) -> Result<RunSummary, SequencerError> {
        self.move_to_start().await?;

        info!("Sequence starting...");
        info!("| From | To | Desired | Actual |");
        loop {
            self.run_pass().await?;
            info!("Completed pass {}", self.summary.passes);
            if !gate.should_continue(self.summary.passes).await {
                break;
            }
        }

        info!("Sequence completed: {}", self.summary);
        Ok(self.summary)
    }
}
