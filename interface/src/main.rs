use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use brain::{FixedCycles, MotionConfig, MoveSequence, MoveSequencer, Robot, RunSummary, load_moves};
use clap::Parser;
use kinematics::{DEFAULT_MAX_JOINT_VELOCITY, InvalidMoveError};
use log::{error, info};

mod communication;
mod prompt;
mod runtime;
mod simulation;

use prompt::{CycleControl, PromptGate};
use runtime::ZenohRobot;
use simulation::SimulatedRobot;

/// Plays a cyclic joint-space dance on a 7-joint arm.
///
/// WARNING: the robot will move. Keep the user stop button at hand.
#[derive(Parser, Debug)]
#[command(author, version, name = "dance")]
struct CommandLineArguments {
    /// Hostname or address of the robot's zenoh router
    robot: String,
    /// Move file: `<index> <q1> .. <q7> <move_time>` per line
    config: PathBuf,
    /// Run against a simulated robot instead of connecting
    #[arg(long)]
    simulate: bool,
    /// Stop after this many passes instead of asking after each one
    #[arg(long)]
    cycles: Option<u64>,
    /// Joint velocity cap (rad/s) used to stretch fast moves
    #[arg(long, default_value_t = DEFAULT_MAX_JOINT_VELOCITY)]
    max_joint_velocity: f64,
    /// Pause after each move (ms)
    #[arg(long, default_value_t = 100)]
    settle_ms: u64,
    /// Wait after a failed error recovery (ms)
    #[arg(long, default_value_t = 5000)]
    backoff_ms: u64,
    /// Control loop rate (Hz)
    #[arg(long, default_value_t = 1000)]
    control_rate_hz: u32,
    /// Zenoh router port on the robot host
    #[arg(long, default_value_t = 7447)]
    port: u16,
    /// Joint state older than this aborts the motion (ms)
    #[arg(long, default_value_t = 100)]
    state_timeout_ms: u64,
    /// Joint velocity envelope of the simulated robot (rad/s)
    #[arg(long)]
    sim_velocity_limit: Option<f64>,
}

impl CommandLineArguments {
    fn motion_config(&self) -> Result<MotionConfig, InvalidMoveError> {
        MotionConfig::default()
            .with_max_joint_velocity(self.max_joint_velocity)
            .with_settle_time(Duration::from_millis(self.settle_ms))
            .with_recovery_backoff(Duration::from_millis(self.backoff_ms))
            .validated()
    }

    fn control_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.control_rate_hz.max(1)))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CommandLineArguments::parse();
    match run(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CommandLineArguments) -> Result<RunSummary, Box<dyn Error>> {
    let config = args.motion_config()?;
    info!("Reading moves from {}", args.config.display());
    let moves = load_moves(&args.config)?;

    let mut gate = match args.cycles {
        Some(cycles) => CycleControl::Fixed(FixedCycles(cycles)),
        None => CycleControl::Interactive(PromptGate::new()),
    };

    if args.simulate {
        info!("Using simulated robot");
        let robot = SimulatedRobot::new(args.control_period()).with_velocity_limit(args.sim_velocity_limit);
        dance(robot, moves, config, &mut gate).await
    } else {
        info!("Connecting to robot at {}:{}...", args.robot, args.port);
        let robot = ZenohRobot::connect(
            &args.robot,
            args.port,
            args.control_period(),
            Duration::from_millis(args.state_timeout_ms),
        )
        .await?;
        dance(robot, moves, config, &mut gate).await
    }
}

async fn dance<R: Robot>(
    robot: R,
    moves: MoveSequence,
    config: MotionConfig,
    gate: &mut CycleControl,
) -> Result<RunSummary, Box<dyn Error>> {
    let mut sequencer = MoveSequencer::new(robot, moves, config);
    Ok(sequencer.run(gate).await?)
}
