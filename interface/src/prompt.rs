use std::io::Write;

use brain::{CycleGate, FixedCycles};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin, stdin};

/// Asks on the terminal whether to run another pass.
pub struct PromptGate {
    lines: Lines<BufReader<Stdin>>,
}

impl PromptGate {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(stdin()).lines(),
        }
    }
}

impl CycleGate for PromptGate {
    async fn should_continue(&mut self, completed_passes: u64) -> bool {
        print!("\nCompleted {} full cycle(s). Continue? (y/n): ", completed_passes);
        let _ = std::io::stdout().flush();

        match self.lines.next_line().await {
            Ok(Some(answer)) => is_yes(&answer),
            _ => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim(), "y" | "Y")
}

/// Either a fixed number of passes or asking the operator each time.
pub enum CycleControl {
    Fixed(FixedCycles),
    Interactive(PromptGate),
}

impl CycleGate for CycleControl {
    async fn should_continue(&mut self, completed_passes: u64) -> bool {
        match self {
            CycleControl::Fixed(gate) => gate.should_continue(completed_passes).await,
            CycleControl::Interactive(gate) => gate.should_continue(completed_passes).await,
        }
    }
}
