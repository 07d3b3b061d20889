use std::time::Duration;

use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use verisum_core::{InputSource, Key, Stimulus, Surface};
use verisum_experiment::{
    ExperimentConfig, ExperimentRunner, RunOutcome, SessionSummary, TrialExecutor,
};
use verisum_timing::{HighPrecisionTimer, Timer};

use crate::term::{TermInput, TermSurface};

/// How long the debrief screen stays up after the last trial.
const DEBRIEF: Duration = Duration::from_millis(1500);

pub struct App {
    config: ExperimentConfig,
}

impl App {
    pub fn new(config: ExperimentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn run(self) -> Result<()> {
        println!("=== SUM VERIFICATION TASK ===");
        println!("Snapshot: {}", self.config.data_path.display());
        println!("Press SPACE to start or ESC to exit.\n");

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        // An existing snapshot is an interrupted session; pick it up
        // instead of generating a fresh table over it.
        let mut runner = ExperimentRunner::new(&self.config.data_path);
        if self.config.data_path.exists() {
            runner.resume()?;
        } else {
            runner.initialize(&self.config.design, &mut rng)?;
        }

        let mut surface = TermSurface::new()?;
        let mut input = TermInput::new();
        let timer = HighPrecisionTimer::new();

        if !self.wait_for_start(&mut surface, &mut input, &timer)? {
            drop(surface);
            println!("session not started; snapshot kept for later");
            return Ok(());
        }

        let mut executor = TrialExecutor::new(surface, input, timer, rng, &self.config);
        let outcome = runner.run(&mut executor);
        info!(?outcome, "session finished");

        let (mut surface, ..) = executor.into_parts();
        if matches!(outcome, Ok(RunOutcome::Complete)) {
            surface.show(&Stimulus::Message(
                "Session complete. Thank you!".into(),
            ))?;
            surface.flip()?;
            surface.wait(DEBRIEF)?;
        }
        drop(surface);

        let outcome = outcome?;
        if let Some(table) = runner.table() {
            println!("{}", SessionSummary::from_table(table));
            if outcome == RunOutcome::Aborted {
                if let Some(next) = table.first_incomplete() {
                    println!("aborted at trial {next}; run again to resume");
                }
            }
        }
        Ok(())
    }

    /// Welcome screen. Returns false when the operator quits instead.
    fn wait_for_start(
        &self,
        surface: &mut TermSurface,
        input: &mut TermInput,
        timer: &HighPrecisionTimer,
    ) -> verisum_core::Result<bool> {
        let welcome = format!(
            "SUM VERIFICATION\n\
             \n\
             You will see two numbers, then a proposed sum.\n\
             Press {} if the sum is right, {} if it is wrong.\n\
             Respond as quickly and accurately as you can.\n\
             \n\
             Press SPACE to begin, ESC to quit.",
            self.config.keys.matching, self.config.keys.nonmatching
        );
        surface.show(&Stimulus::Message(welcome))?;
        surface.flip()?;
        input.drain()?;
        loop {
            for key in input.poll_keys()? {
                match key {
                    Key::Space => return Ok(true),
                    Key::Escape => return Ok(false),
                    _ => {}
                }
            }
            timer.sleep(Duration::from_millis(10));
        }
    }
}
