use std::path::{Path, PathBuf};

use rand::Rng;
use tracing::info;

use verisum_core::{Error, InputSource, Result, Surface, TrialOutcome};
use verisum_timing::Timer;

use crate::design::DesignGenerator;
use crate::executor::TrialExecutor;
use crate::table::TrialTable;

/// Lifecycle of a session. A runner starts idle, runs while it drives
/// trials, and is complete once every trial in the table is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Running,
    Complete,
}

/// How a driving pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every trial is completed and the final snapshot is on disk
    Complete,
    /// The operator quit; everything recorded so far is on disk
    Aborted,
}

/// Owns the trial table for one session and drives it to completion,
/// always running the lowest-numbered incomplete trial next. The table
/// snapshot is rewritten after every recorded response, so a crash or
/// abort at any point loses at most the trial that was in flight.
pub struct ExperimentRunner {
    table: Option<TrialTable>,
    data_path: PathBuf,
    state: RunnerState,
}

impl ExperimentRunner {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            table: None,
            data_path: data_path.into(),
            state: RunnerState::Idle,
        }
    }

    /// Adopts a freshly generated table and persists it immediately, so
    /// even a session that crashes before the first response leaves a
    /// resumable snapshot behind.
    pub fn attach(&mut self, table: TrialTable) -> Result<()> {
        table.save(&self.data_path)?;
        info!(
            trials = table.len(),
            path = %self.data_path.display(),
            "session initialized"
        );
        self.table = Some(table);
        self.state = RunnerState::Idle;
        Ok(())
    }

    /// Generates a table from `design` and adopts it.
    pub fn initialize<D, R>(&mut self, design: &D, rng: &mut R) -> Result<()>
    where
        D: DesignGenerator,
        R: Rng,
    {
        let table = design.generate(rng)?;
        self.attach(table)
    }

    /// Picks an interrupted session back up from its snapshot. The loaded
    /// table is used as-is; nothing is re-randomized.
    pub fn resume(&mut self) -> Result<()> {
        let table = TrialTable::load(&self.data_path)?;
        info!(
            trials = table.len(),
            completed = table.progress_count(),
            "session resumed"
        );
        self.table = Some(table);
        self.state = RunnerState::Idle;
        Ok(())
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn table(&self) -> Option<&TrialTable> {
        self.table.as_ref()
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Drives trials until the table is complete or the operator aborts.
    /// Requires an attached table from `initialize`, `attach` or `resume`.
    pub fn run<S, I, T, R>(
        &mut self,
        executor: &mut TrialExecutor<S, I, T, R>,
    ) -> Result<RunOutcome>
    where
        S: Surface,
        I: InputSource,
        T: Timer,
        R: Rng,
    {
        let Some(table) = self.table.as_mut() else {
            return Err(Error::NotReady);
        };
        self.state = RunnerState::Running;
        let result = Self::drive(table, &self.data_path, executor);
        self.state = match &result {
            Ok(RunOutcome::Complete) => RunnerState::Complete,
            _ => RunnerState::Idle,
        };
        result
    }

    fn drive<S, I, T, R>(
        table: &mut TrialTable,
        data_path: &Path,
        executor: &mut TrialExecutor<S, I, T, R>,
    ) -> Result<RunOutcome>
    where
        S: Surface,
        I: InputSource,
        T: Timer,
        R: Rng,
    {
        loop {
            let Some(trial_number) = table.first_incomplete() else {
                info!("all trials completed");
                return Ok(RunOutcome::Complete);
            };
            let record = table.get(trial_number)?;
            let condition = record.condition.clone();
            info!(
                trial = trial_number,
                block = record.block_number,
                completed = table.progress_count(),
                total = table.len(),
                "running trial"
            );
            match executor.run_trial(&condition)? {
                TrialOutcome::Response {
                    response,
                    reaction_time_ns,
                } => {
                    table.set_response(trial_number, response, reaction_time_ns)?;
                    table.save(data_path)?;
                }
                TrialOutcome::Aborted => {
                    info!(
                        completed = table.progress_count(),
                        "session aborted by operator"
                    );
                    return Ok(RunOutcome::Aborted);
                }
            }
        }
    }
}
