pub mod config;
pub mod design;
pub mod executor;
pub mod runner;
pub mod summary;
pub mod table;

pub mod test_support;

pub use config::{ExperimentConfig, KeyBindings, TimingConfig};
pub use design::{DesignGenerator, FactorialDesign};
pub use executor::TrialExecutor;
pub use runner::{ExperimentRunner, RunOutcome, RunnerState};
pub use summary::SessionSummary;
pub use table::TrialTable;
