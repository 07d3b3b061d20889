use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use verisum_core::{Error, Factor, Key, Result};

use crate::design::FactorialDesign;

/// Phase durations and response-window settings for a single trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// How long the fixation cross and the problem stay on screen, in ms.
    pub instruction_ms: u64,
    /// Lower bound of the randomized inter-stimulus fixation, in ms.
    pub fixation_min_ms: u64,
    /// Upper bound of the randomized inter-stimulus fixation, in ms.
    pub fixation_max_ms: u64,
    /// Response window after probe onset, in ms.
    pub response_timeout_ms: u64,
    /// Pause between input polls while waiting for a response, in ms.
    pub poll_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            instruction_ms: 1000,
            fixation_min_ms: 500,
            fixation_max_ms: 1500,
            response_timeout_ms: 2000,
            poll_interval_ms: 1,
        }
    }
}

impl TimingConfig {
    pub fn instruction(&self) -> Duration {
        Duration::from_millis(self.instruction_ms)
    }

    pub fn fixation_range(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.fixation_min_ms),
            Duration::from_millis(self.fixation_max_ms),
        )
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Which keys count as the two responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    /// Pressed when the presented sum matches the true sum.
    pub matching: Key,
    /// Pressed when it does not.
    pub nonmatching: Key,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            matching: Key::Char('j'),
            nonmatching: Key::Char('f'),
        }
    }
}

/// Everything a session needs: the design, trial timing, response keys
/// and where the trial table is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub design: FactorialDesign,
    pub timing: TimingConfig,
    pub keys: KeyBindings,
    /// Name of the boolean factor that decides whether the presented
    /// sum is correct on a given trial.
    pub correctness_factor: String,
    /// Where the trial table snapshot lives.
    pub data_path: PathBuf,
    /// Fixed RNG seed for reproducible sessions. None draws from the OS.
    pub seed: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        let design = FactorialDesign::new(
            vec![
                Factor::new("stimulus", vec!["A".into(), "B".into()]),
                Factor::new("difficulty", vec![1.into(), 2.into()]),
                Factor::new("sum_correct", vec![true.into(), false.into()]),
            ],
            2,
            2,
        );
        Self {
            design,
            timing: TimingConfig::default(),
            keys: KeyBindings::default(),
            correctness_factor: "sum_correct".into(),
            data_path: PathBuf::from("verisum_data.json"),
            seed: None,
        }
    }
}

impl ExperimentConfig {
    /// Reads a config from a JSON file. Missing fields fall back to the
    /// defaults, so a partial config is fine.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::InvalidDesign(format!("bad config {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the parts of the config the design validator cannot see.
    pub fn validate(&self) -> Result<()> {
        self.design.validate()?;
        if self.keys.matching == self.keys.nonmatching {
            return Err(Error::InvalidDesign(
                "matching and nonmatching keys must differ".into(),
            ));
        }
        if self.keys.matching == Key::Escape || self.keys.nonmatching == Key::Escape {
            return Err(Error::InvalidDesign(
                "ESC is reserved for aborting the session".into(),
            ));
        }
        if self.timing.fixation_min_ms > self.timing.fixation_max_ms {
            return Err(Error::InvalidDesign(format!(
                "fixation range {}..{} ms is inverted",
                self.timing.fixation_min_ms, self.timing.fixation_max_ms
            )));
        }
        let Some(factor) = self
            .design
            .factors
            .iter()
            .find(|f| f.name == self.correctness_factor)
        else {
            return Err(Error::InvalidDesign(format!(
                "correctness factor '{}' is not part of the design",
                self.correctness_factor
            )));
        };
        if factor.levels.iter().any(|level| level.as_bool().is_none()) {
            return Err(Error::InvalidDesign(format!(
                "correctness factor '{}' must have boolean levels",
                self.correctness_factor
            )));
        }
        Ok(())
    }
}
