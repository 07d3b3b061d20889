use std::fmt;

use verisum_core::Response;

use crate::table::TrialTable;

/// Descriptive statistics over a session's recorded trials, for the
/// debrief screen and the operator log.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub total_trials: usize,
    pub completed: usize,
    /// Completed trials where a response key was pressed
    pub answered: usize,
    /// Completed trials where the window closed silently
    pub timeouts: usize,
    pub mean_rt_ms: Option<f64>,
    pub min_rt_ms: Option<f64>,
    pub max_rt_ms: Option<f64>,
}

impl SessionSummary {
    /// Reaction-time statistics cover answered trials only; a timeout's
    /// recorded duration is the window length, not a measurement.
    pub fn from_table(table: &TrialTable) -> Self {
        let mut answered = 0usize;
        let mut timeouts = 0usize;
        let mut rts_ms: Vec<f64> = Vec::new();
        for record in table.records() {
            if !record.completed {
                continue;
            }
            match record.response {
                Some(Response::Key(_)) => {
                    answered += 1;
                    if let Some(ns) = record.reaction_time_ns {
                        rts_ms.push(ns as f64 / 1_000_000.0);
                    }
                }
                Some(Response::NoResponse) => timeouts += 1,
                None => {}
            }
        }
        let mean = (!rts_ms.is_empty()).then(|| rts_ms.iter().sum::<f64>() / rts_ms.len() as f64);
        Self {
            total_trials: table.len(),
            completed: table.progress_count(),
            answered,
            timeouts,
            mean_rt_ms: mean,
            min_rt_ms: rts_ms.iter().copied().reduce(f64::min),
            max_rt_ms: rts_ms.iter().copied().reduce(f64::max),
        }
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "trials completed: {}/{}",
            self.completed, self.total_trials
        )?;
        writeln!(
            f,
            "answered: {}  timeouts: {}",
            self.answered, self.timeouts
        )?;
        match (self.mean_rt_ms, self.min_rt_ms, self.max_rt_ms) {
            (Some(mean), Some(min), Some(max)) => {
                write!(
                    f,
                    "reaction time ms: mean {mean:.1}  min {min:.1}  max {max:.1}"
                )
            }
            _ => write!(f, "reaction time: no responses recorded"),
        }
    }
}
