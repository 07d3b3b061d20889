use serde::{Deserialize, Serialize};

use crate::factor::Condition;
use crate::io::Key;

/// What the participant did during the response window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// A qualifying response key was pressed
    Key(Key),
    /// The response window elapsed without a qualifying key
    NoResponse,
}

/// One row of the trial table. `trial_number` is assigned at generation time
/// and is the table's primary key; the condition fields flatten into the row
/// so the persisted table has one column per factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial_number: usize,
    pub block_number: usize,
    #[serde(flatten)]
    pub condition: Condition,
    pub response: Option<Response>,
    pub reaction_time_ns: Option<u64>,
    pub completed: bool,
}

impl TrialRecord {
    /// A not-yet-run trial: no response, no reaction time, not completed
    pub fn fresh(trial_number: usize, block_number: usize, condition: Condition) -> Self {
        Self {
            trial_number,
            block_number,
            condition,
            response: None,
            reaction_time_ns: None,
            completed: false,
        }
    }
}

/// Raw result of running one trial's presentation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialOutcome {
    /// The response window closed with a recordable outcome. On timeout the
    /// response is the `NoResponse` sentinel and the reaction time is the
    /// full response timeout.
    Response {
        response: Response,
        reaction_time_ns: u64,
    },
    /// The operator quit mid-trial; nothing is recorded
    Aborted,
}
