use thiserror::Error;

/// Result type alias used across the workspace
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for design generation, table access and trial presentation
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed design parameters; raised at generation time, never recovered silently
    #[error("invalid design: {0}")]
    InvalidDesign(String),

    /// Runner invoked before a trial table was generated or loaded
    #[error("no trial table attached; generate or load one first")]
    NotReady,

    /// Trial index outside the table; a caller bug
    #[error("trial {trial_number} out of range (table holds {len} trials)")]
    OutOfRange { trial_number: usize, len: usize },

    /// Implicit double-write refused; corrections go through `amend_response`
    #[error("trial {trial_number} already has a recorded response; use amend_response to correct it")]
    ResponseAlreadyRecorded { trial_number: usize },

    /// The presentation surface or input source failed irrecoverably mid-trial
    #[error("presentation failure: {0}")]
    Presentation(String),

    /// A persisted snapshot violates the table invariants
    #[error("corrupt trial table: {0}")]
    Corrupt(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
