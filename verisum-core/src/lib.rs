pub mod error;
pub mod factor;
pub mod io;
pub mod stimulus;
pub mod trial;

pub use error::{Error, Result};
pub use factor::{Condition, Factor, FactorLevel};
pub use io::{InputSource, Key, Surface};
pub use stimulus::{Stimulus, SumProblem};
pub use trial::{Response, TrialOutcome, TrialRecord};
