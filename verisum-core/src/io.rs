use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::stimulus::Stimulus;

/// A keyboard key as seen by the experiment. Character keys are lowercased
/// by input sources so bindings are case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Char(char),
    Space,
    Enter,
    Escape,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
            Key::Space => write!(f, "SPACE"),
            Key::Enter => write!(f, "ENTER"),
            Key::Escape => write!(f, "ESC"),
        }
    }
}

/// Presentation surface collaborator. The experiment core only needs these
/// three effects, in order: stage content, commit a frame, hold it.
/// Rendering internals are opaque.
pub trait Surface {
    /// Stage `stimulus` for the next committed frame
    fn show(&mut self, stimulus: &Stimulus) -> Result<()>;

    /// Commit the staged frame to the participant
    fn flip(&mut self) -> Result<()>;

    /// Hold the committed frame for `duration`
    fn wait(&mut self, duration: Duration) -> Result<()>;
}

/// Keyboard input collaborator.
pub trait InputSource {
    /// Keys pressed since the previous poll, oldest first. Non-blocking.
    fn poll_keys(&mut self) -> Result<Vec<Key>>;

    /// Discard input buffered before a response window opens
    fn drain(&mut self) -> Result<()> {
        self.poll_keys()?;
        Ok(())
    }
}
