//! Test-only collaborator doubles: a surface, input source and timer that
//! record interactions instead of performing them.

use std::cell::Cell;
use std::collections::VecDeque;
use std::time::Duration;

use verisum_core::{Error, InputSource, Key, Result, Stimulus, Surface};
use verisum_timing::Timer;

/// Surface that records everything staged on it instead of drawing.
#[derive(Debug, Default)]
pub struct ScriptedSurface {
    pub shown: Vec<Stimulus>,
    pub flips: usize,
    pub waits: Vec<Duration>,
    /// When set, `show` fails once this many stimuli have been staged.
    pub fail_after: Option<usize>,
}

impl ScriptedSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Surface for ScriptedSurface {
    fn show(&mut self, stimulus: &Stimulus) -> Result<()> {
        if self.fail_after.is_some_and(|n| self.shown.len() >= n) {
            return Err(Error::Presentation("scripted surface failure".into()));
        }
        self.shown.push(stimulus.clone());
        Ok(())
    }

    fn flip(&mut self) -> Result<()> {
        self.flips += 1;
        Ok(())
    }

    fn wait(&mut self, duration: Duration) -> Result<()> {
        self.waits.push(duration);
        Ok(())
    }
}

/// Input source that replays pre-scripted poll batches, oldest first.
/// Once the script runs out every poll comes back empty.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    batches: VecDeque<Vec<Key>>,
    pub polls: usize,
}

impl ScriptedInput {
    pub fn new(batches: Vec<Vec<Key>>) -> Self {
        Self {
            batches: batches.into(),
            polls: 0,
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }
}

impl InputSource for ScriptedInput {
    fn poll_keys(&mut self) -> Result<Vec<Key>> {
        self.polls += 1;
        Ok(self.batches.pop_front().unwrap_or_default())
    }
}

/// Deterministic clock; `sleep` advances it instead of blocking.
#[derive(Debug, Default)]
pub struct FakeTimer {
    now_ns: Cell<u64>,
}

impl FakeTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        self.now_ns.set(self.now_ns.get() + duration.as_nanos() as u64);
    }
}

impl Timer for FakeTimer {
    fn now(&self) -> u64 {
        self.now_ns.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
