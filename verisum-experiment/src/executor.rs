use std::time::Duration;

use rand::Rng;
use tracing::debug;

use verisum_core::{
    Condition, Error, InputSource, Key, Response, Result, Stimulus, SumProblem, Surface,
    TrialOutcome,
};
use verisum_timing::Timer;

use crate::config::{ExperimentConfig, KeyBindings, TimingConfig};

/// Draws a two-operand addition for one trial. Operands are uniform in
/// 1..=8; the presented sum equals the true sum when `sum_is_correct`,
/// otherwise it is off by one in a random direction.
pub(crate) fn generate_problem<R: Rng>(rng: &mut R, sum_is_correct: bool) -> SumProblem {
    let left = rng.random_range(1..=8);
    let right = rng.random_range(1..=8);
    let true_sum = left + right;
    let presented = if sum_is_correct {
        true_sum
    } else if rng.random_bool(0.5) {
        true_sum + 1
    } else {
        true_sum - 1
    };
    SumProblem {
        left,
        right,
        presented,
    }
}

/// Runs single trials against the injected collaborators: fixation,
/// problem, fixation, probe, then a polled response window.
///
/// The executor draws the operands and the presented sum itself; the
/// condition only tells it which stimulus variant to build. Reaction
/// times are differences between two reads of the monotonic timer.
pub struct TrialExecutor<S, I, T, R> {
    surface: S,
    input: I,
    timer: T,
    rng: R,
    timing: TimingConfig,
    keys: KeyBindings,
    correctness_factor: String,
}

impl<S, I, T, R> TrialExecutor<S, I, T, R>
where
    S: Surface,
    I: InputSource,
    T: Timer,
    R: Rng,
{
    pub fn new(surface: S, input: I, timer: T, rng: R, config: &ExperimentConfig) -> Self {
        Self {
            surface,
            input,
            timer,
            rng,
            timing: config.timing.clone(),
            keys: config.keys.clone(),
            correctness_factor: config.correctness_factor.clone(),
        }
    }

    /// Presents one full trial for `condition` and reports how it ended.
    /// A closed response window is a recordable outcome either way; only
    /// an operator ESC comes back as `Aborted`.
    pub fn run_trial(&mut self, condition: &Condition) -> Result<TrialOutcome> {
        let Some(sum_is_correct) = condition.bool_level(&self.correctness_factor) else {
            return Err(Error::InvalidDesign(format!(
                "condition has no boolean level named {:?}",
                self.correctness_factor
            )));
        };
        let problem = generate_problem(&mut self.rng, sum_is_correct);
        debug!(
            left = problem.left,
            right = problem.right,
            presented = problem.presented,
            "trial stimulus drawn"
        );

        self.present(&Stimulus::Fixation)?;
        self.surface.wait(self.timing.instruction())?;

        self.present(&Stimulus::Problem {
            left: problem.left,
            right: problem.right,
        })?;
        self.surface.wait(self.timing.instruction())?;

        self.present(&Stimulus::Fixation)?;
        let pause = self.fixation_pause();
        self.surface.wait(pause)?;

        self.present(&Stimulus::Probe {
            value: problem.presented,
        })?;

        self.input.drain()?;
        let onset = self.timer.now();
        self.await_response(onset)
    }

    /// Tears the executor apart again, handing the collaborators back.
    pub fn into_parts(self) -> (S, I, T, R) {
        (self.surface, self.input, self.timer, self.rng)
    }

    fn present(&mut self, stimulus: &Stimulus) -> Result<()> {
        self.surface.show(stimulus)?;
        self.surface.flip()
    }

    /// Inter-stimulus pause, uniform over the configured fixation range.
    fn fixation_pause(&mut self) -> Duration {
        let (min, max) = self.timing.fixation_range();
        let ns = self
            .rng
            .random_range(min.as_nanos() as u64..=max.as_nanos() as u64);
        Duration::from_nanos(ns)
    }

    /// Polls for a qualifying key until one arrives or the window closes.
    /// Pending input is checked once more after the deadline so a press
    /// that raced the timeout still counts.
    fn await_response(&mut self, onset_ns: u64) -> Result<TrialOutcome> {
        let timeout_ns = self.timing.response_timeout().as_nanos() as u64;
        loop {
            for key in self.input.poll_keys()? {
                if key == Key::Escape {
                    debug!("abort requested during response window");
                    return Ok(TrialOutcome::Aborted);
                }
                if key == self.keys.matching || key == self.keys.nonmatching {
                    let reaction_time_ns = self.timer.now().saturating_sub(onset_ns);
                    return Ok(TrialOutcome::Response {
                        response: Response::Key(key),
                        reaction_time_ns,
                    });
                }
            }
            if self.timer.now().saturating_sub(onset_ns) >= timeout_ns {
                debug!("response window closed without a response");
                return Ok(TrialOutcome::Response {
                    response: Response::NoResponse,
                    reaction_time_ns: timeout_ns,
                });
            }
            self.timer.sleep(self.timing.poll_interval());
        }
    }
}
