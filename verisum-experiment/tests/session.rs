//! Session-level tests driving the full lifecycle against a snapshot on
//! disk: generate, run, abort mid-block, resume and finish.

use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;

use verisum_core::{Factor, Key, Response};
use verisum_experiment::test_support::{FakeTimer, ScriptedInput, ScriptedSurface};
use verisum_experiment::{
    ExperimentConfig, ExperimentRunner, FactorialDesign, RunOutcome, RunnerState, SessionSummary,
    TrialExecutor, TrialTable,
};

fn config(data_path: &Path) -> ExperimentConfig {
    let mut config = ExperimentConfig::default();
    config.design = FactorialDesign::new(
        vec![
            Factor::new("stimulus", vec!["A".into(), "B".into()]),
            Factor::new("difficulty", vec![1.into(), 2.into()]),
            Factor::new("sum_correct", vec![true.into(), false.into()]),
        ],
        1,
        2,
    );
    config.timing.instruction_ms = 10;
    config.timing.fixation_min_ms = 5;
    config.timing.fixation_max_ms = 10;
    config.timing.response_timeout_ms = 40;
    config.timing.poll_interval_ms = 1;
    config.data_path = data_path.to_path_buf();
    config
}

/// One drain batch plus one response batch per answered trial.
fn answers(key: Key, trials: usize) -> Vec<Vec<Key>> {
    let mut batches = Vec::new();
    for _ in 0..trials {
        batches.push(Vec::new());
        batches.push(vec![key]);
    }
    batches
}

fn make_executor(
    input: ScriptedInput,
    config: &ExperimentConfig,
    seed: u64,
) -> TrialExecutor<ScriptedSurface, ScriptedInput, FakeTimer, StdRng> {
    TrialExecutor::new(
        ScriptedSurface::new(),
        input,
        FakeTimer::new(),
        StdRng::seed_from_u64(seed),
        config,
    )
}

#[test]
fn session_survives_an_abort_and_resumes_to_completion() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = config(&temp.path().join("session.json"));

    // Fresh session: 2 blocks x 8 combinations.
    let mut runner = ExperimentRunner::new(&config.data_path);
    runner
        .initialize(&config.design, &mut StdRng::seed_from_u64(42))
        .expect("initialize");
    assert_eq!(runner.table().map(TrialTable::len), Some(16));

    // Answer five trials, then quit during the sixth.
    let mut batches = answers(config.keys.matching, 5);
    batches.push(Vec::new());
    batches.push(vec![Key::Escape]);
    let mut executor = make_executor(ScriptedInput::new(batches), &config, 1);

    let outcome = runner.run(&mut executor).expect("first pass");
    assert_eq!(outcome, RunOutcome::Aborted);
    assert_eq!(runner.state(), RunnerState::Idle);

    // The snapshot on disk carries exactly the recorded progress.
    let snapshot = TrialTable::load(&config.data_path).expect("load after abort");
    assert_eq!(snapshot.progress_count(), 5);
    assert_eq!(snapshot.first_incomplete(), Some(5));

    // A later process resumes the same table and finishes the rest.
    let mut resumed = ExperimentRunner::new(&config.data_path);
    resumed.resume().expect("resume");
    let mut executor = make_executor(
        ScriptedInput::new(answers(config.keys.nonmatching, 11)),
        &config,
        2,
    );
    let outcome = resumed.run(&mut executor).expect("second pass");
    assert_eq!(outcome, RunOutcome::Complete);
    assert_eq!(resumed.state(), RunnerState::Complete);

    let done = TrialTable::load(&config.data_path).expect("load after completion");
    assert_eq!(done.progress_count(), 16);
    for (i, record) in done.records().iter().enumerate() {
        assert_eq!(record.trial_number, i);
        assert_eq!(record.block_number, i / 8);
        assert!(record.completed);
        let expected = if i < 5 {
            config.keys.matching
        } else {
            config.keys.nonmatching
        };
        assert_eq!(record.response, Some(Response::Key(expected)));
    }

    let summary = SessionSummary::from_table(&done);
    assert_eq!(summary.completed, 16);
    assert_eq!(summary.answered, 16);
    assert_eq!(summary.timeouts, 0);
}

#[test]
fn silent_participant_still_completes_with_timeouts() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut config = config(&temp.path().join("session.json"));
    config.design.blocks = 1;
    config.design.factors[0].levels.truncate(1);
    config.design.factors[1].levels.truncate(1);

    let mut runner = ExperimentRunner::new(&config.data_path);
    runner
        .initialize(&config.design, &mut StdRng::seed_from_u64(7))
        .expect("initialize");

    let mut executor = make_executor(ScriptedInput::silent(), &config, 3);
    let outcome = runner.run(&mut executor).expect("run");
    assert_eq!(outcome, RunOutcome::Complete);

    let timeout_ns = config.timing.response_timeout_ms * 1_000_000;
    let snapshot = TrialTable::load(&config.data_path).expect("load");
    assert_eq!(snapshot.progress_count(), 2);
    for record in snapshot.records() {
        assert_eq!(record.response, Some(Response::NoResponse));
        assert_eq!(record.reaction_time_ns, Some(timeout_ns));
    }

    let summary = SessionSummary::from_table(&snapshot);
    assert_eq!(summary.answered, 0);
    assert_eq!(summary.timeouts, 2);
    assert_eq!(summary.mean_rt_ms, None);
}

#[test]
fn resuming_a_finished_session_reports_complete_without_presenting() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut config = config(&temp.path().join("session.json"));
    config.design.blocks = 1;

    let mut runner = ExperimentRunner::new(&config.data_path);
    runner
        .initialize(&config.design, &mut StdRng::seed_from_u64(11))
        .expect("initialize");
    let mut executor = make_executor(
        ScriptedInput::new(answers(config.keys.matching, 8)),
        &config,
        4,
    );
    runner.run(&mut executor).expect("run");

    let mut reopened = ExperimentRunner::new(&config.data_path);
    reopened.resume().expect("resume");
    let mut executor = make_executor(ScriptedInput::silent(), &config, 5);
    let outcome = reopened.run(&mut executor).expect("second run");
    assert_eq!(outcome, RunOutcome::Complete);

    let (surface, input, _, _) = executor.into_parts();
    assert!(surface.shown.is_empty());
    assert_eq!(input.polls, 0);
}
