// tests/cancellation.rs
//
// Forced termination: caller cancel, run deadline, signals, and descendants
// that keep the output pipes open after the child is gone.
#![cfg(unix)]

use std::error::Error;
use std::time::{Duration, Instant};

use procrelay::exec::{Runner, TerminationCause};
use procrelay::types::{Channel, Outcome};
use procrelay_test_utils::builders::{RunnerBuilder, sh};
use procrelay_test_utils::{RecordingSink, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn cancel_kills_a_sleeping_child() -> TestResult {
    init_tracing();

    let sink = RecordingSink::new();
    let mut handle = Runner::default().start(sh("echo started; sleep 60"), sink.clone())?;

    // Give the child a moment to produce its first line.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let t0 = Instant::now();
    assert!(handle.cancel(), "run should still be cancellable");

    let report = with_timeout(handle.wait()).await;
    assert!(t0.elapsed() < Duration::from_secs(5));
    assert_eq!(report.cause, TerminationCause::Cancelled);
    assert_eq!(report.outcome, Outcome::Failure);

    let terminals = sink.terminals();
    assert_eq!(terminals.len(), 1);
    assert_eq!(terminals[0].detail.as_deref(), Some("cancelled"));
    assert_eq!(sink.lines(Channel::Stdout), vec!["started"]);
    assert!(sink.events().last().is_some_and(|ev| ev.is_terminal()));
    Ok(())
}

#[tokio::test]
async fn cancel_after_completion_is_a_no_op() -> TestResult {
    init_tracing();

    let sink = RecordingSink::new();
    let mut handle = Runner::default().start(sh("exit 0"), sink.clone())?;
    let cancel = handle.cancel_handle().expect("fresh handle has a cancel handle");

    let report = with_timeout(handle.wait()).await;
    assert!(report.is_success());
    assert!(!cancel.cancel());
    assert_eq!(sink.terminals().len(), 1);
    Ok(())
}

#[tokio::test]
async fn deadline_kills_a_hung_child() -> TestResult {
    init_tracing();

    let runner = RunnerBuilder::new()
        .timeout(Duration::from_millis(300))
        .build();
    let sink = RecordingSink::new();
    let report = with_timeout(runner.run(sh("sleep 60"), sink.clone())).await?;

    assert_eq!(report.cause, TerminationCause::TimedOut(Duration::from_millis(300)));
    assert_eq!(report.detail.as_deref(), Some("timed out after 300ms"));
    assert_eq!(sink.terminals().len(), 1);
    Ok(())
}

#[tokio::test]
async fn deadline_does_not_touch_a_fast_child() -> TestResult {
    init_tracing();

    let runner = RunnerBuilder::new().timeout(Duration::from_secs(5)).build();
    let sink = RecordingSink::new();
    let report = with_timeout(runner.run(sh("echo quick"), sink.clone())).await?;

    assert!(report.is_success());
    assert!(!report.output_truncated);
    assert_eq!(sink.lines(Channel::Stdout), vec!["quick"]);
    Ok(())
}

#[tokio::test]
async fn grandchild_holding_pipes_does_not_block_a_cancelled_run() -> TestResult {
    init_tracing();

    // The background `sleep` inherits both pipes and outlives the shell.
    let runner = RunnerBuilder::new()
        .drain_grace(Duration::from_millis(200))
        .build();
    let sink = RecordingSink::new();
    let mut handle = runner.start(sh("sleep 60 & echo forked; wait"), sink.clone())?;

    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.cancel();

    let report = with_timeout(handle.wait()).await;
    assert_eq!(report.cause, TerminationCause::Cancelled);
    assert!(report.output_truncated);
    assert_eq!(sink.terminals().len(), 1);
    Ok(())
}

#[tokio::test]
async fn deadline_bounds_draining_after_a_clean_exit() -> TestResult {
    init_tracing();

    // The shell exits 0 at once, but its background child keeps stdout open.
    let runner = RunnerBuilder::new()
        .timeout(Duration::from_millis(500))
        .drain_grace(Duration::from_millis(100))
        .build();
    let sink = RecordingSink::new();
    let report = with_timeout(runner.run(sh("sleep 60 & echo done"), sink.clone())).await?;

    assert_eq!(report.cause, TerminationCause::Exited(0));
    assert!(report.is_success());
    assert!(report.output_truncated);
    assert_eq!(sink.lines(Channel::Stdout), vec!["done"]);
    assert_eq!(sink.terminals().len(), 1);
    Ok(())
}

#[tokio::test]
async fn signal_death_is_a_failure() -> TestResult {
    init_tracing();

    let sink = RecordingSink::new();
    let report = with_timeout(Runner::default().run(sh("kill -9 $$"), sink.clone())).await?;

    assert_eq!(report.cause, TerminationCause::Signaled(9));
    assert_eq!(report.outcome, Outcome::Failure);
    assert_eq!(
        sink.terminals()[0].detail.as_deref(),
        Some("terminated by signal 9")
    );
    Ok(())
}

#[tokio::test]
async fn unrepresentable_deadline_runs_without_one() -> TestResult {
    init_tracing();

    let runner = RunnerBuilder::new()
        .timeout(Duration::from_secs(u64::MAX))
        .build();
    let sink = RecordingSink::new();
    let report = with_timeout(runner.run(sh("echo hi"), sink.clone())).await?;

    assert_eq!(report.cause, TerminationCause::Exited(0));
    assert!(report.is_success());
    assert_eq!(sink.lines(Channel::Stdout), vec!["hi"]);
    assert_eq!(sink.terminals().len(), 1);
    Ok(())
}
