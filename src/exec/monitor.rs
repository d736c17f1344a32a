// src/exec/monitor.rs

//! Completion monitor.
//!
//! Owns the `Child` after launch and is the only place a run is declared
//! finished. The terminal event goes out once the child has exited **and**
//! both relays have drained their pipes; a child can close its pipes before
//! exiting, and buffered output can still be in flight after it exits, so
//! neither condition alone is enough.
//!
//! Cancellation and the optional deadline share one forced path: kill and
//! reap the child, give the relays `drain_grace` to reach end-of-stream,
//! then tell them to drop their pipes.

use std::future::{Future, pending};
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::oneshot;
use tokio::time::{Instant, sleep_until, timeout};
use tracing::{debug, info, warn};

use crate::errors::{RelayError, Result};
use crate::event::{RunEvent, TerminalEvent};
use crate::exec::relay::{RelayHandle, RelayReport};
use crate::exec::sink::SharedSink;
use crate::types::Outcome;

/// Why the child stopped running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationCause {
    /// Exited on its own with this status code.
    Exited(i32),
    /// Killed by a signal it did not handle (Unix only).
    Signaled(i32),
    /// Killed because the caller cancelled the run.
    Cancelled,
    /// Killed because the run deadline elapsed.
    TimedOut(Duration),
    /// The OS wait on the child failed.
    WaitFailed(String),
}

impl TerminationCause {
    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return TerminationCause::Exited(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return TerminationCause::Signaled(signal);
            }
        }

        TerminationCause::WaitFailed(format!("unrecognised exit status: {status}"))
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            TerminationCause::Exited(0) => Outcome::Success,
            _ => Outcome::Failure,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            TerminationCause::Exited(code) => Some(*code),
            _ => None,
        }
    }

    fn is_forced(&self) -> bool {
        matches!(
            self,
            TerminationCause::Cancelled | TerminationCause::TimedOut(_)
        )
    }

    /// Human-readable reason for a failure; `None` on success.
    pub fn describe(&self) -> Option<String> {
        match self {
            TerminationCause::Exited(0) => None,
            TerminationCause::Exited(code) => Some(format!("exit status: {code}")),
            TerminationCause::Signaled(signal) => Some(format!("terminated by signal {signal}")),
            TerminationCause::Cancelled => Some("cancelled".to_string()),
            TerminationCause::TimedOut(after) => Some(format!("timed out after {after:?}")),
            TerminationCause::WaitFailed(e) => Some(format!("failed to wait for process: {e}")),
        }
    }
}

/// Summary of one finished run, handed to callers that wait for it.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: Outcome,
    /// Same text as the terminal event's detail.
    pub detail: Option<String>,
    pub cause: TerminationCause,
    pub pid: Option<u32>,
    pub stdout_lines: u64,
    pub stderr_lines: u64,
    /// Last stderr lines seen, oldest first.
    pub stderr_tail: Vec<String>,
    /// A relay was stopped before end-of-stream, so some output may be missing.
    pub output_truncated: bool,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.cause.exit_code()
    }

    pub fn terminal_event(&self) -> TerminalEvent {
        TerminalEvent {
            outcome: self.outcome,
            detail: self.detail.clone(),
        }
    }

    /// `Ok(self)` on success, `RelayError::Exit` otherwise.
    pub fn into_result(self) -> Result<RunReport> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(RelayError::Exit {
                detail: self
                    .detail
                    .unwrap_or_else(|| "run failed without detail".to_string()),
            })
        }
    }
}

/// Build the terminal detail text from the cause and the stderr tail.
pub fn failure_detail(cause: &TerminationCause, stderr_tail: &[String]) -> Option<String> {
    let mut detail = cause.describe()?;
    if !stderr_tail.is_empty() {
        detail.push_str("; stderr: ");
        detail.push_str(&stderr_tail.join(" | "));
    }
    Some(detail)
}

#[derive(Debug, Clone, Copy)]
pub struct MonitorOptions {
    pub deadline: Option<Duration>,
    pub drain_grace: Duration,
}

/// Everything the monitor takes ownership of for one run.
pub(crate) struct MonitoredRun {
    pub child: Child,
    pub pid: Option<u32>,
    pub stdout: RelayHandle,
    pub stderr: RelayHandle,
    pub cancel_rx: oneshot::Receiver<()>,
    pub sink: SharedSink,
    pub options: MonitorOptions,
    pub started: Instant,
}

/// Wait for the child and both relays, then submit the terminal event.
pub(crate) async fn monitor(run: MonitoredRun) -> RunReport {
    let MonitoredRun {
        mut child,
        pid,
        stdout,
        stderr,
        cancel_rx,
        sink,
        options,
        started,
    } = run;

    let mut cancel_rx = Some(cancel_rx);
    let deadline_at = deadline_instant(started, options.deadline);

    enum Forced {
        Cancelled,
        TimedOut,
    }

    let waited = tokio::select! {
        status = child.wait() => Ok(status),
        () = cancelled(&mut cancel_rx) => Err(Forced::Cancelled),
        () = deadline_reached(deadline_at) => Err(Forced::TimedOut),
    };

    let cause = match waited {
        Ok(Ok(status)) => TerminationCause::from_status(status),
        Ok(Err(e)) => {
            warn!(pid = ?pid, error = %e, "waiting for child process failed");
            TerminationCause::WaitFailed(e.to_string())
        }
        Err(forced) => {
            let cause = match forced {
                Forced::Cancelled => TerminationCause::Cancelled,
                Forced::TimedOut => TerminationCause::TimedOut(options.deadline.unwrap_or_default()),
            };
            info!(pid = ?pid, reason = ?cause, "terminating child process");
            if let Err(e) = child.kill().await {
                warn!(pid = ?pid, error = %e, "failed to kill child process");
            }
            cause
        }
    };

    debug!(pid = ?pid, cause = ?cause, "child process finished; draining relays");

    let (out_report, err_report) = if cause.is_forced() {
        join_relays(stdout, stderr, std::future::ready(()), options.drain_grace).await
    } else {
        let stop_trigger = async {
            tokio::select! {
                () = cancelled(&mut cancel_rx) => {}
                () = deadline_reached(deadline_at) => {}
            }
        };
        join_relays(stdout, stderr, stop_trigger, options.drain_grace).await
    };

    let outcome = cause.outcome();
    let detail = failure_detail(&cause, &err_report.tail);
    let report = RunReport {
        outcome,
        detail,
        pid,
        stdout_lines: out_report.lines,
        stderr_lines: err_report.lines,
        output_truncated: out_report.stopped || err_report.stopped,
        stderr_tail: err_report.tail,
        cause,
        elapsed: started.elapsed(),
    };

    sink.submit(RunEvent::Terminal(report.terminal_event()));

    if report.is_success() {
        info!(
            pid = ?report.pid,
            stdout_lines = report.stdout_lines,
            stderr_lines = report.stderr_lines,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "run succeeded"
        );
    } else {
        warn!(
            pid = ?report.pid,
            exit_code = ?report.exit_code(),
            detail = report.detail.as_deref().unwrap_or(""),
            "run failed"
        );
    }

    report
}

/// Counted join over both relays.
///
/// Waits for both reports. If `stop_trigger` fires first, the relays get
/// `grace` more to finish on their own before being told to stop.
async fn join_relays<F>(
    mut stdout: RelayHandle,
    mut stderr: RelayHandle,
    stop_trigger: F,
    grace: Duration,
) -> (RelayReport, RelayReport)
where
    F: Future<Output = ()>,
{
    let stop_out = stdout.stop.take();
    let stop_err = stderr.stop.take();

    let both = async move { tokio::join!(stdout.join(), stderr.join()) };
    tokio::pin!(both);

    tokio::select! {
        reports = &mut both => return reports,
        () = stop_trigger => {}
    }

    if let Ok(reports) = timeout(grace, &mut both).await {
        return reports;
    }

    warn!(
        grace_ms = grace.as_millis() as u64,
        "relays still open after drain grace; closing child output streams"
    );
    for stop in [stop_out, stop_err].into_iter().flatten() {
        let _ = stop.send(());
    }
    both.await
}

/// Resolves when the caller asks for cancellation. Never resolves once the
/// cancel handle has been dropped without being used.
async fn cancelled(rx: &mut Option<oneshot::Receiver<()>>) {
    let Some(inner) = rx.as_mut() else {
        return pending().await;
    };
    if inner.await.is_err() {
        *rx = None;
        pending::<()>().await;
    }
}

/// A deadline too far out to be represented is no deadline at all.
fn deadline_instant(started: Instant, deadline: Option<Duration>) -> Option<Instant> {
    let deadline = deadline?;
    let at = started.checked_add(deadline);
    if at.is_none() {
        warn!(?deadline, "run deadline is out of range; running without one");
    }
    at
}

async fn deadline_reached(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_exit_zero_is_success() {
        assert_eq!(TerminationCause::Exited(0).outcome(), Outcome::Success);
        assert_eq!(TerminationCause::Exited(1).outcome(), Outcome::Failure);
        assert_eq!(TerminationCause::Signaled(9).outcome(), Outcome::Failure);
        assert_eq!(TerminationCause::Cancelled.outcome(), Outcome::Failure);
        assert_eq!(
            TerminationCause::TimedOut(Duration::from_secs(1)).outcome(),
            Outcome::Failure
        );
    }

    #[test]
    fn success_has_no_detail() {
        assert_eq!(failure_detail(&TerminationCause::Exited(0), &[]), None);
        assert_eq!(
            failure_detail(&TerminationCause::Exited(0), &["warning".to_string()]),
            None
        );
    }

    #[test]
    fn failure_detail_includes_status_and_stderr_tail() {
        let tail = vec!["bad input".to_string(), "aborting".to_string()];
        assert_eq!(
            failure_detail(&TerminationCause::Exited(3), &tail).as_deref(),
            Some("exit status: 3; stderr: bad input | aborting")
        );
        assert_eq!(
            failure_detail(&TerminationCause::Signaled(15), &[]).as_deref(),
            Some("terminated by signal 15")
        );
        assert_eq!(
            failure_detail(&TerminationCause::TimedOut(Duration::from_millis(250)), &[]).as_deref(),
            Some("timed out after 250ms")
        );
    }

    #[test]
    fn failed_report_converts_to_exit_error() {
        let report = RunReport {
            outcome: Outcome::Failure,
            detail: Some("exit status: 2".into()),
            cause: TerminationCause::Exited(2),
            pid: None,
            stdout_lines: 0,
            stderr_lines: 0,
            stderr_tail: vec![],
            output_truncated: false,
            elapsed: Duration::ZERO,
        };
        assert_eq!(report.exit_code(), Some(2));
        match report.into_result() {
            Err(RelayError::Exit { detail }) => assert_eq!(detail, "exit status: 2"),
            other => panic!("expected Exit error, got {other:?}"),
        }
    }

    #[test]
    fn unrepresentable_deadline_means_none() {
        let now = Instant::now();
        assert_eq!(deadline_instant(now, None), None);
        assert_eq!(deadline_instant(now, Some(Duration::from_secs(u64::MAX))), None);
        assert_eq!(
            deadline_instant(now, Some(Duration::from_secs(5))),
            Some(now + Duration::from_secs(5))
        );
    }

    #[cfg(unix)]
    #[test]
    fn signal_status_maps_to_signaled() {
        use std::os::unix::process::ExitStatusExt;
        let status = ExitStatus::from_raw(9);
        assert_eq!(TerminationCause::from_status(status), TerminationCause::Signaled(9));
        let status = ExitStatus::from_raw(1 << 8);
        assert_eq!(TerminationCause::from_status(status), TerminationCause::Exited(1));
    }
}
