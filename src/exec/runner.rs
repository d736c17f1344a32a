// src/exec/runner.rs

//! Entry point for running one invocation.
//!
//! [`Runner::start`] launches the child and returns straight away; output
//! arrives through the event sink while the caller keeps control. Callers
//! that also want the final status await [`RunHandle::wait`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info_span};

use crate::errors::Result;
use crate::event::{RunEvent, TerminalEvent};
use crate::exec::invocation::Invocation;
use crate::exec::launcher::launch;
use crate::exec::monitor::{MonitorOptions, MonitoredRun, RunReport, TerminationCause, monitor};
use crate::exec::platform::{PlatformLaunchPolicy, default_policy};
use crate::exec::relay::spawn_relay;
use crate::exec::sink::{EventSink, EventStream, SharedSink};
use crate::types::{Channel, Outcome};

/// Tunables shared by every run started from one [`Runner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Kill the child if the run takes longer than this.
    pub timeout: Option<Duration>,
    /// How long relays may keep draining after a forced kill.
    pub drain_grace: Duration,
    /// Number of stderr lines kept for the failure detail.
    pub stderr_tail_lines: usize,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            drain_grace: Duration::from_secs(2),
            stderr_tail_lines: 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Runner {
    policy: Arc<dyn PlatformLaunchPolicy>,
    options: RunnerOptions,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(RunnerOptions::default())
    }
}

impl Runner {
    pub fn new(options: RunnerOptions) -> Self {
        Self {
            policy: default_policy(),
            options,
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn PlatformLaunchPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Launch `invocation` and start relaying its output into `sink`.
    ///
    /// Launch failures are returned here and emit no events at all. Once this
    /// returns `Ok`, exactly one terminal event will reach `sink`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<S>(&self, invocation: Invocation, sink: S) -> Result<RunHandle>
    where
        S: EventSink + 'static,
    {
        let sink: SharedSink = Arc::new(sink);
        let started = Instant::now();

        let launched = launch(&invocation, self.policy.as_ref())?;
        let pid = launched.pid;
        let span = info_span!("run", pid = ?pid, program = %invocation.program().display());
        drop(invocation);

        let tail = self.options.stderr_tail_lines;
        let (stdout, stderr) = {
            let _enter = span.enter();
            (
                spawn_relay(Channel::Stdout, launched.stdout, Arc::clone(&sink), tail),
                spawn_relay(Channel::Stderr, launched.stderr, Arc::clone(&sink), tail),
            )
        };

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let run = MonitoredRun {
            child: launched.child,
            pid,
            stdout,
            stderr,
            cancel_rx,
            sink: Arc::clone(&sink),
            options: MonitorOptions {
                deadline: self.options.timeout,
                drain_grace: self.options.drain_grace,
            },
            started,
        };
        let join = tokio::spawn(monitor(run).instrument(span));

        Ok(RunHandle {
            pid,
            cancel: Some(CancelHandle { tx: cancel_tx }),
            join,
            sink,
            started,
        })
    }

    /// Launch and wait for the final report.
    pub async fn run<S>(&self, invocation: Invocation, sink: S) -> Result<RunReport>
    where
        S: EventSink + 'static,
    {
        Ok(self.start(invocation, sink)?.wait().await)
    }
}

/// Requests termination of a running child.
#[derive(Debug)]
pub struct CancelHandle {
    tx: oneshot::Sender<()>,
}

impl CancelHandle {
    /// Returns `false` if the run had already finished.
    pub fn cancel(self) -> bool {
        self.tx.send(()).is_ok()
    }
}

/// A started run.
///
/// Dropping the handle detaches the run: output and the terminal event still
/// go to the sink, but the run can no longer be cancelled.
pub struct RunHandle {
    pid: Option<u32>,
    cancel: Option<CancelHandle>,
    join: JoinHandle<RunReport>,
    sink: SharedSink,
    started: Instant,
}

impl RunHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Split off the cancel handle, e.g. to hand it to a Ctrl-C listener.
    pub fn cancel_handle(&mut self) -> Option<CancelHandle> {
        self.cancel.take()
    }

    /// Kill the child; the run still ends with a single failure event.
    pub fn cancel(&mut self) -> bool {
        match self.cancel.take() {
            Some(handle) => handle.cancel(),
            None => false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Hand every event from `stream` to `on_event` until the run is over,
    /// then return its report.
    ///
    /// `stream` must be the receiving side of the sink this run was started
    /// with. The monitor is awaited alongside the stream, so a monitor that
    /// dies without reporting still closes the stream through the fallback
    /// terminal event of [`RunHandle::wait`].
    pub async fn follow<F, E>(
        self,
        mut stream: EventStream,
        mut on_event: F,
    ) -> std::result::Result<RunReport, E>
    where
        F: FnMut(&RunEvent) -> std::result::Result<(), E>,
    {
        let wait = self.wait();
        tokio::pin!(wait);

        let report = loop {
            tokio::select! {
                event = stream.recv() => match event {
                    Some(event) => on_event(&event)?,
                    None => break (&mut wait).await,
                },
                report = &mut wait => break report,
            }
        };

        // The terminal event is in the queue by now; flush up to it.
        while let Some(event) = stream.recv().await {
            on_event(&event)?;
        }
        Ok(report)
    }

    /// Wait for the run to finish.
    pub async fn wait(self) -> RunReport {
        match self.join.await {
            Ok(report) => report,
            Err(e) => {
                // The monitor died before reporting; close the run here so the
                // sink still sees exactly one terminal event.
                error!(pid = ?self.pid, error = %e, "completion monitor task failed");
                let cause = TerminationCause::WaitFailed(e.to_string());
                let detail = cause.describe();
                self.sink.submit(RunEvent::Terminal(TerminalEvent {
                    outcome: Outcome::Failure,
                    detail: detail.clone(),
                }));
                debug!(pid = ?self.pid, "submitted fallback terminal event");
                RunReport {
                    outcome: Outcome::Failure,
                    detail,
                    cause,
                    pid: self.pid,
                    stdout_lines: 0,
                    stderr_lines: 0,
                    stderr_tail: Vec::new(),
                    output_truncated: true,
                    elapsed: self.started.elapsed(),
                }
            }
        }
    }
}
