// src/exec/capture.rs

//! Run-to-completion helper for short helper scripts whose output is wanted
//! as a whole rather than streamed.

use std::convert::Infallible;

use tracing::debug;

use crate::errors::{RelayError, Result};
use crate::event::RunEvent;
use crate::exec::invocation::Invocation;
use crate::exec::monitor::RunReport;
use crate::exec::runner::Runner;
use crate::exec::sink::event_channel;
use crate::types::Channel;

/// Everything a captured run printed, plus its report.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    /// Stdout lines, each followed by `\n`.
    pub stdout: String,
    /// Stderr lines, each followed by `\n`.
    pub stderr: String,
    pub report: RunReport,
}

/// Run `invocation` to completion and collect its output.
///
/// A non-zero exit (or any other failure) becomes `RelayError::Exit` whose
/// detail carries the full collected stderr.
pub async fn run_captured(runner: &Runner, invocation: Invocation) -> Result<CapturedOutput> {
    let (sink, stream) = event_channel();
    let handle = runner.start(invocation, sink)?;

    let mut stdout = String::new();
    let mut stderr = String::new();
    let report = handle
        .follow(stream, |event| {
            match event {
                RunEvent::Line(line) => {
                    let buf = match line.channel {
                        Channel::Stdout => &mut stdout,
                        Channel::Stderr => &mut stderr,
                    };
                    buf.push_str(&line.text);
                    buf.push('\n');
                }
                RunEvent::Diagnostic { channel, message } => {
                    debug!(%channel, %message, "diagnostic during captured run");
                }
                RunEvent::Terminal(_) => {}
            }
            Ok::<_, Infallible>(())
        })
        .await;
    let report = match report {
        Ok(report) => report,
        Err(never) => match never {},
    };

    if report.is_success() {
        return Ok(CapturedOutput {
            stdout,
            stderr,
            report,
        });
    }

    let reason = report
        .cause
        .describe()
        .unwrap_or_else(|| "run failed".to_string());
    let detail = if stderr.trim().is_empty() {
        reason
    } else {
        format!("{reason}, stderr: {}", stderr.trim_end())
    };
    Err(RelayError::Exit { detail })
}
