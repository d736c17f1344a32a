// src/output.rs

//! Rendering of run events for the CLI.

use std::io::{self, Write};

use tracing::{info, warn};

use crate::event::RunEvent;
use crate::types::{Channel, OutputFormat};

/// Write one event to the process's own stdout/stderr.
///
/// - `Plain`: stdout lines go to stdout, stderr lines to stderr, verbatim.
///   Diagnostics and the final status go through `tracing`.
/// - `Json`: every event becomes one JSON line on stdout.
pub fn print_event(format: OutputFormat, event: &RunEvent) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string(event).map_err(io::Error::other)?;
            writeln!(io::stdout().lock(), "{json}")
        }
        OutputFormat::Plain => match event {
            RunEvent::Line(line) => match line.channel {
                Channel::Stdout => writeln!(io::stdout().lock(), "{}", line.text),
                Channel::Stderr => writeln!(io::stderr().lock(), "{}", line.text),
            },
            RunEvent::Diagnostic { channel, message } => {
                warn!(%channel, "{message}");
                Ok(())
            }
            RunEvent::Terminal(terminal) => {
                info!(
                    outcome = %terminal.outcome,
                    detail = terminal.detail.as_deref().unwrap_or(""),
                    "run finished"
                );
                Ok(())
            }
        },
    }
}
