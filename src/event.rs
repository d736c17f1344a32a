// src/event.rs

//! Events produced by one invocation.
//!
//! A run emits any number of [`RunEvent::Line`] and [`RunEvent::Diagnostic`]
//! events followed by exactly one [`RunEvent::Terminal`]. Lines from the same
//! channel arrive in production order; lines from different channels have no
//! ordering relationship.

use serde::Serialize;

use crate::types::{Channel, Outcome};

/// One line of child output, with the terminator stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputLine {
    pub channel: Channel,
    pub text: String,
}

/// The single event that closes a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminalEvent {
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl TerminalEvent {
    pub fn success() -> Self {
        Self {
            outcome: Outcome::Success,
            detail: None,
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Failure,
            detail: Some(detail.into()),
        }
    }
}

/// Everything that flows out of a run, tagged by `kind` when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RunEvent {
    Line(OutputLine),
    /// A relay's stream read failed; the relay stopped but the run goes on.
    Diagnostic { channel: Channel, message: String },
    Terminal(TerminalEvent),
}

impl RunEvent {
    pub fn line(channel: Channel, text: impl Into<String>) -> Self {
        RunEvent::Line(OutputLine {
            channel,
            text: text.into(),
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunEvent::Terminal(_))
    }
}
