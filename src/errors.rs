// src/errors.rs

//! Crate-wide error type.
//!
//! Launch-time failures (`InvalidInvocation`, `Launch`, `StreamSetup`) are
//! returned synchronously from [`crate::exec::Runner::start`]. Mid-run
//! failures travel through the event sink instead; `Read` and `Exit` exist so
//! those can still be logged and turned into an error by callers that want
//! one.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Channel;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("invalid invocation: {0}")]
    InvalidInvocation(String),

    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid working directory {path:?}: {source}")]
    WorkingDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to set up {channel} pipe for '{program}'")]
    StreamSetup { program: String, channel: Channel },

    #[error("error reading {channel}: {source}")]
    Read {
        channel: Channel,
        #[source]
        source: std::io::Error,
    },

    #[error("run failed: {detail}")]
    Exit { detail: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RelayError {
    /// True for errors raised before any child process was left running.
    pub fn is_launch_failure(&self) -> bool {
        matches!(
            self,
            RelayError::InvalidInvocation(_)
                | RelayError::Launch { .. }
                | RelayError::WorkingDir { .. }
                | RelayError::StreamSetup { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
