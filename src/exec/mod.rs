// src/exec/mod.rs

//! Process execution layer.
//!
//! This module launches one child process with `tokio::process::Command`,
//! relays its stdout/stderr line by line into an [`EventSink`], and reports
//! a single terminal event once the run is over.
//!
//! - [`invocation`] describes what to run.
//! - [`platform`] holds the per-OS launch policy.
//! - [`launcher`] spawns the child and takes its pipes.
//! - [`line_reader`] and [`relay`] turn each pipe into ordered line events.
//! - [`monitor`] joins the child and both relays and emits the terminal event.
//! - [`sink`] is the outward event boundary.
//! - [`runner`] wires it all together; [`capture`] builds a collect-everything
//!   run on top of it.

pub mod capture;
pub mod invocation;
pub mod launcher;
pub mod line_reader;
pub mod monitor;
pub mod platform;
pub mod relay;
pub mod runner;
pub mod sink;

pub use capture::{CapturedOutput, run_captured};
pub use invocation::Invocation;
pub use launcher::{LaunchedProcess, launch};
pub use line_reader::LineReader;
pub use monitor::{RunReport, TerminationCause};
pub use platform::{NoopPolicy, PlatformLaunchPolicy, default_policy};
pub use runner::{CancelHandle, RunHandle, Runner, RunnerOptions};
pub use sink::{ChannelSink, EventSink, EventStream, FnSink, SharedSink, event_channel};
