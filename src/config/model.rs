// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::exec::RunnerOptions;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [runner]
/// timeout = "30m"
/// drain_grace = "2s"
/// stderr_tail_lines = 20
///
/// [engine]
/// executable = "./palm/palm.exe"
/// config_dir = "../configs"
///
/// [script]
/// interpreter = "python"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub runner: RunnerSection,

    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub script: ScriptSection,
}

/// `[runner]` section: lifecycle tunables for every run.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    /// Optional run deadline, e.g. `"30m"`. No deadline when absent.
    #[serde(default)]
    pub timeout: Option<String>,

    /// How long output may keep draining after a forced kill.
    #[serde(default = "default_drain_grace")]
    pub drain_grace: String,

    /// Stderr lines quoted in a failure detail.
    #[serde(default = "default_stderr_tail_lines")]
    pub stderr_tail_lines: usize,
}

fn default_drain_grace() -> String {
    "2s".to_string()
}

fn default_stderr_tail_lines() -> usize {
    20
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            timeout: None,
            drain_grace: default_drain_grace(),
            stderr_tail_lines: default_stderr_tail_lines(),
        }
    }
}

/// `[engine]` section: defaults for the `engine` subcommand.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineSection {
    pub executable: Option<PathBuf>,

    /// Overrides the default of running from the executable's directory.
    pub working_dir: Option<PathBuf>,

    /// Default for `--engine-config`.
    pub config_dir: Option<PathBuf>,
}

/// `[script]` section: defaults for the `script` subcommand.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptSection {
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
}

fn default_interpreter() -> String {
    "python".to_string()
}

impl Default for ScriptSection {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
        }
    }
}

/// Validated configuration. Build it through `ConfigFile::try_from`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub runner: RunnerOptions,
    pub engine: EngineSection,
    pub script: ScriptSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        runner: RunnerOptions,
        engine: EngineSection,
        script: ScriptSection,
    ) -> Self {
        Self {
            runner,
            engine,
            script,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(
            RunnerOptions::default(),
            EngineSection::default(),
            ScriptSection::default(),
        )
    }
}
