// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, RawConfigFile, RunnerSection, ScriptSection};
use crate::errors::{RelayError, Result};
use crate::exec::RunnerOptions;
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::RelayError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let runner = validate_runner(&raw.runner)?;
        validate_script(&raw.script)?;
        Ok(ConfigFile::new_unchecked(runner, raw.engine, raw.script))
    }
}

fn validate_runner(section: &RunnerSection) -> Result<RunnerOptions> {
    let timeout = match section.timeout.as_deref() {
        Some(s) => Some(parse_field("[runner].timeout", s)?),
        None => None,
    };
    if timeout == Some(Duration::ZERO) {
        return Err(RelayError::Config(
            "[runner].timeout must be greater than zero".to_string(),
        ));
    }

    let drain_grace = parse_field("[runner].drain_grace", &section.drain_grace)?;

    if section.stderr_tail_lines == 0 {
        return Err(RelayError::Config(
            "[runner].stderr_tail_lines must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(RunnerOptions {
        timeout,
        drain_grace,
        stderr_tail_lines: section.stderr_tail_lines,
    })
}

fn validate_script(section: &ScriptSection) -> Result<()> {
    if section.interpreter.trim().is_empty() {
        return Err(RelayError::Config(
            "[script].interpreter must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn parse_field(field: &str, value: &str) -> Result<Duration> {
    parse_duration(value).map_err(|e| RelayError::Config(format!("{field}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<ConfigFile> {
        let raw: RawConfigFile = toml::from_str(toml_src)?;
        ConfigFile::try_from(raw)
    }

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg.runner, RunnerOptions::default());
        assert_eq!(cfg.script.interpreter, "python");
        assert!(cfg.engine.executable.is_none());
    }

    #[test]
    fn runner_section_is_parsed() {
        let cfg = parse(
            r#"
[runner]
timeout = "30m"
drain_grace = "500ms"
stderr_tail_lines = 5

[engine]
executable = "palm/palm.exe"
config_dir = "../configs"
"#,
        )
        .unwrap();
        assert_eq!(cfg.runner.timeout, Some(Duration::from_secs(1800)));
        assert_eq!(cfg.runner.drain_grace, Duration::from_millis(500));
        assert_eq!(cfg.runner.stderr_tail_lines, 5);
        assert_eq!(
            cfg.engine.executable.as_deref(),
            Some(std::path::Path::new("palm/palm.exe"))
        );
    }

    #[test]
    fn bad_duration_names_the_field() {
        match parse("[runner]\ntimeout = \"soon\"\n") {
            Err(RelayError::Config(msg)) => assert!(msg.contains("[runner].timeout")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(matches!(
            parse("[runner]\ntimeout = \"0s\"\n"),
            Err(RelayError::Config(_))
        ));
    }

    #[test]
    fn zero_tail_lines_is_rejected() {
        assert!(matches!(
            parse("[runner]\nstderr_tail_lines = 0\n"),
            Err(RelayError::Config(_))
        ));
    }

    #[test]
    fn blank_interpreter_is_rejected() {
        assert!(matches!(
            parse("[script]\ninterpreter = \"  \"\n"),
            Err(RelayError::Config(_))
        ));
    }
}
