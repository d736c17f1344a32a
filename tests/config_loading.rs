// tests/config_loading.rs

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use procrelay::config::{load_and_validate, load_or_default};
use procrelay::errors::RelayError;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn full_config_file_is_loaded_and_validated() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Procrelay.toml");
    fs::write(
        &path,
        r#"
[runner]
timeout = "90s"
drain_grace = "500ms"
stderr_tail_lines = 5

[engine]
executable = "./palm/palm.exe"
config_dir = "../configs"

[script]
interpreter = "python3"
"#,
    )?;

    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.runner.timeout, Some(Duration::from_secs(90)));
    assert_eq!(cfg.runner.drain_grace, Duration::from_millis(500));
    assert_eq!(cfg.runner.stderr_tail_lines, 5);
    assert_eq!(cfg.engine.executable, Some(PathBuf::from("./palm/palm.exe")));
    assert_eq!(cfg.engine.config_dir, Some(PathBuf::from("../configs")));
    assert_eq!(cfg.engine.working_dir, None);
    assert_eq!(cfg.script.interpreter, "python3");
    Ok(())
}

#[test]
fn bad_duration_names_the_field() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[runner]\ndrain_grace = \"soon\"\n")?;

    match load_and_validate(&path) {
        Err(RelayError::Config(msg)) => assert!(msg.contains("[runner].drain_grace"), "{msg}"),
        other => panic!("expected Config error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn malformed_toml_is_a_toml_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[runner\ntimeout = ")?;

    assert!(matches!(load_and_validate(&path), Err(RelayError::Toml(_))));
    Ok(())
}

#[test]
fn explicit_missing_path_is_an_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("nope.toml");
    assert!(matches!(
        load_or_default(Some(&missing)),
        Err(RelayError::Io(_))
    ));
    Ok(())
}
