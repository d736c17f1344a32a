// src/exec/launcher.rs

//! Process launcher: turns an [`Invocation`] into a running child with both
//! output pipes in hand.

use std::process::Stdio;

use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, error, info};

use crate::errors::{RelayError, Result};
use crate::exec::invocation::Invocation;
use crate::exec::platform::PlatformLaunchPolicy;
use crate::types::Channel;

/// A started child, split into the parts that get handed to the relays and
/// the completion monitor.
#[derive(Debug)]
pub struct LaunchedProcess {
    pub child: Child,
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
    pub pid: Option<u32>,
}

/// Build the command for `invocation` without spawning it.
pub fn build_command(invocation: &Invocation, policy: &dyn PlatformLaunchPolicy) -> Command {
    let mut cmd = Command::new(invocation.program());
    cmd.args(invocation.get_args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = invocation.get_working_dir() {
        cmd.current_dir(dir);
    }

    policy.apply(&mut cmd);
    cmd
}

/// Validate, spawn and take the pipes of one child process.
///
/// Must be called from within a Tokio runtime. On error no child is left
/// running: spawn failures never produced one, and a child whose pipes could
/// not be taken is killed before returning.
pub fn launch(invocation: &Invocation, policy: &dyn PlatformLaunchPolicy) -> Result<LaunchedProcess> {
    invocation.validate()?;

    let program = invocation.program().display().to_string();
    let mut cmd = build_command(invocation, policy);

    debug!(
        program = %program,
        policy = policy.name(),
        working_dir = ?invocation.get_working_dir(),
        "spawning child process"
    );

    let mut child = cmd.spawn().map_err(|source| {
        error!(program = %program, error = %source, "failed to start program");
        RelayError::Launch {
            program: program.clone(),
            source,
        }
    })?;

    let stdout = match child.stdout.take() {
        Some(stdout) => stdout,
        None => return Err(abandon(child, program, Channel::Stdout)),
    };
    let stderr = match child.stderr.take() {
        Some(stderr) => stderr,
        None => return Err(abandon(child, program, Channel::Stderr)),
    };

    let pid = child.id();
    info!(program = %program, pid = ?pid, "child process started");

    Ok(LaunchedProcess {
        child,
        stdout,
        stderr,
        pid,
    })
}

/// Kill a child whose pipes are unusable and build the error for it.
fn abandon(mut child: Child, program: String, channel: Channel) -> RelayError {
    error!(program = %program, %channel, "child started without a {} pipe; killing it", channel);
    if let Err(e) = child.start_kill() {
        debug!(program = %program, error = %e, "kill after stream setup failure failed");
    }
    // Dropping the handle leaves reaping to the runtime (kill_on_drop is set).
    RelayError::StreamSetup { program, channel }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::exec::platform::NoopPolicy;

    #[tokio::test]
    async fn missing_executable_is_a_launch_failure() {
        let inv = Invocation::new("/definitely/not/a/real/program-xyz");
        let err = launch(&inv, &NoopPolicy).unwrap_err();
        match err {
            RelayError::Launch { program, source } => {
                assert!(program.contains("program-xyz"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected Launch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_executable_file_is_a_launch_failure() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = launch(&Invocation::new(file.path()), &NoopPolicy).unwrap_err();
        assert!(matches!(err, RelayError::Launch { .. }));
    }

    #[tokio::test]
    async fn successful_launch_hands_out_both_pipes() {
        let inv = Invocation::new("sh").arg("-c").arg("exit 0");
        let mut launched = launch(&inv, &NoopPolicy).unwrap();
        assert!(launched.pid.is_some());
        let status = launched.child.wait().await.unwrap();
        assert!(status.success());
    }
}
