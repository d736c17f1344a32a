// src/exec/platform.rs

//! Per-OS launch attributes.
//!
//! The launcher never branches on the target OS itself; it asks a
//! [`PlatformLaunchPolicy`] to decorate the command before spawning.
//! [`default_policy`] picks the implementation for the build target.

use std::sync::Arc;

use tokio::process::Command;

/// Hook applied to every command right before it is spawned.
pub trait PlatformLaunchPolicy: Send + Sync + std::fmt::Debug {
    fn apply(&self, cmd: &mut Command);

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Windows: keep the engine from opening its own console window on top of
/// the host UI.
///
/// Only the "no new console" half is applied. Hiding the window itself
/// (`STARTUPINFO.wShowWindow = SW_HIDE`) has no stable `CommandExt`
/// equivalent, and with `CREATE_NO_WINDOW` there is no console window left
/// to show for console programs.
#[cfg(windows)]
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsHiddenConsole;

#[cfg(windows)]
impl WindowsHiddenConsole {
    /// `CREATE_NO_WINDOW`: run console children without a console window.
    pub const CREATE_NO_WINDOW: u32 = 0x0800_0000;
}

#[cfg(windows)]
impl PlatformLaunchPolicy for WindowsHiddenConsole {
    fn apply(&self, cmd: &mut Command) {
        cmd.creation_flags(Self::CREATE_NO_WINDOW);
    }

    fn name(&self) -> &'static str {
        "windows-hidden-console"
    }
}

/// Platforms without a console-window concept.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPolicy;

impl PlatformLaunchPolicy for NoopPolicy {
    fn apply(&self, _cmd: &mut Command) {}

    fn name(&self) -> &'static str {
        "noop"
    }
}

#[cfg(windows)]
pub fn default_policy() -> Arc<dyn PlatformLaunchPolicy> {
    Arc::new(WindowsHiddenConsole)
}

#[cfg(not(windows))]
pub fn default_policy() -> Arc<dyn PlatformLaunchPolicy> {
    Arc::new(NoopPolicy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(windows))]
    #[test]
    fn non_windows_default_is_noop() {
        assert_eq!(default_policy().name(), "noop");
    }

    #[cfg(windows)]
    #[test]
    fn windows_default_hides_console() {
        assert_eq!(default_policy().name(), "windows-hidden-console");
        assert_eq!(WindowsHiddenConsole::CREATE_NO_WINDOW, 0x0800_0000);
    }
}
