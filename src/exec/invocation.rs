// src/exec/invocation.rs

//! The immutable description of one child process launch.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::{RelayError, Result};

/// A fully specified request to run one external program once.
///
/// Built with consuming builder methods; once handed to the launcher it is
/// never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
    working_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// The engine preset: `<executable> run --config <dir> --configname <name>`,
    /// run from the executable's own directory.
    ///
    /// The working directory is made absolute against the current directory
    /// so relative config paths resolve the way the engine expects.
    pub fn engine(
        executable: impl Into<PathBuf>,
        config_dir: impl Into<OsString>,
        config_name: impl Into<OsString>,
    ) -> Result<Self> {
        let executable = executable.into();
        let dir = absolute_parent(&executable)?;
        Ok(Self::new(executable)
            .arg("run")
            .arg("--config")
            .arg(config_dir)
            .arg("--configname")
            .arg(config_name)
            .working_dir(dir))
    }

    /// `<interpreter> <script> <params...>`, run from the script's directory.
    ///
    /// The script is passed by file name since the child starts inside its
    /// directory.
    pub fn script<I, S>(interpreter: impl Into<PathBuf>, script: impl Into<PathBuf>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let script = script.into();
        let parent = script.parent().filter(|p| !p.as_os_str().is_empty());
        match (parent, script.file_name()) {
            (Some(parent), Some(name)) => Self::new(interpreter)
                .arg(name)
                .args(params)
                .working_dir(parent),
            _ => Self::new(interpreter).arg(script.as_os_str()).args(params),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn get_working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Check the launch preconditions that can be checked without spawning.
    ///
    /// - the program must be non-empty;
    /// - the working directory, if any, must exist and be a directory now.
    pub fn validate(&self) -> Result<()> {
        if self.program.as_os_str().is_empty() {
            return Err(RelayError::InvalidInvocation(
                "program path must not be empty".to_string(),
            ));
        }

        if let Some(dir) = &self.working_dir {
            match std::fs::metadata(dir) {
                Ok(meta) if meta.is_dir() => {}
                Ok(_) => {
                    return Err(RelayError::WorkingDir {
                        path: dir.clone(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::InvalidInput,
                            "not a directory",
                        ),
                    });
                }
                Err(source) => {
                    return Err(RelayError::WorkingDir {
                        path: dir.clone(),
                        source,
                    });
                }
            }
        }

        Ok(())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

fn absolute_parent(executable: &Path) -> Result<PathBuf> {
    let parent = match executable.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if parent.is_absolute() {
        Ok(parent)
    } else {
        Ok(std::env::current_dir()?.join(parent))
    }
}
