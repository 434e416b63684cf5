use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::error::ProvisionError;

/// A single external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }
}

/// Renders the command line the way a user would type it (without the cwd).
impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// How a command's standard streams are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Stream to the user's terminal.
    Inherit,
    /// Capture stdout, discard stderr.
    Capture,
    /// Discard both streams; only the exit status matters.
    Quiet,
}

/// Exit status and captured stdout of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
        }
    }

    pub fn exit(code: i32) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Trimmed stdout, or `None` when the command failed or printed nothing.
    pub fn trimmed(&self) -> Option<&str> {
        let out = self.stdout.trim();
        (self.success() && !out.is_empty()).then_some(out)
    }
}

/// Executes external programs.
///
/// Every subprocess the provisioning flows start goes through this seam.
/// A program that cannot be found must surface as
/// [`ProvisionError::ProgramNotFound`] so callers can treat it as "tool
/// absent" rather than as a hard failure.
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        command: &CommandSpec,
        mode: OutputMode,
    ) -> Result<CommandOutput, ProvisionError>;
}

/// Runs commands on the host through `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait::async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        command: &CommandSpec,
        mode: OutputMode,
    ) -> Result<CommandOutput, ProvisionError> {
        match &command.cwd {
            Some(cwd) => tracing::debug!("[RUN] {command} (in {})", cwd.display()),
            None => tracing::debug!("[RUN] {command}"),
        }

        let mut process = tokio::process::Command::new(&command.program);
        process.args(&command.args);
        if let Some(cwd) = &command.cwd {
            process.current_dir(cwd);
        }

        let spawn_error = |e: std::io::Error| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProvisionError::ProgramNotFound(command.program.clone())
            } else {
                ProvisionError::Spawn {
                    program: command.program.clone(),
                    source: e,
                }
            }
        };

        match mode {
            OutputMode::Inherit => {
                let status = process.status().await.map_err(spawn_error)?;
                Ok(CommandOutput {
                    code: status.code(),
                    stdout: String::new(),
                })
            }
            OutputMode::Capture => {
                let output = process
                    .stdin(Stdio::null())
                    .stderr(Stdio::null())
                    .output()
                    .await
                    .map_err(spawn_error)?;
                Ok(CommandOutput {
                    code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                })
            }
            OutputMode::Quiet => {
                let status = process
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .await
                    .map_err(spawn_error)?;
                Ok(CommandOutput {
                    code: status.code(),
                    stdout: String::new(),
                })
            }
        }
    }
}
