//! Utilities for running shell commands with secret masking and failure classification

use super::executor::CommandExecutor;
use crate::errors::{BackupError, Result};
use regex::{Captures, Regex};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Replacement for secrets in logged command lines
pub const SECRET_MASK: &str = "*****";

/// A shell command line plus what is needed to run and log it safely
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    line: String,
    secret_prefix: Option<String>,
    envs: Vec<(String, String)>,
}

impl ShellCommand {
    pub fn new(line: impl Into<String>) -> Self {
        Self {
            line: line.into().trim().to_string(),
            secret_prefix: None,
            envs: Vec::new(),
        }
    }

    /// Mask the token following `prefix` whenever this command is logged
    pub fn with_secret_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.secret_prefix = Some(prefix.into());
        self
    }

    /// Extra environment variable for the child process
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn envs(&self) -> &[(String, String)] {
        &self.envs
    }

    /// Command line safe for logs and error messages
    pub fn masked(&self) -> String {
        mask_secret(&self.line, self.secret_prefix.as_deref())
    }
}

/// Captured output of one external invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// stderr followed by stdout
    pub output: String,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl ProcessResult {
    pub fn new(output: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self {
            output: output.into(),
            exit_code,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn looks_like_error(&self) -> bool {
        looks_like_error(&self.output)
    }
}

/// Case-insensitive scan for `error` / `fail` in command output
pub fn looks_like_error(output: &str) -> bool {
    let lower = output.to_lowercase();
    lower.contains("error") || lower.contains("fail")
}

/// Replace the secret following `prefix` with [`SECRET_MASK`].
///
/// Quoted secrets keep their quote characters (`-p"*****"`) and are masked up
/// to the first unescaped closing quote; bare ones are replaced up to the next
/// whitespace (`PGPASSWORD=*****`). The prefix must
/// start the line or follow whitespace. Without a prefix the command is
/// returned unchanged.
pub fn mask_secret(command: &str, prefix: Option<&str>) -> String {
    let prefix = match prefix {
        Some(p) if !p.is_empty() => p,
        _ => return command.to_string(),
    };

    let pattern = format!(
        r#"(^|\s)({})(?:("+)((?:\\.|[^"\\])*)|([^\s"]+))"#,
        regex::escape(prefix)
    );
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(_) => return command.to_string(),
    };

    re.replace_all(command, |caps: &Captures| {
        let quotes = caps.get(3).map(|m| m.as_str()).unwrap_or("");
        format!("{}{}{}{}", &caps[1], &caps[2], quotes, SECRET_MASK)
    })
    .into_owned()
}

/// Quote an argument for `sh -c` when it contains anything unusual
pub fn quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

/// Runs shell commands through an executor and turns failures into errors
#[derive(Clone)]
pub struct ProcessRunner {
    executor: Arc<dyn CommandExecutor>,
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(executor: Arc<dyn CommandExecutor>, timeout: Option<Duration>) -> Self {
        Self { executor, timeout }
    }

    pub fn executor(&self) -> &dyn CommandExecutor {
        self.executor.as_ref()
    }

    /// Run a command and return its combined output.
    ///
    /// A non-zero exit status is a failure. Output that merely mentions an
    /// error after a clean exit is logged as a warning; callers verify the
    /// files the command was supposed to produce.
    pub fn run(&self, command: &ShellCommand) -> Result<String> {
        let masked = command.masked();
        debug!("Call command [{}] ...", masked);

        let result = self.executor.execute(command, self.timeout)?;
        let output = result.output.trim();

        if !result.success() {
            error!("Command failed [{}] (exit code {:?})", masked, result.exit_code);
            let output = if output.is_empty() {
                format!("exit code {:?}", result.exit_code)
            } else {
                output.trim_start_matches("Error: ").to_string()
            };
            return Err(BackupError::Execution {
                command: masked,
                output,
            });
        }

        if result.looks_like_error() {
            warn!("Command [{}] exited cleanly but reported: {}", masked, output);
        } else if !output.is_empty() {
            debug!("{}", output);
        }

        Ok(result.output)
    }

    /// Fail fast when a required program is not available
    pub fn ensure_binary(&self, program: &str) -> Result<()> {
        match self.executor.locate(program) {
            Some(path) => {
                debug!("Found {} at {}", program, path.display());
                Ok(())
            }
            None => Err(BackupError::InvalidConfiguration(format!(
                "executable not found in PATH: {}",
                program
            ))),
        }
    }
}

/// Spawn a shell for `command`, capturing stderr and stdout
pub fn spawn_shell(command: &ShellCommand, timeout: Option<Duration>) -> Result<ProcessResult> {
    #[cfg(unix)]
    let (shell, flag) = ("sh", "-c");

    #[cfg(windows)]
    let (shell, flag) = ("cmd", "/C");

    let mut cmd = Command::new(shell);
    cmd.arg(flag).arg(command.line());
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    for (key, value) in command.envs() {
        cmd.env(key, value);
    }

    let output = if let Some(timeout_duration) = timeout {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BackupError::io("Failed to start async runtime", e))?;

        runtime.block_on(async {
            let mut child = tokio::process::Command::from(cmd);
            child.kill_on_drop(true);

            match tokio::time::timeout(timeout_duration, child.output()).await {
                Ok(output) => output.map_err(|e| {
                    BackupError::io(format!("Failed to execute [{}]", command.masked()), e)
                }),
                Err(_) => Err(BackupError::Execution {
                    command: command.masked(),
                    output: format!("Command timed out after {:?}", timeout_duration),
                }),
            }
        })?
    } else {
        cmd.output()
            .map_err(|e| BackupError::io(format!("Failed to execute [{}]", command.masked()), e))?
    };

    let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stdout));

    Ok(ProcessResult::new(text, output.status.code()))
}
