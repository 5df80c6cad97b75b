//! Symmetric encryption of backup artifacts
//!
//! Artifacts are wrapped with `openssl enc -aes-256-cbc -pbkdf2`. The password
//! never appears on a command line: openssl receives a pass spec (`env:NAME`,
//! `file:PATH` or `fd:N`) and resolves it itself.

use super::command::{quote, ProcessRunner, ShellCommand};
use super::naming::{decrypted_path, encrypted_path, file_name};
use crate::config::{env_value, Config};
use crate::errors::{BackupError, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn, Span};

pub const CIPHER: &str = "aes-256-cbc";
pub const PBKDF2_ITERATIONS: u32 = 10_000;

/// Where the cipher password lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassSpec {
    Env(String),
    File(PathBuf),
    Fd(u32),
}

impl FromStr for PassSpec {
    type Err = BackupError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            BackupError::Encryption(format!(
                "unsupported pass spec '{}' (expected env:<name>, file:<path> or fd:<number>)",
                s
            ))
        };

        let (kind, value) = s.split_once(':').ok_or_else(invalid)?;
        if value.is_empty() {
            return Err(invalid());
        }

        match kind {
            "env" => Ok(PassSpec::Env(value.to_string())),
            "file" => Ok(PassSpec::File(PathBuf::from(value))),
            "fd" => value.parse().map(PassSpec::Fd).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for PassSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassSpec::Env(name) => write!(f, "env:{}", name),
            PassSpec::File(path) => write!(f, "file:{}", path.display()),
            PassSpec::Fd(fd) => write!(f, "fd:{}", fd),
        }
    }
}

/// Wraps and unwraps artifacts with the configured pass spec
pub struct EncryptionCodec {
    runner: ProcessRunner,
    config: Arc<Config>,
    spec: PassSpec,
    span: Span,
}

impl EncryptionCodec {
    pub fn new(runner: ProcessRunner, config: Arc<Config>, spec: PassSpec, span: Span) -> Self {
        Self {
            runner,
            config,
            spec,
            span,
        }
    }

    pub fn spec(&self) -> &PassSpec {
        &self.spec
    }

    /// Encrypt `path` into `<path>.enc` and remove the plain artifact
    pub fn encrypt(&self, path: &Path) -> Result<PathBuf> {
        let _enter = self.span.enter();
        let output_path = encrypted_path(path);
        debug!("encrypting file {} ...", path.display());

        self.run_cipher("-e", path, &output_path)?;

        if let Err(e) = fs::remove_file(path) {
            warn!("Couldn't remove unencrypted file {}: {}", path.display(), e);
        }

        info!("encryption: backup file encrypted {}", output_path.display());
        Ok(output_path)
    }

    /// Decrypt `<path>.enc` into `<path>`; the encrypted input is kept
    pub fn decrypt(&self, path: &Path) -> Result<PathBuf> {
        let _enter = self.span.enter();
        let output_path = decrypted_path(path);
        if output_path == path {
            return Err(BackupError::Encryption(format!(
                "not an encrypted artifact: {}",
                file_name(path)
            )));
        }
        debug!("decrypting file {} ...", path.display());

        self.run_cipher("-d", path, &output_path)?;

        info!("decryption: backup file decrypted {}", output_path.display());
        Ok(output_path)
    }

    fn run_cipher(&self, mode: &str, input: &Path, output: &Path) -> Result<()> {
        let command = self.prepare_command(mode, input, output)?;

        self.runner
            .ensure_binary("openssl")
            .map_err(|e| BackupError::Encryption(e.to_string()))?;

        let last_output = self
            .runner
            .run(&command)
            .map_err(|e| BackupError::Encryption(e.to_string()))?;

        match fs::metadata(output) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
            _ => Err(BackupError::ArtifactMissing {
                path: output.to_path_buf(),
                output: last_output.trim().to_string(),
            }),
        }
    }

    /// Build the cipher command after checking the secret can be resolved
    fn prepare_command(&self, mode: &str, input: &Path, output: &Path) -> Result<ShellCommand> {
        if !input.is_file() {
            return Err(BackupError::Encryption(format!(
                "input file does not exist: {}",
                input.display()
            )));
        }

        let line = format!(
            "openssl enc -{} {} -pbkdf2 -iter {} -pass {} -in {} -out {}",
            CIPHER,
            mode,
            PBKDF2_ITERATIONS,
            quote(&self.spec.to_string()),
            quote(&input.display().to_string()),
            quote(&output.display().to_string()),
        );
        let mut command = ShellCommand::new(line);

        match &self.spec {
            PassSpec::Env(name) => {
                if env_value(name).is_none() {
                    // Only available from the config file: hand it to the child process
                    let value = self.config.lookup(name).ok_or_else(|| {
                        BackupError::Encryption(format!(
                            "Missing value for env variable {}",
                            name
                        ))
                    })?;
                    command = command.with_env(name.clone(), value);
                }
            }
            PassSpec::File(path) => {
                let contents = fs::read_to_string(path).map_err(|e| {
                    BackupError::Encryption(format!(
                        "Couldn't read password file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                if contents.lines().next().map_or(true, |l| l.trim().is_empty()) {
                    return Err(BackupError::Encryption(format!(
                        "Password file {} is empty",
                        path.display()
                    )));
                }
            }
            PassSpec::Fd(fd) => {
                if !fd_is_open(*fd) {
                    return Err(BackupError::Encryption(format!(
                        "File descriptor {} is not open",
                        fd
                    )));
                }
            }
        }

        Ok(command)
    }
}

#[cfg(unix)]
fn fd_is_open(fd: u32) -> bool {
    Path::new(&format!("/dev/fd/{}", fd)).exists()
}

#[cfg(not(unix))]
fn fd_is_open(_fd: u32) -> bool {
    false
}
