//! Error taxonomy for backup and restore operations
//!
//! Every failure inside the pipeline is one of these kinds. Nothing is retried:
//! errors propagate to the top-level operation, which logs them and exits.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`BackupError`], used for exit-code mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Execution,
    ArtifactMissing,
    Transfer,
    Encryption,
    Restore,
    Io,
}

#[derive(Debug, Error)]
pub enum BackupError {
    /// Required configuration/environment values are absent
    #[error("Missing required variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    /// Configuration present but unusable (bad value, missing argument, unknown binary)
    #[error("Configuration error: {0}")]
    InvalidConfiguration(String),

    /// An external command failed
    #[error("Command failed [{command}]: {output}")]
    Execution { command: String, output: String },

    /// A pipeline step did not produce its expected file
    #[error("Result file not found: {} (last output: {output})", .path.display())]
    ArtifactMissing { path: PathBuf, output: String },

    /// Copy/upload/download to a destination failed
    #[error("Transfer to {destination} failed: {message}")]
    Transfer {
        destination: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Restore error: {0}")]
    Restore(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl BackupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackupError::MissingVariables(_) | BackupError::InvalidConfiguration(_) => {
                ErrorKind::Configuration
            }
            BackupError::Execution { .. } => ErrorKind::Execution,
            BackupError::ArtifactMissing { .. } => ErrorKind::ArtifactMissing,
            BackupError::Transfer { .. } => ErrorKind::Transfer,
            BackupError::Encryption(_) => ErrorKind::Encryption,
            BackupError::Restore(_) => ErrorKind::Restore,
            BackupError::Io { .. } => ErrorKind::Io,
        }
    }

    /// Build an I/O error with a human readable context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BackupError::Io {
            context: context.into(),
            source,
        }
    }

    /// Build a transfer error without an underlying cause
    pub fn transfer(destination: impl Into<String>, message: impl Into<String>) -> Self {
        BackupError::Transfer {
            destination: destination.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Build a transfer error that keeps the underlying client/network error
    pub fn transfer_with<E>(destination: impl Into<String>, message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BackupError::Transfer {
            destination: destination.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Names reported by a missing-variables error (empty for other kinds)
    pub fn missing_variables(&self) -> &[String] {
        match self {
            BackupError::MissingVariables(names) => names,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
