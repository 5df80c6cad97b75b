//! Configuration module for db-backups
//!
//! Settings come from an optional TOML file and from the process environment.
//! Every setting has a canonical variable name (`PG_HOST`, `S3_BUCKET_NAME`, ...).
//!
//! ## Lookup order
//!
//! 1. Process environment variable with that name (when non-empty)
//! 2. Value from the config file (or its built-in default)
//!
//! ## Example Usage
//!
//! ```no_run
//! use db_backups::config;
//!
//! let config = config::load_config("db-backups.toml")?;
//! let host = config.lookup("PG_HOST");
//! println!("Postgres host: {:?}", host);
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{load_config, load_or_default, parse_config, ConfigError, Result};
pub use types::*;

use crate::errors::BackupError;
use crate::utils::env_check::check_env_variables;
use std::path::{Path, PathBuf};

/// Variables required by the S3 destination/source
pub const S3_VARIABLES: &[&str] = &[
    "S3_REGION_NAME",
    "S3_STORAGE_URL",
    "S3_ACCESS_KEY_ID",
    "S3_SECRET_ACCESS_KEY",
    "S3_BUCKET_NAME",
    "S3_PATH",
];

/// Variables required by the LOCAL destination/source
pub const LOCAL_VARIABLES: &[&str] = &["LOCAL_PATH"];

/// Variables required by the default encryption pass spec
pub const ENCRYPT_VARIABLES: &[&str] = &["ENCRYPT_PASS"];

impl Config {
    /// Resolve a setting by its variable name, environment first
    pub fn lookup(&self, name: &str) -> Option<String> {
        env_value(name).or_else(|| self.file_value(name).filter(|v| !v.is_empty()))
    }

    /// Resolve a setting or fail with a missing-variable error
    pub fn require(&self, name: &str) -> std::result::Result<String, BackupError> {
        self.lookup(name)
            .ok_or_else(|| BackupError::MissingVariables(vec![name.to_string()]))
    }

    /// Value held by the config file (including defaults) for a variable name
    pub fn file_value(&self, name: &str) -> Option<String> {
        let path_value = |p: &Option<PathBuf>| p.as_ref().map(|p| p.display().to_string());

        match name {
            "LOCAL_PATH" => path_value(&self.global.local_path),
            "TMP_BACKUP_DIR" => Some(self.global.tmp_dir.display().to_string()),
            "ENCRYPT_PASS" => self.global.encrypt_pass.clone(),
            "LOG_DIR" => Some(self.global.log_directory.display().to_string()),
            "LOG_LEVEL" => Some(self.global.log_level.clone()),

            "MYSQL_HOST" => Some(self.mysql.host.clone()),
            "MYSQL_PORT" => Some(self.mysql.port.to_string()),
            "MYSQL_USER" => Some(self.mysql.user.clone()),
            "MYSQL_PASSWORD" => self.mysql.password.clone(),
            "MYSQL_DUMP" => Some(self.mysql.dump_binary.clone()),
            "MYSQL_CLIENT" => Some(self.mysql.client_binary.clone()),

            "PG_HOST" => Some(self.postgres.host.clone()),
            "PG_PORT" => Some(self.postgres.port.to_string()),
            "PG_USER" => Some(self.postgres.user.clone()),
            "PG_PASSWORD" => self.postgres.password.clone(),
            "PG_DUMP" => Some(self.postgres.dump_binary.clone()),
            "PG_PSQL" => Some(self.postgres.psql_binary.clone()),

            "S3_REGION_NAME" => self.s3.region_name.clone(),
            "S3_STORAGE_URL" => self.s3.storage_url.clone(),
            "S3_ACCESS_KEY_ID" => self.s3.access_key_id.clone(),
            "S3_SECRET_ACCESS_KEY" => self.s3.secret_access_key.clone(),
            "S3_BUCKET_NAME" => self.s3.bucket_name.clone(),
            "S3_PATH" => self.s3.path.clone(),

            _ => None,
        }
    }

    /// Directory used by the LOCAL destination and source
    pub fn local_path(&self) -> std::result::Result<PathBuf, BackupError> {
        check_env_variables(LOCAL_VARIABLES, self, true)?;
        self.require("LOCAL_PATH")
            .map(|p| expand_tilde(Path::new(&p)))
    }

    /// Root directory for per-run working directories
    pub fn tmp_root(&self) -> PathBuf {
        self.lookup("TMP_BACKUP_DIR")
            .map(|p| expand_tilde(Path::new(&p)))
            .unwrap_or_else(|| self.global.tmp_dir.clone())
    }

    /// Resolve all S3 settings, failing with the complete list of missing names
    pub fn s3_settings(&self) -> std::result::Result<S3Settings, BackupError> {
        check_env_variables(S3_VARIABLES, self, true)?;

        Ok(S3Settings {
            region_name: self.require("S3_REGION_NAME")?,
            storage_url: self.require("S3_STORAGE_URL")?,
            access_key_id: self.require("S3_ACCESS_KEY_ID")?,
            secret_access_key: self.require("S3_SECRET_ACCESS_KEY")?,
            bucket_name: self.require("S3_BUCKET_NAME")?,
            path: self.require("S3_PATH")?.trim_matches('/').to_string(),
        })
    }
}

/// Non-empty value of a process environment variable
pub fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Expand tilde (~) in path
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
