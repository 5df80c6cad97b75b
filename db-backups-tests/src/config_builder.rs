//! Fluent API for building test configurations
//!
//! Provides a builder pattern for creating test configurations with sensible defaults.
//! Every path points into a private temp dir so runs never touch the real system.

use db_backups::config::{Config, S3Settings};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    config: Config,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder: temp root and log dir inside a fresh temp dir,
    /// no passwords, no LOCAL path and no S3 settings
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let tmp_dir = temp_dir.path().join("work");
        fs::create_dir_all(&tmp_dir).expect("Failed to create work root");

        let log_directory = temp_dir.path().join("logs");
        fs::create_dir_all(&log_directory).expect("Failed to create log_directory");

        let mut config = Config::default();
        config.global.tmp_dir = tmp_dir;
        config.global.log_directory = log_directory;
        config.global.log_max_files = 5;

        Self { temp_dir, config }
    }

    /// Config with a LOCAL directory and credentials for both direct engines
    pub fn minimal() -> Self {
        Self::new()
            .with_local_dir("local")
            .with_mysql_password("mysql-secret")
            .with_pg_password("pg-secret")
    }

    /// Use `<temp>/<name>` as LOCAL_PATH (created)
    pub fn with_local_dir(mut self, name: &str) -> Self {
        let path = self.temp_dir.path().join(name);
        fs::create_dir_all(&path).expect("Failed to create local backup dir");
        self.config.global.local_path = Some(path);
        self
    }

    /// Set LOCAL_PATH to an arbitrary path (not created)
    pub fn with_local_path(mut self, path: &Path) -> Self {
        self.config.global.local_path = Some(path.to_path_buf());
        self
    }

    pub fn with_mysql_password(mut self, password: &str) -> Self {
        self.config.mysql.password = Some(password.to_string());
        self
    }

    pub fn with_pg_password(mut self, password: &str) -> Self {
        self.config.postgres.password = Some(password.to_string());
        self
    }

    pub fn with_pg_user(mut self, user: &str) -> Self {
        self.config.postgres.user = user.to_string();
        self
    }

    /// Secret for the default `env:ENCRYPT_PASS` pass spec
    pub fn with_encrypt_pass(mut self, password: &str) -> Self {
        self.config.global.encrypt_pass = Some(password.to_string());
        self
    }

    pub fn with_pass_spec(mut self, spec: &str) -> Self {
        self.config.global.encrypt_pass_spec = spec.to_string();
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.config.global.command_timeout_seconds = Some(seconds);
        self
    }

    /// Fill every S3 setting from `settings`
    pub fn with_s3(mut self, settings: &S3Settings) -> Self {
        self.config.s3.region_name = Some(settings.region_name.clone());
        self.config.s3.storage_url = Some(settings.storage_url.clone());
        self.config.s3.access_key_id = Some(settings.access_key_id.clone());
        self.config.s3.secret_access_key = Some(settings.secret_access_key.clone());
        self.config.s3.bucket_name = Some(settings.bucket_name.clone());
        self.config.s3.path = Some(settings.path.clone());
        self
    }

    /// Path inside the builder's temp dir
    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Build the configuration, keeping the temp dir alive
    pub fn build(self) -> (Config, TempDir) {
        (self.config, self.temp_dir)
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(&self.config).expect("Failed to serialize config")
    }

    /// Write the configuration to `<temp>/db-backups.toml` and return its path
    pub fn persist(self) -> (Config, PathBuf, TempDir) {
        let path = self.temp_dir.path().join("db-backups.toml");
        fs::write(&path, self.to_toml()).expect("Failed to write config file");
        (self.config, path, self.temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
