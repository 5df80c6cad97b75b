use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub mysql: MysqlConfig,
    #[serde(default)]
    pub postgres: PostgresConfig,
    #[serde(default)]
    pub s3: S3Config,
}

/// Global configuration settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Directory used by the LOCAL destination/source
    #[serde(default)]
    pub local_path: Option<PathBuf>,

    /// Root for per-run working directories
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: PathBuf,

    /// Timeout for a single external command (unbounded when absent)
    #[serde(default)]
    pub command_timeout_seconds: Option<u64>,

    /// Secret used by the default `env:ENCRYPT_PASS` pass spec
    #[serde(default)]
    pub encrypt_pass: Option<String>,

    /// Where the cipher tool reads its password from
    #[serde(default = "default_encrypt_pass_spec")]
    pub encrypt_pass_spec: String,

    /// Logging configuration
    #[serde(default = "default_log_directory")]
    pub log_directory: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_max_files")]
    pub log_max_files: u32,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            local_path: None,
            tmp_dir: default_tmp_dir(),
            command_timeout_seconds: None,
            encrypt_pass: None,
            encrypt_pass_spec: default_encrypt_pass_spec(),
            log_directory: default_log_directory(),
            log_level: default_log_level(),
            log_max_files: default_log_max_files(),
        }
    }
}

/// Direct MySQL server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MysqlConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_mysql_port")]
    pub port: u16,
    #[serde(default = "default_mysql_user")]
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_mysqldump")]
    pub dump_binary: String,
    #[serde(default = "default_mysql_client")]
    pub client_binary: String,
}

impl Default for MysqlConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_mysql_port(),
            user: default_mysql_user(),
            password: None,
            dump_binary: default_mysqldump(),
            client_binary: default_mysql_client(),
        }
    }
}

/// PostgreSQL settings (direct server and container)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostgresConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_pg_port")]
    pub port: u16,
    #[serde(default = "default_pg_user")]
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_pg_dump")]
    pub dump_binary: String,
    #[serde(default = "default_psql")]
    pub psql_binary: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_pg_port(),
            user: default_pg_user(),
            password: None,
            dump_binary: default_pg_dump(),
            psql_binary: default_psql(),
        }
    }
}

/// S3-compatible object storage settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct S3Config {
    #[serde(default)]
    pub region_name: Option<String>,
    #[serde(default)]
    pub storage_url: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub bucket_name: Option<String>,
    /// Key prefix inside the bucket
    #[serde(default)]
    pub path: Option<String>,
}

/// Fully resolved S3 settings (all values present)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub region_name: String,
    pub storage_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    pub path: String,
}

// Default value functions

fn default_tmp_dir() -> PathBuf { std::env::temp_dir().join("db-backups") }
fn default_encrypt_pass_spec() -> String { "env:ENCRYPT_PASS".to_string() }
fn default_log_directory() -> PathBuf { PathBuf::from("~/logs") }
fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 20 }
fn default_host() -> String { "localhost".to_string() }
fn default_mysql_port() -> u16 { 3306 }
fn default_mysql_user() -> String { "root".to_string() }
fn default_mysqldump() -> String { "mysqldump".to_string() }
fn default_mysql_client() -> String { "mysql".to_string() }
fn default_pg_port() -> u16 { 5432 }
fn default_pg_user() -> String { "postgres".to_string() }
fn default_pg_dump() -> String { "pg_dump".to_string() }
fn default_psql() -> String { "psql".to_string() }
