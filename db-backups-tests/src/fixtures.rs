//! Test fixtures and fake external tools
//!
//! The `simulate_*` helpers register hooks on a [`MockExecutor`] so that the
//! commands the pipeline runs leave behind the files the real tools would.

use chrono::NaiveDate;
use db_backups::config::S3Settings;
use db_backups::utils::executor::mock::MockExecutor;
use std::fs;
use std::path::{Path, PathBuf};

/// Content written for every faked SQL dump
pub const SAMPLE_DUMP: &str = "CREATE TABLE orders (id integer);\n";

/// Settings for a fake S3-compatible endpoint
pub fn sample_s3_settings() -> S3Settings {
    S3Settings {
        region_name: "eu-west-1".to_string(),
        storage_url: "https://s3.example.test".to_string(),
        access_key_id: "AKIATEST".to_string(),
        secret_access_key: "test-secret-key".to_string(),
        bucket_name: "backups".to_string(),
        path: "nightly".to_string(),
    }
}

/// Path argument following `flag` in a command line, with shell quotes removed
pub fn arg_after(line: &str, flag: &str) -> PathBuf {
    let mut tokens = line.split_whitespace();
    while let Some(token) = tokens.next() {
        if token == flag {
            let value = tokens
                .next()
                .unwrap_or_else(|| panic!("no value after {} in {}", flag, line));
            return PathBuf::from(value.trim_matches(|c| c == '\'' || c == '"'));
        }
        if let Some(value) = token.strip_prefix(&format!("{}=", flag)) {
            return PathBuf::from(value.trim_matches(|c| c == '\'' || c == '"'));
        }
    }
    panic!("flag {} not found in {}", flag, line)
}

/// `pg_dump ... -f RAW` and `mysqldump --result-file=RAW` write a dump on the host.
/// Dumps run inside a container are left to [`simulate_docker_cp`].
pub fn simulate_dumps(executor: &MockExecutor) {
    executor.on_success("pg_dump", |line| {
        if !line.starts_with("docker ") {
            write_file(&arg_after(line, "-f"), SAMPLE_DUMP)
        }
    });
    executor.on_success("mysqldump", |line| {
        write_file(&arg_after(line, "--result-file"), SAMPLE_DUMP)
    });
}

/// `tar -czf` writes the archive; `tar -xzf A -C D` leaves `D/<stem>.sql`
pub fn simulate_archiving(executor: &MockExecutor) {
    executor.on_success("tar -czf", |line| {
        write_file(&arg_after(line, "-czf"), "fake archive")
    });
    executor.on_success("tar -xzf", |line| {
        let archive = arg_after(line, "-xzf");
        let dest = arg_after(line, "-C");
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = name.split(".backup").next().unwrap_or("restored").to_string();
        write_file(&dest.join(format!("{}.backup.sql", stem)), SAMPLE_DUMP);
    });
}

/// `openssl enc ... -in IN -out OUT` copies IN to OUT
pub fn simulate_openssl(executor: &MockExecutor) {
    executor.on_success("openssl enc", |line| {
        let input = arg_after(line, "-in");
        let output = arg_after(line, "-out");
        let contents = fs::read(&input).unwrap_or_else(|_| b"ciphertext".to_vec());
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&output, contents).unwrap();
    });
}

/// `docker cp CONTAINER:/tmp/NAME HOST` writes the dump on the host side
pub fn simulate_docker_cp(executor: &MockExecutor) {
    executor.on_success("docker cp", |line| {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if let [.., from, to] = tokens.as_slice() {
            if from.contains(':') && !to.contains(':') {
                write_file(Path::new(to.trim_matches('\'')), SAMPLE_DUMP);
            }
        }
    });
}

/// Every fake tool at once
pub fn simulate_all_tools(executor: &MockExecutor) {
    simulate_dumps(executor);
    simulate_archiving(executor);
    simulate_openssl(executor);
    simulate_docker_cp(executor);
}

/// Backup file name as the pipeline produces it
pub fn backup_name(date: NaiveDate, time: &str, db_name: &str, suffix: &str) -> String {
    format!("{}-{}.{}.backup{}", date.format("%Y-%m-%d"), time, db_name, suffix)
}

/// Create a backup file in `dir` and return its path
pub fn write_backup(dir: &Path, date: NaiveDate, time: &str, db_name: &str, suffix: &str) -> PathBuf {
    let path = dir.join(backup_name(date, time, db_name, suffix));
    write_file(&path, "archived dump");
    path
}

fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// Minimal config TOML: credentials only
pub fn minimal_config_toml() -> &'static str {
    r#"
[mysql]
password = "mysql-secret"

[postgres]
password = "pg-secret"
"#
}

/// Config TOML exercising every section
pub fn full_config_toml() -> &'static str {
    r#"
[global]
local_path = "/var/backups/db"
tmp_dir = "/var/tmp/db-backups"
command_timeout_seconds = 3600
encrypt_pass_spec = "file:/etc/db-backups/pass"
log_directory = "/var/log/db-backups"
log_level = "debug"
log_max_files = 10

[mysql]
host = "mysql.internal"
port = 3307
user = "backup"
password = "mysql-secret"

[postgres]
host = "pg.internal"
port = 5433
user = "backup"
password = "pg-secret"
dump_binary = "/usr/lib/postgresql/16/bin/pg_dump"

[s3]
region_name = "eu-west-1"
storage_url = "https://s3.example.test"
access_key_id = "AKIATEST"
secret_access_key = "test-secret-key"
bucket_name = "backups"
path = "/nightly/"
"#
}
