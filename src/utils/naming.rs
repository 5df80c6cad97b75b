//! Artifact file naming
//!
//! Compressed artifacts are named `<timestamp>.<db>.backup.tar.gz`, with `.enc`
//! appended once encrypted. Restore lookups by date depend on the leading
//! timestamp, so this layout must stay stable.

use chrono::{DateTime, Local, NaiveDate};
use std::path::{Path, PathBuf};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";
pub const ENCRYPTED_SUFFIX: &str = ".enc";
pub const RAW_SUFFIX: &str = ".sql";

/// Name of a backup file for `db_name` created at `now`.
///
/// Second granularity: two names generated within the same second for the
/// same database are identical.
pub fn backup_filename(db_name: &str, suffix: &str, now: DateTime<Local>) -> String {
    format!("{}.{}.backup{}", now.format(TIMESTAMP_FORMAT), db_name, suffix)
}

/// Working paths of one handler invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub raw: PathBuf,
    pub compressed: PathBuf,
}

impl ArtifactPaths {
    /// Both paths live in `work_dir` and share one timestamp
    pub fn new(work_dir: &Path, db_name: &str, engine_suffix: &str, now: DateTime<Local>) -> Self {
        let raw = work_dir.join(backup_filename(
            db_name,
            &format!(".{}{}", engine_suffix, RAW_SUFFIX),
            now,
        ));
        let compressed = work_dir.join(backup_filename(db_name, ARCHIVE_SUFFIX, now));
        Self { raw, compressed }
    }
}

/// Whether `file_name` is an (optionally encrypted) archive created on `date`
pub fn is_backup_for_date(file_name: &str, date: NaiveDate) -> bool {
    let prefix = date.format(DATE_FORMAT).to_string();
    file_name.starts_with(&prefix)
        && (file_name.ends_with(ARCHIVE_SUFFIX)
            || file_name.ends_with(&format!("{}{}", ARCHIVE_SUFFIX, ENCRYPTED_SUFFIX)))
}

pub fn is_encrypted(path: &Path) -> bool {
    path.to_string_lossy().ends_with(ENCRYPTED_SUFFIX)
}

pub fn is_archive(path: &Path) -> bool {
    path.to_string_lossy().ends_with(ARCHIVE_SUFFIX)
}

/// `backup.tar.gz` -> `backup.tar.gz.enc`
pub fn encrypted_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(ENCRYPTED_SUFFIX);
    PathBuf::from(name)
}

/// `backup.tar.gz.enc` -> `backup.tar.gz`; other paths are returned unchanged
pub fn decrypted_path(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    match text.strip_suffix(ENCRYPTED_SUFFIX) {
        Some(stripped) => PathBuf::from(stripped),
        None => path.to_path_buf(),
    }
}

/// Final path component as an owned string
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
