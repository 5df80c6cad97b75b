//! Filesystem destinations (LOCAL and FILE) and the date lookup used on restore

use crate::errors::{BackupError, Result};
use crate::utils::naming::{file_name, is_backup_for_date, DATE_FORMAT};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Copy `artifact` into `directory`, creating the directory when absent
pub fn copy_to_directory(artifact: &Path, directory: &Path, destination: &str) -> Result<PathBuf> {
    if directory.as_os_str().is_empty() {
        return Err(BackupError::transfer(
            destination,
            "destination path cannot be empty",
        ));
    }

    if directory.exists() && !directory.is_dir() {
        return Err(BackupError::transfer(
            destination,
            format!("Couldn't copy backup to non-dir path: '{}'", directory.display()),
        ));
    }

    if !directory.exists() {
        debug!("Destination directory does not exist: {}. Creating ...", directory.display());
        fs::create_dir_all(directory).map_err(|e| {
            BackupError::transfer_with(
                destination,
                format!("Couldn't create directory '{}'", directory.display()),
                e,
            )
        })?;
    }

    let target = directory.join(file_name(artifact));
    fs::copy(artifact, &target).map_err(|e| {
        BackupError::transfer_with(
            destination,
            format!(
                "Couldn't copy backup from {} to '{}'",
                artifact.display(),
                directory.display()
            ),
            e,
        )
    })?;

    if !target.is_file() {
        return Err(BackupError::transfer(
            destination,
            format!("Copied file not found: {}", target.display()),
        ));
    }

    Ok(target)
}

/// Latest backup in `directory` created on `date`.
///
/// Candidates start with the ISO date and end in `.tar.gz` or `.tar.gz.enc`; the
/// reverse-sorted first name wins, which is the latest timestamp of that day.
pub fn find_backup_by_date(directory: &Path, date: NaiveDate) -> Result<PathBuf> {
    debug!("Finding last backup file in provided dir: {}", directory.display());

    let entries = fs::read_dir(directory).map_err(|e| {
        BackupError::Restore(format!(
            "Couldn't read backup directory {}: {}",
            directory.display(),
            e
        ))
    })?;

    let latest = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| is_backup_for_date(name, date))
        .max();

    match latest {
        Some(name) => Ok(directory.join(name)),
        None => Err(BackupError::Restore(format!(
            "No backup files found for date {} in {}",
            date.format(DATE_FORMAT),
            directory.display()
        ))),
    }
}
