//! Destinations and sources of backup artifacts
//!
//! A backup fans out to any number of destinations, one after another; the first
//! failure aborts the rest. A restore reads from exactly one source.

pub mod local;
pub mod s3;

pub use s3::{ObjectStorage, S3Storage};

use crate::config::{Config, S3Settings, LOCAL_VARIABLES, S3_VARIABLES};
use crate::errors::{BackupError, Result};
use crate::utils::env_check::check_env_variables;
use crate::utils::naming::{file_name, DATE_FORMAT};
use chrono::NaiveDate;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestinationKind {
    Local,
    File,
    S3,
}

impl DestinationKind {
    pub const ALL: [DestinationKind; 3] = [DestinationKind::S3, DestinationKind::Local, DestinationKind::File];

    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationKind::Local => "LOCAL",
            DestinationKind::File => "FILE",
            DestinationKind::S3 => "S3",
        }
    }

    pub fn required_variables(&self) -> &'static [&'static str] {
        match self {
            DestinationKind::Local => LOCAL_VARIABLES,
            DestinationKind::File => &[],
            DestinationKind::S3 => S3_VARIABLES,
        }
    }
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DestinationKind {
    type Err = BackupError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_uppercase();
        DestinationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| {
                BackupError::InvalidConfiguration(format!(
                    "Unknown destination '{}' (expected one of: S3, LOCAL, FILE)",
                    s
                ))
            })
    }
}

/// Parse a comma separated destination list, keeping first-seen order
pub fn parse_destination_list(value: &str) -> Result<Vec<DestinationKind>> {
    let mut kinds = Vec::new();
    for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let kind: DestinationKind = part.parse()?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }

    if kinds.is_empty() {
        return Err(BackupError::InvalidConfiguration(
            "at least one destination is required".to_string(),
        ));
    }
    Ok(kinds)
}

/// A destination/source with everything it needs already resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Configured `LOCAL_PATH` directory
    Local(PathBuf),
    /// Caller supplied path: a directory on backup, a file on restore
    File(PathBuf),
    S3(S3Settings),
}

impl Destination {
    pub fn kind(&self) -> DestinationKind {
        match self {
            Destination::Local(_) => DestinationKind::Local,
            Destination::File(_) => DestinationKind::File,
            Destination::S3(_) => DestinationKind::S3,
        }
    }

    /// Resolve one kind against the config and the caller's `--file` argument
    pub fn resolve(kind: DestinationKind, file: Option<&Path>, config: &Config) -> Result<Self> {
        match kind {
            DestinationKind::File => {
                let path = file.filter(|p| !p.as_os_str().is_empty()).ok_or_else(|| {
                    BackupError::InvalidConfiguration(
                        "Using destination 'FILE' requires a file argument".to_string(),
                    )
                })?;
                Ok(Destination::File(path.to_path_buf()))
            }
            DestinationKind::Local => Ok(Destination::Local(config.local_path()?)),
            DestinationKind::S3 => Ok(Destination::S3(config.s3_settings()?)),
        }
    }
}

/// Resolve every requested kind before any work starts.
///
/// The FILE argument is checked first, then missing variables of all kinds are
/// reported together.
pub fn resolve_all(
    kinds: &[DestinationKind],
    file: Option<&Path>,
    config: &Config,
) -> Result<Vec<Destination>> {
    if kinds.contains(&DestinationKind::File) {
        Destination::resolve(DestinationKind::File, file, config)?;
    }

    let required: Vec<&str> = kinds
        .iter()
        .flat_map(|kind| kind.required_variables().iter().copied())
        .collect();
    check_env_variables(&required, config, true)?;

    kinds
        .iter()
        .map(|kind| Destination::resolve(*kind, file, config))
        .collect()
}

/// Moves artifacts to destinations and fetches them back from sources
pub struct Dispatcher {
    storage: Option<Arc<dyn ObjectStorage>>,
    span: Span,
}

impl Dispatcher {
    pub fn new(span: Span) -> Self {
        Self {
            storage: None,
            span,
        }
    }

    /// Use `storage` for S3 instead of connecting a real client
    pub fn with_storage(mut self, storage: Arc<dyn ObjectStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    fn storage_for(&self, settings: &S3Settings) -> Result<Arc<dyn ObjectStorage>> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => Ok(Arc::new(S3Storage::connect(settings.clone())?)),
        }
    }

    /// Transfer `artifact` to each destination in order.
    ///
    /// Returns one location per destination. The first failure aborts the
    /// remaining transfers.
    pub fn deliver(&self, artifact: &Path, destinations: &[Destination]) -> Result<Vec<String>> {
        let _enter = self.span.enter();
        let mut delivered: Vec<&str> = Vec::with_capacity(destinations.len());
        let mut locations = Vec::with_capacity(destinations.len());

        for destination in destinations {
            match self.deliver_one(artifact, destination) {
                Ok(location) => {
                    info!("backup delivered to {}: {}", destination.kind(), location);
                    delivered.push(destination.kind().as_str());
                    locations.push(location);
                }
                Err(e) => {
                    if !delivered.is_empty() {
                        warn!(
                            "transfer to {} failed after successful transfer to: {}",
                            destination.kind(),
                            delivered.join(", ")
                        );
                    }
                    return Err(e);
                }
            }
        }

        Ok(locations)
    }

    fn deliver_one(&self, artifact: &Path, destination: &Destination) -> Result<String> {
        let label = destination.kind().as_str();
        match destination {
            Destination::Local(directory) | Destination::File(directory) => {
                local::copy_to_directory(artifact, directory, label)
                    .map(|path| path.display().to_string())
            }
            Destination::S3(settings) => {
                let key = s3::object_key(settings, &file_name(artifact));
                self.storage_for(settings)?.upload(artifact, &key)
            }
        }
    }

    /// Bring the backup for `date` from `source` into `work_dir`
    pub fn fetch(&self, source: &Destination, date: NaiveDate, work_dir: &Path) -> Result<PathBuf> {
        let _enter = self.span.enter();
        fs::create_dir_all(work_dir)
            .map_err(|e| BackupError::io(format!("Failed to create {}", work_dir.display()), e))?;
        let label = source.kind().as_str();

        let fetched = match source {
            Destination::File(path) => {
                if !path.is_file() {
                    return Err(BackupError::Restore(format!(
                        "Source file does not exist: {}",
                        path.display()
                    )));
                }
                local::copy_to_directory(path, work_dir, label)?
            }
            Destination::Local(directory) => {
                let found = local::find_backup_by_date(directory, date)?;
                debug!("Last backup found: {}", found.display());
                local::copy_to_directory(&found, work_dir, label)?
            }
            Destination::S3(settings) => {
                let prefix = s3::object_key(settings, &date.format(DATE_FORMAT).to_string());
                let storage = self.storage_for(settings)?;
                // Keys ending in `/` are folder markers, not backups
                let key = storage
                    .list(&prefix)?
                    .into_iter()
                    .filter(|key| !key.ends_with('/'))
                    .max()
                    .ok_or_else(|| {
                        BackupError::Restore(format!(
                            "No objects in S3 bucket for requested prefix {}",
                            prefix
                        ))
                    })?;
                let name = key.rsplit('/').next().unwrap_or(key.as_str()).to_string();
                storage.download(&key, &work_dir.join(name))?
            }
        };

        info!("backup fetched from {}: {}", label, fetched.display());
        Ok(fetched)
    }
}
