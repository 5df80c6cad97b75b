//! Backup manager - orchestrates one backup run
//!
//! `destinations -> handler backup -> [encrypt] -> fan-out -> cleanup`

use super::{remove_work_dir, resolve_pass_spec, work_dir_for, Collaborators};
use crate::config::Config;
use crate::destinations::{self, DestinationKind, Dispatcher};
use crate::errors::Result;
use crate::handlers::{self, HandlerContext, HandlerKind};
use crate::utils::encryption::{EncryptionCodec, PassSpec};
use crate::utils::naming::file_name;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Span};

/// What to back up and where to send it
#[derive(Debug, Clone)]
pub struct BackupRequest {
    pub db_name: String,
    pub handler: HandlerKind,
    /// Required by container-mediated handlers
    pub container: Option<String>,
    pub destinations: Vec<DestinationKind>,
    /// Target directory for the FILE destination
    pub file: Option<PathBuf>,
    pub encrypt: bool,
    /// Overrides the configured pass spec
    pub pass_spec: Option<PassSpec>,
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
    pub artifact_name: String,
    pub encrypted: bool,
    /// One location per destination, in request order
    pub locations: Vec<String>,
}

pub struct BackupManager {
    config: Arc<Config>,
    collaborators: Collaborators,
}

impl BackupManager {
    pub fn new(config: Config) -> Self {
        Self::with_collaborators(config, Collaborators::default())
    }

    pub fn with_collaborators(config: Config, collaborators: Collaborators) -> Self {
        Self {
            config: Arc::new(config),
            collaborators,
        }
    }

    /// Run one backup.
    ///
    /// Destinations and the encryption secret are validated before the dump
    /// starts. The working directory is removed on success and kept on failure.
    pub fn run(&self, request: &BackupRequest) -> Result<BackupReport> {
        let span = info_span!("backup", db = %request.db_name, handler = %request.handler);
        let _enter = span.enter();
        let start_time = Instant::now();
        info!("[{}] BACKUP STARTING ...", request.db_name);

        let work_dir = work_dir_for(&self.config, &request.db_name);
        match self.execute(request, &work_dir, &span) {
            Ok(report) => {
                remove_work_dir(&work_dir);
                info!(
                    "[{}] BACKUP SUCCESS ({}s)",
                    request.db_name,
                    start_time.elapsed().as_secs()
                );
                Ok(report)
            }
            Err(e) => {
                error!("[{}] BACKUP FAILED: {}", request.db_name, e);
                if work_dir.exists() {
                    warn!("Intermediate files kept in {}", work_dir.display());
                }
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        request: &BackupRequest,
        work_dir: &Path,
        span: &Span,
    ) -> Result<BackupReport> {
        let config = &self.config;
        let destinations =
            destinations::resolve_all(&request.destinations, request.file.as_deref(), config)?;
        let pass_spec = if request.encrypt {
            Some(resolve_pass_spec(config, request.pass_spec.as_ref())?)
        } else {
            None
        };

        let runner = self.collaborators.runner(config);
        let ctx = HandlerContext {
            config: config.clone(),
            runner: runner.clone(),
            work_dir: work_dir.to_path_buf(),
            confirm: self.collaborators.confirm.clone(),
            span: span.clone(),
        };
        let handler = handlers::build(
            request.handler,
            &request.db_name,
            request.container.as_deref(),
            ctx,
        )?;

        let mut artifact = handler.backup()?;

        if let Some(spec) = pass_spec {
            let codec = EncryptionCodec::new(runner, config.clone(), spec, span.clone());
            artifact = codec.encrypt(&artifact)?;
        }

        let mut dispatcher = Dispatcher::new(span.clone());
        if let Some(storage) = &self.collaborators.storage {
            dispatcher = dispatcher.with_storage(storage.clone());
        }
        let locations = dispatcher.deliver(&artifact, &destinations)?;

        Ok(BackupReport {
            artifact_name: file_name(&artifact),
            encrypted: request.encrypt,
            locations,
        })
    }
}
