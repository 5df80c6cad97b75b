//! Restore manager - orchestrates one restore run
//!
//! `source -> fetch into work dir -> [decrypt] -> handler restore -> cleanup`

use super::{remove_work_dir, resolve_pass_spec, work_dir_for, Collaborators};
use crate::config::Config;
use crate::destinations::{Destination, DestinationKind, Dispatcher};
use crate::errors::Result;
use crate::handlers::{self, HandlerContext, HandlerKind};
use crate::utils::encryption::{EncryptionCodec, PassSpec};
use crate::utils::naming::{file_name, is_encrypted};
use crate::utils::env_check::check_env_variables;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Span};

/// Which backup to restore and into what
#[derive(Debug, Clone)]
pub struct RestoreRequest {
    pub db_name: String,
    pub handler: HandlerKind,
    pub container: Option<String>,
    pub source: DestinationKind,
    /// Backup file for the FILE source
    pub file: Option<PathBuf>,
    /// Day of the backup for LOCAL and S3 lookups
    pub date: NaiveDate,
    /// Overrides the configured pass spec
    pub pass_spec: Option<PassSpec>,
}

pub struct RestoreManager {
    config: Arc<Config>,
    collaborators: Collaborators,
}

impl RestoreManager {
    pub fn new(config: Config) -> Self {
        Self::with_collaborators(config, Collaborators::default())
    }

    pub fn with_collaborators(config: Config, collaborators: Collaborators) -> Self {
        Self {
            config: Arc::new(config),
            collaborators,
        }
    }

    /// Run one restore and return the name of the artifact that was replayed.
    ///
    /// The working directory is removed on success and kept on failure.
    pub fn run(&self, request: &RestoreRequest) -> Result<String> {
        let span = info_span!("restore", db = %request.db_name, handler = %request.handler);
        let _enter = span.enter();
        let start_time = Instant::now();
        info!(
            "[{}] RESTORE STARTING (source {}) ...",
            request.db_name, request.source
        );

        let work_dir = work_dir_for(&self.config, &request.db_name);
        match self.execute(request, &work_dir, &span) {
            Ok(restored) => {
                remove_work_dir(&work_dir);
                info!(
                    "[{}] RESTORE SUCCESS ({}s)",
                    request.db_name,
                    start_time.elapsed().as_secs()
                );
                Ok(restored)
            }
            Err(e) => {
                error!("[{}] RESTORE FAILED: {}", request.db_name, e);
                if work_dir.exists() {
                    warn!("Intermediate files kept in {}", work_dir.display());
                }
                Err(e)
            }
        }
    }

    fn execute(&self, request: &RestoreRequest, work_dir: &Path, span: &Span) -> Result<String> {
        let config = &self.config;
        let source = Destination::resolve(request.source, request.file.as_deref(), config)?;

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
        check_env_variables(request.handler.required_variables(), config, true)?;

        let mut dispatcher = Dispatcher::new(span.clone());
        if let Some(storage) = &self.collaborators.storage {
            dispatcher = dispatcher.with_storage(storage.clone());
        }
        let mut artifact = dispatcher.fetch(&source, request.date, work_dir)?;

        if is_encrypted(&artifact) {
            let spec = resolve_pass_spec(config, request.pass_spec.as_ref())?;
            let codec = EncryptionCodec::new(runner, config.clone(), spec, span.clone());
            artifact = codec.decrypt(&artifact)?;
        }

        handler.restore(&artifact)?;

        Ok(file_name(&artifact))
    }
}
