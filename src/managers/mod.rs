pub mod backup;
pub mod logging;
pub mod restore;

use crate::config::Config;
use crate::destinations::ObjectStorage;
use crate::errors::Result;
use crate::utils::command::ProcessRunner;
use crate::utils::confirm::{AssumeNo, Confirmation};
use crate::utils::encryption::PassSpec;
use crate::utils::env_check::check_env_variables;
use crate::utils::executor::{CommandExecutor, RealExecutor};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// External collaborators of a run, swappable for tests
#[derive(Clone)]
pub struct Collaborators {
    pub executor: Arc<dyn CommandExecutor>,
    pub confirm: Arc<dyn Confirmation>,
    /// Replaces the real S3 client when set
    pub storage: Option<Arc<dyn ObjectStorage>>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            executor: Arc::new(RealExecutor::new()),
            confirm: Arc::new(AssumeNo),
            storage: None,
        }
    }
}

impl Collaborators {
    pub fn runner(&self, config: &Config) -> ProcessRunner {
        ProcessRunner::new(
            self.executor.clone(),
            config.global.command_timeout_seconds.map(Duration::from_secs),
        )
    }
}

/// Per-run working directory under the temp root: `{db}-{timestamp}-{pid}`.
///
/// Not created here; the first step that writes into it does.
pub fn work_dir_for(config: &Config, db_name: &str) -> PathBuf {
    let safe_name: String = db_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    config.tmp_root().join(format!(
        "{}-{}-{}",
        safe_name,
        Local::now().format("%Y%m%d%H%M%S"),
        std::process::id()
    ))
}

/// Remove a finished run's working directory; failure is only logged
pub fn remove_work_dir(work_dir: &Path) {
    match fs::remove_dir_all(work_dir) {
        Ok(()) => debug!("Removed working directory {}", work_dir.display()),
        Err(e) => warn!("Failed to cleanup working directory {}: {}", work_dir.display(), e),
    }
}

/// Pass spec for this run: the explicit one, else the configured default.
///
/// For `env:` specs the variable must already resolve, so a run never dumps a
/// database it cannot encrypt.
pub fn resolve_pass_spec(config: &Config, explicit: Option<&PassSpec>) -> Result<PassSpec> {
    let spec = match explicit {
        Some(spec) => spec.clone(),
        None => config.global.encrypt_pass_spec.parse::<PassSpec>()?,
    };

    if let PassSpec::Env(name) = &spec {
        check_env_variables(&[name.as_str()], config, true)?;
    }

    Ok(spec)
}
