//! Test context and harness for pipeline testing
//!
//! Bundles a configuration, a recording executor with fake tools and an
//! in-memory object store, so a whole backup or restore runs without any
//! database, docker or network.

use crate::config_builder::ConfigBuilder;
use crate::fixtures::{sample_s3_settings, simulate_all_tools};
use anyhow::Result;
use db_backups::config::Config;
use db_backups::destinations::s3::mock::MockObjectStorage;
use db_backups::handlers::{self, DatabaseHandler, HandlerContext, HandlerKind};
use db_backups::managers::Collaborators;
use db_backups::utils::confirm::{AssumeNo, Confirmation};
use db_backups::utils::executor::mock::MockExecutor;
use db_backups::{BackupManager, RestoreManager};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Test context that manages test resources and provides common utilities
pub struct TestContext {
    /// Temporary directory for test files
    temp_dir: TempDir,
    /// The test configuration
    config: Config,
    /// Recording executor with every fake tool registered
    pub executor: MockExecutor,
    /// In-memory S3 bucket
    pub storage: MockObjectStorage,
    confirm: Arc<dyn Confirmation>,
}

impl TestContext {
    /// Context with LOCAL, S3 and both engines' credentials configured
    pub fn new() -> Self {
        Self::from_builder(ConfigBuilder::minimal().with_s3(&sample_s3_settings()))
    }

    /// Create a test context from a ConfigBuilder
    pub fn from_builder(builder: ConfigBuilder) -> Self {
        let (config, temp_dir) = builder.build();
        let executor = MockExecutor::new();
        simulate_all_tools(&executor);

        Self {
            temp_dir,
            config,
            executor,
            storage: MockObjectStorage::new(sample_s3_settings()),
            confirm: Arc::new(AssumeNo),
        }
    }

    /// Replace the executor (fake tools are registered on it)
    pub fn with_executor(mut self, executor: MockExecutor) -> Self {
        simulate_all_tools(&executor);
        self.executor = executor;
        self
    }

    pub fn with_storage(mut self, storage: MockObjectStorage) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_confirm(mut self, confirm: impl Confirmation + 'static) -> Self {
        self.confirm = Arc::new(confirm);
        self
    }

    /// Get the temporary directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// LOCAL destination directory
    pub fn local_dir(&self) -> PathBuf {
        self.config
            .global
            .local_path
            .clone()
            .expect("context has no LOCAL path")
    }

    /// Root under which per-run work dirs are created
    pub fn work_root(&self) -> PathBuf {
        self.config.global.tmp_dir.clone()
    }

    /// Work dirs left behind by runs
    pub fn leftover_work_dirs(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(self.work_root()) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            executor: Arc::new(self.executor.clone()),
            confirm: self.confirm.clone(),
            storage: Some(Arc::new(self.storage.clone())),
        }
    }

    pub fn backup_manager(&self) -> BackupManager {
        BackupManager::with_collaborators(self.config.clone(), self.collaborators())
    }

    pub fn restore_manager(&self) -> RestoreManager {
        RestoreManager::with_collaborators(self.config.clone(), self.collaborators())
    }

    /// Build a handler working in `<temp>/handler-work`
    pub fn handler(
        &self,
        kind: HandlerKind,
        db_name: &str,
        container: Option<&str>,
    ) -> db_backups::Result<Box<dyn DatabaseHandler>> {
        let collaborators = self.collaborators();
        let ctx = HandlerContext {
            config: Arc::new(self.config.clone()),
            runner: collaborators.runner(&self.config),
            work_dir: self.handler_work_dir(),
            confirm: collaborators.confirm,
            span: tracing::info_span!("handler-test", db = db_name),
        };
        handlers::build(kind, db_name, container, ctx)
    }

    pub fn handler_work_dir(&self) -> PathBuf {
        self.temp_dir.path().join("handler-work")
    }

    /// Create a subdirectory in the temp dir
    pub fn create_subdir(&self, name: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::create_dir_all(&path).expect("Failed to create subdirectory");
        path
    }

    /// Create a file in the temp dir
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Read a file from the temp directory
    pub fn read_file(&self, name: &str) -> Result<String> {
        let path = self.temp_dir.path().join(name);
        Ok(std::fs::read_to_string(path)?)
    }

    /// File names in a directory, sorted
    pub fn list_files(&self, dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Extension trait for assertion helpers
pub trait ResultAssertions<T> {
    /// Assert that the result is Ok and return the value
    fn assert_ok(self) -> T;

    /// Assert that the result is Ok with a custom message
    fn assert_ok_msg(self, msg: &str) -> T;

    /// Assert that the result is Err
    fn assert_err(self);

    /// Assert that the result is Err and the error message contains the given string
    fn assert_err_contains(self, needle: &str);
}

impl<T: std::fmt::Debug, E: std::fmt::Debug + std::fmt::Display> ResultAssertions<T>
    for std::result::Result<T, E>
{
    fn assert_ok(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    }

    fn assert_ok_msg(self, msg: &str) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("{}: {:?}", msg, e),
        }
    }

    fn assert_err(self) {
        if let Ok(v) = self {
            panic!("Expected Err, got Ok: {:?}", v);
        }
    }

    fn assert_err_contains(self, needle: &str) {
        match self {
            Ok(v) => panic!("Expected Err containing '{}', got Ok: {:?}", needle, v),
            Err(e) => {
                let err_msg = e.to_string();
                assert!(
                    err_msg.contains(needle),
                    "Error '{}' does not contain '{}'",
                    err_msg,
                    needle
                );
            }
        }
    }
}
