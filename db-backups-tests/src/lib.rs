//! Test utilities for db-backups
//!
//! This crate provides shared test utilities, fake external tools,
//! and helper functions for testing the db-backups pipeline.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, MockExecutor, simulate_archiving};
//!
//! #[test]
//! fn my_test() {
//!     let (config, temp_dir) = ConfigBuilder::new()
//!         .with_pg_password("secret")
//!         .build();
//!     let executor = MockExecutor::new();
//!     simulate_archiving(&executor);
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use test_context::TestContext;

// Re-export types from the main crate for convenience
pub use db_backups::config::{Config, GlobalConfig, S3Settings};
pub use db_backups::errors::{BackupError, ErrorKind};
pub use db_backups::managers::Collaborators;

// Re-export mock implementations from the main crate
pub use db_backups::destinations::s3::mock::{MockObjectStorage, StorageCall};
pub use db_backups::destinations::ObjectStorage;
pub use db_backups::utils::executor::mock::{CommandCall, MockExecutor, MockResponse};
pub use db_backups::utils::executor::CommandExecutor;

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
