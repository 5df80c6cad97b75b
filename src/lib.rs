//! DB Backups Library
//!
//! Backup and restore orchestration for MySQL and PostgreSQL databases,
//! delivering compressed (optionally encrypted) dumps to local directories
//! and S3-compatible object storage.

pub mod config;
pub mod destinations;
pub mod errors;
pub mod handlers;
pub mod managers;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, load_or_default, Config};
pub use destinations::DestinationKind;
pub use errors::{BackupError, ErrorKind, Result};
pub use handlers::HandlerKind;
pub use managers::backup::{BackupManager, BackupReport, BackupRequest};
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig};
pub use managers::restore::{RestoreManager, RestoreRequest};
pub use managers::Collaborators;
