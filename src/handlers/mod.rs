//! Database handlers
//!
//! One handler per (engine, transport) pair. The lifecycle lives in the default
//! methods of [`DatabaseHandler`]; engines only supply the dump and replay steps.
//!
//! Backup: `preconditions -> dump -> guard raw -> tar -> guard archive -> remove raw`
//!
//! Restore: `preconditions -> [untar] -> replay -> remove extracted raw`
//!
//! Every guard is fatal. Intermediates are removed on the happy path only.

pub mod mysql;
pub mod pg_container;
pub mod postgres;

pub use mysql::MysqlHandler;
pub use pg_container::PgContainerHandler;
pub use postgres::PostgresHandler;

use crate::config::Config;
use crate::errors::{BackupError, Result};
use crate::utils::command::{quote, ProcessRunner, ShellCommand};
use crate::utils::confirm::Confirmation;
use crate::utils::env_check::check_env_variables;
use crate::utils::naming::{file_name, is_archive, ArtifactPaths, RAW_SUFFIX};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn, Span};

/// Subdirectory of the work dir that archives are unpacked into
pub const EXTRACT_DIR: &str = "extracted";

/// Closed set of supported (engine, transport) pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Mysql,
    Pg,
    PgContainer,
}

impl HandlerKind {
    pub const ALL: [HandlerKind; 3] = [HandlerKind::Mysql, HandlerKind::Pg, HandlerKind::PgContainer];

    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerKind::Mysql => "MYSQL",
            HandlerKind::Pg => "PG",
            HandlerKind::PgContainer => "PG_CONTAINER",
        }
    }

    pub fn requires_container(&self) -> bool {
        matches!(self, HandlerKind::PgContainer)
    }

    /// Variables that must resolve before this handler runs
    pub fn required_variables(&self) -> &'static [&'static str] {
        match self {
            HandlerKind::Mysql => mysql::REQUIRED_VARIABLES,
            HandlerKind::Pg => postgres::REQUIRED_VARIABLES,
            HandlerKind::PgContainer => pg_container::REQUIRED_VARIABLES,
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandlerKind {
    type Err = BackupError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_uppercase();
        HandlerKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| {
                BackupError::InvalidConfiguration(format!(
                    "Unknown handler '{}' (expected one of: MYSQL, PG, PG_CONTAINER)",
                    s
                ))
            })
    }
}

/// Collaborators shared by every handler of one run
#[derive(Clone)]
pub struct HandlerContext {
    pub config: Arc<Config>,
    pub runner: ProcessRunner,
    /// Per-run directory owned exclusively by this run
    pub work_dir: PathBuf,
    pub confirm: Arc<dyn Confirmation>,
    pub span: Span,
}

/// Build the handler for `kind`.
///
/// `container` is mandatory for container-mediated handlers; its absence is a
/// configuration error raised here, before anything runs.
pub fn build(
    kind: HandlerKind,
    db_name: &str,
    container: Option<&str>,
    ctx: HandlerContext,
) -> Result<Box<dyn DatabaseHandler>> {
    if db_name.trim().is_empty() {
        return Err(BackupError::InvalidConfiguration(
            "database name must not be empty".to_string(),
        ));
    }

    let handler: Box<dyn DatabaseHandler> = match kind {
        HandlerKind::Mysql => Box::new(MysqlHandler::new(db_name, ctx)),
        HandlerKind::Pg => Box::new(PostgresHandler::new(db_name, ctx)),
        HandlerKind::PgContainer => {
            let container = container.filter(|c| !c.trim().is_empty()).ok_or_else(|| {
                BackupError::InvalidConfiguration(format!(
                    "Using handler '{}' requires a docker container name",
                    kind
                ))
            })?;
            Box::new(PgContainerHandler::new(db_name, container, ctx))
        }
    };

    Ok(handler)
}

/// Backup/restore lifecycle of one database
pub trait DatabaseHandler {
    /// Display name for logs
    fn service(&self) -> &'static str;

    fn kind(&self) -> HandlerKind;

    fn db_name(&self) -> &str;

    fn context(&self) -> &HandlerContext;

    fn paths(&self) -> &ArtifactPaths;

    /// Write the uncompressed dump to `paths().raw`, returning the last output
    fn dump(&self) -> Result<String>;

    /// Replay an uncompressed dump into the engine
    fn restore_raw(&self, raw: &Path) -> Result<String>;

    fn check_preconditions(&self) -> Result<()> {
        check_env_variables(self.kind().required_variables(), &self.context().config, true)?;
        Ok(())
    }

    /// Produce the compressed artifact and return its path
    fn backup(&self) -> Result<PathBuf> {
        let ctx = self.context();
        let _enter = ctx.span.enter();
        let paths = self.paths();

        self.check_preconditions()?;
        fs::create_dir_all(&ctx.work_dir).map_err(|e| {
            BackupError::io(format!("Failed to create {}", ctx.work_dir.display()), e)
        })?;

        info!("[{}] dumping database '{}' ...", self.service(), self.db_name());
        let output = self.dump()?;
        ensure_artifact(&paths.raw, &output)?;

        let output = archive(&ctx.runner, &paths.raw, &paths.compressed)?;
        ensure_artifact(&paths.compressed, &output)?;

        remove_intermediate(&paths.raw);
        info!(
            "[{}] backup of '{}' ready: {}",
            self.service(),
            self.db_name(),
            paths.compressed.display()
        );

        Ok(paths.compressed.clone())
    }

    /// Replay `artifact` (archive or raw dump) into the engine
    fn restore(&self, artifact: &Path) -> Result<()> {
        let ctx = self.context();
        let _enter = ctx.span.enter();

        self.check_preconditions()?;
        if !artifact.is_file() {
            return Err(BackupError::Restore(format!(
                "backup does not exist: {}",
                artifact.display()
            )));
        }

        let (raw, extracted) = if is_archive(artifact) {
            let dest = ctx.work_dir.join(EXTRACT_DIR);
            (unarchive(&ctx.runner, artifact, &dest)?, true)
        } else {
            (artifact.to_path_buf(), false)
        };

        info!(
            "[{}] restoring database '{}' from {} ...",
            self.service(),
            self.db_name(),
            file_name(&raw)
        );
        self.restore_raw(&raw)?;

        if extracted {
            remove_intermediate(&raw);
        }
        info!("[{}] database '{}' restored", self.service(), self.db_name());

        Ok(())
    }
}

/// Fail with the last process output unless `path` is a non-empty file
pub fn ensure_artifact(path: &Path, last_output: &str) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        _ => Err(BackupError::ArtifactMissing {
            path: path.to_path_buf(),
            output: last_output.trim().to_string(),
        }),
    }
}

/// `tar -czf <compressed> -C <dir> <raw name>`
pub fn archive(runner: &ProcessRunner, raw: &Path, compressed: &Path) -> Result<String> {
    runner.ensure_binary("tar")?;

    let dir = raw.parent().unwrap_or_else(|| Path::new("."));
    let command = ShellCommand::new(format!(
        "tar -czf {} -C {} {}",
        quote(&compressed.display().to_string()),
        quote(&dir.display().to_string()),
        quote(&file_name(raw)),
    ));
    debug!("archiving {} ...", raw.display());
    runner.run(&command)
}

/// Unpack `archive` into `dest` and return the dump found inside
pub fn unarchive(runner: &ProcessRunner, archive: &Path, dest: &Path) -> Result<PathBuf> {
    runner.ensure_binary("tar")?;
    fs::create_dir_all(dest)
        .map_err(|e| BackupError::io(format!("Failed to create {}", dest.display()), e))?;

    let command = ShellCommand::new(format!(
        "tar -xzf {} -C {}",
        quote(&archive.display().to_string()),
        quote(&dest.display().to_string()),
    ));
    runner.run(&command)?;

    let mut members = Vec::new();
    collect_dumps(dest, &mut members)
        .map_err(|e| BackupError::io(format!("Failed to scan {}", dest.display()), e))?;
    members.sort();

    if members.len() > 1 {
        warn!(
            "Archive {} holds {} dump files, using the last one",
            file_name(archive),
            members.len()
        );
    }

    members.pop().ok_or_else(|| {
        BackupError::Restore(format!(
            "no {} file found in archive {}",
            RAW_SUFFIX,
            file_name(archive)
        ))
    })
}

fn collect_dumps(dir: &Path, found: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_dumps(&path, found)?;
        } else if path.to_string_lossy().ends_with(RAW_SUFFIX) {
            found.push(path);
        }
    }
    Ok(())
}

/// Remove a file that is no longer needed; failure is only logged
pub fn remove_intermediate(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) => warn!("Couldn't remove {}: {}", path.display(), e),
    }
}

/// `"value"` for `sh -c`, escaping what double quotes still expand
pub(crate) fn double_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
