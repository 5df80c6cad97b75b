//! PostgreSQL running inside a docker container
//!
//! Commands run through `docker exec`; dumps move between the container's `/tmp`
//! and the host work dir with `docker cp`.

use super::{DatabaseHandler, HandlerContext, HandlerKind};
use crate::errors::{BackupError, Result};
use crate::utils::command::{quote, ShellCommand};
use crate::utils::naming::{file_name, ArtifactPaths};
use chrono::Local;
use std::path::Path;
use tracing::{info, warn};

pub const REQUIRED_VARIABLES: &[&str] = &["PG_USER"];

const CONTAINER_TMP: &str = "/tmp";

pub struct PgContainerHandler {
    db_name: String,
    container: String,
    ctx: HandlerContext,
    paths: ArtifactPaths,
}

impl PgContainerHandler {
    pub fn new(db_name: &str, container: &str, ctx: HandlerContext) -> Self {
        let paths = ArtifactPaths::new(&ctx.work_dir, db_name, "pg", Local::now());
        Self {
            db_name: db_name.to_string(),
            container: container.to_string(),
            ctx,
            paths,
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    fn user(&self) -> Result<String> {
        self.ctx.config.require("PG_USER")
    }

    /// `docker exec <container> sh -c '<inner>'`
    fn exec(&self, inner: &str) -> Result<String> {
        let command = ShellCommand::new(format!(
            "docker exec {} sh -c {}",
            quote(&self.container),
            quote(inner)
        ));
        self.ctx.runner.run(&command)
    }

    fn copy(&self, from: &str, to: &str) -> Result<String> {
        let command = ShellCommand::new(format!("docker cp {} {}", quote(from), quote(to)));
        self.ctx.runner.run(&command)
    }

    fn remove_in_container(&self, path: &str) {
        if let Err(e) = self.exec(&format!("rm -f {}", quote(path))) {
            warn!("Couldn't remove {} in container {}: {}", path, self.container, e);
        }
    }

    /// Whether `psql -lqt` lists the target database
    fn database_exists(&self, user: &str) -> Result<bool> {
        let listing = self.exec(&format!("psql -U {} -lqt", quote(user)))?;
        Ok(listing_contains(&listing, &self.db_name))
    }

    fn recreate_database(&self, user: &str) -> Result<()> {
        if self.database_exists(user)? {
            let prompt = format!(
                "Database '{}' already exists in container '{}'. Drop and recreate it?",
                self.db_name, self.container
            );
            if !self.ctx.confirm.confirm(&prompt) {
                return Err(BackupError::Restore(format!(
                    "database exists: {}",
                    self.db_name
                )));
            }
            info!("dropping database '{}' ...", self.db_name);
            self.exec(&format!(
                "dropdb -U {} {}",
                quote(user),
                quote(&self.db_name)
            ))?;
        }

        info!("creating database '{}' ...", self.db_name);
        self.exec(&format!(
            "createdb -U {} {}",
            quote(user),
            quote(&self.db_name)
        ))?;
        Ok(())
    }
}

/// Match `name` against the first column of `psql -lqt` output
fn listing_contains(listing: &str, name: &str) -> bool {
    listing
        .lines()
        .filter_map(|line| line.split('|').next())
        .any(|column| column.trim() == name)
}

impl DatabaseHandler for PgContainerHandler {
    fn service(&self) -> &'static str {
        "postgres-container"
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::PgContainer
    }

    fn db_name(&self) -> &str {
        &self.db_name
    }

    fn context(&self) -> &HandlerContext {
        &self.ctx
    }

    fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    fn dump(&self) -> Result<String> {
        self.ctx.runner.ensure_binary("docker")?;
        let user = self.user()?;
        let inner_path = format!("{}/{}", CONTAINER_TMP, file_name(&self.paths.raw));

        self.exec(&format!(
            "pg_dump -U {} -d {} -f {}",
            quote(&user),
            quote(&self.db_name),
            quote(&inner_path)
        ))?;

        let output = self.copy(
            &format!("{}:{}", self.container, inner_path),
            &self.paths.raw.display().to_string(),
        )?;
        self.remove_in_container(&inner_path);

        Ok(output)
    }

    fn restore_raw(&self, raw: &Path) -> Result<String> {
        self.ctx.runner.ensure_binary("docker")?;
        let user = self.user()?;
        let inner_path = format!("{}/{}", CONTAINER_TMP, file_name(raw));

        self.copy(
            &raw.display().to_string(),
            &format!("{}:{}", self.container, inner_path),
        )?;

        self.recreate_database(&user)?;

        let output = self.exec(&format!(
            "psql -U {} -d {} -v ON_ERROR_STOP=1 -q -f {}",
            quote(&user),
            quote(&self.db_name),
            quote(&inner_path)
        ))?;
        self.remove_in_container(&inner_path);

        Ok(output)
    }
}
