//! PostgreSQL server reachable by host and port

use super::{double_quote, DatabaseHandler, HandlerContext, HandlerKind};
use crate::errors::Result;
use crate::utils::command::{quote, ShellCommand};
use crate::utils::naming::ArtifactPaths;
use chrono::Local;
use std::path::Path;

pub const REQUIRED_VARIABLES: &[&str] = &["PG_HOST", "PG_PORT", "PG_USER", "PG_PASSWORD"];

const SECRET_PREFIX: &str = "PGPASSWORD=";

pub struct PostgresHandler {
    db_name: String,
    ctx: HandlerContext,
    paths: ArtifactPaths,
}

impl PostgresHandler {
    pub fn new(db_name: &str, ctx: HandlerContext) -> Self {
        let paths = ArtifactPaths::new(&ctx.work_dir, db_name, "pg", Local::now());
        Self {
            db_name: db_name.to_string(),
            ctx,
            paths,
        }
    }

    /// `PGPASSWORD="..." <binary> -h HOST -p PORT -U USER -d DB`
    fn command_prefix(&self, binary_variable: &str) -> Result<String> {
        let config = &self.ctx.config;
        let binary = config.require(binary_variable)?;
        self.ctx.runner.ensure_binary(&binary)?;

        Ok(format!(
            "{}{} {} -h {} -p {} -U {} -d {}",
            SECRET_PREFIX,
            double_quote(&config.require("PG_PASSWORD")?),
            binary,
            quote(&config.require("PG_HOST")?),
            quote(&config.require("PG_PORT")?),
            quote(&config.require("PG_USER")?),
            quote(&self.db_name),
        ))
    }
}

impl DatabaseHandler for PostgresHandler {
    fn service(&self) -> &'static str {
        "postgres"
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Pg
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
        let command = ShellCommand::new(format!(
            "{} -f {}",
            self.command_prefix("PG_DUMP")?,
            quote(&self.paths.raw.display().to_string()),
        ))
        .with_secret_prefix(SECRET_PREFIX);

        self.ctx.runner.run(&command)
    }

    fn restore_raw(&self, raw: &Path) -> Result<String> {
        let command = ShellCommand::new(format!(
            "{} -v ON_ERROR_STOP=1 -q -f {}",
            self.command_prefix("PG_PSQL")?,
            quote(&raw.display().to_string()),
        ))
        .with_secret_prefix(SECRET_PREFIX);

        self.ctx.runner.run(&command)
    }
}
