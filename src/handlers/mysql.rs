//! MySQL server reachable by host and port

use super::{double_quote, DatabaseHandler, HandlerContext, HandlerKind};
use crate::errors::Result;
use crate::utils::command::{quote, ShellCommand};
use crate::utils::naming::ArtifactPaths;
use chrono::Local;
use std::path::Path;
use tracing::debug;

pub const REQUIRED_VARIABLES: &[&str] = &["MYSQL_HOST", "MYSQL_PORT", "MYSQL_USER", "MYSQL_PASSWORD"];

/// Masks the password in `-p"..."`
const SECRET_PREFIX: &str = "-p";

pub struct MysqlHandler {
    db_name: String,
    ctx: HandlerContext,
    paths: ArtifactPaths,
}

impl MysqlHandler {
    pub fn new(db_name: &str, ctx: HandlerContext) -> Self {
        let paths = ArtifactPaths::new(&ctx.work_dir, db_name, "mysql", Local::now());
        Self {
            db_name: db_name.to_string(),
            ctx,
            paths,
        }
    }

    /// `-h HOST -P PORT -u USER -p"PASSWORD"`
    fn connection_args(&self) -> Result<String> {
        let config = &self.ctx.config;
        Ok(format!(
            "-h {} -P {} -u {} -p{}",
            quote(&config.require("MYSQL_HOST")?),
            quote(&config.require("MYSQL_PORT")?),
            quote(&config.require("MYSQL_USER")?),
            double_quote(&config.require("MYSQL_PASSWORD")?),
        ))
    }

    fn binary(&self, name: &str) -> Result<String> {
        let binary = self.ctx.config.require(name)?;
        self.ctx.runner.ensure_binary(&binary)?;
        Ok(binary)
    }
}

impl DatabaseHandler for MysqlHandler {
    fn service(&self) -> &'static str {
        "mysql"
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Mysql
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
        let dump = self.binary("MYSQL_DUMP")?;
        let command = ShellCommand::new(format!(
            "{} {} --result-file={} {}",
            dump,
            self.connection_args()?,
            quote(&self.paths.raw.display().to_string()),
            quote(&self.db_name),
        ))
        .with_secret_prefix(SECRET_PREFIX);

        self.ctx.runner.run(&command)
    }

    fn restore_raw(&self, raw: &Path) -> Result<String> {
        let client = self.binary("MYSQL_CLIENT")?;
        let connection = self.connection_args()?;

        debug!("ensuring database '{}' exists", self.db_name);
        let create = ShellCommand::new(format!(
            "{} {} -e {}",
            client,
            connection,
            quote(&format!(
                "CREATE DATABASE IF NOT EXISTS `{}`",
                self.db_name.replace('`', "``")
            )),
        ))
        .with_secret_prefix(SECRET_PREFIX);
        self.ctx.runner.run(&create)?;

        let replay = ShellCommand::new(format!(
            "{} {} {} < {}",
            client,
            connection,
            quote(&self.db_name),
            quote(&raw.display().to_string()),
        ))
        .with_secret_prefix(SECRET_PREFIX);

        self.ctx.runner.run(&replay)
    }
}
