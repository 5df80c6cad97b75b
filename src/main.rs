use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use db_backups::config::{self, Config, ENCRYPT_VARIABLES};
use db_backups::destinations::parse_destination_list;
use db_backups::utils::confirm::{AssumeYes, Confirmation, TerminalConfirm};
use db_backups::utils::encryption::PassSpec;
use db_backups::utils::env_check::check_env_variables;
use db_backups::{
    init_console_logging, init_logging, BackupError, BackupManager, BackupRequest, Collaborators,
    DestinationKind, ErrorKind, HandlerKind, LogGuard, LoggingConfig, RestoreManager,
    RestoreRequest,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, warn};

const EXIT_USAGE: u8 = 1;
const EXIT_FAILURE: u8 = 2;

#[derive(Parser)]
#[command(name = "db-backups")]
#[command(about = "Backup and restore MySQL/PostgreSQL databases to local disk or S3", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file (values may also come from the environment)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Show debug output on the console
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable ANSI colors on the console
    #[arg(long, global = true)]
    no_colors: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump a database and deliver the archive to one or more destinations
    Backup {
        /// Database name
        db_name: String,

        /// Backup handler: MYSQL, PG or PG_CONTAINER
        #[arg(long = "from", value_name = "HANDLER")]
        handler: String,

        /// Docker container running the database (PG_CONTAINER)
        #[arg(short = 'c', long = "container")]
        container: Option<String>,

        /// Comma-separated destinations: LOCAL, FILE, S3
        #[arg(long = "to", value_name = "DESTINATIONS")]
        destinations: String,

        /// Target directory for the FILE destination
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Encrypt the archive before delivery
        #[arg(short, long)]
        encrypt: bool,

        /// Password source for encryption (env:NAME, file:PATH or fd:N)
        #[arg(long, value_name = "SPEC")]
        encrypt_pass: Option<String>,
    },

    /// Fetch a backup and replay it into a database
    Restore {
        /// Database name
        db_name: String,

        /// Where the backup lives: LOCAL, FILE or S3
        #[arg(long = "from", value_name = "SOURCE")]
        source: String,

        /// Restore handler: MYSQL, PG or PG_CONTAINER
        #[arg(long = "to", value_name = "HANDLER")]
        handler: String,

        /// Docker container running the database (PG_CONTAINER)
        #[arg(short = 'c', long = "container")]
        container: Option<String>,

        /// Backup file for the FILE source
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Day of the backup to restore (defaults to today)
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,

        /// Password source for decryption (env:NAME, file:PATH or fd:N)
        #[arg(long, value_name = "SPEC")]
        encrypt_pass: Option<String>,

        /// Answer yes to every confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Report missing variables for handlers and destinations
    CheckEnv {
        /// Groups to check (MYSQL, PG, PG_CONTAINER, LOCAL, S3, ENCRYPT); all when omitted
        groups: Vec<String>,
    },
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let colors = !cli.no_colors;

    let config = match config::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")
    {
        Ok(config) => config,
        Err(e) => {
            init_console_logging(cli.verbose, colors);
            error!("{:#}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let _log_guard: Option<LogGuard> =
        match init_logging(&LoggingConfig::from_config(&config, cli.verbose, colors)) {
            Ok(guard) => Some(guard),
            Err(e) => {
                init_console_logging(cli.verbose, colors);
                warn!("File logging disabled: {:#}", e);
                None
            }
        };

    match cli.command {
        Commands::Backup {
            db_name,
            handler,
            container,
            destinations,
            file,
            encrypt,
            encrypt_pass,
        } => {
            let request = match build_backup_request(
                db_name,
                &handler,
                container,
                &destinations,
                file,
                encrypt,
                encrypt_pass.as_deref(),
            ) {
                Ok(request) => request,
                Err(e) => return usage_error(e),
            };

            let manager = BackupManager::new(config);
            match manager.run(&request) {
                Ok(report) => {
                    for location in &report.locations {
                        println!("{}", location);
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => run_failure(&e),
            }
        }

        Commands::Restore {
            db_name,
            source,
            handler,
            container,
            file,
            date,
            encrypt_pass,
            yes,
        } => {
            let request = match build_restore_request(
                db_name,
                &source,
                &handler,
                container,
                file,
                date,
                encrypt_pass.as_deref(),
            ) {
                Ok(request) => request,
                Err(e) => return usage_error(e),
            };

            let confirm: Arc<dyn Confirmation> = if yes {
                Arc::new(AssumeYes)
            } else {
                Arc::new(TerminalConfirm)
            };
            let collaborators = Collaborators {
                confirm,
                ..Collaborators::default()
            };

            let manager = RestoreManager::with_collaborators(config, collaborators);
            match manager.run(&request) {
                Ok(restored) => {
                    println!("Restored {} into {}", restored, request.db_name);
                    ExitCode::SUCCESS
                }
                Err(e) => run_failure(&e),
            }
        }

        Commands::CheckEnv { groups } => match check_env(&config, &groups) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => usage_error(e),
        },
    }
}

fn build_backup_request(
    db_name: String,
    handler: &str,
    container: Option<String>,
    destinations: &str,
    file: Option<PathBuf>,
    encrypt: bool,
    encrypt_pass: Option<&str>,
) -> Result<BackupRequest> {
    Ok(BackupRequest {
        db_name,
        handler: handler.parse()?,
        container,
        destinations: parse_destination_list(destinations)?,
        file,
        encrypt,
        pass_spec: encrypt_pass.map(str::parse::<PassSpec>).transpose()?,
    })
}

fn build_restore_request(
    db_name: String,
    source: &str,
    handler: &str,
    container: Option<String>,
    file: Option<PathBuf>,
    date: Option<NaiveDate>,
    encrypt_pass: Option<&str>,
) -> Result<RestoreRequest> {
    Ok(RestoreRequest {
        db_name,
        handler: handler.parse()?,
        container,
        source: source.parse()?,
        file,
        date: date.unwrap_or_else(|| Local::now().date_naive()),
        pass_spec: encrypt_pass.map(str::parse::<PassSpec>).transpose()?,
    })
}

/// Print the missing variables of each requested group
fn check_env(config: &Config, groups: &[String]) -> Result<()> {
    let mut checks: Vec<(String, &'static [&'static str])> = Vec::new();

    if groups.is_empty() {
        for kind in HandlerKind::ALL {
            checks.push((kind.to_string(), kind.required_variables()));
        }
        for kind in DestinationKind::ALL {
            checks.push((kind.to_string(), kind.required_variables()));
        }
        checks.push(("ENCRYPT".to_string(), ENCRYPT_VARIABLES));
    } else {
        for group in groups {
            checks.push(resolve_group(group)?);
        }
    }

    for (name, variables) in checks {
        let missing = check_env_variables(variables, config, false)?;
        if missing.is_empty() {
            println!("{:<14} ok", name);
        } else {
            println!("{:<14} missing {}", name, missing.join(", "));
        }
    }

    Ok(())
}

fn resolve_group(group: &str) -> Result<(String, &'static [&'static str])> {
    if group.eq_ignore_ascii_case("ENCRYPT") {
        return Ok(("ENCRYPT".to_string(), ENCRYPT_VARIABLES));
    }
    if let Ok(kind) = group.parse::<HandlerKind>() {
        return Ok((kind.to_string(), kind.required_variables()));
    }
    let kind = group.parse::<DestinationKind>()?;
    Ok((kind.to_string(), kind.required_variables()))
}

fn usage_error(e: anyhow::Error) -> ExitCode {
    error!("{:#}", e);
    ExitCode::from(EXIT_USAGE)
}

/// The manager has already logged the failure
fn run_failure(e: &BackupError) -> ExitCode {
    match e.kind() {
        ErrorKind::Configuration => ExitCode::from(EXIT_USAGE),
        _ => ExitCode::from(EXIT_FAILURE),
    }
}
