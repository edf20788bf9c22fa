//! Revolt CLI Tool
//!
//! Command-line interface for rendering and applying schema refactorings.
//! `plan` and `check` work offline; the other commands connect to the database.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use revolt::dialect::DialectKind;
use revolt::migration::Migrator;
use revolt::{DatabaseConfig, MayPostgresExecutor};
use revolt_cli::{commands, Changelog};
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "revolt")]
#[command(about = "Declarative schema refactorings and versioned migrations")]
#[command(version)]
struct Cli {
    /// Database connection URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// SQL dialect (postgres, mysql, sqlite); inferred from the URL when omitted
    #[arg(long, global = true)]
    dialect: Option<String>,

    /// Changelog file (.toml or .json)
    #[arg(long, global = true)]
    changelog: Option<PathBuf>,

    /// Configuration file
    #[arg(long, global = true, default_value = revolt::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Apply nothing when any pending refactoring is invalid
    #[arg(long, global = true)]
    strict: bool,

    /// Seconds to wait for the migration lock
    #[arg(long, global = true)]
    lock_timeout: Option<u64>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show applied and pending refactorings
    Status,

    /// Apply pending refactorings
    Up {
        /// Number of refactorings to apply (default: all pending)
        #[arg(long)]
        steps: Option<usize>,

        /// Show the SQL that would run without running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Revert applied refactorings
    Down {
        /// Number of refactorings to revert
        #[arg(long, default_value = "1")]
        steps: usize,

        /// Show the SQL that would run without running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Render the SQL of the changelog without a database
    Plan {
        /// Render only the refactorings after this version
        #[arg(long, default_value = "0")]
        from_version: usize,
    },

    /// Validate the whole changelog without a database
    Check,

    /// Check the stored checksum against the changelog
    Validate,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = dotenv::dotenv() {
        log::debug!("No .env file loaded: {e}");
    }

    let quiet = cli.quiet;
    match run(cli) {
        Ok(()) => {
            if !quiet {
                println!("{}", "✅ Success".green());
            }
        }
        Err(e) => {
            eprintln!("{} {e:#}", "❌ Error:".red().bold());
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = DatabaseConfig::load_from(&cli.config).context("failed to load configuration")?;

    if let Some(url) = cli
        .database_url
        .or_else(|| std::env::var("REVOLT_DATABASE_URL").ok())
        .or_else(|| std::env::var("DATABASE_URL").ok())
    {
        config.url = url;
    }
    if let Some(dialect) = cli.dialect {
        config.dialect = Some(dialect);
    }
    if let Some(changelog) = cli.changelog {
        config.changelog = changelog;
    }
    if let Some(seconds) = cli.lock_timeout {
        config.lock_timeout_seconds = seconds;
    }
    config.strict |= cli.strict;

    let kind = config.dialect_kind()?;
    let changelog = Changelog::load(&config.changelog)?;
    log::debug!(
        "{} refactoring(s) declared in {}",
        changelog.len(),
        config.changelog.display()
    );

    let migrator = Migrator::new(kind.dialect(), changelog.refactorings)
        .with_lock_timeout(config.lock_timeout())
        .with_strict_planning(config.strict);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Plan { from_version } => commands::plan(&migrator, from_version, &mut out),
        Commands::Check => commands::check(&migrator, &mut out),
        Commands::Status => commands::status(&migrator, &connect(kind, &config.url)?, &mut out),
        Commands::Up { steps, dry_run } => {
            commands::up(&migrator, &connect(kind, &config.url)?, steps, dry_run, &mut out)
        }
        Commands::Down { steps, dry_run } => {
            commands::down(&migrator, &connect(kind, &config.url)?, steps, dry_run, &mut out)
        }
        Commands::Validate => commands::validate(&migrator, &connect(kind, &config.url)?, &mut out),
    }
}

fn connect(kind: DialectKind, url: &str) -> Result<MayPostgresExecutor> {
    if kind != DialectKind::Postgres {
        bail!("live execution is only available for PostgreSQL; use `revolt plan` to render {kind} SQL");
    }
    MayPostgresExecutor::connect(url).context("failed to connect to the database")
}
