//! Command-line interface for KPM.
//!
//! Each command lives in its own module with a clap `Args` struct and an
//! async `execute` method taking the shared [`CommandContext`].
//!
//! # Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `list` (`ls`) | List packages in the local repository |
//! | `new-package` (`new`) | Write a sample package to a directory |
//! | `pack` | Import a package directory into the local repository |
//! | `unpack` | Export an installed package to a directory |
//! | `inspect` | Print a package's identity, parameters and files |
//! | `run` | Render a package and its dependencies |
//! | `remove` (`rm`) | Delete one installed package |
//! | `purge` | Delete every version of a package, or everything |
//! | `repo` | List, search, push to and pull from remote repositories |
//!
//! # Example
//!
//! ```bash
//! kpm new-package acme/hello -d "$PWD/hello" -y
//! kpm pack ./hello -y
//! kpm run acme/hello -p overrides.yaml -d ./out -y
//! ```
//!
//! Commands that replace or delete data ask for confirmation first. When
//! stdin is not a terminal the answer is "no" unless `-y/--confirm` is given.

pub mod common;
mod inspect;
mod list;
mod new_package;
mod pack;
mod purge;
mod remove;
mod repo;
mod run;
mod unpack;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub use common::CommandContext;

use crate::config::{EnvOverrides, LogLevel};

/// Runtime settings derived from the global flags.
///
/// Kept separate from [`Cli`] so tests can drive commands without parsing
/// arguments.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Level forced by `--verbose` or `--quiet`, winning over configuration
    pub log_level: Option<LogLevel>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    /// The level to log at, given the configured one.
    #[must_use]
    pub fn effective_level(&self, configured: LogLevel) -> LogLevel {
        self.log_level.unwrap_or(configured)
    }
}

#[derive(Parser)]
#[command(
    name = "kpm",
    about = "KPM - render versioned template packages",
    version,
    long_about = "KPM manages a local repository of template packages and renders them, \
                  together with their dependencies, into a directory of generated files."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log debugging details
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Log nothing; errors are still printed
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List packages in the local repository
    #[command(visible_alias = "ls")]
    List(list::ListCommand),

    /// Create a sample package
    #[command(name = "new-package", visible_alias = "new")]
    NewPackage(new_package::NewPackageCommand),

    /// Import a package directory into the local repository
    Pack(pack::PackCommand),

    /// Export an installed package to a directory
    Unpack(unpack::UnpackCommand),

    /// Show a package's identity, default parameters and files
    Inspect(inspect::InspectCommand),

    /// Render a package and its dependencies
    Run(run::RunCommand),

    /// Remove an installed package
    #[command(visible_alias = "rm")]
    Remove(remove::RemoveCommand),

    /// Remove every version of a package, or every package
    Purge(purge::PurgeCommand),

    /// Work with remote repositories
    #[command(subcommand)]
    Repo(repo::RepoCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some(LogLevel::Verbose)
        } else if self.quiet {
            Some(LogLevel::None)
        } else {
            None
        };
        CliConfig {
            log_level,
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        let ctx = CommandContext::load(&EnvOverrides::from_env())?;
        let level = config.effective_level(ctx.config.log_level());
        init_logging(level);
        tracing::debug!("KPM home is {}", ctx.home.display());

        match self.command {
            Commands::List(cmd) => cmd.execute(&ctx).await,
            Commands::NewPackage(cmd) => cmd.execute(&ctx).await,
            Commands::Pack(cmd) => cmd.execute(&ctx).await,
            Commands::Unpack(cmd) => cmd.execute(&ctx).await,
            Commands::Inspect(cmd) => cmd.execute(&ctx).await,
            Commands::Run(cmd) => cmd.execute(&ctx).await,
            Commands::Remove(cmd) => cmd.execute(&ctx).await,
            Commands::Purge(cmd) => cmd.execute(&ctx).await,
            Commands::Repo(cmd) => cmd.execute(&ctx).await,
        }
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `level` when set.
///
/// At [`LogLevel::Debug`] a panic hook also logs where the panic happened.
pub fn init_logging(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
        .try_init();

    if level == LogLevel::Debug {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map_or_else(|| "unknown location".to_string(), ToString::to_string);
            tracing::error!("panic at {location}: {info}");
            previous(info);
        }));
    }
}
