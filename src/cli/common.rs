//! Common utilities for CLI commands

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use strsim::levenshtein;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::{EnvOverrides, KpmConfig, kpm_home};
use crate::core::{ErrorContext, IntoAnyhowWithContext, KpmError};
use crate::package::PackageInfo;
use crate::repository::{RepositoryCollection, local};

/// Maximum edit distance, as a percentage of the name length, for suggestions.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Everything a command needs to know about its environment.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// KPM home directory
    pub home: PathBuf,
    /// Directory the command was started from
    pub cwd: PathBuf,
    /// Merged configuration
    pub config: KpmConfig,
}

impl CommandContext {
    /// Resolve the home directory and load the layered configuration.
    pub fn load(env: &EnvOverrides) -> Result<Self> {
        let home = kpm_home(env)?;
        let cwd = std::env::current_dir()?;
        let config = KpmConfig::load(&home, &cwd, env)?;
        Ok(Self {
            home,
            cwd,
            config,
        })
    }

    /// Repositories from the configuration, in configured order.
    pub fn repositories(&self) -> Result<RepositoryCollection> {
        RepositoryCollection::from_config(self.config.repositories())
    }

    /// Make a user-supplied path absolute against the working directory.
    pub fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() { path.to_path_buf() } else { self.cwd.join(path) }
    }

    /// Resolve `name [version]` against the local repository.
    ///
    /// When the name is unknown, similar installed names are suggested.
    pub fn resolve_local(&self, package: &PackageArgs) -> Result<PackageInfo> {
        local::resolve_version(&self.home, &package.name, package.version.as_deref())
            .map_err(|e| self.suggest_similar(e))
    }

    fn suggest_similar(&self, error: anyhow::Error) -> anyhow::Error {
        let Some(KpmError::VersionNotFound { name }) = error.downcast_ref::<KpmError>() else {
            return error;
        };
        let Ok(installed) = local::versions_by_name(&self.home) else {
            return error;
        };
        let installed: Vec<String> = installed.into_keys().collect();
        let similar = similar_names(name, &installed);
        if similar.is_empty() {
            return error;
        }

        let kpm_error = KpmError::VersionNotFound {
            name: name.clone(),
        };
        let context = ErrorContext::new(kpm_error.clone())
            .with_suggestion(format!("Did you mean {}?", similar.join(", ")));
        kpm_error.into_anyhow_with_context(context)
    }
}

/// `<name> [<version>]` positional arguments.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct PackageArgs {
    /// Package name, e.g. acme/hello
    pub name: String,

    /// Package version; defaults to the highest available
    pub version: Option<String>,
}

/// `-y/--confirm`
#[derive(Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfirmArgs {
    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long = "confirm")]
    pub confirm: bool,
}

/// Ask a yes/no question on stdin.
///
/// Returns `true` straight away when `assume_yes` is set, and `false` when
/// stdin is not a terminal.
pub async fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    if !io::stdin().is_terminal() {
        eprintln!("{} {prompt} (pass -y to confirm)", "Not confirmed:".yellow());
        return Ok(false);
    }

    print!("{} ", format!("{prompt} [y/N]:").green());
    io::stdout().flush()?;

    let mut reader = BufReader::new(tokio::io::stdin());
    let mut response = String::new();
    reader.read_line(&mut response).await?;
    let response = response.trim().to_lowercase();
    Ok(response == "y" || response == "yes")
}

/// Like [`confirm`], failing with [`KpmError::UserAbort`] on "no".
pub async fn require_confirmation(prompt: &str, assume_yes: bool, operation: &str) -> Result<()> {
    if confirm(prompt, assume_yes).await? {
        Ok(())
    } else {
        Err(KpmError::UserAbort {
            operation: operation.to_string(),
        }
        .into())
    }
}

/// Up to three entries of `available` close to `target`, closest first.
#[must_use]
pub fn similar_names(target: &str, available: &[String]) -> Vec<String> {
    let mut scored: Vec<_> =
        available.iter().map(|name| (name.clone(), levenshtein(target, name))).collect();
    scored.sort_by_key(|(_, distance)| *distance);

    scored
        .into_iter()
        .filter(|(_, distance)| *distance <= target.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
        .take(3)
        .map(|(name, _)| name)
        .collect()
}
