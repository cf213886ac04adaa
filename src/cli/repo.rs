//! `kpm repo`: remote repositories.
//!
//! ```bash
//! kpm repo list                       # configured repositories
//! kpm repo find hello                 # packages whose full name contains "hello"
//! kpm repo push acme/hello 0.0.1 --repo shared -y
//! kpm repo pull acme/hello            # highest version any repository has
//! ```

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use futures::future::try_join_all;

use super::CommandContext;
use super::common::{ConfirmArgs, PackageArgs, require_confirmation};
use crate::core::KpmError;
use crate::package::PackageInfo;
use crate::package::validation::compare_versions;
use crate::repository::{Repository, RepositoryCollection, local};

#[derive(Subcommand, Debug, Clone)]
pub enum RepoCommand {
    /// List configured repositories
    List,

    /// Search repositories for packages
    Find(FindArgs),

    /// Upload an installed package to a repository
    Push(PushArgs),

    /// Download a package into the local repository
    Pull(PullArgs),
}

/// `--repo <name>`
#[derive(Args, Debug, Clone, Default)]
pub struct RepoSelection {
    /// Only use this repository
    #[arg(long = "repo")]
    pub repo: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct FindArgs {
    /// Substring of the full package name
    pub term: Option<String>,

    #[command(flatten)]
    pub selection: RepoSelection,
}

#[derive(Args, Debug, Clone)]
pub struct PushArgs {
    /// Package name
    pub name: String,

    /// Package version
    pub version: String,

    #[command(flatten)]
    pub selection: RepoSelection,

    #[command(flatten)]
    pub confirm: ConfirmArgs,
}

#[derive(Args, Debug, Clone)]
pub struct PullArgs {
    #[command(flatten)]
    pub package: PackageArgs,

    #[command(flatten)]
    pub selection: RepoSelection,

    #[command(flatten)]
    pub confirm: ConfirmArgs,
}

impl RepoCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let repositories = ctx.repositories()?;
        if repositories.is_empty() {
            return Err(KpmError::ConfigError {
                message: "No repositories are configured".to_string(),
            }
            .into());
        }

        match self {
            Self::List => {
                for repository in repositories.iter() {
                    println!("{} ({})", repository.name().bold(), repository.repo_type());
                }
                Ok(())
            }
            Self::Find(args) => find(&repositories, args).await,
            Self::Push(args) => push(ctx, &repositories, args).await,
            Self::Pull(args) => pull(ctx, &repositories, args).await,
        }
    }
}

async fn find(repositories: &RepositoryCollection, args: FindArgs) -> Result<()> {
    let mut found = 0;
    for repository in repositories.select(args.selection.repo.as_deref())? {
        for info in repository.list_packages(args.term.as_deref()).await? {
            println!("{}\t{}", info.full_name(), repository.name().bright_black());
            found += 1;
        }
    }
    if found == 0 {
        eprintln!("{}", "No matching packages found.".yellow());
    }
    Ok(())
}

/// The repository to push to: `--repo`, or the only one configured.
fn push_target<'a>(
    repositories: &'a RepositoryCollection,
    selection: &RepoSelection,
) -> Result<&'a dyn Repository> {
    match (&selection.repo, repositories.len()) {
        (Some(name), _) => repositories.get(name),
        (None, 1) => repositories.select(None)?.pop().ok_or_else(|| {
            KpmError::ConfigError {
                message: "No repositories are configured".to_string(),
            }
            .into()
        }),
        (None, _) => Err(KpmError::ConfigError {
            message: "Several repositories are configured; choose one with --repo".to_string(),
        }
        .into()),
    }
}

async fn push(ctx: &CommandContext, repositories: &RepositoryCollection, args: PushArgs) -> Result<()> {
    let info = PackageInfo::new(&args.name, &args.version);
    info.validate().map_err(KpmError::from)?;
    local::load_installed(&ctx.home, &info)?;

    let target = push_target(repositories, &args.selection)?;
    require_confirmation(
        &format!("Push '{info}' to repository '{}'?", target.name()),
        args.confirm.confirm,
        "repo push",
    )
    .await?;

    target.push(&ctx.home, &info).await?;
    println!("{} {} to {}", "Pushed".green(), info.full_name().bold(), target.name());
    Ok(())
}

async fn pull(ctx: &CommandContext, repositories: &RepositoryCollection, args: PullArgs) -> Result<()> {
    let selected = repositories.select(args.selection.repo.as_deref())?;
    let name = &args.package.name;

    let version = match &args.package.version {
        Some(version) => version.clone(),
        None => {
            let per_repository = try_join_all(selected.iter().map(|r| r.versions(name))).await?;
            let mut versions: Vec<String> = per_repository.into_iter().flatten().collect();
            versions.sort_by(|a, b| compare_versions(a, b));
            versions.pop().ok_or_else(|| KpmError::Other {
                message: format!("No repository has a version of '{name}'"),
            })?
        }
    };
    let info = PackageInfo::new(name, version);
    info.validate().map_err(KpmError::from)?;

    if local::contains(&ctx.home, &info) {
        require_confirmation(
            &format!("'{info}' is already installed. Replace it?"),
            args.confirm.confirm,
            "repo pull",
        )
        .await?;
    }

    let from = match &args.selection.repo {
        Some(repo) => {
            repositories.get(repo)?.pull(&ctx.home, &info).await?;
            repo.clone()
        }
        None => repositories.pull_first(&ctx.home, &info).await?,
    };
    println!("{} {} from {}", "Pulled".green(), info.full_name().bold(), from);
    Ok(())
}
