//! `kpm inspect`: print a package's identity, default parameters and files.
//!
//! A package missing from the local repository is fetched from the
//! configured repositories into a temporary home, after confirmation, and
//! inspected there without being installed.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tempfile::TempDir;

use super::CommandContext;
use super::common::{ConfirmArgs, PackageArgs, require_confirmation};
use crate::core::KpmError;
use crate::package::{PackageInfo, PackageLayout};
use crate::repository::local;

#[derive(Args, Debug, Clone)]
pub struct InspectCommand {
    #[command(flatten)]
    pub package: PackageArgs,

    #[command(flatten)]
    pub confirm: ConfirmArgs,
}

impl InspectCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        match ctx.resolve_local(&self.package) {
            Ok(info) if local::contains(&ctx.home, &info) => {
                print_package(&local::load_installed(&ctx.home, &info)?)
            }
            Ok(_) | Err(_) if !ctx.config.repositories().is_empty() => self.inspect_remote(ctx).await,
            Ok(info) => Err(KpmError::PackageNotFound {
                name: info.name,
                version: info.version,
            }
            .into()),
            Err(e) => Err(e),
        }
    }

    async fn inspect_remote(&self, ctx: &CommandContext) -> Result<()> {
        let repositories = ctx.repositories()?;
        let version = match &self.package.version {
            Some(version) => version.clone(),
            None => repositories.versions(&self.package.name).await?.pop().ok_or_else(|| {
                KpmError::Other {
                    message: format!("No repository has a version of '{}'", self.package.name),
                }
            })?,
        };
        let info = PackageInfo::new(&self.package.name, version);
        info.validate().map_err(KpmError::from)?;

        require_confirmation(
            &format!("'{info}' is not installed. Fetch it from the configured repositories?"),
            self.confirm.confirm,
            "inspect",
        )
        .await?;

        let scratch = TempDir::new()?;
        let from = repositories.pull_first(scratch.path(), &info).await?;
        tracing::debug!("Fetched {info} from '{from}' for inspection");
        print_package(&local::load_installed(scratch.path(), &info)?)
    }
}

fn print_package(layout: &PackageLayout) -> Result<()> {
    println!("{} {}", "Name:".cyan().bold(), layout.info.name);
    println!("{} {}", "Version:".cyan().bold(), layout.info.version);
    println!();

    let parameters = layout.read_parameters()?;
    println!("{}", "Default parameters:".cyan().bold());
    if parameters.is_empty() {
        println!("  (none)");
    } else {
        let text = serde_yaml::to_string(&parameters)?;
        for line in text.lines() {
            println!("  {line}");
        }
    }

    for relative in layout.all_files() {
        let path = layout.dir.join(&relative);
        let content = std::fs::read_to_string(&path)?;
        println!();
        println!("{}", format!("--- {} ---", relative.display()).bright_black());
        print!("{content}");
        if !content.is_empty() && !content.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}
