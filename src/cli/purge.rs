//! `kpm purge`: remove every version of one package, or every package.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::CommandContext;
use super::common::{ConfirmArgs, require_confirmation};
use crate::core::KpmError;
use crate::package::PackageInfo;
use crate::package::validation::validate_package_name;
use crate::repository::local;

#[derive(Args, Debug, Clone)]
pub struct PurgeCommand {
    /// Only purge versions of this package
    pub name: Option<String>,

    #[command(flatten)]
    pub confirm: ConfirmArgs,
}

impl PurgeCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let targets = self.targets(ctx)?;
        if targets.is_empty() {
            eprintln!("{}", "Nothing to purge.".yellow());
            return Ok(());
        }

        let scope = self.name.as_deref().map_or_else(
            || "ALL installed packages".to_string(),
            |name| format!("every version of '{name}'"),
        );
        require_confirmation(
            &format!("Remove {scope} ({} package(s))?", targets.len()),
            self.confirm.confirm,
            "purge",
        )
        .await?;

        for info in &targets {
            local::remove_package(&ctx.home, info)?;
            println!("{} {}", "Removed".green(), info.full_name());
        }
        Ok(())
    }

    fn targets(&self, ctx: &CommandContext) -> Result<Vec<PackageInfo>> {
        let installed = local::list_packages(&ctx.home)?;
        let Some(name) = &self.name else {
            return Ok(installed);
        };

        validate_package_name(name).map_err(KpmError::from)?;
        let matching: Vec<PackageInfo> =
            installed.into_iter().filter(|info| &info.name == name).collect();
        if matching.is_empty() {
            return Err(KpmError::VersionNotFound {
                name: name.clone(),
            }
            .into());
        }
        Ok(matching)
    }
}
