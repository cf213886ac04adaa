//! `kpm pack`: import a package directory into the local repository.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::CommandContext;
use super::common::{ConfirmArgs, require_confirmation};
use crate::package::load_package;
use crate::repository::local;

#[derive(Args, Debug, Clone)]
pub struct PackCommand {
    /// Directory containing package.yaml
    pub package_directory: PathBuf,

    #[command(flatten)]
    pub confirm: ConfirmArgs,
}

impl PackCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let source = ctx.absolute(&self.package_directory);
        let layout = load_package(&source)?;

        if local::contains(&ctx.home, &layout.info) {
            require_confirmation(
                &format!("Package '{}' is already installed. Replace it?", layout.info),
                self.confirm.confirm,
                "pack",
            )
            .await?;
        }

        let info = local::install_package(&ctx.home, &source)?;
        println!("{} {}", "Packed".green(), info.full_name().bold());
        Ok(())
    }
}
