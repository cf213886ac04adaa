//! `kpm unpack`: copy an installed package out of the local repository.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::CommandContext;
use super::common::{ConfirmArgs, PackageArgs, require_confirmation};
use crate::core::KpmError;
use crate::package::validation::validate_output_name;
use crate::repository::local;
use crate::utils::fs::{copy_dir, remove_dir_all};

#[derive(Args, Debug, Clone)]
pub struct UnpackCommand {
    #[command(flatten)]
    pub package: PackageArgs,

    /// Directory to export into (default: current directory)
    #[arg(short = 'd', long = "export-dir")]
    pub export_dir: Option<PathBuf>,

    /// Name of the exported directory (default: <name>-<version>)
    #[arg(short = 'n', long = "export-name")]
    pub export_name: Option<String>,

    #[command(flatten)]
    pub confirm: ConfirmArgs,
}

impl UnpackCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let info = ctx.resolve_local(&self.package)?;
        let source = local::package_dir(&ctx.home, &info);
        let export_dir = self.export_dir.map_or_else(|| ctx.cwd.clone(), |d| ctx.absolute(&d));
        let export_name = self.export_name.unwrap_or_else(|| info.full_name());
        validate_output_name(&export_name).map_err(KpmError::from)?;
        let target = export_dir.join(&export_name);

        if target.exists() {
            require_confirmation(
                &format!("{} already exists. Overwrite it?", target.display()),
                self.confirm.confirm,
                "unpack",
            )
            .await?;
            remove_dir_all(&target)?;
        }

        copy_dir(&source, &target)?;
        println!("{} {} to {}", "Unpacked".green(), info.full_name().bold(), target.display());
        Ok(())
    }
}
