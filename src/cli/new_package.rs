//! `kpm new-package`: write a sample package to get started with.
//!
//! The package name is qualified with a namespace derived from the login
//! name unless it already contains a `/`. Without `--output-dir` the package
//! is written to `./<name>` (the name's last segment).

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::CommandContext;
use super::common::{ConfirmArgs, require_confirmation};
use crate::constants::DEFAULT_NEW_PACKAGE_NAME;
use crate::package::sample::{login_namespace, qualified_name, write_sample_package};

#[derive(Args, Debug, Clone)]
pub struct NewPackageCommand {
    /// Name of the new package
    #[arg(default_value = DEFAULT_NEW_PACKAGE_NAME)]
    pub package_name: String,

    /// Directory to write the package to
    #[arg(short = 'd', long = "output-dir")]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub confirm: ConfirmArgs,
}

impl NewPackageCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let namespace = login_namespace();
        let name = qualified_name(&self.package_name, &namespace);
        let tail = name.rsplit('/').next().unwrap_or(&name).to_string();
        let target = ctx.absolute(&self.output_dir.unwrap_or_else(|| PathBuf::from(tail)));

        require_confirmation(
            &format!("Create package '{name}' in {}?", target.display()),
            self.confirm.confirm,
            "new-package",
        )
        .await?;

        let info = write_sample_package(&target, &name, &namespace)?;
        println!("{} {} in {}", "Created".green(), info.full_name().bold(), target.display());
        Ok(())
    }
}
