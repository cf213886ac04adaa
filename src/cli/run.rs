//! `kpm run`: render a package and its dependencies.
//!
//! Output goes to `<output-dir>/<output-name>/`; an existing directory there
//! is replaced after confirmation. Parameters from `--parameters-file`
//! override the package defaults key by key.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::CommandContext;
use super::common::{ConfirmArgs, PackageArgs, require_confirmation};
use crate::core::KpmError;
use crate::engine::run_package;
use crate::package::Parameters;
use crate::package::validation::validate_output_name;
use crate::package::yaml::yaml_to_mapping;

#[derive(Args, Debug, Clone)]
pub struct RunCommand {
    #[command(flatten)]
    pub package: PackageArgs,

    /// YAML mapping of parameter overrides
    #[arg(short = 'p', long = "parameters-file")]
    pub parameters_file: Option<PathBuf>,

    /// Directory to render into (default: current directory)
    #[arg(short = 'd', long = "output-dir")]
    pub output_dir: Option<PathBuf>,

    /// Name of the root output directory (default: <name>-<version>)
    #[arg(short = 'n', long = "output-name")]
    pub output_name: Option<String>,

    #[command(flatten)]
    pub confirm: ConfirmArgs,
}

impl RunCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let info = ctx.resolve_local(&self.package)?;
        let overrides = self.read_overrides(ctx)?;
        let output_root = self.output_dir.as_ref().map_or_else(|| ctx.cwd.clone(), |d| ctx.absolute(d));
        let output_name = self.output_name.clone().unwrap_or_else(|| info.full_name());
        validate_output_name(&output_name).map_err(KpmError::from)?;

        let target = output_root.join(&output_name);
        if target.exists() {
            require_confirmation(
                &format!("{} already exists and will be replaced. Continue?", target.display()),
                self.confirm.confirm,
                "run",
            )
            .await?;
        }

        let count = run_package(&ctx.home, &info, overrides, &output_root, &output_name)?;
        println!(
            "{} {count} package(s) from {} into {}",
            "Rendered".green(),
            info.full_name().bold(),
            target.display()
        );
        Ok(())
    }

    fn read_overrides(&self, ctx: &CommandContext) -> Result<Option<Parameters>> {
        let Some(file) = &self.parameters_file else {
            return Ok(None);
        };
        let path = ctx.absolute(file);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read parameters file {}", path.display()))?;
        let parameters = yaml_to_mapping(&text)
            .with_context(|| format!("Invalid parameters file {}", path.display()))?;
        Ok(Some(parameters))
    }
}
