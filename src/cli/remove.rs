//! `kpm remove`: delete one installed package.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::CommandContext;
use super::common::{ConfirmArgs, PackageArgs, require_confirmation};
use crate::repository::local;

#[derive(Args, Debug, Clone)]
pub struct RemoveCommand {
    #[command(flatten)]
    pub package: PackageArgs,

    #[command(flatten)]
    pub confirm: ConfirmArgs,
}

impl RemoveCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let info = ctx.resolve_local(&self.package)?;
        require_confirmation(
            &format!("Remove package '{info}'?"),
            self.confirm.confirm,
            "remove",
        )
        .await?;

        local::remove_package(&ctx.home, &info)?;
        println!("{} {}", "Removed".green(), info.full_name().bold());
        Ok(())
    }
}
