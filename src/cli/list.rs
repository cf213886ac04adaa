//! `kpm list`: installed packages, one full name per line.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::CommandContext;
use crate::repository::local;

#[derive(Args, Debug, Clone, Default)]
pub struct ListCommand {}

impl ListCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let names = local::list_all_full_names(&ctx.home)?;
        if names.is_empty() {
            eprintln!("{}", "No packages installed.".yellow());
            return Ok(());
        }
        for name in names {
            println!("{name}");
        }
        Ok(())
    }
}
