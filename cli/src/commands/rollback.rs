//! Implementation of the `flotilla rollback` command.

use colored::Colorize;

use crate::commands::{announcer_for, close_bus, confirm, CommandContext};
use crate::registry::deployer::Deployer;
use crate::utils::short_cid;

/// Arguments for the rollback command.
pub struct RollbackArgs {
    pub app: String,

    /// Version tag to roll back to; the newest undeployed one when absent
    pub version: Option<String>,

    /// Domain override for the re-asserted version
    pub domain: Option<String>,

    /// Skip the confirmation prompt
    pub force: bool,
}

pub async fn run(ctx: CommandContext, args: RollbackArgs) -> anyhow::Result<()> {
    let prompt = match &args.version {
        Some(tag) => format!("Roll '{}' back to version {}?", args.app, tag),
        None => format!("Roll '{}' back to its previous version?", args.app),
    };
    if !confirm(&prompt, args.force)? {
        println!("Aborted.");
        return Ok(());
    }

    let bus = ctx.connect_bus().await;
    let deployer = Deployer::new(ctx.log.clone(), ctx.node.clone(), announcer_for(&bus));
    let outcome = deployer
        .rollback(&args.app, args.version.as_deref(), args.domain)
        .await;
    close_bus(bus).await;
    let outcome = outcome?;

    println!(
        "{} '{}' to version {} ({})",
        "Rolled back".cyan().bold(),
        outcome.app_name,
        outcome.version,
        short_cid(&outcome.cid)
    );
    Ok(())
}
