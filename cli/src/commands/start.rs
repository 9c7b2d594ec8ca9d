//! Implementation of the `flotilla start` command.

use colored::Colorize;

use crate::commands::{announcer_for, close_bus, CommandContext};
use crate::registry::deployer::Deployer;
use crate::utils::short_cid;

/// Arguments for the start command.
pub struct StartArgs {
    pub app: String,

    /// Version tag to start
    pub version: String,
}

pub async fn run(ctx: CommandContext, args: StartArgs) -> anyhow::Result<()> {
    let bus = ctx.connect_bus().await;
    let deployer = Deployer::new(ctx.log.clone(), ctx.node.clone(), announcer_for(&bus));
    let outcome = deployer.start(&args.app, &args.version).await;
    close_bus(bus).await;
    let outcome = outcome?;

    println!(
        "{} '{}' at version {} ({})",
        "Started".green().bold(),
        outcome.app_name,
        outcome.version,
        short_cid(&outcome.cid)
    );
    Ok(())
}
