//! Implementation of the `flotilla stop` command.

use colored::Colorize;

use crate::commands::{announcer_for, close_bus, confirm, CommandContext};
use crate::registry::deployer::Deployer;

/// Arguments for the stop command.
pub struct StopArgs {
    pub app: String,

    /// Skip the confirmation prompt
    pub force: bool,
}

pub async fn run(ctx: CommandContext, args: StopArgs) -> anyhow::Result<()> {
    let prompt = format!("Stop '{}' across all nodes?", args.app);
    if !confirm(&prompt, args.force)? {
        println!("Aborted.");
        return Ok(());
    }

    let bus = ctx.connect_bus().await;
    let deployer = Deployer::new(ctx.log.clone(), ctx.node.clone(), announcer_for(&bus));
    let result = deployer.stop(&args.app, args.force).await;
    close_bus(bus).await;
    result?;

    println!("{} '{}'", "Stopped".yellow().bold(), args.app);
    Ok(())
}
