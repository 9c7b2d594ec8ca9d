//! Implementation of the `flotilla delete` command.

use colored::Colorize;

use crate::commands::{announcer_for, close_bus, confirm, CommandContext};
use crate::registry::deployer::Deployer;

/// Arguments for the delete command.
pub struct DeleteArgs {
    pub app: String,

    /// Skip the confirmation prompt
    pub force: bool,
}

pub async fn run(ctx: CommandContext, args: DeleteArgs) -> anyhow::Result<()> {
    let prompt = format!(
        "Delete '{}'? Its history stays in the log and a new deploy revives it.",
        args.app
    );
    if !confirm(&prompt, args.force)? {
        println!("Aborted.");
        return Ok(());
    }

    let bus = ctx.connect_bus().await;
    let deployer = Deployer::new(ctx.log.clone(), ctx.node.clone(), announcer_for(&bus));
    let result = deployer.delete(&args.app, args.force).await;
    close_bus(bus).await;
    result?;

    println!("{} '{}'", "Deleted".red().bold(), args.app);
    Ok(())
}
