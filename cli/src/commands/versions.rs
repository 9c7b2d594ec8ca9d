//! Implementation of the `flotilla versions` command.

use colored::Colorize;

use crate::commands::CommandContext;
use crate::errors::RegistryError;
use crate::registry::view::RegistryView;
use crate::utils::short_cid;

/// Arguments for the versions command.
pub struct VersionsArgs {
    pub app: String,
}

pub async fn run(ctx: CommandContext, args: VersionsArgs) -> anyhow::Result<()> {
    let view = RegistryView::new(ctx.log.clone());
    let versions = view.versions(&args.app).await?;

    if versions.is_empty() {
        return Err(RegistryError::NoVersionsFound(args.app).into());
    }

    println!("Versions of '{}', newest first:", args.app);
    println!(
        "  {:<14} {:<9} {:<9} {:<24} {}",
        "VERSION", "DEPLOYED", "STATUS", "RECORDED", "CID"
    );
    for entry in &versions {
        let deployed = if entry.record.deployed {
            format!("{:<9}", "yes").green().to_string()
        } else {
            format!("{:<9}", "-")
        };
        let rollback = if entry.record.is_rollback.unwrap_or(false) {
            " (rollback)".dimmed().to_string()
        } else {
            String::new()
        };
        println!(
            "  {:<14} {} {:<9} {:<24} {}{}",
            entry.record.version,
            deployed,
            entry.record.status,
            entry.record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            short_cid(&entry.record.cid),
            rollback,
        );
    }
    Ok(())
}
