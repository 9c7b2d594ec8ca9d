//! Implementation of the `flotilla apps` command.

use colored::{ColoredString, Colorize};
use wire_models::AppStatus;

use crate::commands::CommandContext;
use crate::registry::view::RegistryView;
use crate::utils::short_cid;

pub async fn run(ctx: CommandContext) -> anyhow::Result<()> {
    let view = RegistryView::new(ctx.log.clone());
    let states = view.active_states().await?;

    if states.is_empty() {
        println!("No applications deployed.");
        return Ok(());
    }

    println!(
        "{:<20} {:<14} {:<10} {:<14} {}",
        "APP", "VERSION", "STATUS", "CID", "DOMAIN"
    );
    for (name, entry) in &states {
        println!(
            "{:<20} {:<14} {} {:<14} {}",
            name,
            entry.record.version,
            status_cell(entry.record.status),
            short_cid(&entry.record.cid),
            entry.record.domain.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

// Pad before coloring: escape codes count toward format width
fn status_cell(status: AppStatus) -> ColoredString {
    let padded = format!("{:<10}", status.as_str());
    match status {
        AppStatus::Running => padded.green(),
        AppStatus::Stopped => padded.yellow(),
        AppStatus::Deleted => padded.red(),
        AppStatus::Unknown => padded.dimmed(),
    }
}
