//! Implementation of the `flotilla node` command.

use crate::commands::CommandContext;
use crate::ports::PeerDirectory;
use crate::stats::{collect_stats, human_bytes};

pub async fn run(ctx: CommandContext) -> anyhow::Result<()> {
    let peers = ctx.node.connected_peers().await?;

    if peers.is_empty() {
        println!("No peers connected.");
    } else {
        println!("{:<24} {:<8} {}", "PEER", "LOAD", "ADDRESS");
        let mut sorted: Vec<_> = peers.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        for (id, info) in sorted {
            println!(
                "{:<24} {:<8.2} {}",
                id,
                info.load,
                if info.public_address.is_empty() {
                    "-"
                } else {
                    &info.public_address
                }
            );
        }
    }

    let stats = collect_stats();
    println!();
    println!("This node ({}):", stats.hostname);
    println!(
        "  cpu     {:>5.1}% of {} cores",
        stats.cpu_usage, stats.cpu_count
    );
    println!(
        "  memory  {} / {} ({:.1}%)",
        human_bytes(stats.memory_used),
        human_bytes(stats.memory_total),
        stats.memory_percent
    );
    println!(
        "  disk    {} / {}",
        human_bytes(stats.disk_used),
        human_bytes(stats.disk_total)
    );
    println!("  uptime  {}", format_uptime(stats.uptime_secs));

    Ok(())
}

fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(59), "0m");
        assert_eq!(format_uptime(3_600), "1h 0m");
        assert_eq!(format_uptime(90_061), "1d 1h 1m");
    }
}
