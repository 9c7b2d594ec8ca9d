//! Implementation of the `flotilla listen` command.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::bus::listener::{self, IndexTracker};
use crate::commands::CommandContext;
use crate::ports::mqtt::MqttBroadcast;
use crate::utils::version_info;

pub async fn run(ctx: CommandContext) -> anyhow::Result<()> {
    let version = version_info();
    info!(
        "flotilla {} ({}) entering listen mode",
        version.version, version.git_hash
    );

    let client_id = format!("flotilla-listen-{}", uuid::Uuid::new_v4());
    let transport = MqttBroadcast::connect(&ctx.bus_address(), &client_id)
        .await
        .context("cannot reach the announcement bus; set bus.host in settings.json")?;

    let tracker = Arc::new(IndexTracker::new(ctx.log.clone()));
    let seeded = tracker.seed().await.context("cannot seed state from the feed")?;
    info!("Seeded state for {} app(s) from the feed", seeded);

    listener::run(
        Arc::new(transport),
        tracker,
        Box::pin(await_shutdown_signal()),
    )
    .await?;
    Ok(())
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).unwrap();
        let mut sigint = signal(SignalKind::interrupt()).unwrap();

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        info!("Ctrl+C received, shutting down...");
    }
}
