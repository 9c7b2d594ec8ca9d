//! CLI command implementations

use std::io::{self, Write};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::bus::announce::Announcer;
use crate::errors::RegistryError;
use crate::ports::http::NodeApiClient;
use crate::ports::mqtt::{MqttAddress, MqttBroadcast};
use crate::ports::{Broadcast, Feed};
use crate::registry::log::EventLog;
use crate::storage::settings::Settings;

pub mod apps;
pub mod delete;
pub mod deploy;
pub mod listen;
pub mod node;
pub mod rollback;
pub mod start;
pub mod stop;
pub mod versions;

/// Everything a command needs to reach the mesh.
pub struct CommandContext {
    pub settings: Settings,
    pub node: Arc<NodeApiClient>,
    pub log: EventLog,
}

impl CommandContext {
    /// Wire the daemon client and the shared log up from settings.
    pub fn new(settings: Settings) -> Result<Self, RegistryError> {
        let node = Arc::new(NodeApiClient::new(
            &settings.node.api_url,
            settings.node.api_token.clone(),
        )?);
        let feed: Arc<dyn Feed> = node.clone();
        let log = EventLog::new(feed, settings.feed_name.clone());
        Ok(Self {
            settings,
            node,
            log,
        })
    }

    pub fn bus_address(&self) -> MqttAddress {
        MqttAddress {
            host: self.settings.bus.host.clone(),
            port: self.settings.bus.port,
            use_tls: self.settings.bus.tls,
            ca_cert_path: self.settings.bus.ca_cert_path.clone(),
        }
    }

    /// Open the bus for the duration of one command.
    ///
    /// `None` when no bus is configured or the broker is unreachable.
    /// Commands proceed either way; they just announce to no one.
    pub async fn connect_bus(&self) -> Option<Arc<MqttBroadcast>> {
        if self.settings.bus.host.is_empty() {
            debug!("Bus host not configured, proceeding without announcements");
            return None;
        }

        let client_id = format!("flotilla-{}", uuid::Uuid::new_v4());
        match MqttBroadcast::connect(&self.bus_address(), &client_id).await {
            Ok(transport) => Some(Arc::new(transport)),
            Err(e) => {
                warn!("Announcement bus unavailable: {}", e);
                None
            }
        }
    }
}

/// Announcer over an optionally connected bus.
pub fn announcer_for(bus: &Option<Arc<MqttBroadcast>>) -> Announcer {
    match bus {
        Some(transport) => Announcer::new(transport.clone()),
        None => Announcer::disabled(),
    }
}

/// Flush and drop the bus session, if one was opened.
pub async fn close_bus(bus: Option<Arc<MqttBroadcast>>) {
    if let Some(transport) = bus {
        if let Err(e) = transport.close().await {
            debug!("Bus close failed: {}", e);
        }
    }
}

/// Ask before a disruptive action. `force` skips the prompt.
pub fn confirm(prompt: &str, force: bool) -> Result<bool, RegistryError> {
    if force {
        return Ok(true);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
