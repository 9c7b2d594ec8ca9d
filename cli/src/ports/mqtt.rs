//! MQTT adapter for the announcement bus

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::RegistryError;
use crate::ports::Broadcast;

/// All flotilla traffic lives under one namespace so a shared broker can
/// host other tenants.
const TOPIC_NAMESPACE: &str = "flotilla";

const RECONNECT_DELAY: Duration = Duration::from_secs(3);

fn wire_topic(topic: &str) -> String {
    format!("{}/{}", TOPIC_NAMESPACE, topic)
}

/// MQTT broker address
#[derive(Debug, Clone)]
pub struct MqttAddress {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
    /// Optional path to a PEM-encoded CA certificate for broker verification.
    /// When `None` and `use_tls` is `true`, the system certificate store is used.
    pub ca_cert_path: Option<String>,
}

impl Default for MqttAddress {
    fn default() -> Self {
        Self {
            host: "".to_string(),
            port: 8883,
            use_tls: true,
            ca_cert_path: None,
        }
    }
}

/// Broadcast transport over an MQTT session.
///
/// Publishes are QoS 0: messages reach whoever is connected right now
/// and nobody else. A background task pumps the event loop and routes
/// incoming messages to subscribers.
pub struct MqttBroadcast {
    client: AsyncClient,
    routes: Arc<Mutex<HashMap<String, mpsc::Sender<Vec<u8>>>>>,
    closing: Arc<AtomicBool>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl MqttBroadcast {
    /// Open a session against the broker.
    pub async fn connect(address: &MqttAddress, client_id: &str) -> Result<Self, RegistryError> {
        if address.host.is_empty() {
            return Err(RegistryError::BusError(
                "Bus host is not configured".to_string(),
            ));
        }

        let mut options = MqttOptions::new(client_id, &address.host, address.port);
        options.set_keep_alive(Duration::from_secs(30));

        if address.use_tls {
            use rumqttc::{TlsConfiguration, Transport};
            use rustls::ClientConfig;

            let mut root_cert_store = rustls::RootCertStore::empty();

            if let Some(ref ca_path) = address.ca_cert_path {
                let ca_pem = std::fs::read(ca_path).map_err(|e| {
                    RegistryError::BusError(format!("Failed to read CA cert {ca_path}: {e}"))
                })?;
                let mut cursor = std::io::Cursor::new(ca_pem);
                for cert in rustls_pemfile::certs(&mut cursor).flatten() {
                    let _ = root_cert_store.add(cert);
                }
            } else {
                for cert in rustls_native_certs::load_native_certs().unwrap_or_default() {
                    let _ = root_cert_store.add(cert);
                }
            }

            let client_config = ClientConfig::builder()
                .with_root_certificates(root_cert_store)
                .with_no_client_auth();

            options.set_transport(Transport::tls_with_config(TlsConfiguration::Rustls(
                Arc::new(client_config),
            )));
        }

        let (client, eventloop) = AsyncClient::new(options, 16);
        let routes: Arc<Mutex<HashMap<String, mpsc::Sender<Vec<u8>>>>> = Arc::default();
        let closing = Arc::new(AtomicBool::new(false));
        let pump = tokio::spawn(pump_events(eventloop, routes.clone(), closing.clone()));

        Ok(Self {
            client,
            routes,
            closing,
            pump: Mutex::new(Some(pump)),
        })
    }
}

#[async_trait]
impl Broadcast for MqttBroadcast {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), RegistryError> {
        self.client
            .publish(wire_topic(topic), QoS::AtMostOnce, false, payload.to_vec())
            .await
            .map_err(|e| RegistryError::PublishFailed(e.to_string()))
    }

    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<Vec<u8>>, RegistryError> {
        let wire = wire_topic(topic);
        let (tx, rx) = mpsc::channel(64);
        self.routes.lock().await.insert(wire.clone(), tx);
        self.client
            .subscribe(&wire, QoS::AtMostOnce)
            .await
            .map_err(|e| RegistryError::BusError(e.to_string()))?;
        info!("Subscribed to: {}", wire);
        Ok(rx)
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), RegistryError> {
        let wire = wire_topic(topic);
        self.routes.lock().await.remove(&wire);
        self.client
            .unsubscribe(&wire)
            .await
            .map_err(|e| RegistryError::BusError(e.to_string()))
    }

    async fn close(&self) -> Result<(), RegistryError> {
        self.closing.store(true, Ordering::Relaxed);

        // The disconnect request sits behind any queued publishes, so
        // pending announcements flush before the session drops
        if let Err(e) = self.client.disconnect().await {
            debug!("Bus disconnect after session loss: {}", e);
        }

        if let Some(handle) = self.pump.lock().await.take() {
            if tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .is_err()
            {
                warn!("Bus event pump did not stop in time");
            }
        }
        Ok(())
    }
}

async fn pump_events(
    mut eventloop: EventLoop,
    routes: Arc<Mutex<HashMap<String, mpsc::Sender<Vec<u8>>>>>,
    closing: Arc<AtomicBool>,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let routes = routes.lock().await;
                if let Some(tx) = routes.get(publish.topic.as_str()) {
                    if tx.try_send(publish.payload.to_vec()).is_err() {
                        warn!(
                            "Dropping message on '{}': subscriber not keeping up",
                            publish.topic
                        );
                    }
                }
            }
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                debug!("Connected to announcement bus");
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("Bus session closed");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                if closing.load(Ordering::Relaxed) {
                    break;
                }
                // poll() re-establishes the connection on the next call
                warn!("Bus connection error: {}", e);
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}
