//! Boundaries to the outside world
//!
//! Registry and bus logic talk to these traits, never to a concrete
//! backend. The [`http`] and [`mqtt`] adapters cover the real daemon and
//! broker; the [`memory`] adapters back the tests.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::errors::RegistryError;

pub mod http;
pub mod memory;
pub mod mqtt;

/// Content-addressed blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes, returning their content id.
    async fn put(&self, bytes: &[u8]) -> Result<String, RegistryError>;

    /// Fetch bytes by content id.
    async fn get(&self, cid: &str) -> Result<Vec<u8>, RegistryError>;
}

/// One page of feed entries in store order.
#[derive(Debug, Clone)]
pub struct FeedPage {
    /// Sequence number and raw value of each entry.
    pub entries: Vec<(u64, Value)>,
    /// Offset to request next, absent when this page reached the end.
    pub next: Option<u64>,
}

/// A named, replicated, append-only feed.
///
/// Sequence numbers are dense and zero-based. Reads may lag other
/// writers; a reader always sees a prefix of the feed plus its own
/// appends, never a reordering.
#[async_trait]
pub trait Feed: Send + Sync {
    /// Append one entry, returning its sequence number.
    async fn append(&self, feed: &str, value: Value) -> Result<u64, RegistryError>;

    /// Read up to `limit` entries starting at `offset`.
    async fn read_page(&self, feed: &str, offset: u64, limit: usize)
        -> Result<FeedPage, RegistryError>;
}

/// Fire-and-forget broadcast to peers.
#[async_trait]
pub trait Broadcast: Send + Sync {
    /// Publish a payload. Delivery is best-effort.
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), RegistryError>;

    /// Subscribe to a topic. Messages arrive on the returned channel
    /// until the subscription or the session ends.
    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<Vec<u8>>, RegistryError>;

    /// Drop a subscription.
    async fn unsubscribe(&self, topic: &str) -> Result<(), RegistryError>;

    /// Flush queued publishes and tear down the session.
    async fn close(&self) -> Result<(), RegistryError>;
}

/// Peer details as reported by the node daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    /// Load factor the peer advertises, 0.0 when idle.
    #[serde(default)]
    pub load: f64,
    /// Address other nodes can reach the peer on.
    #[serde(default)]
    pub public_address: String,
}

/// Read access to the daemon's view of the mesh.
#[async_trait]
pub trait PeerDirectory: Send + Sync {
    /// Currently connected peers, keyed by peer id.
    async fn connected_peers(&self) -> Result<HashMap<String, PeerInfo>, RegistryError>;
}
