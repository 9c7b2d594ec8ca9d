//! In-memory adapters
//!
//! Back the test suite and behave like a single perfectly-synced node:
//! every append is immediately visible to every reader of the same
//! instance. Clones share state.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::errors::RegistryError;
use crate::ports::{BlobStore, Broadcast, Feed, FeedPage, PeerDirectory, PeerInfo};
use crate::utils::sha256_hash;

/// Blob store over a hash map, content-addressed by SHA-256.
#[derive(Clone, Default)]
pub struct MemoryBlobs {
    data: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobs {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn put(&self, bytes: &[u8]) -> Result<String, RegistryError> {
        let cid = sha256_hash(bytes);
        self.data.write().await.insert(cid.clone(), bytes.to_vec());
        Ok(cid)
    }

    async fn get(&self, cid: &str) -> Result<Vec<u8>, RegistryError> {
        self.data
            .read()
            .await
            .get(cid)
            .cloned()
            .ok_or_else(|| RegistryError::StorageUnavailable(format!("unknown blob {cid}")))
    }
}

/// Append-only feeds over a vector per name.
#[derive(Clone, Default)]
pub struct MemoryFeed {
    feeds: Arc<Mutex<HashMap<String, Vec<Value>>>>,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently in `feed`.
    pub async fn len(&self, feed: &str) -> usize {
        self.feeds
            .lock()
            .await
            .get(feed)
            .map(|log| log.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Feed for MemoryFeed {
    async fn append(&self, feed: &str, value: Value) -> Result<u64, RegistryError> {
        let mut feeds = self.feeds.lock().await;
        let log = feeds.entry(feed.to_string()).or_default();
        log.push(value);
        Ok((log.len() - 1) as u64)
    }

    async fn read_page(
        &self,
        feed: &str,
        offset: u64,
        limit: usize,
    ) -> Result<FeedPage, RegistryError> {
        let feeds = self.feeds.lock().await;
        let log = feeds.get(feed).map(|v| v.as_slice()).unwrap_or(&[]);

        let start = (offset as usize).min(log.len());
        let end = start.saturating_add(limit).min(log.len());
        let entries = log[start..end]
            .iter()
            .enumerate()
            .map(|(i, value)| ((start + i) as u64, value.clone()))
            .collect();
        let next = if end < log.len() {
            Some(end as u64)
        } else {
            None
        };

        Ok(FeedPage { entries, next })
    }
}

/// Broadcast over in-process channels.
#[derive(Clone, Default)]
pub struct MemoryBroadcast {
    topics: Arc<Mutex<HashMap<String, Vec<mpsc::Sender<Vec<u8>>>>>>,
}

impl MemoryBroadcast {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Broadcast for MemoryBroadcast {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), RegistryError> {
        let mut topics = self.topics.lock().await;
        if let Some(subscribers) = topics.get_mut(topic) {
            // Slow or dropped subscribers lose messages, like the real bus
            subscribers.retain(|tx| tx.try_send(payload.to_vec()).is_ok() || !tx.is_closed());
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<Vec<u8>>, RegistryError> {
        let (tx, rx) = mpsc::channel(64);
        self.topics
            .lock()
            .await
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), RegistryError> {
        self.topics.lock().await.remove(topic);
        Ok(())
    }

    async fn close(&self) -> Result<(), RegistryError> {
        self.topics.lock().await.clear();
        Ok(())
    }
}

/// Fixed peer directory.
#[derive(Clone, Default)]
pub struct MemoryPeers {
    peers: HashMap<String, PeerInfo>,
}

impl MemoryPeers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_peer(mut self, id: &str, load: f64, address: &str) -> Self {
        self.peers.insert(
            id.to_string(),
            PeerInfo {
                load,
                public_address: address.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl PeerDirectory for MemoryPeers {
    async fn connected_peers(&self) -> Result<HashMap<String, PeerInfo>, RegistryError> {
        Ok(self.peers.clone())
    }
}
