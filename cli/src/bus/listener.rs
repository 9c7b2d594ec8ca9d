//! Subscriber loop for bus announcements

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use wire_models::Announcement;

use crate::bus::topics;
use crate::errors::RegistryError;
use crate::ports::Broadcast;
use crate::registry::index::LatestIndex;
use crate::registry::log::{EventLog, LogEntry};
use crate::utils::short_cid;

/// Receives announcements picked up from peers.
#[async_trait]
pub trait AnnouncementHandler: Send + Sync {
    async fn handle(&self, announcement: Announcement) -> Result<(), RegistryError>;
}

/// Run the subscriber loop until `shutdown_signal` resolves.
///
/// Malformed payloads are skipped and handler errors are logged; neither
/// stops the loop. The transport session is closed on every exit path so
/// the broker does not accumulate dead subscriptions.
pub async fn run(
    transport: Arc<dyn Broadcast>,
    handler: Arc<dyn AnnouncementHandler>,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) -> Result<(), RegistryError> {
    let mut deploy_rx = transport.subscribe(topics::DEPLOY).await?;
    let mut actions_rx = transport.subscribe(topics::APP_ACTIONS).await?;
    info!(
        "Listening for announcements on '{}' and '{}'",
        topics::DEPLOY,
        topics::APP_ACTIONS
    );

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Listener shutting down...");
                break;
            }
            message = deploy_rx.recv() => match message {
                Some(payload) => dispatch(handler.as_ref(), topics::DEPLOY, &payload).await,
                None => {
                    warn!("Subscription for '{}' closed", topics::DEPLOY);
                    break;
                }
            },
            message = actions_rx.recv() => match message {
                Some(payload) => dispatch(handler.as_ref(), topics::APP_ACTIONS, &payload).await,
                None => {
                    warn!("Subscription for '{}' closed", topics::APP_ACTIONS);
                    break;
                }
            },
        }
    }

    for topic in topics::all() {
        let _ = transport.unsubscribe(topic).await;
    }
    transport.close().await
}

async fn dispatch(handler: &dyn AnnouncementHandler, topic: &str, payload: &[u8]) {
    let announcement: Announcement = match serde_json::from_slice(payload) {
        Ok(a) => a,
        Err(e) => {
            warn!("Skipping malformed message on '{}': {}", topic, e);
            return;
        }
    };
    debug!("Received announcement on '{}'", topic);

    if let Err(e) = handler.handle(announcement).await {
        warn!("Handler failed for message on '{}': {}", topic, e);
    }
}

/// The stock handler: keeps a [`LatestIndex`] current by treating every
/// deployment announcement as a nudge to catch up from the feed.
///
/// Announcements are lossy and carry no feed position, so the tracker
/// never folds their payloads directly. The log stays the source of
/// truth; the bus only tells us when to look.
pub struct IndexTracker {
    log: EventLog,
    index: Mutex<LatestIndex>,
}

impl IndexTracker {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            index: Mutex::new(LatestIndex::new()),
        }
    }

    /// Fold the whole replicated feed into the index.
    pub async fn seed(&self) -> Result<usize, RegistryError> {
        let entries = self.log.entries().await?;
        let mut index = self.index.lock().await;
        *index = LatestIndex::from_entries(&entries);
        Ok(index.len())
    }

    /// Fetch entries the index has not seen and fold them in. Returns
    /// the entries that changed some app's current state.
    pub async fn catch_up(&self) -> Result<Vec<LogEntry>, RegistryError> {
        let mut index = self.index.lock().await;
        let fresh = self.log.entries_from(index.next_seq()).await?;

        let mut changed = Vec::new();
        for entry in &fresh {
            if index.apply(entry) {
                changed.push(entry.clone());
            }
        }
        Ok(changed)
    }

    /// Current winning entry for `app_name`, if the index knows one.
    pub async fn current(&self, app_name: &str) -> Option<LogEntry> {
        self.index.lock().await.get(app_name).cloned()
    }

    /// Number of apps currently tracked.
    pub async fn tracked(&self) -> usize {
        self.index.lock().await.len()
    }
}

#[async_trait]
impl AnnouncementHandler for IndexTracker {
    async fn handle(&self, announcement: Announcement) -> Result<(), RegistryError> {
        match announcement {
            Announcement::Deployment(notice) => {
                let kind = if notice.is_rollback.unwrap_or(false) {
                    "rolled back"
                } else {
                    "deployed"
                };
                info!(
                    "Peer {} '{}' version {} ({})",
                    kind,
                    notice.app_name,
                    notice.version,
                    short_cid(&notice.cid)
                );
                for entry in self.catch_up().await? {
                    info!(
                        "Now tracking '{}' at version {} [{}]",
                        entry.record.app_name, entry.record.version, entry.record.status
                    );
                }
            }
            Announcement::AppAction(notice) => {
                info!(
                    "Peer requested {} of '{}'",
                    notice.action, notice.app_name
                );
                // Lifecycle events also land in the log
                self.catch_up().await?;
            }
        }
        Ok(())
    }
}
