//! Append-only access to the deployment feed

use std::sync::Arc;

use futures::stream::{self, Stream, TryStreamExt};
use serde_json::Value;
use tracing::{debug, warn};
use wire_models::DeploymentRecord;

use crate::errors::RegistryError;
use crate::ports::Feed;

/// Entries fetched per page when walking the feed.
const PAGE_SIZE: usize = 256;

/// One decoded entry of the deployment log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Position in the feed. Unique and dense per feed.
    pub seq: u64,
    pub record: DeploymentRecord,
}

/// The shared deployment log.
///
/// Appends go straight to the feed; reads decode whatever prefix the
/// local node has replicated. Entries that fail to decode are skipped
/// with a warning rather than poisoning every reader.
#[derive(Clone)]
pub struct EventLog {
    feed: Arc<dyn Feed>,
    feed_name: String,
}

impl EventLog {
    pub fn new(feed: Arc<dyn Feed>, feed_name: impl Into<String>) -> Self {
        Self {
            feed,
            feed_name: feed_name.into(),
        }
    }

    pub fn feed_name(&self) -> &str {
        &self.feed_name
    }

    /// Durably append `record`, returning its sequence number.
    pub async fn append(&self, record: &DeploymentRecord) -> Result<u64, RegistryError> {
        let value = serde_json::to_value(record)?;
        let seq = self.feed.append(&self.feed_name, value).await?;
        debug!("Appended entry {} for '{}'", seq, record.app_name);
        Ok(seq)
    }

    /// Walk the feed lazily from `offset`, fetching a page at a time.
    pub fn stream_from(
        &self,
        offset: u64,
    ) -> impl Stream<Item = Result<LogEntry, RegistryError>> + '_ {
        stream::try_unfold(Some(offset), move |state| async move {
            let Some(offset) = state else {
                return Ok::<_, RegistryError>(None);
            };
            let page = self
                .feed
                .read_page(&self.feed_name, offset, PAGE_SIZE)
                .await?;
            let entries: Vec<Result<LogEntry, RegistryError>> =
                decode_entries(page.entries).into_iter().map(Ok).collect();
            Ok(Some((stream::iter(entries), page.next)))
        })
        .try_flatten()
    }

    /// Every decodable entry currently replicated, in store order.
    pub async fn entries(&self) -> Result<Vec<LogEntry>, RegistryError> {
        self.stream_from(0).try_collect().await
    }

    /// Entries from `offset` onward, in store order.
    pub async fn entries_from(&self, offset: u64) -> Result<Vec<LogEntry>, RegistryError> {
        self.stream_from(offset).try_collect().await
    }
}

fn decode_entries(raw: Vec<(u64, Value)>) -> Vec<LogEntry> {
    raw.into_iter()
        .filter_map(
            |(seq, value)| match serde_json::from_value::<DeploymentRecord>(value) {
                Ok(record) => Some(LogEntry { seq, record }),
                Err(e) => {
                    warn!("Skipping undecodable feed entry {}: {}", seq, e);
                    None
                }
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::memory::MemoryFeed;
    use chrono::Utc;
    use serde_json::json;
    use wire_models::AppStatus;

    fn record(app: &str, version: &str) -> DeploymentRecord {
        DeploymentRecord {
            app_name: app.to_string(),
            cid: format!("cid-{version}"),
            version: version.to_string(),
            timestamp: Utc::now(),
            deployed: true,
            domain: None,
            status: AppStatus::Running,
            is_rollback: None,
        }
    }

    fn log_over(feed: MemoryFeed) -> EventLog {
        EventLog::new(Arc::new(feed), "deployments")
    }

    #[test]
    fn entries_come_back_in_append_order() {
        tokio_test::block_on(async {
            let log = log_over(MemoryFeed::new());
            log.append(&record("blog", "v1")).await.unwrap();
            log.append(&record("api", "v1")).await.unwrap();
            log.append(&record("blog", "v2")).await.unwrap();

            let entries = log.entries().await.unwrap();
            assert_eq!(entries.len(), 3);
            assert_eq!(entries[0].seq, 0);
            assert_eq!(entries[0].record.app_name, "blog");
            assert_eq!(entries[2].record.version, "v2");
        });
    }

    #[test]
    fn undecodable_entries_are_skipped() {
        tokio_test::block_on(async {
            let feed = MemoryFeed::new();
            let log = log_over(feed.clone());

            log.append(&record("blog", "v1")).await.unwrap();
            feed.append("deployments", json!({"not": "a record"}))
                .await
                .unwrap();
            log.append(&record("blog", "v2")).await.unwrap();

            let entries = log.entries().await.unwrap();
            assert_eq!(entries.len(), 2);
            // Surviving entries keep their real feed positions
            assert_eq!(entries[0].seq, 0);
            assert_eq!(entries[1].seq, 2);
        });
    }

    #[test]
    fn walks_across_page_boundaries() {
        tokio_test::block_on(async {
            let log = log_over(MemoryFeed::new());
            let total = PAGE_SIZE + 3;
            for n in 0..total {
                log.append(&record("blog", &format!("v{n}"))).await.unwrap();
            }

            let entries = log.entries().await.unwrap();
            assert_eq!(entries.len(), total);
            assert_eq!(entries.last().unwrap().seq, (total - 1) as u64);
        });
    }

    #[test]
    fn entries_from_skips_the_prefix() {
        tokio_test::block_on(async {
            let log = log_over(MemoryFeed::new());
            for n in 0..5 {
                log.append(&record("blog", &format!("v{n}"))).await.unwrap();
            }

            let tail = log.entries_from(3).await.unwrap();
            assert_eq!(tail.len(), 2);
            assert_eq!(tail[0].seq, 3);
        });
    }
}
