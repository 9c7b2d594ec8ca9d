//! Deployment lifecycle tests
//!
//! Drive the full deploy/start/stop/rollback/delete cycle through the
//! in-memory adapters and check what the derived views report.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use wire_models::AppStatus;

use flotilla::bus::announce::Announcer;
use flotilla::errors::RegistryError;
use flotilla::ports::memory::{MemoryBlobs, MemoryFeed};
use flotilla::ports::{BlobStore, Broadcast};
use flotilla::progress::SilentProgress;
use flotilla::registry::deployer::Deployer;
use flotilla::registry::log::EventLog;
use flotilla::registry::view::RegistryView;
use flotilla::utils::sha256_hash;

const FEED: &str = "deployments";

struct Harness {
    feed: MemoryFeed,
    blobs: MemoryBlobs,
    deployer: Deployer,
    view: RegistryView,
}

fn harness() -> Harness {
    let feed = MemoryFeed::new();
    let blobs = MemoryBlobs::new();
    let log = EventLog::new(Arc::new(feed.clone()), FEED);
    let deployer = Deployer::new(log.clone(), Arc::new(blobs.clone()), Announcer::disabled());
    Harness {
        feed,
        blobs,
        deployer,
        view: RegistryView::new(log),
    }
}

#[test]
fn test_deploy_then_listed() {
    tokio_test::block_on(async {
        let h = harness();
        let outcome = h
            .deployer
            .deploy(
                "blog",
                b"artifact bytes",
                "v1",
                Some("blog.example.org".to_string()),
                &SilentProgress,
            )
            .await
            .unwrap();

        assert_eq!(outcome.seq, 0);
        assert_eq!(outcome.cid, sha256_hash(b"artifact bytes"));
        // The artifact really landed in the blob store
        assert_eq!(h.blobs.get(&outcome.cid).await.unwrap(), b"artifact bytes");

        let states = h.view.active_states().await.unwrap();
        let entry = &states["blog"];
        assert_eq!(entry.record.version, "v1");
        assert_eq!(entry.record.status, AppStatus::Running);
        assert_eq!(entry.record.domain.as_deref(), Some("blog.example.org"));
        assert!(entry.record.deployed);

        let versions = h.view.versions("blog").await.unwrap();
        assert_eq!(versions.len(), 1);
        assert!(versions[0].record.deployed);
    });
}

#[test]
fn test_second_deploy_becomes_current() {
    tokio_test::block_on(async {
        let h = harness();
        h.deployer
            .deploy("blog", b"one", "v1", None, &SilentProgress)
            .await
            .unwrap();
        h.deployer
            .deploy("blog", b"two", "v2", None, &SilentProgress)
            .await
            .unwrap();

        let states = h.view.states().await.unwrap();
        assert_eq!(states["blog"].record.version, "v2");

        // History is newest first and only the winner keeps the flag
        let versions = h.view.versions("blog").await.unwrap();
        assert_eq!(versions[0].record.version, "v2");
        assert!(versions[0].record.deployed);
        assert!(!versions[1].record.deployed);
    });
}

#[test]
fn test_rollback_without_tag_targets_previous_version() {
    tokio_test::block_on(async {
        let h = harness();
        h.deployer
            .deploy("blog", b"one", "v1", None, &SilentProgress)
            .await
            .unwrap();
        h.deployer
            .deploy("blog", b"two", "v2", None, &SilentProgress)
            .await
            .unwrap();

        let outcome = h.deployer.rollback("blog", None, None).await.unwrap();
        assert_eq!(outcome.version, "v1");
        assert_eq!(outcome.cid, sha256_hash(b"one"));
        assert_eq!(h.feed.len(FEED).await, 3);

        let states = h.view.states().await.unwrap();
        let current = &states["blog"].record;
        assert_eq!(current.version, "v1");
        assert_eq!(current.is_rollback, Some(true));
        assert_eq!(current.status, AppStatus::Running);
    });
}

#[test]
fn test_rollback_to_unknown_tag_appends_nothing() {
    tokio_test::block_on(async {
        let h = harness();
        h.deployer
            .deploy("blog", b"one", "v1", None, &SilentProgress)
            .await
            .unwrap();

        let err = h
            .deployer
            .rollback("blog", Some("v9"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::VersionNotFound { .. }));

        // Resolution happens before any write
        assert_eq!(h.feed.len(FEED).await, 1);
        assert_eq!(h.view.states().await.unwrap()["blog"].record.version, "v1");
    });
}

#[test]
fn test_rollback_with_single_version_fails() {
    tokio_test::block_on(async {
        let h = harness();
        h.deployer
            .deploy("blog", b"one", "v1", None, &SilentProgress)
            .await
            .unwrap();

        let err = h.deployer.rollback("blog", None, None).await.unwrap_err();
        assert!(matches!(err, RegistryError::NoPreviousVersion(_)));
        assert_eq!(h.feed.len(FEED).await, 1);
    });
}

#[test]
fn test_rollback_domain_override_and_carry() {
    tokio_test::block_on(async {
        let h = harness();
        h.deployer
            .deploy(
                "blog",
                b"one",
                "v1",
                Some("old.example.org".to_string()),
                &SilentProgress,
            )
            .await
            .unwrap();
        h.deployer
            .deploy("blog", b"two", "v2", None, &SilentProgress)
            .await
            .unwrap();

        // No override: the target's recorded domain rides along
        h.deployer.rollback("blog", None, None).await.unwrap();
        let states = h.view.states().await.unwrap();
        assert_eq!(
            states["blog"].record.domain.as_deref(),
            Some("old.example.org")
        );

        // Explicit override replaces it
        h.deployer
            .rollback("blog", Some("v2"), Some("new.example.org".to_string()))
            .await
            .unwrap();
        let states = h.view.states().await.unwrap();
        assert_eq!(
            states["blog"].record.domain.as_deref(),
            Some("new.example.org")
        );
    });
}

#[test]
fn test_start_unknown_version_leaves_log_untouched() {
    tokio_test::block_on(async {
        let h = harness();
        h.deployer
            .deploy("blog", b"one", "v1", None, &SilentProgress)
            .await
            .unwrap();

        let err = h.deployer.start("blog", "v7").await.unwrap_err();
        assert!(matches!(err, RegistryError::VersionNotFound { .. }));
        assert_eq!(h.feed.len(FEED).await, 1);

        let err = h.deployer.start("ghost", "v1").await.unwrap_err();
        assert!(matches!(err, RegistryError::NoVersionsFound(_)));
    });
}

#[test]
fn test_start_reasserts_an_older_version() {
    tokio_test::block_on(async {
        let h = harness();
        h.deployer
            .deploy("blog", b"one", "v1", None, &SilentProgress)
            .await
            .unwrap();
        h.deployer
            .deploy("blog", b"two", "v2", None, &SilentProgress)
            .await
            .unwrap();

        let outcome = h.deployer.start("blog", "v1").await.unwrap();
        assert_eq!(outcome.cid, sha256_hash(b"one"));

        let states = h.view.states().await.unwrap();
        assert_eq!(states["blog"].record.version, "v1");
        assert_eq!(states["blog"].record.is_rollback, None);
    });
}

#[test]
fn test_stop_keeps_the_version_attributable() {
    tokio_test::block_on(async {
        let h = harness();
        h.deployer
            .deploy("blog", b"one", "v1", None, &SilentProgress)
            .await
            .unwrap();
        h.deployer.stop("blog", true).await.unwrap();

        // Stopped apps stay listed, with their version and artifact intact
        let states = h.view.active_states().await.unwrap();
        let current = &states["blog"].record;
        assert_eq!(current.status, AppStatus::Stopped);
        assert_eq!(current.version, "v1");
        assert_eq!(current.cid, sha256_hash(b"one"));

        let err = h.deployer.stop("ghost", true).await.unwrap_err();
        assert!(matches!(err, RegistryError::NoVersionsFound(_)));
    });
}

#[test]
fn test_delete_writes_a_tombstone_and_keeps_history() {
    tokio_test::block_on(async {
        let h = harness();
        h.deployer
            .deploy("blog", b"one", "v1", None, &SilentProgress)
            .await
            .unwrap();
        h.deployer
            .deploy("blog", b"two", "v2", None, &SilentProgress)
            .await
            .unwrap();
        h.deployer.delete("blog", true).await.unwrap();

        // Gone from the active listing, still present as a tombstone
        assert!(h.view.active_states().await.unwrap().is_empty());
        let states = h.view.states().await.unwrap();
        assert_eq!(states["blog"].record.status, AppStatus::Deleted);
        assert!(!states["blog"].record.deployed);

        // Nothing was erased
        let versions = h.view.versions("blog").await.unwrap();
        assert_eq!(versions.len(), 3);
        assert_eq!(versions[0].record.status, AppStatus::Deleted);
    });
}

#[test]
fn test_rollback_after_delete_revives_an_older_version() {
    tokio_test::block_on(async {
        let h = harness();
        h.deployer
            .deploy("blog", b"one", "v1", None, &SilentProgress)
            .await
            .unwrap();
        h.deployer
            .deploy("blog", b"two", "v2", None, &SilentProgress)
            .await
            .unwrap();
        h.deployer.delete("blog", true).await.unwrap();

        // The tombstone is never a rollback target; v1 is the newest
        // version not holding the deployed flag
        let outcome = h.deployer.rollback("blog", None, None).await.unwrap();
        assert_eq!(outcome.version, "v1");

        let states = h.view.active_states().await.unwrap();
        assert_eq!(states["blog"].record.version, "v1");
        assert_eq!(states["blog"].record.status, AppStatus::Running);
    });
}

#[test]
fn test_deploy_after_delete_revives_the_app() {
    tokio_test::block_on(async {
        let h = harness();
        h.deployer
            .deploy("blog", b"one", "v1", None, &SilentProgress)
            .await
            .unwrap();
        h.deployer.delete("blog", true).await.unwrap();
        assert!(h.view.active_states().await.unwrap().is_empty());

        h.deployer
            .deploy("blog", b"two", "v2", None, &SilentProgress)
            .await
            .unwrap();

        let states = h.view.active_states().await.unwrap();
        assert_eq!(states["blog"].record.version, "v2");
        assert_eq!(h.view.versions("blog").await.unwrap().len(), 3);
    });
}

/// A bus whose publishes always fail, as if the broker just vanished.
struct DeadBus;

#[async_trait]
impl Broadcast for DeadBus {
    async fn publish(&self, _topic: &str, _payload: &[u8]) -> Result<(), RegistryError> {
        Err(RegistryError::PublishFailed("broker gone".to_string()))
    }

    async fn subscribe(&self, _topic: &str) -> Result<mpsc::Receiver<Vec<u8>>, RegistryError> {
        Err(RegistryError::BusError("broker gone".to_string()))
    }

    async fn unsubscribe(&self, _topic: &str) -> Result<(), RegistryError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), RegistryError> {
        Ok(())
    }
}

#[test]
fn test_publish_failures_never_fail_the_command() {
    tokio_test::block_on(async {
        let feed = MemoryFeed::new();
        let log = EventLog::new(Arc::new(feed.clone()), FEED);
        let deployer = Deployer::new(
            log.clone(),
            Arc::new(MemoryBlobs::new()),
            Announcer::new(Arc::new(DeadBus)),
        );

        let outcome = deployer
            .deploy("blog", b"one", "v1", None, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(outcome.version, "v1");
        assert_eq!(feed.len(FEED).await, 1);

        // Lifecycle announcements are just as expendable
        deployer.stop("blog", true).await.unwrap();
        deployer.rollback("blog", Some("v1"), None).await.unwrap();
        assert_eq!(feed.len(FEED).await, 3);
    });
}
