//! Deployment operations
//!
//! Every operation follows the same discipline: append to the log
//! first, announce second. The append is the source of truth; a failed
//! announcement downgrades nothing and is logged and swallowed.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use wire_models::{AppAction, AppStatus, DeploymentRecord};

use crate::bus::announce::Announcer;
use crate::errors::RegistryError;
use crate::ports::BlobStore;
use crate::progress::{ProgressSink, ProgressStage};
use crate::registry::log::EventLog;
use crate::registry::resolve::rollback_target;
use crate::registry::view::RegistryView;

/// What a deployment operation recorded.
#[derive(Debug, Clone)]
pub struct DeployOutcome {
    pub app_name: String,
    pub cid: String,
    pub version: String,
    pub seq: u64,
}

/// Issues deployment lifecycle operations against the shared log.
pub struct Deployer {
    log: EventLog,
    view: RegistryView,
    blobs: Arc<dyn BlobStore>,
    announcer: Announcer,
}

impl Deployer {
    pub fn new(log: EventLog, blobs: Arc<dyn BlobStore>, announcer: Announcer) -> Self {
        Self {
            view: RegistryView::new(log.clone()),
            log,
            blobs,
            announcer,
        }
    }

    /// Store an artifact and record it as the app's running version.
    pub async fn deploy(
        &self,
        app_name: &str,
        artifact: &[u8],
        version: &str,
        domain: Option<String>,
        progress: &dyn ProgressSink,
    ) -> Result<DeployOutcome, RegistryError> {
        progress.update(ProgressStage::Uploading);
        let cid = self.blobs.put(artifact).await?;
        info!("Stored artifact for '{}' as {}", app_name, cid);

        let record = DeploymentRecord {
            app_name: app_name.to_string(),
            cid: cid.clone(),
            version: version.to_string(),
            timestamp: Utc::now(),
            deployed: true,
            domain,
            status: AppStatus::Running,
            is_rollback: None,
        };

        progress.update(ProgressStage::Registering);
        let seq = self.log.append(&record).await?;

        progress.update(ProgressStage::Announcing);
        self.announce_deployment(&record).await;

        Ok(DeployOutcome {
            app_name: app_name.to_string(),
            cid,
            version: version.to_string(),
            seq,
        })
    }

    /// Record a previously stored version as running again.
    pub async fn start(&self, app_name: &str, version_tag: &str) -> Result<DeployOutcome, RegistryError> {
        let versions = self.view.versions(app_name).await?;
        if versions.is_empty() {
            return Err(RegistryError::NoVersionsFound(app_name.to_string()));
        }

        let target = versions
            .iter()
            .find(|v| v.record.version == version_tag && v.record.status != AppStatus::Deleted)
            .ok_or_else(|| RegistryError::VersionNotFound {
                app_name: app_name.to_string(),
                version: version_tag.to_string(),
            })?;

        let record = DeploymentRecord {
            app_name: app_name.to_string(),
            cid: target.record.cid.clone(),
            version: version_tag.to_string(),
            timestamp: Utc::now(),
            deployed: true,
            domain: target.record.domain.clone(),
            status: AppStatus::Running,
            is_rollback: None,
        };

        let seq = self.log.append(&record).await?;
        self.announce_deployment(&record).await;
        self.announce_action(AppAction::Start, app_name, Some(version_tag), None)
            .await;

        Ok(DeployOutcome {
            app_name: app_name.to_string(),
            cid: record.cid,
            version: record.version,
            seq,
        })
    }

    /// Record the app as stopped.
    ///
    /// The new event is the current state with only timestamp and status
    /// changed, so the version and artifact stay attributable.
    pub async fn stop(&self, app_name: &str, force: bool) -> Result<u64, RegistryError> {
        let states = self.view.states().await?;
        let current = states
            .get(app_name)
            .ok_or_else(|| RegistryError::NoVersionsFound(app_name.to_string()))?;

        let mut record = current.record.clone();
        record.timestamp = Utc::now();
        record.status = AppStatus::Stopped;

        let seq = self.log.append(&record).await?;
        self.announce_action(AppAction::Stop, app_name, None, Some(force))
            .await;
        info!("Recorded stop for '{}'", app_name);
        Ok(seq)
    }

    /// Re-assert an earlier version as the running one.
    ///
    /// Rollback never rewrites history: it appends a fresh event carrying
    /// the old version and cid with a current timestamp. Target selection
    /// happens before anything is written, so a failed resolution leaves
    /// the log untouched.
    pub async fn rollback(
        &self,
        app_name: &str,
        version_tag: Option<&str>,
        domain: Option<String>,
    ) -> Result<DeployOutcome, RegistryError> {
        let versions = self.view.versions(app_name).await?;
        let target = rollback_target(app_name, &versions, version_tag)?;

        let record = DeploymentRecord {
            app_name: app_name.to_string(),
            cid: target.record.cid.clone(),
            version: target.record.version.clone(),
            timestamp: Utc::now(),
            deployed: true,
            domain: domain.or_else(|| target.record.domain.clone()),
            status: AppStatus::Running,
            is_rollback: Some(true),
        };

        let seq = self.log.append(&record).await?;
        info!(
            "Rolled '{}' back to version {} ({})",
            app_name, record.version, record.cid
        );
        self.announce_deployment(&record).await;

        Ok(DeployOutcome {
            app_name: app_name.to_string(),
            cid: record.cid,
            version: record.version,
            seq,
        })
    }

    /// Record a tombstone for the app.
    ///
    /// Nothing is erased: prior entries stay readable in the history and
    /// a later deploy revives the app under the same name.
    pub async fn delete(&self, app_name: &str, force: bool) -> Result<u64, RegistryError> {
        let states = self.view.states().await?;
        let current = states
            .get(app_name)
            .ok_or_else(|| RegistryError::NoVersionsFound(app_name.to_string()))?;

        let mut record = current.record.clone();
        record.timestamp = Utc::now();
        record.deployed = false;
        record.status = AppStatus::Deleted;
        record.is_rollback = None;

        let seq = self.log.append(&record).await?;
        self.announce_action(AppAction::Delete, app_name, None, Some(force))
            .await;
        info!("Recorded delete for '{}'", app_name);
        Ok(seq)
    }

    async fn announce_deployment(&self, record: &DeploymentRecord) {
        if let Err(e) = self.announcer.deployment(record).await {
            warn!(
                "Failed to announce deployment of '{}': {}",
                record.app_name, e
            );
        }
    }

    async fn announce_action(
        &self,
        action: AppAction,
        app_name: &str,
        version: Option<&str>,
        force: Option<bool>,
    ) {
        if let Err(e) = self
            .announcer
            .app_action(action, app_name, version, force)
            .await
        {
            warn!("Failed to announce {} of '{}': {}", action, app_name, e);
        }
    }
}
