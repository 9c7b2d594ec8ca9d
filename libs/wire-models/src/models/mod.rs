//! Deployment log records and announcement payloads

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status carried by a deployment record.
///
/// `Deleted` is a tombstone: the app's history stays in the log but the
/// app no longer appears in the active listing. Records written before
/// status tracking existed deserialize with [`AppStatus::Unknown`] via
/// the `#[serde(default)]` on [`DeploymentRecord::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppStatus {
    Running,
    Stopped,
    Deleted,
    #[default]
    Unknown,
}

impl AppStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppStatus::Running => "running",
            AppStatus::Stopped => "stopped",
            AppStatus::Deleted => "deleted",
            AppStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable entry of the replicated deployment log.
///
/// Events are never updated in place; every change to an app appends a
/// new record and readers fold the log to find the current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub app_name: String,
    /// Content id of the deployed artifact in blob storage.
    pub cid: String,
    /// Human-chosen version tag, e.g. "v2" or "latest". Not unique.
    pub version: String,
    pub timestamp: DateTime<Utc>,
    /// Claim that this entry is the live one. Readers repair the claim:
    /// at most one entry per app wins it.
    pub deployed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub status: AppStatus,
    /// Set when the record was produced by a rollback. Provenance only;
    /// carries no special meaning when folding state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_rollback: Option<bool>,
}

/// Lifecycle intent carried by an application action announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppAction {
    Start,
    Stop,
    Delete,
}

impl fmt::Display for AppAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AppAction::Start => "start",
            AppAction::Stop => "stop",
            AppAction::Delete => "delete",
        })
    }
}

/// Broadcast payload for a completed deployment or rollback.
///
/// Advisory only: the log entry is already durable when this goes out,
/// and peers that miss it converge from the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentNotice {
    pub app_name: String,
    pub cid: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_rollback: Option<bool>,
    /// Publish time in epoch milliseconds.
    pub timestamp: i64,
}

impl DeploymentNotice {
    /// Build the notice for a just-appended record.
    pub fn of(record: &DeploymentRecord, timestamp_ms: i64) -> Self {
        Self {
            app_name: record.app_name.clone(),
            cid: record.cid.clone(),
            version: record.version.clone(),
            domain: record.domain.clone(),
            is_rollback: record.is_rollback,
            timestamp: timestamp_ms,
        }
    }
}

/// Broadcast payload for a start/stop/delete intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppActionNotice {
    pub action: AppAction,
    pub app_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
    /// Publish time in epoch milliseconds.
    pub timestamp: i64,
}

/// Anything that can travel over the announcement bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Announcement {
    #[serde(rename = "deployment")]
    Deployment(DeploymentNotice),
    #[serde(rename = "application-action")]
    AppAction(AppActionNotice),
}
