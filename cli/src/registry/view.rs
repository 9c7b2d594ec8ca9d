//! Derived views over the deployment log
//!
//! Nothing here writes. Current state is a pure fold of the log, so two
//! nodes holding the same entries always derive the same answer no
//! matter how the entries arrived.

use std::collections::BTreeMap;

use wire_models::AppStatus;

use crate::errors::RegistryError;
use crate::registry::log::{EventLog, LogEntry};

/// One row of an application's version history.
///
/// `record.deployed` is repaired: across a history at most one entry
/// carries `true`, regardless of what the raw events claimed.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionEntry {
    pub seq: u64,
    pub record: wire_models::DeploymentRecord,
}

/// Last-writer-wins ordering: `challenger` beats `incumbent` when its
/// timestamp is later, with feed position breaking exact ties. The rule
/// only looks at the two entries, so folds applied in any order agree.
pub(crate) fn wins(challenger: &LogEntry, incumbent: &LogEntry) -> bool {
    (challenger.record.timestamp, challenger.seq) > (incumbent.record.timestamp, incumbent.seq)
}

/// Fold entries into the winning entry per application.
///
/// Running the fold twice over the same entries is a no-op; appending
/// more entries can only move an app forward in (timestamp, seq) order.
pub fn reduce(entries: &[LogEntry]) -> BTreeMap<String, LogEntry> {
    let mut states: BTreeMap<String, LogEntry> = BTreeMap::new();
    for entry in entries {
        states
            .entry(entry.record.app_name.clone())
            .and_modify(|current| {
                if wins(entry, current) {
                    *current = entry.clone();
                }
            })
            .or_insert_with(|| entry.clone());
    }
    states
}

/// All entries for one app, newest first, with the deployed claim
/// repaired: the latest entry that claimed `deployed` keeps it, every
/// other entry reads `false`.
pub fn version_history(entries: &[LogEntry], app_name: &str) -> Vec<VersionEntry> {
    let mut history: Vec<LogEntry> = entries
        .iter()
        .filter(|e| e.record.app_name == app_name)
        .cloned()
        .collect();
    history.sort_by(|a, b| (b.record.timestamp, b.seq).cmp(&(a.record.timestamp, a.seq)));

    let winner = history.iter().find(|e| e.record.deployed).map(|e| e.seq);

    history
        .into_iter()
        .map(|e| {
            let deployed = Some(e.seq) == winner;
            let mut record = e.record;
            record.deployed = deployed;
            VersionEntry { seq: e.seq, record }
        })
        .collect()
}

/// Read-side API over the event log.
pub struct RegistryView {
    log: EventLog,
}

impl RegistryView {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }

    /// Winning entry per app, tombstones included.
    pub async fn states(&self) -> Result<BTreeMap<String, LogEntry>, RegistryError> {
        Ok(reduce(&self.log.entries().await?))
    }

    /// Winning entry per app, minus apps whose current state is deleted.
    pub async fn active_states(&self) -> Result<BTreeMap<String, LogEntry>, RegistryError> {
        let mut states = self.states().await?;
        states.retain(|_, entry| entry.record.status != AppStatus::Deleted);
        Ok(states)
    }

    /// Repaired version history for one app, newest first.
    pub async fn versions(&self, app_name: &str) -> Result<Vec<VersionEntry>, RegistryError> {
        Ok(version_history(&self.log.entries().await?, app_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use wire_models::DeploymentRecord;

    fn entry(seq: u64, app: &str, version: &str, ts_secs: i64, deployed: bool) -> LogEntry {
        LogEntry {
            seq,
            record: DeploymentRecord {
                app_name: app.to_string(),
                cid: format!("cid-{app}-{version}"),
                version: version.to_string(),
                timestamp: Utc.timestamp_opt(ts_secs, 0).unwrap(),
                deployed,
                domain: None,
                status: AppStatus::Running,
                is_rollback: None,
            },
        }
    }

    #[test]
    fn reduce_keeps_one_entry_per_app() {
        let entries = vec![
            entry(0, "blog", "v1", 10, true),
            entry(1, "api", "v1", 11, true),
            entry(2, "blog", "v2", 20, true),
        ];
        let states = reduce(&entries);
        assert_eq!(states.len(), 2);
        assert_eq!(states["blog"].record.version, "v2");
        assert_eq!(states["api"].record.version, "v1");
    }

    #[test]
    fn reduce_prefers_later_timestamps_over_feed_order() {
        // The v1 event was appended after v2 but carries an older clock
        let entries = vec![
            entry(0, "blog", "v2", 20, true),
            entry(1, "blog", "v1", 10, true),
        ];
        let states = reduce(&entries);
        assert_eq!(states["blog"].record.version, "v2");
    }

    #[test]
    fn reduce_breaks_timestamp_ties_by_feed_position() {
        let entries = vec![
            entry(0, "blog", "v1", 10, true),
            entry(1, "blog", "v2", 10, true),
        ];
        let states = reduce(&entries);
        assert_eq!(states["blog"].record.version, "v2");
    }

    #[test]
    fn reduce_is_idempotent() {
        let entries = vec![
            entry(0, "blog", "v1", 10, true),
            entry(1, "blog", "v2", 20, true),
            entry(2, "api", "v3", 30, true),
        ];
        assert_eq!(reduce(&entries), reduce(&entries));
    }

    #[test]
    fn history_is_newest_first_with_one_deployed() {
        let entries = vec![
            entry(0, "blog", "v1", 10, true),
            entry(1, "blog", "v2", 20, true),
        ];
        let history = version_history(&entries, "blog");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].record.version, "v2");
        assert!(history[0].record.deployed);
        assert_eq!(history[1].record.version, "v1");
        // v1 claimed deployed in the raw event; the repair clears it
        assert!(!history[1].record.deployed);
    }

    #[test]
    fn history_repair_survives_stale_claims() {
        // Three raw claims, only the newest one survives
        let entries = vec![
            entry(0, "blog", "v1", 10, true),
            entry(1, "blog", "v2", 20, true),
            entry(2, "blog", "v3", 15, true),
        ];
        let history = version_history(&entries, "blog");
        assert_eq!(history[0].record.version, "v2");
        assert!(history[0].record.deployed);
        assert!(!history[1].record.deployed);
        assert!(!history[2].record.deployed);
    }

    #[test]
    fn history_without_claims_has_no_deployed_entry() {
        let entries = vec![
            entry(0, "blog", "v1", 10, false),
            entry(1, "blog", "v2", 20, false),
        ];
        let history = version_history(&entries, "blog");
        assert!(history.iter().all(|v| !v.record.deployed));
    }

    #[test]
    fn history_for_unknown_app_is_empty() {
        let entries = vec![entry(0, "blog", "v1", 10, true)];
        assert!(version_history(&entries, "api").is_empty());
    }

    #[test]
    fn history_ignores_other_apps() {
        let entries = vec![
            entry(0, "blog", "v1", 10, true),
            entry(1, "api", "v9", 99, true),
            entry(2, "blog", "v2", 20, true),
        ];
        let history = version_history(&entries, "blog");
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|v| v.record.app_name == "blog"));
    }
}
