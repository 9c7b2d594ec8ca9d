//! Publishing announcements

use std::sync::Arc;

use tracing::debug;
use wire_models::{Announcement, AppAction, AppActionNotice, DeploymentNotice, DeploymentRecord};

use crate::bus::topics;
use crate::errors::RegistryError;
use crate::ports::Broadcast;
use crate::utils::unix_millis;

/// Publishes deployment facts and lifecycle intents to peers.
///
/// Callers announce only after the corresponding log append succeeded,
/// and they treat publish failures as log-and-continue.
#[derive(Clone)]
pub struct Announcer {
    transport: Option<Arc<dyn Broadcast>>,
}

impl Announcer {
    pub fn new(transport: Arc<dyn Broadcast>) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    /// An announcer with no bus behind it. Publishes become no-ops,
    /// which is exactly what an unconfigured bus means.
    pub fn disabled() -> Self {
        Self { transport: None }
    }

    /// Announce a just-recorded deployment or rollback.
    pub async fn deployment(&self, record: &DeploymentRecord) -> Result<(), RegistryError> {
        let notice = DeploymentNotice::of(record, unix_millis());
        self.publish(topics::DEPLOY, &Announcement::Deployment(notice))
            .await
    }

    /// Announce a start/stop/delete intent.
    pub async fn app_action(
        &self,
        action: AppAction,
        app_name: &str,
        version: Option<&str>,
        force: Option<bool>,
    ) -> Result<(), RegistryError> {
        let notice = AppActionNotice {
            action,
            app_name: app_name.to_string(),
            version: version.map(String::from),
            force,
            timestamp: unix_millis(),
        };
        self.publish(topics::APP_ACTIONS, &Announcement::AppAction(notice))
            .await
    }

    async fn publish(
        &self,
        topic: &str,
        announcement: &Announcement,
    ) -> Result<(), RegistryError> {
        let Some(transport) = &self.transport else {
            debug!("No bus configured, skipping announcement on '{}'", topic);
            return Ok(());
        };
        let payload = serde_json::to_vec(announcement)?;
        transport.publish(topic, &payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::memory::MemoryBroadcast;
    use chrono::Utc;
    use wire_models::AppStatus;

    fn record() -> DeploymentRecord {
        DeploymentRecord {
            app_name: "blog".to_string(),
            cid: "cid-1".to_string(),
            version: "v1".to_string(),
            timestamp: Utc::now(),
            deployed: true,
            domain: None,
            status: AppStatus::Running,
            is_rollback: Some(true),
        }
    }

    #[test]
    fn deployments_go_out_on_the_deploy_topic() {
        tokio_test::block_on(async {
            let bus = MemoryBroadcast::new();
            let mut rx = bus.subscribe(topics::DEPLOY).await.unwrap();

            let announcer = Announcer::new(Arc::new(bus));
            announcer.deployment(&record()).await.unwrap();

            let payload = rx.recv().await.unwrap();
            let decoded: Announcement = serde_json::from_slice(&payload).unwrap();
            match decoded {
                Announcement::Deployment(notice) => {
                    assert_eq!(notice.app_name, "blog");
                    assert_eq!(notice.is_rollback, Some(true));
                    assert!(notice.timestamp > 0);
                }
                other => panic!("wrong announcement: {other:?}"),
            }
        });
    }

    #[test]
    fn actions_go_out_on_the_actions_topic() {
        tokio_test::block_on(async {
            let bus = MemoryBroadcast::new();
            let mut rx = bus.subscribe(topics::APP_ACTIONS).await.unwrap();

            let announcer = Announcer::new(Arc::new(bus));
            announcer
                .app_action(AppAction::Stop, "blog", None, Some(true))
                .await
                .unwrap();

            let payload = rx.recv().await.unwrap();
            let decoded: Announcement = serde_json::from_slice(&payload).unwrap();
            match decoded {
                Announcement::AppAction(notice) => {
                    assert_eq!(notice.action, AppAction::Stop);
                    assert_eq!(notice.force, Some(true));
                }
                other => panic!("wrong announcement: {other:?}"),
            }
        });
    }

    #[test]
    fn disabled_announcer_swallows_everything() {
        tokio_test::block_on(async {
            let announcer = Announcer::disabled();
            announcer.deployment(&record()).await.unwrap();
            announcer
                .app_action(AppAction::Delete, "blog", None, None)
                .await
                .unwrap();
        });
    }
}
