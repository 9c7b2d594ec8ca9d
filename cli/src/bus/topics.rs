//! Announcement bus topics

/// Completed deployments and rollbacks.
pub const DEPLOY: &str = "deploy";

/// Start/stop/delete intents.
pub const APP_ACTIONS: &str = "app-actions";

/// Every topic a listening node subscribes to.
pub fn all() -> [&'static str; 2] {
    [DEPLOY, APP_ACTIONS]
}
