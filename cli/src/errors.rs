//! Error types for flotilla

use thiserror::Error;

/// Errors surfaced by registry operations and the adapters beneath them.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The storage backend is unreachable or rejected the request.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The app has no recorded versions at all.
    #[error("No versions found for app '{0}'")]
    NoVersionsFound(String),

    /// A named version tag does not exist in the app's history.
    #[error("Version '{version}' not found for app '{app_name}'")]
    VersionNotFound { app_name: String, version: String },

    /// Rollback without a tag, but nothing older than the live version exists.
    #[error("No previous version to roll back to for app '{0}'")]
    NoPreviousVersion(String),

    /// An announcement could not be handed to the bus.
    #[error("Publish failed: {0}")]
    PublishFailed(String),

    /// The announcement bus session could not be established or maintained.
    #[error("Bus error: {0}")]
    BusError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl RegistryError {
    /// True for conditions the user can resolve themselves, as opposed to
    /// infrastructure being down.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            RegistryError::NoVersionsFound(_)
                | RegistryError::VersionNotFound { .. }
                | RegistryError::NoPreviousVersion(_)
        )
    }
}
