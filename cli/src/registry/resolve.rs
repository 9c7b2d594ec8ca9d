//! Rollback target selection

use wire_models::AppStatus;

use crate::errors::RegistryError;
use crate::registry::view::VersionEntry;

/// Choose which recorded version a rollback should re-assert.
///
/// `versions` must be a newest-first repaired history, as produced by
/// the view. With a tag the match is exact; without one the target is
/// the newest entry not currently deployed. Tombstones mark lifecycle,
/// not runnable artifacts, and are never selected.
pub fn rollback_target<'a>(
    app_name: &str,
    versions: &'a [VersionEntry],
    version_tag: Option<&str>,
) -> Result<&'a VersionEntry, RegistryError> {
    let mut candidates = versions
        .iter()
        .filter(|v| v.record.status != AppStatus::Deleted)
        .peekable();

    if candidates.peek().is_none() {
        return Err(RegistryError::NoVersionsFound(app_name.to_string()));
    }

    match version_tag {
        // Tags are not unique; a duplicated tag resolves to its newest entry
        Some(tag) => candidates
            .find(|v| v.record.version == tag)
            .ok_or_else(|| RegistryError::VersionNotFound {
                app_name: app_name.to_string(),
                version: tag.to_string(),
            }),
        None => candidates
            .find(|v| !v.record.deployed)
            .ok_or_else(|| RegistryError::NoPreviousVersion(app_name.to_string())),
    }
}
