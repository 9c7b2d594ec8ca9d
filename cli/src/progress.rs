//! Progress reporting for long-running operations

use colored::Colorize;

/// Stages a deployment moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStage {
    /// Artifact bytes are being handed to blob storage.
    Uploading,
    /// The deployment record is being appended to the log.
    Registering,
    /// Peers are being notified over the bus.
    Announcing,
}

impl ProgressStage {
    pub fn describe(&self) -> &'static str {
        match self {
            ProgressStage::Uploading => "Uploading artifact...",
            ProgressStage::Registering => "Recording deployment...",
            ProgressStage::Announcing => "Announcing to peers...",
        }
    }
}

/// Receives stage updates from an operation. Callers choose how to render
/// them; the operation itself never touches the terminal.
pub trait ProgressSink: Send + Sync {
    fn update(&self, stage: ProgressStage);
}

/// Prints each stage for interactive use.
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn update(&self, stage: ProgressStage) {
        println!("{}", stage.describe().dimmed());
    }
}

/// Discards all updates.
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn update(&self, _stage: ProgressStage) {}
}
