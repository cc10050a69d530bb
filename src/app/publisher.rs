//! Telemetry publisher: snapshot → transient artifact → storage network.
//!
//! The artifact path is shared by every publish, which is why the
//! [`UploadGate`](crate::gate::UploadGate) must admit at most one publish
//! at a time.

use std::path::{Path, PathBuf};

use crate::app::ports::{ArchiveError, ArchivePort};
use crate::app::records::ContentRef;
use crate::error::Result;
use crate::snapshot::Snapshot;

/// Writes snapshots to the artifact and uploads them via an [`ArchivePort`].
pub struct TelemetryPublisher<A> {
    archive: A,
    artifact_path: PathBuf,
}

impl<A: ArchivePort> TelemetryPublisher<A> {
    pub fn new(archive: A, artifact_path: impl Into<PathBuf>) -> Self {
        Self {
            archive,
            artifact_path: artifact_path.into(),
        }
    }

    /// Serialise `snapshot`, overwrite the artifact and upload it.
    pub async fn publish(&self, snapshot: &Snapshot) -> Result<ContentRef> {
        let bytes = snapshot
            .to_artifact_bytes()
            .map_err(|e| ArchiveError::Artifact(format!("serialise: {e}")))?;
        std::fs::write(&self.artifact_path, bytes).map_err(|e| {
            ArchiveError::Artifact(format!("write {}: {e}", self.artifact_path.display()))
        })?;

        let content = self.archive.upload(&self.artifact_path).await?;
        Ok(content)
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    /// The underlying archive adapter.
    pub fn archive(&self) -> &A {
        &self.archive
    }
}
