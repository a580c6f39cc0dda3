//! Stage snapshots
//!
//! After each stage the orchestrator hands the merged state to a
//! `CheckpointStore`. Snapshots are for inspection and post-mortems; a
//! failed save is logged and the run goes on.

use crate::error::CheckpointError;
use crate::phase::StageKind;
use crate::state::PipelineState;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use ulid::Ulid;

/// Destination for stage snapshots
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persist the state as it stands after `stage`
    ///
    /// # Errors
    /// `CheckpointError` when the snapshot cannot be written.
    async fn save(&self, stage: StageKind, state: &PipelineState) -> Result<(), CheckpointError>;
}

/// Keeps snapshots in memory
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    snapshots: Mutex<Vec<(StageKind, PipelineState)>>,
}

impl MemoryCheckpointStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots taken so far, oldest first
    #[must_use]
    pub fn snapshots(&self) -> Vec<(StageKind, PipelineState)> {
        self.snapshots.lock().clone()
    }
}

#[async_trait::async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn save(&self, stage: StageKind, state: &PipelineState) -> Result<(), CheckpointError> {
        self.snapshots.lock().push((stage, state.clone()));
        Ok(())
    }
}

/// Writes one pretty-printed JSON file per stage: `<runId>-<stage>.json`
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    /// Store under `dir`, created on first save
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Snapshot directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a snapshot of `stage` in run `run_id` is written to
    #[must_use]
    pub fn path_for(&self, run_id: Ulid, stage: StageKind) -> PathBuf {
        self.dir.join(format!("{run_id}-{}.json", stage.as_str()))
    }

    /// Read a snapshot back
    ///
    /// # Errors
    /// `CheckpointError::Io` for a missing file, `Encoding` for a corrupt one.
    pub async fn load(&self, run_id: Ulid, stage: StageKind) -> Result<PipelineState, CheckpointError> {
        let path = self.path_for(run_id, stage);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| CheckpointError::Io { path, source })?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[async_trait::async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(&self, stage: StageKind, state: &PipelineState) -> Result<(), CheckpointError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| CheckpointError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.path_for(state.run_id(), stage);
        let body = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|source| CheckpointError::Io {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(path = %path.display(), %stage, "Checkpoint written");
        Ok(())
    }
}
