//! Orchestrator snapshots stored as a pretty-printed JSON file.
//!
//! Saves go to a sibling temp file first and are renamed into place, so a
//! crash mid-write leaves the previous checkpoint intact.

use hypoloop_application::ports::checkpoint::{CheckpointError, CheckpointStore};
use hypoloop_domain::OrchestratorSnapshot;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct JsonFileCheckpoint {
    path: PathBuf,
}

impl JsonFileCheckpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CheckpointStore for JsonFileCheckpoint {
    fn save(&self, snapshot: &OrchestratorSnapshot) -> Result<(), CheckpointError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = snapshot.to_json()?;
        let temp = self.temp_path();
        std::fs::write(&temp, json)?;
        std::fs::rename(&temp, &self.path)?;
        debug!(
            "Saved checkpoint at turn {} to {}",
            snapshot.n_rounds,
            self.path.display()
        );
        Ok(())
    }

    fn load(&self) -> Result<Option<OrchestratorSnapshot>, CheckpointError> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(OrchestratorSnapshot::from_json(&json)?))
    }
}
