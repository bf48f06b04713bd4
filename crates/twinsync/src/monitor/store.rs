use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::warn;

use crate::asset::Population;

/// File name of the persisted population inside the data directory
pub const STATE_FILE: &str = "asset-monitor-state.json";

#[derive(Debug, thiserror::Error)]
pub enum SnapshotStoreError {
    #[error("failed to create data directory {0}: {1}")]
    CreateDir(PathBuf, #[source] std::io::Error),

    #[error("failed to write {0}: {1}")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("failed to serialize population: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persists the last observed population so change detection survives
/// restarts.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    /// Load the last saved population.
    ///
    /// A missing, unreadable or malformed file is reported as `None`: the
    /// caller treats it the same as a first run.
    pub async fn load(&self) -> Option<Population> {
        let path = self.path();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No saved state at {}", path.display());
                return None;
            }
            Err(e) => {
                warn!("Failed to read saved state {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice::<Population>(&bytes) {
            Ok(population) => Some(population),
            Err(e) => {
                warn!("Ignoring corrupt saved state {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Save a population, replacing the previous one.
    ///
    /// The document is written to a sibling temporary file and renamed over
    /// the target, so an interrupted write leaves the old file in place.
    pub async fn save(&self, population: &Population) -> Result<(), SnapshotStoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| SnapshotStoreError::CreateDir(self.dir.clone(), e))?;

        let path = self.path();
        let tmp = tmp_path(&path);
        let json = serde_json::to_vec_pretty(population)?;

        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| SnapshotStoreError::Write(tmp.clone(), e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| SnapshotStoreError::Write(path.clone(), e))?;

        debug!("Saved {} assets to {}", population.len(), path.display());
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
