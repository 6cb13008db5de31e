//! Snapshot loading
//!
//! A snapshot is a JSON file holding the rows the storage layer would return.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::Snapshot;
use crate::infrastructure::traits::FileSystem;
use crate::infrastructure::{InfraError, InfraResult};

/// Reads snapshot files through the filesystem boundary.
pub struct SnapshotLoader {
    fs: Arc<dyn FileSystem>,
}

impl SnapshotLoader {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> InfraResult<Snapshot> {
        if !self.fs.is_file(path) {
            return Err(InfraError::SnapshotNotFound(path.to_path_buf()));
        }
        let content = self
            .fs
            .read_to_string(path)
            .map_err(|e| InfraError::io(format!("read snapshot {}", path.display()), e))?;
        let snapshot = Self::parse(&content).map_err(|source| InfraError::Snapshot {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            sectors = snapshot.sectors.len(),
            links = snapshot.service_sectors.len(),
            sector_ratings = snapshot.sector_ratings.len(),
            service_ratings = snapshot.service_ratings.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    pub fn parse(content: &str) -> Result<Snapshot, serde_json::Error> {
        serde_json::from_str(content)
    }
}
