//! JSON snapshot persistence for the semantic cache

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::semantic_cache::{CacheSnapshot, SemanticCache};
use crate::domain::DomainError;

/// Saves and restores cache snapshots as a JSON file
#[derive(Debug, Clone)]
pub struct CachePersistence {
    path: PathBuf,
}

impl CachePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot file; a missing file is an empty snapshot
    pub async fn load(&self) -> Result<CacheSnapshot, DomainError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CacheSnapshot::default());
            }
            Err(e) => {
                return Err(DomainError::store(format!(
                    "Failed to read cache file {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        serde_json::from_str(&content).map_err(|e| {
            DomainError::store(format!(
                "Invalid cache file {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    pub async fn save(&self, snapshot: &CacheSnapshot) -> Result<(), DomainError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                DomainError::store(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| DomainError::internal(format!("Failed to encode cache: {}", e)))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(|e| {
            DomainError::store(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            DomainError::store(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;

        Ok(())
    }

    /// Load into the cache. Failures are logged and leave the cache empty.
    pub async fn restore_into(&self, cache: &dyn SemanticCache) {
        match self.load().await {
            Ok(snapshot) => {
                let stored = snapshot.entries.len();
                cache.restore(snapshot);
                info!(
                    path = %self.path.display(),
                    stored,
                    loaded = cache.size(),
                    "Semantic cache restored"
                );
            }
            Err(e) => warn!(error = %e, "Could not restore semantic cache"),
        }
    }

    /// Save the cache. Failures are logged only.
    pub async fn save_from(&self, cache: &dyn SemanticCache) {
        let snapshot = cache.snapshot();
        match self.save(&snapshot).await {
            Ok(()) => info!(
                path = %self.path.display(),
                entries = snapshot.entries.len(),
                "Semantic cache saved"
            ),
            Err(e) => warn!(error = %e, "Could not save semantic cache"),
        }
    }
}
