//! On-disk cache for the last downloaded business dataset, with TTL.

use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

use crate::domain::Dataset;

const CACHE_FILENAME: &str = "dataset_cache.json";

/// Dataset TTL: 1 hour. Stale entries are still served when the store is unreachable.
pub const DATASET_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetCache {
    /// Name pattern the dataset was searched with.
    pub pattern: String,
    /// Unix timestamp (seconds) when this cache was created.
    pub cached_at: u64,
    pub dataset: Dataset,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl DatasetCache {
    pub fn new(pattern: impl Into<String>, dataset: Dataset) -> Self {
        Self {
            pattern: pattern.into(),
            cached_at: now_secs(),
            dataset,
        }
    }

    pub fn age(&self) -> Duration {
        Duration::from_secs(now_secs().saturating_sub(self.cached_at))
    }

    pub fn is_expired(&self) -> bool {
        self.age() > DATASET_CACHE_TTL
    }

    /// Human-readable age string.
    pub fn age_string(&self) -> String {
        let secs = self.age().as_secs();
        if secs < 60 {
            format!("{secs}s")
        } else if secs < 3600 {
            format!("{}m", secs / 60)
        } else if secs < 86400 {
            format!("{}h", secs / 3600)
        } else {
            format!("{}d", secs / 86400)
        }
    }
}

/// Location of the dataset cache file.
#[derive(Clone, Debug)]
pub struct DatasetStore {
    path: PathBuf,
}

impl DatasetStore {
    /// Cache file in the platform's local data directory.
    pub fn default_location() -> Self {
        let base = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vessel-quote");
        Self::at(base.join(CACHE_FILENAME))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached dataset for `pattern`, regardless of age.
    pub fn load(&self, pattern: &str) -> Option<DatasetCache> {
        if !self.path.exists() {
            log::debug!("[dataset-cache] no cache at {}", self.path.display());
            return None;
        }

        let cache = match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<DatasetCache>(&content) {
                Ok(cache) => cache,
                Err(e) => {
                    log::warn!("[dataset-cache] failed to parse: {e}");
                    return None;
                }
            },
            Err(e) => {
                log::warn!("[dataset-cache] failed to read: {e}");
                return None;
            }
        };

        if cache.pattern != pattern {
            log::debug!(
                "[dataset-cache] cached pattern `{}` does not match `{pattern}`",
                cache.pattern
            );
            return None;
        }
        log::debug!(
            "[dataset-cache] loaded `{}` (age: {})",
            cache.dataset.source_name,
            cache.age_string()
        );
        Some(cache)
    }

    /// Cached dataset for `pattern` only while it is within the TTL.
    pub fn load_fresh(&self, pattern: &str) -> Option<DatasetCache> {
        self.load(pattern).filter(|cache| !cache.is_expired())
    }

    pub fn save(&self, cache: &DatasetCache) -> Result<(), std::io::Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(cache)?;
        fs::write(&self.path, content)?;
        log::info!(
            "[dataset-cache] saved `{}` ({} rows) to {}",
            cache.dataset.source_name,
            cache.dataset.rows.len(),
            self.path.display()
        );
        Ok(())
    }
}
