use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

pub const CACHE_FILE_NAME: &str = "depot-cache.json";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode cache state: {0}")]
    Encode(serde_json::Error),
}

/// Last known remote fingerprint per local file name. An entry exists iff the
/// name was fetched or recorded as up to date, and leaves exactly when the
/// local file is deleted for remote absence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheState {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    files: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(rename = "hash")]
    pub fingerprint: String,
}

pub struct CacheStore {
    path: PathBuf,
    state: CacheState,
}

impl CacheStore {
    /// Loads the cache document under `dir`, creating the directory and an
    /// empty document when none exists yet so later saves are pure overwrites.
    pub async fn load(dir: &Path) -> Result<Self, CacheError> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(CACHE_FILE_NAME);
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| CacheError::Corrupt {
                    path: path.clone(),
                    source,
                })?
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let store = Self {
                    path,
                    state: CacheState::default(),
                };
                store.save().await?;
                return Ok(store);
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, state })
    }

    pub fn fingerprint(&self, name: &str) -> Option<&str> {
        self.state
            .files
            .get(name)
            .map(|entry| entry.fingerprint.as_str())
    }

    pub fn record(&mut self, name: &str, fingerprint: &str) {
        self.state.files.insert(
            name.to_string(),
            CacheEntry {
                fingerprint: fingerprint.to_string(),
            },
        );
    }

    pub fn forget(&mut self, name: &str) {
        self.state.files.remove(name);
    }

    pub fn names(&self) -> Vec<String> {
        self.state.files.keys().cloned().collect()
    }

    pub fn state(&self) -> &CacheState {
        &self.state
    }

    /// Writes a sibling file and renames it over the document, so a reader
    /// never observes a truncated cache.
    pub async fn save(&self) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(&self.state).map_err(CacheError::Encode)?;
        let partial = self.path.with_extension("json.partial");
        let mut file = tokio::fs::File::create(&partial).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        tokio::fs::rename(&partial, &self.path).await?;
        Ok(())
    }
}
