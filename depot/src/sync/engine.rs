use std::collections::HashSet;

use depot_core::{RemoteEntry, StoreClient, StoreError};
use thiserror::Error;

use super::cache::{CacheError, CacheStore};
use super::fs::{FsError, LocalDir};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("object store error: {0}")]
    Store(#[from] StoreError),
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Listed { namespace: String, objects: usize },
    Removed { name: String },
    Skipped { name: String },
    Fetched { path: String, bytes: u64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub fetched: usize,
    pub skipped: usize,
    pub removed: usize,
}

enum Disposition {
    New,
    Unchanged,
    Changed,
}

/// Reconciles one namespace per call: drops local files whose remote
/// counterpart disappeared, fetches new or changed objects, skips unchanged
/// ones, then persists the cache once for the whole pass.
pub struct SyncEngine {
    store: StoreClient,
    cache: CacheStore,
    target: LocalDir,
}

impl SyncEngine {
    pub fn new(store: StoreClient, cache: CacheStore, target: LocalDir) -> Self {
        Self {
            store,
            cache,
            target,
        }
    }

    pub async fn sync_namespace(
        &mut self,
        namespace: &str,
        on_event: &mut dyn FnMut(SyncEvent),
    ) -> Result<SyncSummary, EngineError> {
        let listing = self.store.list(namespace).await?;
        on_event(SyncEvent::Listed {
            namespace: namespace.to_string(),
            objects: listing.len(),
        });

        // Stale files go first so a remote rename never leaves orphaned
        // bytes on disk, even when the fetch pass below fails partway.
        let removed = self.remove_stale(&listing, on_event).await?;
        let mut summary = SyncSummary {
            removed,
            ..SyncSummary::default()
        };

        for entry in &listing {
            if entry.name.is_empty() {
                // Directory placeholder key; no local counterpart.
                continue;
            }
            let disposition = match self.cache.fingerprint(&entry.name) {
                None => Disposition::New,
                Some(cached) if cached == entry.fingerprint => Disposition::Unchanged,
                Some(_) => Disposition::Changed,
            };
            match disposition {
                Disposition::Unchanged => {
                    summary.skipped += 1;
                    on_event(SyncEvent::Skipped {
                        name: entry.name.clone(),
                    });
                }
                Disposition::New => {
                    // Registered before the transfer; the cache is only
                    // persisted once the whole pass succeeds, so a failed
                    // fetch leaves the saved document at its pre-run state.
                    self.cache.record(&entry.name, &entry.fingerprint);
                    self.fetch_entry(entry, &mut summary, on_event).await?;
                }
                Disposition::Changed => {
                    self.fetch_entry(entry, &mut summary, on_event).await?;
                    self.cache.record(&entry.name, &entry.fingerprint);
                }
            }
        }

        self.cache.save().await?;
        Ok(summary)
    }

    async fn remove_stale(
        &mut self,
        listing: &[RemoteEntry],
        on_event: &mut dyn FnMut(SyncEvent),
    ) -> Result<usize, EngineError> {
        let live: HashSet<&str> = listing.iter().map(|entry| entry.name.as_str()).collect();
        let mut removed = 0;
        for name in self.cache.names() {
            if live.contains(name.as_str()) {
                continue;
            }
            if self.target.exists(&name).await? {
                self.target.remove(&name).await?;
                removed += 1;
                on_event(SyncEvent::Removed { name: name.clone() });
            }
            self.cache.forget(&name);
        }
        Ok(removed)
    }

    async fn fetch_entry(
        &mut self,
        entry: &RemoteEntry,
        summary: &mut SyncSummary,
        on_event: &mut dyn FnMut(SyncEvent),
    ) -> Result<(), EngineError> {
        let body = self.store.fetch(&entry.path).await?;
        self.target.write(&entry.name, &body).await?;
        summary.fetched += 1;
        on_event(SyncEvent::Fetched {
            path: entry.path.clone(),
            bytes: body.len() as u64,
        });
        Ok(())
    }
}
