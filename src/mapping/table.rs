/// In-memory mapping table with write-through persistence
use crate::{
    error::RegistryResult,
    mapping::{MappingBackend, MappingEntries},
    metrics,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Mapping table shared by the resolver, upload handlers and repair jobs
///
/// All mutations load-modify-save under one lock, so concurrent self-healing
/// writes within the process never drop each other's entries.
pub struct MappingTable {
    backend: Arc<dyn MappingBackend>,
    entries: Mutex<MappingEntries>,
}

impl MappingTable {
    /// Load the table from its backend
    pub async fn open(backend: Arc<dyn MappingBackend>) -> RegistryResult<Self> {
        let entries = backend.load().await?;
        metrics::MAPPING_ENTRIES.set(entries.len() as i64);
        Ok(Self {
            backend,
            entries: Mutex::new(entries),
        })
    }

    /// Exact-key lookup
    pub async fn lookup(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }

    /// Point every alias at the store key `key` and persist once
    ///
    /// Returns whether anything changed. Nothing is written when every alias
    /// already maps to the key.
    pub async fn record<S: AsRef<str>>(&self, aliases: &[S], key: &str) -> RegistryResult<bool> {
        let value = key.trim().to_string();
        if value.is_empty() {
            return Ok(false);
        }
        let mut entries = self.entries.lock().await;

        let mut changed = false;
        for alias in aliases {
            let alias = alias.as_ref();
            if alias.is_empty() {
                continue;
            }
            if entries.get(alias) != Some(&value) {
                entries.insert(alias.to_string(), value.clone());
                changed = true;
            }
        }

        if changed {
            self.backend.save(&entries).await?;
            metrics::MAPPING_ENTRIES.set(entries.len() as i64);
            debug!("Recorded mapping {:?} -> {}", aliases.iter().map(|a| a.as_ref()).collect::<Vec<_>>(), value);
        }

        Ok(changed)
    }

    /// Insert a batch of entries and persist once
    ///
    /// Returns how many entries were added or changed.
    pub async fn merge(&self, batch: MappingEntries) -> RegistryResult<usize> {
        let mut entries = self.entries.lock().await;

        let mut changed = 0;
        for (alias, key) in batch {
            if alias.is_empty() || key.is_empty() || entries.get(&alias) == Some(&key) {
                continue;
            }
            entries.insert(alias, key);
            changed += 1;
        }

        if changed > 0 {
            self.backend.save(&entries).await?;
            metrics::MAPPING_ENTRIES.set(entries.len() as i64);
        }

        Ok(changed)
    }

    /// Replace the whole table (used by repair)
    pub async fn replace_all(&self, new_entries: MappingEntries) -> RegistryResult<()> {
        let mut entries = self.entries.lock().await;
        self.backend.save(&new_entries).await?;
        *entries = new_entries;
        metrics::MAPPING_ENTRIES.set(entries.len() as i64);
        Ok(())
    }

    /// Snapshot of all entries
    pub async fn entries(&self) -> MappingEntries {
        self.entries.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
