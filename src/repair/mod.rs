/// Store maintenance
///
/// Offline counterparts of the resolver's self-healing writes: rebuild the
/// mapping table and proxy records from what is on disk, and migrate keys
/// written by older tooling to canonical form.
use crate::{
    artifact_store::ArtifactStore,
    error::RegistryResult,
    identity::normalize::{canonical_key, is_hex_hash},
    mapping::{MappingEntries, MappingTable},
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Outcome of [`rebuild_mapping`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub proxies_scanned: usize,
    pub metadata_scanned: usize,
    pub mappings_recorded: usize,
    pub proxies_created: usize,
    /// Proxy records that disagree with the metadata naming the same alias
    pub proxy_conflicts: usize,
    pub proxies_unreadable: usize,
}

/// Outcome of [`canonicalize_store`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CanonicalizeReport {
    pub keys_renamed: usize,
    /// Legacy keys left alone because the canonical key is taken
    pub keys_skipped: usize,
    pub proxies_rewritten: usize,
    pub mappings_rewritten: usize,
}

/// Rebuild mapping entries and missing proxy records from proxies and metadata
///
/// Existing proxy records are never overwritten; one that points somewhere
/// other than the metadata says is counted as a conflict.
pub async fn rebuild_mapping(
    store: &ArtifactStore,
    mapping: &MappingTable,
) -> RegistryResult<RepairReport> {
    let mut report = RepairReport::default();
    let mut batch = MappingEntries::new();

    for alias in store.list_proxy_aliases().await? {
        report.proxies_scanned += 1;

        let target = match store.read_proxy(&alias).await {
            Ok(Some(target)) => target,
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping unreadable proxy record {}: {}", alias, e);
                report.proxies_unreadable += 1;
                continue;
            }
        };
        let Some(key) = store.locate_blob(&target).await else {
            debug!("Proxy record {} -> {} points at nothing", alias, target);
            continue;
        };

        batch.insert(alias.to_lowercase(), key.clone());
        batch.insert(alias, key);
    }

    for (key, record) in store.list_metadata().await? {
        report.metadata_scanned += 1;

        let Some(alias) = record.alias().map(str::to_string) else {
            continue;
        };
        if !store.blob_exists(&key).await {
            continue;
        }

        match store.read_proxy(&alias).await {
            // Already counted in the proxy pass; the metadata still names the key
            Err(_) => {}
            Ok(None) => match store.write_proxy(&alias, &key).await {
                Ok(()) => report.proxies_created += 1,
                Err(e) => warn!("Failed to create proxy record {} -> {}: {}", alias, key, e),
            },
            Ok(Some(target)) => {
                if store.locate_blob(&target).await.as_deref() != Some(key.as_str()) {
                    warn!(
                        "Proxy record {} points at {}, metadata says {}; leaving it",
                        alias, target, key
                    );
                    report.proxy_conflicts += 1;
                    continue;
                }
            }
        }

        batch.insert(alias.to_lowercase(), key.clone());
        batch.insert(alias, key);
    }

    report.mappings_recorded = mapping.merge(batch).await?;

    info!(
        proxies_scanned = report.proxies_scanned,
        metadata_scanned = report.metadata_scanned,
        mappings_recorded = report.mappings_recorded,
        proxies_created = report.proxies_created,
        proxy_conflicts = report.proxy_conflicts,
        proxies_unreadable = report.proxies_unreadable,
        "mapping_rebuilt"
    );
    Ok(report)
}

/// Move legacy `0x`-prefixed or upper-case keys to canonical form
///
/// Proxy records and mapping values that point at a renamed key, or at a
/// non-canonical spelling of a key that exists, are rewritten too.
pub async fn canonicalize_store(
    store: &ArtifactStore,
    mapping: &MappingTable,
) -> RegistryResult<CanonicalizeReport> {
    let mut report = CanonicalizeReport::default();

    let mut keys = store.list_blob_keys().await?;
    keys.extend(store.list_metadata_keys().await?);
    keys.sort();
    keys.dedup();

    let mut renamed: HashMap<String, String> = HashMap::new();
    for key in keys {
        let canonical = canonical_key(&key);
        if canonical == key || !is_hex_hash(&key) {
            continue;
        }

        match store.rename_key(&key, &canonical).await {
            Ok(()) => {
                report.keys_renamed += 1;
                renamed.insert(key, canonical);
            }
            Err(e) => {
                warn!("Leaving legacy key {}: {}", key, e);
                report.keys_skipped += 1;
            }
        }
    }

    for alias in store.list_proxy_aliases().await? {
        let target = match store.read_proxy(&alias).await {
            Ok(Some(target)) => target,
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping unreadable proxy record {}: {}", alias, e);
                continue;
            }
        };
        let Some(fixed) = canonical_target(store, &renamed, &target).await else {
            continue;
        };
        match store.write_proxy(&alias, &fixed).await {
            Ok(()) => report.proxies_rewritten += 1,
            Err(e) => warn!("Failed to rewrite proxy record {}: {}", alias, e),
        }
    }

    let mut batch = MappingEntries::new();
    for (alias, target) in mapping.entries().await {
        if let Some(fixed) = canonical_target(store, &renamed, &target).await {
            batch.insert(alias, fixed);
        }
    }
    report.mappings_rewritten = mapping.merge(batch).await?;

    info!(
        keys_renamed = report.keys_renamed,
        keys_skipped = report.keys_skipped,
        proxies_rewritten = report.proxies_rewritten,
        mappings_rewritten = report.mappings_rewritten,
        "store_canonicalized"
    );
    Ok(report)
}

/// Canonical replacement for a stored reference, if it needs one
async fn canonical_target(
    store: &ArtifactStore,
    renamed: &HashMap<String, String>,
    target: &str,
) -> Option<String> {
    if let Some(new_key) = renamed.get(target) {
        return Some(new_key.clone());
    }

    let canonical = canonical_key(target);
    if canonical == target || !is_hex_hash(target) {
        return None;
    }
    store.blob_exists(&canonical).await.then_some(canonical)
}
