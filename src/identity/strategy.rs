/// Resolution strategies
///
/// Each strategy turns an alias into the key of a stored blob, or passes.
/// A strategy only answers with a key whose blob exists, so a dangling
/// mapping entry or proxy record falls through to the next strategy.
use crate::{
    artifact_store::ArtifactStore,
    identity::{
        normalize::{canonical_key, probe_keys, strip_hex_prefix},
        StrategyKind,
    },
    mapping::MappingTable,
    metrics,
};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Shared state handed to every strategy
pub struct ResolveContext<'a> {
    pub store: &'a ArtifactStore,
    pub mapping: &'a MappingTable,
    /// When false, strategies never write
    pub self_heal: bool,
}

impl ResolveContext<'_> {
    /// Key of an existing blob for a candidate hash in any encoding
    async fn existing_key(&self, candidate: &str) -> Option<String> {
        self.store.locate_blob(candidate).await
    }

    /// Advisory write: alias (original and lower-cased) -> key
    async fn remember(&self, alias: &str, key: &str) {
        if !self.self_heal {
            return;
        }
        let aliases = [alias.to_string(), alias.to_lowercase()];
        match self.mapping.record(&aliases, key).await {
            Ok(_) => metrics::record_self_heal("mapping", true),
            Err(e) => {
                metrics::record_self_heal("mapping", false);
                warn!("Failed to cache mapping {} -> {}: {}", alias, key, e);
            }
        }
    }

    /// Advisory write: proxy record alias -> key
    async fn remember_proxy(&self, alias: &str, key: &str) {
        if !self.self_heal {
            return;
        }
        match self.store.write_proxy(alias, key).await {
            Ok(()) => {
                metrics::record_self_heal("proxy", true);
                debug!("Created proxy record {} -> {}", alias, key);
            }
            Err(e) => {
                metrics::record_self_heal("proxy", false);
                warn!("Failed to create proxy record {} -> {}: {}", alias, key, e);
            }
        }
    }
}

/// One step of the resolution pipeline
#[async_trait]
pub trait ResolveStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Key of the stored document this alias names, if this strategy can tell
    async fn try_resolve(&self, ctx: &ResolveContext<'_>, alias: &str) -> Option<String>;
}

/// Step 1: mapping table, probing the exact, lower-cased and canonical spellings
pub struct MappingLookup;

#[async_trait]
impl ResolveStrategy for MappingLookup {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MappingLookup
    }

    async fn try_resolve(&self, ctx: &ResolveContext<'_>, alias: &str) -> Option<String> {
        for probe in probe_keys(alias) {
            let Some(target) = ctx.mapping.lookup(&probe).await else {
                continue;
            };
            match ctx.existing_key(&target).await {
                Some(key) => return Some(key),
                None => debug!("Mapping {} -> {} points at nothing", probe, target),
            }
        }
        None
    }
}

/// Step 2: per-alias proxy record
pub struct ProxyRecord;

#[async_trait]
impl ResolveStrategy for ProxyRecord {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ProxyRecord
    }

    async fn try_resolve(&self, ctx: &ResolveContext<'_>, alias: &str) -> Option<String> {
        let target = match ctx.store.read_proxy(alias).await {
            Ok(Some(target)) => target,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read proxy record for {}: {}", alias, e);
                return None;
            }
        };

        let Some(key) = ctx.existing_key(&target).await else {
            debug!("Proxy record {} -> {} points at nothing", alias, target);
            return None;
        };

        ctx.remember(alias, &key).await;
        Some(key)
    }
}

/// Step 3: scan metadata records for a matching `docIdString`
pub struct MetadataScan;

#[async_trait]
impl ResolveStrategy for MetadataScan {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MetadataScan
    }

    async fn try_resolve(&self, ctx: &ResolveContext<'_>, alias: &str) -> Option<String> {
        let records = match ctx.store.list_metadata().await {
            Ok(records) => records,
            Err(e) => {
                warn!("Metadata scan failed: {}", e);
                return None;
            }
        };

        let needle = alias.trim().to_lowercase();
        for (key, record) in records {
            let matches = record
                .alias()
                .map(|doc_id| doc_id.to_lowercase() == needle)
                .unwrap_or(false);
            if !matches || !ctx.store.blob_exists(&key).await {
                continue;
            }

            debug!("Found docIdString {} in metadata for {}", alias, key);
            ctx.remember_proxy(alias, &key).await;
            ctx.remember(alias, &key).await;
            return Some(key);
        }
        None
    }
}

/// Step 4: the alias is itself a store key (blob and metadata both present)
pub struct DirectProbe;

#[async_trait]
impl ResolveStrategy for DirectProbe {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DirectProbe
    }

    async fn try_resolve(&self, ctx: &ResolveContext<'_>, alias: &str) -> Option<String> {
        let exact = alias.trim().to_string();
        let canonical = canonical_key(alias);

        for key in [exact, canonical] {
            if key.is_empty() {
                continue;
            }
            if ctx.store.blob_exists(&key).await && ctx.store.metadata_exists(&key).await {
                return Some(key);
            }
        }
        None
    }
}

/// Step 5: first blob key (sorted) containing the alias, case-insensitively
///
/// A match is cached only when it is unambiguous, so a short fragment is
/// never pinned to whichever document happened to sort first.
pub struct PartialMatch;

#[async_trait]
impl ResolveStrategy for PartialMatch {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PartialMatch
    }

    async fn try_resolve(&self, ctx: &ResolveContext<'_>, alias: &str) -> Option<String> {
        let lowered = alias.trim().to_lowercase();
        let stripped = strip_hex_prefix(&lowered).to_string();
        if stripped.is_empty() {
            return None;
        }

        let keys = match ctx.store.list_blob_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Partial match scan failed: {}", e);
                return None;
            }
        };

        let matches: Vec<String> = keys
            .into_iter()
            .filter(|key| {
                let key = key.to_lowercase();
                key.contains(&lowered) || key.contains(&stripped)
            })
            .collect();

        let first = matches.first()?.clone();
        debug!("Partial match {} -> {} ({} candidates)", alias, first, matches.len());

        if matches.len() == 1 {
            ctx.remember(alias, &first).await;
        }
        Some(first)
    }
}

/// The fixed pipeline, in order
pub fn default_pipeline() -> Vec<Box<dyn ResolveStrategy>> {
    vec![
        Box::new(MappingLookup),
        Box::new(ProxyRecord),
        Box::new(MetadataScan),
        Box::new(DirectProbe),
        Box::new(PartialMatch),
    ]
}
