/// Document Resolver - runs the strategy pipeline and loads the result
use crate::{
    artifact_store::{ArtifactStore, MetadataRecord},
    config::ResolverConfig,
    error::{RegistryError, RegistryResult},
    identity::{
        strategy::{default_pipeline, ResolveContext, ResolveStrategy},
        ResolvedDocument,
    },
    mapping::MappingTable,
    metrics,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resolves any alias of a stored document
///
/// Resolution order:
/// 1. Mapping table (fast path)
/// 2. Proxy record for the alias
/// 3. Metadata scan for a matching `docIdString`
/// 4. The alias as a store key
/// 5. Partial match against stored keys
///
/// Later steps write back into the earlier ones when self-heal is enabled,
/// so repeated lookups of the same alias take the fast path.
#[derive(Clone)]
pub struct DocumentResolver {
    store: Arc<ArtifactStore>,
    mapping: Arc<MappingTable>,
    strategies: Arc<Vec<Box<dyn ResolveStrategy>>>,
    self_heal: bool,
}

impl DocumentResolver {
    /// Create a resolver with the standard pipeline
    pub fn new(
        store: Arc<ArtifactStore>,
        mapping: Arc<MappingTable>,
        config: &ResolverConfig,
    ) -> Self {
        Self::with_strategies(store, mapping, default_pipeline(), config.self_heal)
    }

    /// Create a resolver with a custom pipeline
    pub fn with_strategies(
        store: Arc<ArtifactStore>,
        mapping: Arc<MappingTable>,
        strategies: Vec<Box<dyn ResolveStrategy>>,
        self_heal: bool,
    ) -> Self {
        Self {
            store,
            mapping,
            strategies: Arc::new(strategies),
            self_heal,
        }
    }

    pub fn self_heal(&self) -> bool {
        self.self_heal
    }

    /// Resolve an alias to its stored document
    ///
    /// The only error is NotFound; failed side effects are logged and counted.
    pub async fn resolve(&self, alias: &str) -> RegistryResult<ResolvedDocument> {
        if alias.trim().is_empty() {
            return Err(RegistryError::NotFound("Document alias is empty".to_string()));
        }

        let ctx = ResolveContext {
            store: &self.store,
            mapping: &self.mapping,
            self_heal: self.self_heal,
        };

        for strategy in self.strategies.iter() {
            let Some(hash) = strategy.try_resolve(&ctx, alias).await else {
                continue;
            };

            let kind = strategy.kind();
            metrics::record_resolution(kind.as_str(), true);
            debug!("Resolved {} -> {} via {}", alias, hash, kind.as_str());

            let (metadata, synthesized) = self.load_or_recover(&hash, alias).await;
            return Ok(ResolvedDocument {
                hash,
                metadata,
                resolved_by: kind,
                synthesized,
            });
        }

        metrics::record_resolution("none", false);
        info!("No document found for {}", alias);
        Err(RegistryError::NotFound(format!("Document not found: {}", alias)))
    }

    /// Metadata for a resolved key, synthesizing a `recovered` record if missing
    async fn load_or_recover(&self, hash: &str, alias: &str) -> (MetadataRecord, bool) {
        if let Some(metadata) = self.store.load_metadata(hash).await {
            return (metadata, false);
        }

        let record = MetadataRecord::recovered(hash, alias);

        // An unreadable record stays on disk for an operator to fix
        if self.store.metadata_exists(hash).await {
            warn!("Metadata for {} is unreadable, serving a recovered record", hash);
            return (record, true);
        }

        warn!("Document {} has no metadata, synthesizing a record", hash);
        if self.self_heal {
            match self.store.create_metadata(hash, &record).await {
                Ok(()) => {
                    metrics::record_self_heal("metadata", true);
                    info!("Persisted recovered metadata for {}", hash);
                }
                Err(e) => {
                    metrics::record_self_heal("metadata", false);
                    warn!("Failed to persist recovered metadata for {}: {}", hash, e);
                }
            }
        }

        (record, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        artifact_store::{DiskArtifactBackend, DocumentStatus},
        identity::StrategyKind,
        mapping::FileMappingBackend,
    };
    use tempfile::{tempdir, TempDir};

    const HASH: &str = "717efd549ed4fbf9327e34855a1a409dcc842fdc8adb95203f6c0c92f2fe923a";

    async fn create_test_resolver(self_heal: bool) -> (TempDir, DocumentResolver) {
        let dir = tempdir().unwrap();
        let store = Arc::new(ArtifactStore::new(
            Arc::new(DiskArtifactBackend::new(dir.path().join("uploads"))),
            1 << 20,
        ));
        let mapping = Arc::new(
            MappingTable::open(Arc::new(FileMappingBackend::new(
                dir.path().join("hash-mapping.json"),
            )))
            .await
            .unwrap(),
        );
        let resolver = DocumentResolver::new(store, mapping, &ResolverConfig { self_heal });
        (dir, resolver)
    }

    #[tokio::test]
    async fn test_empty_alias_is_not_found() {
        let (_dir, resolver) = create_test_resolver(true).await;

        assert!(resolver.resolve("").await.unwrap_err().is_not_found());
        assert!(resolver.resolve("   ").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_resolve_by_doc_id_then_fast_path() {
        let (_dir, resolver) = create_test_resolver(true).await;
        resolver
            .store
            .put(
                HASH,
                b"%PDF".to_vec(),
                MetadataRecord::unsigned(Some("a.pdf".into()), Some("Doc1".into())),
            )
            .await
            .unwrap();

        let first = resolver.resolve("Doc1").await.unwrap();
        assert_eq!(first.hash, HASH);
        assert_eq!(first.resolved_by, StrategyKind::MetadataScan);
        assert!(!first.synthesized);

        let second = resolver.resolve("Doc1").await.unwrap();
        assert_eq!(second.hash, HASH);
        assert_eq!(second.resolved_by, StrategyKind::MappingLookup);
    }

    #[tokio::test]
    async fn test_missing_metadata_is_recovered_and_persisted() {
        let (dir, resolver) = create_test_resolver(true).await;
        let uploads = dir.path().join("uploads");
        std::fs::create_dir_all(&uploads).unwrap();
        std::fs::write(uploads.join(format!("{}.pdf", HASH)), b"%PDF").unwrap();

        let resolved = resolver.resolve(HASH).await.unwrap();
        assert!(resolved.synthesized);
        assert_eq!(resolved.metadata.status, Some(DocumentStatus::Recovered));
        assert_eq!(resolved.metadata.file_name.as_deref(), Some("Document-717efd54"));
        assert!(uploads.join(format!("{}.json", HASH)).exists());
    }

    #[tokio::test]
    async fn test_recovered_metadata_not_persisted_without_self_heal() {
        let (dir, resolver) = create_test_resolver(false).await;
        let uploads = dir.path().join("uploads");
        std::fs::create_dir_all(&uploads).unwrap();
        std::fs::write(uploads.join(format!("{}.pdf", HASH)), b"%PDF").unwrap();

        let resolved = resolver.resolve(HASH).await.unwrap();
        assert!(resolved.synthesized);
        assert_eq!(resolved.metadata.recovered, Some(true));
        assert!(!uploads.join(format!("{}.json", HASH)).exists());
    }

    #[tokio::test]
    async fn test_unreadable_metadata_is_left_in_place() {
        let (dir, resolver) = create_test_resolver(true).await;
        let uploads = dir.path().join("uploads");
        let meta_path = uploads.join(format!("{}.json", HASH));
        std::fs::create_dir_all(&uploads).unwrap();
        std::fs::write(uploads.join(format!("{}.pdf", HASH)), b"%PDF").unwrap();
        std::fs::write(&meta_path, r#"{"signature":"0xsig","#).unwrap();

        let resolved = resolver.resolve(HASH).await.unwrap();
        assert!(resolved.synthesized);
        assert_eq!(resolved.metadata.status, Some(DocumentStatus::Recovered));
        assert_eq!(
            std::fs::read_to_string(&meta_path).unwrap(),
            r#"{"signature":"0xsig","#
        );
    }

    #[tokio::test]
    async fn test_unknown_alias_writes_nothing() {
        let (dir, resolver) = create_test_resolver(true).await;

        assert!(resolver.resolve("nothing-here").await.unwrap_err().is_not_found());
        assert!(!dir.path().join("hash-mapping.json").exists());
        assert!(resolver.mapping.is_empty().await);
    }
}
