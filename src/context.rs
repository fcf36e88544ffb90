/// Application context and dependency injection
use crate::{
    artifact_store::{ArtifactStore, DiskArtifactBackend},
    config::ServerConfig,
    error::{RegistryError, RegistryResult},
    identity::DocumentResolver,
    mapping::{FileMappingBackend, MappingTable},
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub store: Arc<ArtifactStore>,
    pub mapping: Arc<MappingTable>,
    pub resolver: Arc<DocumentResolver>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> RegistryResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let backend = Arc::new(DiskArtifactBackend::new(
            config.storage.uploads_directory.clone(),
        ));
        let store = Arc::new(ArtifactStore::new(backend, config.service.max_upload_bytes));

        let mapping_backend = Arc::new(FileMappingBackend::new(config.storage.mapping_file.clone()));
        let mapping = Arc::new(MappingTable::open(mapping_backend).await?);

        let resolver = Arc::new(DocumentResolver::new(
            Arc::clone(&store),
            Arc::clone(&mapping),
            &config.resolver,
        ));

        Ok(Self {
            config: Arc::new(config),
            store,
            mapping,
            resolver,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> RegistryResult<()> {
        let dirs = [
            &config.storage.data_directory,
            &config.storage.uploads_directory,
        ];

        for dir in dirs {
            if !dir.exists() {
                tokio::fs::create_dir_all(dir).await.map_err(|e| {
                    RegistryError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
                })?;
            }
        }

        Ok(())
    }

    /// Public base URL for links handed to clients
    pub fn service_url(&self) -> String {
        self.config.base_url()
    }
}
