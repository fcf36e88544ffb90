/// Artifact Store Manager
///
/// Applies key canonicalization at the write boundary and handles metadata
/// (de)serialization on top of an [`ArtifactBackend`].
use crate::{
    artifact_store::{models::pdf_url, ArtifactBackend, DocumentSummary, MetadataRecord},
    error::{RegistryError, RegistryResult},
    identity::normalize::{canonical_key, is_hex_hash},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Main artifact store manager
#[derive(Clone)]
pub struct ArtifactStore {
    backend: Arc<dyn ArtifactBackend>,
    max_upload_bytes: usize,
}

impl ArtifactStore {
    /// Create a new artifact store
    pub fn new(backend: Arc<dyn ArtifactBackend>, max_upload_bytes: usize) -> Self {
        Self {
            backend,
            max_upload_bytes,
        }
    }

    /// Store a document under the canonical form of `hash` (last write wins)
    ///
    /// Returns the key the document was stored under.
    pub async fn put(
        &self,
        hash: &str,
        blob: Vec<u8>,
        mut metadata: MetadataRecord,
    ) -> RegistryResult<String> {
        if !is_hex_hash(hash) {
            return Err(RegistryError::Validation(format!(
                "Document hash must be hexadecimal: {:?}",
                hash
            )));
        }
        if blob.is_empty() {
            return Err(RegistryError::Validation("Document body is empty".to_string()));
        }
        if blob.len() > self.max_upload_bytes {
            return Err(RegistryError::Validation(format!(
                "Document is {} bytes, limit is {}",
                blob.len(),
                self.max_upload_bytes
            )));
        }

        let key = canonical_key(hash);
        metadata.pdf_url = Some(pdf_url(&key));
        let size = blob.len();

        self.backend.put_blob(&key, blob).await?;
        self.write_metadata(&key, &metadata).await?;

        info!("Stored document {} ({} bytes)", key, size);
        Ok(key)
    }

    /// Blob and metadata for a hash
    ///
    /// Metadata is synthesized with status `recovered` when only the blob exists.
    pub async fn get(&self, hash: &str) -> RegistryResult<(Vec<u8>, MetadataRecord)> {
        let key = self
            .locate_blob(hash)
            .await
            .ok_or_else(|| RegistryError::NotFound(format!("Document not found: {}", hash)))?;

        let blob = self
            .backend
            .get_blob(&key)
            .await?
            .ok_or_else(|| RegistryError::NotFound(format!("Document not found: {}", hash)))?;

        let metadata = match self.load_metadata(&key).await {
            Some(metadata) => metadata,
            None => MetadataRecord::recovered(&key, hash),
        };

        Ok((blob, metadata))
    }

    /// Apply `mutator` to an existing metadata record and persist it
    ///
    /// Fails with NotFound when no record exists; annotating never creates a document.
    pub async fn update_metadata<F>(&self, hash: &str, mutator: F) -> RegistryResult<MetadataRecord>
    where
        F: FnOnce(&mut MetadataRecord),
    {
        let key = self.locate_metadata(hash).await.ok_or_else(|| {
            RegistryError::NotFound(format!("Document metadata not found: {}", hash))
        })?;

        let raw = self.backend.get_metadata(&key).await?.ok_or_else(|| {
            RegistryError::NotFound(format!("Document metadata not found: {}", hash))
        })?;
        let mut record = MetadataRecord::from_json(&raw).map_err(|e| {
            RegistryError::Storage(format!("Metadata for {} is unreadable: {}", key, e))
        })?;

        mutator(&mut record);
        self.write_metadata(&key, &record).await?;

        debug!("Updated metadata for {}", key);
        Ok(record)
    }

    /// Replace an existing metadata record wholesale
    pub async fn replace_metadata(
        &self,
        hash: &str,
        record: MetadataRecord,
    ) -> RegistryResult<MetadataRecord> {
        let key = self.locate_metadata(hash).await.ok_or_else(|| {
            RegistryError::NotFound(format!("Document metadata not found: {}", hash))
        })?;

        self.write_metadata(&key, &record).await?;
        Ok(record)
    }

    /// Write a metadata record for a key that holds a blob but no record
    ///
    /// Used to persist synthesized records; the key is taken as-is. An
    /// existing record, readable or not, is never replaced.
    pub async fn create_metadata(&self, key: &str, record: &MetadataRecord) -> RegistryResult<()> {
        if !self.backend.blob_exists(key).await? {
            return Err(RegistryError::NotFound(format!("Document not found: {}", key)));
        }
        if self.backend.metadata_exists(key).await? {
            return Err(RegistryError::Storage(format!(
                "Metadata for {} already exists",
                key
            )));
        }
        self.write_metadata(key, record).await
    }

    /// Parsed metadata for an exact key; unreadable records count as missing
    pub async fn load_metadata(&self, key: &str) -> Option<MetadataRecord> {
        let raw = match self.backend.get_metadata(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read metadata for {}: {}", key, e);
                return None;
            }
        };

        match MetadataRecord::from_json(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Ignoring unreadable metadata for {}: {}", key, e);
                None
            }
        }
    }

    /// Metadata for a hash in any encoding
    pub async fn find_metadata(&self, hash: &str) -> Option<(String, MetadataRecord)> {
        let key = self.locate_metadata(hash).await?;
        let record = self.load_metadata(&key).await?;
        Some((key, record))
    }

    /// Key under which a blob exists for `hash`: exact spelling first, then canonical
    pub async fn locate_blob(&self, hash: &str) -> Option<String> {
        for key in candidate_keys(hash) {
            if self.blob_exists(&key).await {
                return Some(key);
            }
        }
        None
    }

    /// Key under which a metadata record exists for `hash`
    pub async fn locate_metadata(&self, hash: &str) -> Option<String> {
        for key in candidate_keys(hash) {
            if self.metadata_exists(&key).await {
                return Some(key);
            }
        }
        None
    }

    pub async fn blob_exists(&self, key: &str) -> bool {
        match self.backend.blob_exists(key).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!("Failed to check blob {}: {}", key, e);
                false
            }
        }
    }

    pub async fn metadata_exists(&self, key: &str) -> bool {
        match self.backend.metadata_exists(key).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!("Failed to check metadata {}: {}", key, e);
                false
            }
        }
    }

    /// Raw blob for an exact key
    pub async fn get_blob(&self, key: &str) -> RegistryResult<Option<Vec<u8>>> {
        self.backend.get_blob(key).await
    }

    pub async fn list_blob_keys(&self) -> RegistryResult<Vec<String>> {
        self.backend.list_blob_keys().await
    }

    pub async fn list_metadata_keys(&self) -> RegistryResult<Vec<String>> {
        self.backend.list_metadata_keys().await
    }

    /// Every readable metadata record with its key
    pub async fn list_metadata(&self) -> RegistryResult<Vec<(String, MetadataRecord)>> {
        let keys = self.backend.list_metadata_keys().await?;
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(record) = self.load_metadata(&key).await {
                records.push((key, record));
            }
        }
        Ok(records)
    }

    /// Summaries of all stored documents
    pub async fn list_documents(&self) -> RegistryResult<Vec<DocumentSummary>> {
        let keys = self.backend.list_blob_keys().await?;
        let mut documents = Vec::with_capacity(keys.len());
        for key in keys {
            let size = self.backend.blob_size(&key).await?.unwrap_or(0);
            let metadata = self.load_metadata(&key).await;
            documents.push(DocumentSummary {
                size,
                has_metadata: metadata.is_some(),
                doc_id_string: metadata
                    .as_ref()
                    .and_then(|m| m.alias())
                    .unwrap_or_default()
                    .to_string(),
                status: metadata
                    .as_ref()
                    .and_then(|m| m.status)
                    .map(|s| s.as_str().to_string())
                    .unwrap_or_default(),
                hash: key,
            });
        }
        Ok(documents)
    }

    /// Target hash of an alias's proxy record (trimmed, None if blank)
    pub async fn read_proxy(&self, alias: &str) -> RegistryResult<Option<String>> {
        let content = self.backend.get_proxy(alias).await?;
        Ok(content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()))
    }

    /// Raw proxy contents, untrimmed, for inspection endpoints
    pub async fn read_proxy_raw(&self, alias: &str) -> RegistryResult<Option<String>> {
        self.backend.get_proxy(alias).await
    }

    /// Point `alias` at the store key `key`
    pub async fn write_proxy(&self, alias: &str, key: &str) -> RegistryResult<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(RegistryError::Validation(format!(
                "Proxy record for {} needs a target",
                alias
            )));
        }
        self.backend.put_proxy(alias, key).await
    }

    pub async fn list_proxy_aliases(&self) -> RegistryResult<Vec<String>> {
        self.backend.list_proxy_aliases().await
    }

    /// Move a document to a new key and fix its `pdfUrl`
    pub async fn rename_key(&self, from: &str, to: &str) -> RegistryResult<()> {
        if self.blob_exists(to).await || self.metadata_exists(to).await {
            return Err(RegistryError::Storage(format!(
                "Cannot rename {} to {}: target exists",
                from, to
            )));
        }

        self.backend.rename(from, to).await?;

        if let Some(mut record) = self.load_metadata(to).await {
            record.pdf_url = Some(pdf_url(to));
            self.write_metadata(to, &record).await?;
        }

        info!("Renamed document {} -> {}", from, to);
        Ok(())
    }

    async fn write_metadata(&self, key: &str, record: &MetadataRecord) -> RegistryResult<()> {
        let json = serde_json::to_string_pretty(record)?;
        self.backend.put_metadata(key, &json).await
    }
}

/// Exact spelling, then canonical form if different
fn candidate_keys(hash: &str) -> Vec<String> {
    let exact = hash.trim().to_string();
    let canonical = canonical_key(hash);
    if exact == canonical || exact.is_empty() {
        vec![canonical]
    } else {
        vec![exact, canonical]
    }
}
