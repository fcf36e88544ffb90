/// Disk-based artifact storage backend
use crate::{
    artifact_store::ArtifactBackend,
    error::{RegistryError, RegistryResult},
    identity::normalize::is_safe_name,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

const BLOB_EXT: &str = "pdf";
const METADATA_EXT: &str = "json";
const PROXY_EXT: &str = "txt";
const TEMP_PREFIX: &str = "temp_";

/// Disk storage backend
///
/// Everything lives flat in one uploads directory:
/// `{key}.pdf`, `{key}.json` and `{alias}.txt`. Writes go to a `temp_*`
/// file first and are renamed into place.
#[derive(Clone)]
pub struct DiskArtifactBackend {
    base_path: PathBuf,
}

impl DiskArtifactBackend {
    /// Create a new disk storage backend
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path for `{name}.{ext}`, or None if the name can't be a file stem
    fn path_for(&self, name: &str, ext: &str) -> Option<PathBuf> {
        if !is_safe_name(name) {
            return None;
        }
        Some(self.base_path.join(format!("{}.{}", name, ext)))
    }

    fn require_path(&self, name: &str, ext: &str) -> RegistryResult<PathBuf> {
        self.path_for(name, ext).ok_or_else(|| {
            RegistryError::Validation(format!("Unusable storage name: {:?}", name))
        })
    }

    /// Write through a temp file so readers never see a half-written file
    async fn write_atomic(&self, path: &Path, data: &[u8]) -> RegistryResult<()> {
        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            RegistryError::Storage(format!("Failed to create uploads directory: {}", e))
        })?;

        let temp_path = self
            .base_path
            .join(format!("{}{}", TEMP_PREFIX, uuid::Uuid::new_v4()));
        fs::write(&temp_path, data).await.map_err(|e| {
            RegistryError::Storage(format!("Failed to write {}: {}", temp_path.display(), e))
        })?;

        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(RegistryError::Storage(format!(
                "Failed to move into {}: {}",
                path.display(),
                e
            )));
        }

        Ok(())
    }

    async fn read_optional(&self, path: Option<PathBuf>) -> RegistryResult<Option<Vec<u8>>> {
        let Some(path) = path else {
            return Ok(None);
        };

        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RegistryError::Storage(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn is_file(&self, path: Option<PathBuf>) -> bool {
        match path {
            Some(path) => fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            None => false,
        }
    }

    /// Sorted stems of all files with the given extension
    async fn list_stems(&self, ext: &str) -> RegistryResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(RegistryError::Storage(format!(
                    "Failed to list uploads directory: {}",
                    e
                )))
            }
        };

        let suffix = format!(".{}", ext);
        let mut stems = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if name.starts_with(TEMP_PREFIX) {
                continue;
            }
            if let Some(stem) = name.strip_suffix(&suffix) {
                if !stem.is_empty() {
                    stems.push(stem.to_string());
                }
            }
        }

        stems.sort();
        Ok(stems)
    }
}

#[async_trait]
impl ArtifactBackend for DiskArtifactBackend {
    async fn put_blob(&self, key: &str, data: Vec<u8>) -> RegistryResult<()> {
        let path = self.require_path(key, BLOB_EXT)?;
        self.write_atomic(&path, &data).await
    }

    async fn get_blob(&self, key: &str) -> RegistryResult<Option<Vec<u8>>> {
        self.read_optional(self.path_for(key, BLOB_EXT)).await
    }

    async fn blob_exists(&self, key: &str) -> RegistryResult<bool> {
        Ok(self.is_file(self.path_for(key, BLOB_EXT)).await)
    }

    async fn blob_size(&self, key: &str) -> RegistryResult<Option<u64>> {
        let Some(path) = self.path_for(key, BLOB_EXT) else {
            return Ok(None);
        };

        match fs::metadata(&path).await {
            Ok(metadata) => Ok(Some(metadata.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RegistryError::Storage(format!(
                "Failed to get blob size {}: {}",
                key, e
            ))),
        }
    }

    async fn put_metadata(&self, key: &str, json: &str) -> RegistryResult<()> {
        let path = self.require_path(key, METADATA_EXT)?;
        self.write_atomic(&path, json.as_bytes()).await
    }

    async fn get_metadata(&self, key: &str) -> RegistryResult<Option<String>> {
        let data = self.read_optional(self.path_for(key, METADATA_EXT)).await?;
        Ok(data.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    async fn metadata_exists(&self, key: &str) -> RegistryResult<bool> {
        Ok(self.is_file(self.path_for(key, METADATA_EXT)).await)
    }

    async fn list_blob_keys(&self) -> RegistryResult<Vec<String>> {
        self.list_stems(BLOB_EXT).await
    }

    async fn list_metadata_keys(&self) -> RegistryResult<Vec<String>> {
        self.list_stems(METADATA_EXT).await
    }

    async fn get_proxy(&self, alias: &str) -> RegistryResult<Option<String>> {
        let data = self.read_optional(self.path_for(alias, PROXY_EXT)).await?;
        Ok(data.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    async fn put_proxy(&self, alias: &str, target: &str) -> RegistryResult<()> {
        let path = self.require_path(alias, PROXY_EXT)?;
        self.write_atomic(&path, target.as_bytes()).await
    }

    async fn list_proxy_aliases(&self) -> RegistryResult<Vec<String>> {
        self.list_stems(PROXY_EXT).await
    }

    async fn rename(&self, from: &str, to: &str) -> RegistryResult<()> {
        for ext in [BLOB_EXT, METADATA_EXT] {
            let source = self.require_path(from, ext)?;
            let target = self.require_path(to, ext)?;
            match fs::rename(&source, &target).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(RegistryError::Storage(format!(
                        "Failed to rename {} to {}: {}",
                        source.display(),
                        target.display(),
                        e
                    )))
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_and_get_blob() {
        let dir = tempdir().unwrap();
        let backend = DiskArtifactBackend::new(dir.path().to_path_buf());

        let data = b"%PDF-1.7 test".to_vec();
        backend.put_blob("abc123", data.clone()).await.unwrap();

        assert_eq!(backend.get_blob("abc123").await.unwrap(), Some(data));
        assert!(dir.path().join("abc123.pdf").exists());
    }

    #[tokio::test]
    async fn test_get_nonexistent_blob() {
        let dir = tempdir().unwrap();
        let backend = DiskArtifactBackend::new(dir.path().to_path_buf());

        assert_eq!(backend.get_blob("nonexistent").await.unwrap(), None);
        assert!(!backend.blob_exists("nonexistent").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_replaces_previous_blob() {
        let dir = tempdir().unwrap();
        let backend = DiskArtifactBackend::new(dir.path().to_path_buf());

        backend.put_blob("abc", b"first".to_vec()).await.unwrap();
        backend.put_blob("abc", b"second".to_vec()).await.unwrap();

        assert_eq!(backend.get_blob("abc").await.unwrap(), Some(b"second".to_vec()));
        assert_eq!(backend.blob_size("abc").await.unwrap(), Some(6));
    }

    #[tokio::test]
    async fn test_listings_skip_temp_and_other_extensions() {
        let dir = tempdir().unwrap();
        let backend = DiskArtifactBackend::new(dir.path().to_path_buf());

        backend.put_blob("bbb", b"b".to_vec()).await.unwrap();
        backend.put_blob("aaa", b"a".to_vec()).await.unwrap();
        backend.put_metadata("aaa", "{}").await.unwrap();
        backend.put_proxy("doc1", "aaa").await.unwrap();
        std::fs::write(dir.path().join("temp_upload.pdf"), b"partial").unwrap();

        assert_eq!(backend.list_blob_keys().await.unwrap(), vec!["aaa", "bbb"]);
        assert_eq!(backend.list_metadata_keys().await.unwrap(), vec!["aaa"]);
        assert_eq!(backend.list_proxy_aliases().await.unwrap(), vec!["doc1"]);
    }

    #[tokio::test]
    async fn test_listing_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let backend = DiskArtifactBackend::new(dir.path().join("not-created-yet"));

        assert!(backend.list_blob_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsafe_names() {
        let dir = tempdir().unwrap();
        let backend = DiskArtifactBackend::new(dir.path().to_path_buf());

        // Reads treat traversal attempts as absent, writes reject them
        assert_eq!(backend.get_proxy("../secret").await.unwrap(), None);
        assert!(backend.put_proxy("../secret", "abc").await.is_err());
        assert!(backend.put_blob("", b"x".to_vec()).await.is_err());
    }

    #[tokio::test]
    async fn test_rename_moves_blob_and_metadata() {
        let dir = tempdir().unwrap();
        let backend = DiskArtifactBackend::new(dir.path().to_path_buf());

        backend.put_blob("0xABC", b"pdf".to_vec()).await.unwrap();
        backend.put_metadata("0xABC", "{}").await.unwrap();

        backend.rename("0xABC", "abc").await.unwrap();

        assert!(backend.blob_exists("abc").await.unwrap());
        assert!(backend.metadata_exists("abc").await.unwrap());
        assert!(!backend.blob_exists("0xABC").await.unwrap());
    }
}
