/// JSON file persistence for the mapping table
use crate::{
    error::{RegistryError, RegistryResult},
    mapping::{MappingBackend, MappingEntries},
};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// Value written by an old client that serialized an object with string coercion
const COERCED_OBJECT: &str = "[object Object]";

/// Mapping table stored as one pretty-printed JSON object
#[derive(Clone)]
pub struct FileMappingBackend {
    path: PathBuf,
}

impl FileMappingBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse table contents, dropping values that are not plain strings
    ///
    /// Returns the clean entries and whether anything was dropped.
    fn parse(contents: &str) -> Option<(MappingEntries, bool)> {
        let value: Value = match serde_json::from_str(contents) {
            Ok(value) => value,
            Err(e) => {
                warn!("Mapping table is not valid JSON, starting empty: {}", e);
                return None;
            }
        };

        let Value::Object(object) = value else {
            warn!("Mapping table is not a JSON object, starting empty");
            return None;
        };

        let mut entries = MappingEntries::new();
        let mut dropped = false;
        for (key, value) in object {
            match value {
                Value::String(hash) if !hash.is_empty() && hash != COERCED_OBJECT => {
                    entries.insert(key, hash);
                }
                other => {
                    warn!("Dropping invalid mapping entry {}: {}", key, other);
                    dropped = true;
                }
            }
        }

        Some((entries, dropped))
    }
}

#[async_trait]
impl MappingBackend for FileMappingBackend {
    async fn load(&self) -> RegistryResult<MappingEntries> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No mapping table at {}, starting empty", self.path.display());
                return Ok(MappingEntries::new());
            }
            Err(e) => {
                warn!("Failed to read mapping table {}: {}", self.path.display(), e);
                return Ok(MappingEntries::new());
            }
        };

        let Some((entries, dropped)) = Self::parse(&contents) else {
            return Ok(MappingEntries::new());
        };

        if dropped {
            info!("Rewriting mapping table without invalid entries");
            if let Err(e) = self.save(&entries).await {
                warn!("Failed to rewrite cleaned mapping table: {}", e);
            }
        }

        info!("Loaded {} hash mappings", entries.len());
        Ok(entries)
    }

    async fn save(&self, entries: &MappingEntries) -> RegistryResult<()> {
        let json = serde_json::to_string_pretty(entries)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    RegistryError::Mapping(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        let temp_path = self
            .path
            .with_extension(format!("tmp-{}", uuid::Uuid::new_v4()));
        fs::write(&temp_path, json).await.map_err(|e| {
            RegistryError::Mapping(format!("Failed to write {}: {}", temp_path.display(), e))
        })?;

        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(RegistryError::Mapping(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let backend = FileMappingBackend::new(dir.path().join("hash-mapping.json"));

        assert!(backend.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hash-mapping.json");
        std::fs::write(&path, "{ not json").unwrap();

        let backend = FileMappingBackend::new(path);
        assert!(backend.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_string_values_dropped_and_rewritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hash-mapping.json");
        std::fs::write(
            &path,
            r#"{
                "doc1": "abc",
                "doc2": {"hash": "def"},
                "doc3": "[object Object]",
                "doc4": 7
            }"#,
        )
        .unwrap();

        let backend = FileMappingBackend::new(path.clone());
        let entries = backend.load().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries.get("doc1").map(String::as_str), Some("abc"));

        // The file itself no longer carries the bad entries
        let rewritten: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(rewritten, serde_json::json!({"doc1": "abc"}));
    }

    #[tokio::test]
    async fn test_save_overwrites_whole_table() {
        let dir = tempdir().unwrap();
        let backend = FileMappingBackend::new(dir.path().join("nested").join("hash-mapping.json"));

        let mut entries = MappingEntries::new();
        entries.insert("doc1".into(), "abc".into());
        entries.insert("doc2".into(), "def".into());
        backend.save(&entries).await.unwrap();

        entries.remove("doc2");
        backend.save(&entries).await.unwrap();

        let loaded = backend.load().await.unwrap();
        assert_eq!(loaded, entries);
    }
}
