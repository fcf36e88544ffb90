/// Artifact Storage System
///
/// Holds each document as a binary blob plus a JSON metadata record under its
/// canonical hash, and the per-alias proxy records that point human-readable
/// document IDs at a hash.

pub mod disk;
pub mod models;
pub mod store;

pub use disk::DiskArtifactBackend;
pub use models::*;
pub use store::ArtifactStore;

use crate::error::RegistryResult;
use async_trait::async_trait;

/// Artifact storage backend trait
///
/// Backends deal in raw bytes and strings keyed by already-chosen names;
/// normalization and (de)serialization live in [`ArtifactStore`].
#[async_trait]
pub trait ArtifactBackend: Send + Sync {
    /// Store a blob, replacing any previous one
    async fn put_blob(&self, key: &str, data: Vec<u8>) -> RegistryResult<()>;

    /// Retrieve a blob
    async fn get_blob(&self, key: &str) -> RegistryResult<Option<Vec<u8>>>;

    /// Check if a blob exists
    async fn blob_exists(&self, key: &str) -> RegistryResult<bool>;

    /// Get the size of a blob in bytes
    async fn blob_size(&self, key: &str) -> RegistryResult<Option<u64>>;

    /// Store a serialized metadata record, replacing any previous one
    async fn put_metadata(&self, key: &str, json: &str) -> RegistryResult<()>;

    /// Retrieve a serialized metadata record
    async fn get_metadata(&self, key: &str) -> RegistryResult<Option<String>>;

    /// Check if a metadata record exists
    async fn metadata_exists(&self, key: &str) -> RegistryResult<bool>;

    /// Keys of all stored blobs, sorted
    async fn list_blob_keys(&self) -> RegistryResult<Vec<String>>;

    /// Keys of all stored metadata records, sorted
    async fn list_metadata_keys(&self) -> RegistryResult<Vec<String>>;

    /// Read the proxy record for an alias (raw contents)
    async fn get_proxy(&self, alias: &str) -> RegistryResult<Option<String>>;

    /// Write the proxy record for an alias
    async fn put_proxy(&self, alias: &str, target: &str) -> RegistryResult<()>;

    /// Aliases that have a proxy record, sorted
    async fn list_proxy_aliases(&self) -> RegistryResult<Vec<String>>;

    /// Move blob and metadata from one key to another
    async fn rename(&self, from: &str, to: &str) -> RegistryResult<()>;
}
