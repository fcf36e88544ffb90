/// Alias Mapping Table
///
/// A persisted alias -> document key dictionary. Keys are stored as given
/// (original spelling and lower-cased); values are the keys documents are
/// stored under, which are canonical for everything this service writes.

pub mod file;
pub mod table;

pub use file::FileMappingBackend;
pub use table::MappingTable;

use crate::error::RegistryResult;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// In-memory form of the mapping table
pub type MappingEntries = BTreeMap<String, String>;

/// Persistence for the mapping table
///
/// `save` always overwrites the whole table; merging happens in memory.
#[async_trait]
pub trait MappingBackend: Send + Sync {
    /// Load the persisted table; missing or corrupt storage yields an empty table
    async fn load(&self) -> RegistryResult<MappingEntries>;

    /// Overwrite the persisted table
    async fn save(&self, entries: &MappingEntries) -> RegistryResult<()>;
}
