/// Document Registry
///
/// Stores signed PDFs and their metadata by content hash, and resolves any
/// name a document goes by (hash in any encoding, human-readable document ID,
/// or a fragment of either) to the stored document.

pub mod api;
pub mod artifact_store;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod jobs;
pub mod mapping;
pub mod metrics;
pub mod repair;
pub mod server;

pub use context::AppContext;
pub use error::{RegistryError, RegistryResult};
