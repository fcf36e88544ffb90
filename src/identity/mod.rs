/// Document Identity Resolution
///
/// Maps the many names a document goes by (upload hash in any encoding,
/// human-readable `docIdString`, fragments of either) to the key it is
/// stored under.

pub mod normalize;
pub mod resolver;
pub mod strategy;

pub use resolver::DocumentResolver;

use crate::artifact_store::{DocumentStatus, MetadataRecord};
use serde::Serialize;
use serde_json::Value;

/// Which pipeline step produced a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    MappingLookup,
    ProxyRecord,
    MetadataScan,
    DirectProbe,
    PartialMatch,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::MappingLookup => "mapping_lookup",
            StrategyKind::ProxyRecord => "proxy_record",
            StrategyKind::MetadataScan => "metadata_scan",
            StrategyKind::DirectProbe => "direct_probe",
            StrategyKind::PartialMatch => "partial_match",
        }
    }
}

/// Outcome of a successful resolution
#[derive(Debug, Clone)]
pub struct ResolvedDocument {
    /// Key the blob is stored under
    pub hash: String,
    pub metadata: MetadataRecord,
    pub resolved_by: StrategyKind,
    /// True when `metadata` was synthesized because the record was missing
    pub synthesized: bool,
}

impl ResolvedDocument {
    pub fn into_view(self) -> DocumentView {
        DocumentView::from(self)
    }
}

/// Resolution result as served to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    pub hash: String,
    pub pdf_url: String,
    pub signature: String,
    pub signer: String,
    pub timestamp: String,
    pub file_name: String,
    pub tx_hash: String,
    pub doc_id_string: String,
    pub status: String,
    pub signed_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<Value>,
    pub recovered: bool,
    pub resolved_by: StrategyKind,
}

impl From<ResolvedDocument> for DocumentView {
    fn from(resolved: ResolvedDocument) -> Self {
        let ResolvedDocument {
            hash,
            metadata,
            resolved_by,
            ..
        } = resolved;

        // Records without a status predate it and were only written on signed upload
        let status = metadata.status.unwrap_or(DocumentStatus::Signed);

        Self {
            pdf_url: metadata
                .pdf_url
                .unwrap_or_else(|| crate::artifact_store::pdf_url(&hash)),
            signature: metadata.signature.unwrap_or_default(),
            signer: metadata.signer.unwrap_or_default(),
            timestamp: metadata.timestamp.unwrap_or_default(),
            file_name: metadata.file_name.unwrap_or_default(),
            tx_hash: metadata.tx_hash.unwrap_or_default(),
            doc_id_string: metadata.doc_id_string.unwrap_or_default(),
            status: status.as_str().to_string(),
            signed_at: metadata.signed_at.unwrap_or_default(),
            block_number: metadata.block_number,
            recovered: metadata.recovered.unwrap_or(false),
            resolved_by,
            hash,
        }
    }
}
