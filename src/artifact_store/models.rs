/// Artifact storage data models
use crate::error::{RegistryError, RegistryResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle status of a stored document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Stored, waiting for a signature
    Uploaded,
    /// Signature attached
    Signed,
    /// Blob found without metadata; record synthesized on read
    Recovered,
    /// Written by tooling this crate does not know about
    #[serde(other)]
    Unknown,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::Signed => "signed",
            DocumentStatus::Recovered => "recovered",
            DocumentStatus::Unknown => "unknown",
        }
    }
}

/// Per-document metadata record (`{hash}.json`)
///
/// Every field is optional on read: records written by earlier servers
/// miss fields freely. Fields this crate does not model are kept in `extra`
/// and written back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DocumentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<String>,
    /// Ledger block number; older records store it as a number, newer as a string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovered: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Known fields that hold text
const TEXT_FIELDS: &[&str] = &[
    "timestamp",
    "fileName",
    "signature",
    "signer",
    "txHash",
    "pdfUrl",
    "uploadedAt",
    "docIdString",
    "signedAt",
];

impl MetadataRecord {
    /// Parse a stored record, tolerating known fields of the wrong JSON type
    pub fn from_json(raw: &str) -> RegistryResult<Self> {
        Self::from_value(serde_json::from_str(raw)?)
    }

    /// Build a record from a JSON object
    ///
    /// Numbers and booleans in text fields are read as their string form.
    /// Any other mistyped known field moves to `extra`, so it is written back
    /// as found instead of failing the whole record.
    pub fn from_value(value: Value) -> RegistryResult<Self> {
        let Value::Object(mut fields) = value else {
            return Err(RegistryError::Validation(
                "Metadata record must be a JSON object".to_string(),
            ));
        };

        let mut misfits = Map::new();
        for &name in TEXT_FIELDS {
            match fields.remove(name) {
                None => {}
                Some(Value::Number(n)) => {
                    fields.insert(name.to_string(), Value::String(n.to_string()));
                }
                Some(Value::Bool(b)) => {
                    fields.insert(name.to_string(), Value::String(b.to_string()));
                }
                Some(value @ (Value::Array(_) | Value::Object(_))) => {
                    misfits.insert(name.to_string(), value);
                }
                Some(value) => {
                    fields.insert(name.to_string(), value);
                }
            }
        }

        for name in ["status", "recovered"] {
            let Some(value) = fields.remove(name) else {
                continue;
            };
            let fits = match name {
                "status" => matches!(value, Value::String(_) | Value::Null),
                _ => matches!(value, Value::Bool(_) | Value::Null),
            };
            if fits {
                fields.insert(name.to_string(), value);
            } else {
                misfits.insert(name.to_string(), value);
            }
        }

        let mut record: MetadataRecord = serde_json::from_value(Value::Object(fields))?;
        record.extra.extend(misfits);
        Ok(record)
    }

    /// Record for a document uploaded before it is signed
    pub fn unsigned(file_name: Option<String>, doc_id_string: Option<String>) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            timestamp: Some(now.clone()),
            file_name,
            signature: Some(String::new()),
            signer: Some(String::new()),
            uploaded_at: Some(now),
            doc_id_string: Some(doc_id_string.unwrap_or_default()),
            status: Some(DocumentStatus::Uploaded),
            ..Default::default()
        }
    }

    /// Record for a document uploaded together with its signature
    pub fn signed(
        file_name: Option<String>,
        doc_id_string: Option<String>,
        signature: SignatureInfo,
    ) -> Self {
        let mut record = Self::unsigned(file_name, doc_id_string);
        record.attach_signature(signature);
        record
    }

    /// Placeholder for a blob whose metadata file is missing or unreadable
    pub fn recovered(key: &str, alias: &str) -> Self {
        let prefix: String = key.chars().take(8).collect();
        Self {
            timestamp: Some(Utc::now().to_rfc3339()),
            file_name: Some(format!("Document-{}", prefix)),
            pdf_url: Some(pdf_url(key)),
            doc_id_string: Some(alias.to_string()),
            status: Some(DocumentStatus::Recovered),
            recovered: Some(true),
            ..Default::default()
        }
    }

    /// Second phase of the upload flow: annotate with signature details
    pub fn attach_signature(&mut self, signature: SignatureInfo) {
        self.signature = Some(signature.signature);
        self.signer = Some(signature.signer);
        self.tx_hash = Some(signature.tx_hash.unwrap_or_default());
        self.status = Some(DocumentStatus::Signed);
        self.signed_at = Some(Utc::now().to_rfc3339());
    }

    /// Human-readable alias recorded at upload time, if any
    pub fn alias(&self) -> Option<&str> {
        self.doc_id_string
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Signature details supplied by the signing client
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    pub signer: String,
    #[serde(default)]
    pub tx_hash: Option<String>,
}

/// Summary of one stored document, used by listings
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub hash: String,
    pub size: u64,
    pub has_metadata: bool,
    pub doc_id_string: String,
    pub status: String,
}

/// Public URL path of a stored blob
pub fn pdf_url(key: &str) -> String {
    format!("/uploads/{}.pdf", key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_record_parses() {
        // Written by the first signed-upload server: no status, numeric block
        let json = r#"{
            "signature": "0xsig",
            "signer": "0xabc",
            "timestamp": "2025-05-01T10:00:00.000Z",
            "fileName": "contract.pdf",
            "txHash": "",
            "pdfUrl": "/uploads/abc.pdf",
            "blockNumber": 42,
            "docIdString": "testpdf0-mb19fmhd-4qhbd6"
        }"#;
        let record: MetadataRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status, None);
        assert_eq!(record.block_number, Some(Value::from(42)));
        assert_eq!(record.alias(), Some("testpdf0-mb19fmhd-4qhbd6"));
    }

    #[test]
    fn test_unknown_fields_survive_roundtrip() {
        let json = r#"{"fileName":"a.pdf","status":"archived","reviewer":"bob"}"#;
        let record: MetadataRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status, Some(DocumentStatus::Unknown));
        assert_eq!(record.extra.get("reviewer"), Some(&Value::from("bob")));

        let written = serde_json::to_value(&record).unwrap();
        assert_eq!(written["reviewer"], "bob");
    }

    #[test]
    fn test_attach_signature_marks_signed() {
        let mut record = MetadataRecord::unsigned(Some("a.pdf".into()), Some("doc1".into()));
        assert_eq!(record.status, Some(DocumentStatus::Uploaded));
        assert_eq!(record.signature.as_deref(), Some(""));

        record.attach_signature(SignatureInfo {
            signature: "0xsig".into(),
            signer: "0xsigner".into(),
            tx_hash: None,
        });
        assert_eq!(record.status, Some(DocumentStatus::Signed));
        assert_eq!(record.signature.as_deref(), Some("0xsig"));
        assert_eq!(record.tx_hash.as_deref(), Some(""));
        assert!(record.signed_at.is_some());
    }

    #[test]
    fn test_recovered_placeholder() {
        let record = MetadataRecord::recovered("717efd549ed4fbf9", "doc1");
        assert_eq!(record.status, Some(DocumentStatus::Recovered));
        assert_eq!(record.file_name.as_deref(), Some("Document-717efd54"));
        assert_eq!(record.pdf_url.as_deref(), Some("/uploads/717efd549ed4fbf9.pdf"));
        assert_eq!(record.recovered, Some(true));
    }

    #[test]
    fn test_mistyped_fields_are_tolerated() {
        let json = r#"{
            "docIdString": 12345,
            "signature": "0xsig",
            "timestamp": 1700000000,
            "signedAt": {"seconds": 1},
            "status": 3,
            "recovered": "yes"
        }"#;
        let record = MetadataRecord::from_json(json).unwrap();
        assert_eq!(record.alias(), Some("12345"));
        assert_eq!(record.signature.as_deref(), Some("0xsig"));
        assert_eq!(record.timestamp.as_deref(), Some("1700000000"));
        assert_eq!(record.signed_at, None);
        assert_eq!(record.status, None);
        assert_eq!(record.recovered, None);

        // Values that could not be read are written back as found
        let written = serde_json::to_value(&record).unwrap();
        assert_eq!(written["signedAt"]["seconds"], 1);
        assert_eq!(written["status"], 3);
        assert_eq!(written["recovered"], "yes");
    }

    #[test]
    fn test_non_object_record_is_rejected() {
        assert!(MetadataRecord::from_json("[1, 2]").is_err());
        assert!(MetadataRecord::from_json("{not json").is_err());
    }

    #[test]
    fn test_blank_alias_is_none() {
        let record = MetadataRecord::unsigned(None, None);
        assert_eq!(record.alias(), None);
    }
}
