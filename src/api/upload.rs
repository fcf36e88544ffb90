/// Upload and annotation endpoints
///
/// Documents arrive in two phases: `upload-unsigned` stores the PDF, then
/// `update-signature` annotates it once the signer has acted. `upload`
/// does both at once.
use crate::{
    artifact_store::{pdf_url, MetadataRecord, SignatureInfo},
    context::AppContext,
    error::{RegistryError, RegistryResult},
    metrics,
};
use axum::{
    body::Bytes,
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Build upload routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/upload-unsigned", post(upload_unsigned))
        .route("/api/upload", post(upload_signed))
        .route("/api/update-signature", post(update_signature))
        .route("/api/update-metadata", post(update_metadata))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedUploadParams {
    pub file_hash: String,
    #[serde(default)]
    pub doc_id_string: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUploadParams {
    pub hash: String,
    pub signature: String,
    pub signer: String,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub doc_id_string: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSignatureRequest {
    pub file_hash: String,
    #[serde(default)]
    pub doc_id_string: Option<String>,
    #[serde(flatten)]
    pub signature: SignatureInfo,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMetadataRequest {
    pub hash: String,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub hash: String,
    pub pdf_url: String,
    pub doc_id_string: String,
    pub status: String,
}

impl UploadResponse {
    fn new(hash: String, record: &MetadataRecord) -> Self {
        Self {
            success: true,
            pdf_url: pdf_url(&hash),
            doc_id_string: record.alias().unwrap_or_default().to_string(),
            status: record
                .status
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            hash,
        }
    }
}

/// Store a PDF that has not been signed yet
async fn upload_unsigned(
    State(ctx): State<AppContext>,
    Query(params): Query<UnsignedUploadParams>,
    body: Bytes,
) -> RegistryResult<Json<UploadResponse>> {
    let doc_id = non_empty(params.doc_id_string);
    let record = MetadataRecord::unsigned(non_empty(params.file_name), doc_id.clone());

    let key = ctx.store.put(&params.file_hash, body.to_vec(), record.clone()).await?;
    index_aliases(&ctx, &key, &params.file_hash, doc_id.as_deref()).await;

    metrics::record_upload("unsigned");
    info!("Unsigned upload stored as {}", key);
    Ok(Json(UploadResponse::new(key, &record)))
}

/// Store a PDF together with its signature
async fn upload_signed(
    State(ctx): State<AppContext>,
    Query(params): Query<SignedUploadParams>,
    body: Bytes,
) -> RegistryResult<Json<UploadResponse>> {
    let doc_id = non_empty(params.doc_id_string);
    let record = MetadataRecord::signed(
        non_empty(params.file_name),
        doc_id.clone(),
        SignatureInfo {
            signature: params.signature,
            signer: params.signer,
            tx_hash: params.tx_hash,
        },
    );

    let key = ctx.store.put(&params.hash, body.to_vec(), record.clone()).await?;
    index_aliases(&ctx, &key, &params.hash, doc_id.as_deref()).await;

    metrics::record_upload("signed");
    info!("Signed upload stored as {}", key);
    Ok(Json(UploadResponse::new(key, &record)))
}

/// Attach a signature to a document stored by `upload-unsigned`
///
/// Never creates a document: 404 when no metadata exists for the hash.
async fn update_signature(
    State(ctx): State<AppContext>,
    Json(req): Json<UpdateSignatureRequest>,
) -> RegistryResult<Json<UploadResponse>> {
    let key = ctx.store.locate_metadata(&req.file_hash).await.ok_or_else(|| {
        RegistryError::NotFound(format!("Document metadata not found: {}", req.file_hash))
    })?;

    let doc_id = non_empty(req.doc_id_string);
    let signature = req.signature;
    let record = ctx
        .store
        .update_metadata(&key, |record| {
            record.attach_signature(signature);
            if record.alias().is_none() {
                record.doc_id_string = doc_id;
            }
        })
        .await?;

    index_aliases(&ctx, &key, &req.file_hash, record.alias()).await;

    metrics::record_upload("signature");
    info!("Signature attached to {}", key);
    Ok(Json(UploadResponse::new(key, &record)))
}

/// Merge fields into an existing metadata record
async fn update_metadata(
    State(ctx): State<AppContext>,
    Json(req): Json<UpdateMetadataRequest>,
) -> RegistryResult<Json<Value>> {
    let (key, record) = ctx.store.find_metadata(&req.hash).await.ok_or_else(|| {
        RegistryError::NotFound(format!("Document metadata not found: {}", req.hash))
    })?;

    let mut merged = serde_json::to_value(&record)?;
    if let Value::Object(fields) = &mut merged {
        fields.extend(req.metadata);
    }
    let merged = MetadataRecord::from_value(merged)
        .map_err(|e| RegistryError::Validation(format!("Invalid metadata: {}", e)))?;

    let merged = ctx.store.replace_metadata(&key, merged).await?;
    if merged.alias() != record.alias() {
        index_aliases(&ctx, &key, &req.hash, merged.alias()).await;
    }

    info!("Metadata updated for {}", key);
    Ok(Json(serde_json::json!({
        "success": true,
        "hash": key,
        "metadata": merged,
    })))
}

/// Make a freshly stored document reachable by every name it arrived with
///
/// The document itself is already stored, so failures here only cost a
/// slower first lookup; they are logged, not returned.
async fn index_aliases(ctx: &AppContext, key: &str, submitted_hash: &str, doc_id: Option<&str>) {
    let mut aliases = vec![key.to_string()];
    let submitted = submitted_hash.trim();
    if submitted != key {
        aliases.push(submitted.to_string());
    }
    if let Some(doc_id) = doc_id {
        aliases.push(doc_id.to_string());
        aliases.push(doc_id.to_lowercase());
    }

    if let Err(e) = ctx.mapping.record(&aliases, key).await {
        warn!("Failed to record mapping for {}: {}", key, e);
    }

    if let Some(doc_id) = doc_id {
        if let Err(e) = ctx.store.write_proxy(doc_id, key).await {
            warn!("Failed to write proxy record {} -> {}: {}", doc_id, key, e);
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
