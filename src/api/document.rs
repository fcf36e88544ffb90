/// Document lookup endpoints
use crate::{
    artifact_store::DocumentSummary,
    context::AppContext,
    error::RegistryResult,
    identity::DocumentView,
};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

/// Build document routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/find-document/:alias", get(find_document))
        .route("/api/certificate/:alias", get(certificate))
        .route("/api/tx-hash/:hash", get(tx_hash))
        .route("/api/files", get(list_files))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxHashResponse {
    pub tx_hash: String,
    /// "metadata" when the record carries a transaction hash, "default" otherwise
    pub source: &'static str,
}

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub files: Vec<DocumentSummary>,
    pub count: usize,
}

/// Resolve any alias to its document
async fn find_document(
    State(ctx): State<AppContext>,
    Path(alias): Path<String>,
) -> RegistryResult<Json<DocumentView>> {
    let resolved = ctx.resolver.resolve(&alias).await?;
    Ok(Json(resolved.into_view()))
}

/// Data for the certificate page; same resolution as `find-document`
async fn certificate(
    State(ctx): State<AppContext>,
    Path(alias): Path<String>,
) -> RegistryResult<Json<DocumentView>> {
    let resolved = ctx.resolver.resolve(&alias).await?;
    tracing::debug!(
        alias = %alias,
        hash = %resolved.hash,
        strategy = resolved.resolved_by.as_str(),
        "certificate_resolved"
    );
    Ok(Json(resolved.into_view()))
}

/// Ledger transaction hash recorded for a document
async fn tx_hash(
    State(ctx): State<AppContext>,
    Path(hash): Path<String>,
) -> RegistryResult<Json<TxHashResponse>> {
    let resolved = ctx.resolver.resolve(&hash).await?;

    let response = match resolved.metadata.tx_hash.filter(|tx| !tx.is_empty()) {
        Some(tx_hash) => TxHashResponse {
            tx_hash,
            source: "metadata",
        },
        None => TxHashResponse {
            tx_hash: String::new(),
            source: "default",
        },
    };
    Ok(Json(response))
}

/// Every stored document
async fn list_files(State(ctx): State<AppContext>) -> RegistryResult<Json<FileListResponse>> {
    let files = ctx.store.list_documents().await?;
    Ok(Json(FileListResponse {
        count: files.len(),
        files,
    }))
}
