/// Proxy record inspection and redirect endpoints
use crate::{
    artifact_store::pdf_url,
    context::AppContext,
    error::{RegistryError, RegistryResult},
};
use axum::{
    extract::{Path, State},
    response::Redirect,
    routing::get,
    Json, Router,
};
use serde::Serialize;

/// Build proxy routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/proxy-view/:docid", get(proxy_view))
        .route("/api/proxy/:docid", get(proxy_redirect))
        .route("/certificate/:alias", get(qr_redirect))
}

/// What a proxy record says and whether its target is still there
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyView {
    pub doc_id: String,
    pub proxy_exists: bool,
    /// Untrimmed file contents
    pub proxy_content: String,
    pub pdf_exists: bool,
    pub meta_exists: bool,
    pub pdf_path: String,
    pub meta_path: String,
}

async fn proxy_view(
    State(ctx): State<AppContext>,
    Path(doc_id): Path<String>,
) -> RegistryResult<Json<ProxyView>> {
    let content = ctx
        .store
        .read_proxy_raw(&doc_id)
        .await?
        .ok_or_else(|| RegistryError::NotFound(format!("No proxy record for {}", doc_id)))?;

    let target = content.trim().to_string();
    let pdf_exists = !target.is_empty() && ctx.store.locate_blob(&target).await.is_some();
    let meta_exists = !target.is_empty() && ctx.store.locate_metadata(&target).await.is_some();

    Ok(Json(ProxyView {
        proxy_exists: true,
        pdf_path: pdf_url(&target),
        meta_path: format!("/uploads/{}.json", target),
        proxy_content: content,
        pdf_exists,
        meta_exists,
        doc_id,
    }))
}

/// Follow a proxy record straight to the PDF
async fn proxy_redirect(
    State(ctx): State<AppContext>,
    Path(doc_id): Path<String>,
) -> RegistryResult<Redirect> {
    let target = ctx
        .store
        .read_proxy(&doc_id)
        .await?
        .ok_or_else(|| RegistryError::NotFound(format!("No proxy record for {}", doc_id)))?;

    let key = ctx.store.locate_blob(&target).await.ok_or_else(|| {
        RegistryError::NotFound(format!("Proxy record {} points at a missing document", doc_id))
    })?;

    Ok(Redirect::to(&pdf_url(&key)))
}

/// Entry point printed in certificate QR codes: resolve, then hand out the PDF
async fn qr_redirect(
    State(ctx): State<AppContext>,
    Path(alias): Path<String>,
) -> RegistryResult<Redirect> {
    let resolved = ctx.resolver.resolve(&alias).await?;
    tracing::info!(
        alias = %alias,
        hash = %resolved.hash,
        strategy = resolved.resolved_by.as_str(),
        "qr_redirect"
    );
    Ok(Redirect::to(&pdf_url(&resolved.hash)))
}
