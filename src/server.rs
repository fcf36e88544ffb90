/// HTTP server setup and routing
use crate::{
    api::middleware::track_http_metrics,
    context::AppContext,
    error::{RegistryError, RegistryResult},
    metrics,
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Build the main application router
/// Returns Router<()> because state is already provided
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::RANGE, header::IF_NONE_MATCH]);

    let body_limit = ctx.config.service.max_upload_bytes;

    Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(crate::api::routes())
        .fallback(not_found)
        // Provide state - converts Router<AppContext> to Router<()>
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(track_http_metrics))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Prometheus scrape endpoint
async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render_metrics(),
    )
}

/// 404 handler
async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "NotFound",
            "message": "Endpoint not found"
        })),
    )
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> RegistryResult<()> {
    let addr = format!("{}:{}", ctx.config.service.hostname, ctx.config.service.port);

    info!("Document registry listening on {}", addr);
    info!("   Public URL: {}", ctx.service_url());
    info!("   Uploads: {}", ctx.config.storage.uploads_directory.display());
    info!("   Self-heal: {}", ctx.config.resolver.self_heal);

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RegistryError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| RegistryError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
