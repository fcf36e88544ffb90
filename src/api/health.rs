/// Health check endpoints for liveness and readiness probes
///
/// Readiness covers the two things every request depends on: the uploads
/// directory and the mapping table.
use crate::{context::AppContext, error::RegistryResult};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Health status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status: "healthy", "degraded", or "unhealthy"
    pub status: String,

    pub version: String,

    /// Individual component checks
    pub checks: Vec<ComponentHealth>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Health status of individual component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,

    /// Status: "healthy", "degraded", or "unhealthy"
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_basic))
        .route("/health/live", get(liveness_probe))
        .route("/health/ready", get(readiness_probe))
        .route("/health/detailed", get(health_detailed))
}

/// Basic health check
pub async fn health_basic() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Liveness probe: if we can respond, we're alive
pub async fn liveness_probe() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe
///
/// Returns 503 when the uploads directory cannot be listed.
pub async fn readiness_probe(
    State(ctx): State<AppContext>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if let Err(e) = check_storage(&ctx).await {
        tracing::warn!(error = %e, "readiness_probe_failed: storage check failed");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(serde_json::json!({
        "status": "ready",
        "version": env!("CARGO_PKG_VERSION")
    })))
}

/// Detailed health check with all component statuses
pub async fn health_detailed(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthStatus>) {
    let start = Instant::now();

    let checks = vec![
        check_storage_detailed(&ctx).await,
        check_mapping_detailed(&ctx).await,
    ];

    let overall_status = determine_overall_status(&checks);

    let health = HealthStatus {
        status: overall_status.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks,
        message: if overall_status == "healthy" {
            None
        } else {
            Some("One or more components are unhealthy".to_string())
        },
    };

    let status_code = match overall_status.as_str() {
        "healthy" | "degraded" => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    };

    tracing::info!(
        status = %overall_status,
        duration_ms = start.elapsed().as_millis(),
        "health_check_completed"
    );

    (status_code, Json(health))
}

/// Number of stored documents, proving the uploads directory is readable
async fn check_storage(ctx: &AppContext) -> RegistryResult<usize> {
    Ok(ctx.store.list_blob_keys().await?.len())
}

async fn check_storage_detailed(ctx: &AppContext) -> ComponentHealth {
    let start = Instant::now();

    match check_storage(ctx).await {
        Ok(documents) => ComponentHealth {
            name: "artifact_store".to_string(),
            status: "healthy".to_string(),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
            details: Some(serde_json::json!({
                "type": "disk",
                "documents": documents,
            })),
        },
        Err(e) => ComponentHealth {
            name: "artifact_store".to_string(),
            status: "unhealthy".to_string(),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
            error: Some(e.to_string()),
            details: None,
        },
    }
}

/// The mapping table is in memory; an empty table only slows resolution down
async fn check_mapping_detailed(ctx: &AppContext) -> ComponentHealth {
    let start = Instant::now();
    let entries = ctx.mapping.len().await;

    ComponentHealth {
        name: "mapping_table".to_string(),
        status: if entries > 0 { "healthy" } else { "degraded" }.to_string(),
        response_time_ms: Some(start.elapsed().as_millis() as u64),
        error: None,
        details: Some(serde_json::json!({
            "entries": entries,
            "self_heal": ctx.resolver.self_heal(),
        })),
    }
}

/// Determine overall health status from individual checks
fn determine_overall_status(checks: &[ComponentHealth]) -> String {
    let unhealthy_count = checks.iter().filter(|c| c.status == "unhealthy").count();
    let degraded_count = checks.iter().filter(|c| c.status == "degraded").count();

    if unhealthy_count > 0 {
        "unhealthy".to_string()
    } else if degraded_count > 0 {
        "degraded".to_string()
    } else {
        "healthy".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str, status: &str) -> ComponentHealth {
        ComponentHealth {
            name: name.to_string(),
            status: status.to_string(),
            response_time_ms: Some(1),
            error: None,
            details: None,
        }
    }

    #[test]
    fn test_determine_overall_status() {
        assert_eq!(
            determine_overall_status(&[component("store", "healthy"), component("mapping", "healthy")]),
            "healthy"
        );
        assert_eq!(
            determine_overall_status(&[component("store", "healthy"), component("mapping", "degraded")]),
            "degraded"
        );
        assert_eq!(
            determine_overall_status(&[component("store", "unhealthy"), component("mapping", "degraded")]),
            "unhealthy"
        );
    }

    #[test]
    fn test_health_status_serialization() {
        let health = HealthStatus {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
            checks: vec![component("artifact_store", "healthy")],
            message: None,
        };

        let json = serde_json::to_string(&health).unwrap();
        assert!(json.contains("artifact_store"));
        assert!(!json.contains("message"));
    }
}
