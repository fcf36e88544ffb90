/// API routes and handlers
pub mod blob;
pub mod document;
pub mod health;
pub mod middleware;
pub mod proxy;
pub mod upload;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(upload::routes())
        .merge(document::routes())
        .merge(proxy::routes())
        .merge(blob::routes())
}
