//! Route tables and the assembled application router.

pub mod common;
pub mod docs;
pub mod entity;

pub use common::common_routes;
pub use docs::docs_routes;
pub use entity::entity_routes;

use crate::state::AppState;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Common, documentation and entity routes with body limit and request tracing.
pub fn app(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .merge(docs_routes())
        .merge(entity_routes(state))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
}
