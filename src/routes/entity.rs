//! Entity CRUD routes. Handlers resolve the entity from the path segment
//! (`agents`, `company`, `customer`, `orders`); unknown segments are 404.

use crate::handlers::entity::{create, delete as delete_handler, list, patch, replace};
use crate::state::AppState;
use axum::{routing::get, routing::put, Router};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/:path_segment", get(list).post(create))
        .route(
            "/:path_segment/:key",
            put(replace).patch(patch).delete(delete_handler),
        )
        .with_state(state)
}
