use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

// REST API for the query pipeline; the UI consumes these endpoints
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::api::health))
        .nest(
            "/api",
            Router::new()
                // Query endpoints
                .route("/nl-query", post(handlers::api::nl_query))
                .route("/query", post(handlers::api::execute_query))
                .route("/correct-sql", post(handlers::api::correct_sql))
                // Schema introspection
                .route("/schema", get(handlers::api::get_schema))
                // System status
                .route("/status", get(handlers::api::system_status)),
        )
}
