//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    decrement_handler, delete_handler, flush_handler, get_handler, get_many_handler,
    health_handler, increment_handler, replace_handler, set_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /set` - Store a value under a new key
/// - `PUT /replace` - Overwrite the value of a key
/// - `GET /get/:key` - Retrieve a value by key
/// - `POST /get` - Retrieve several keys at once
/// - `DELETE /del/:key` - Delete a key, optionally after a timeout
/// - `POST /incr/:key` / `POST /decr/:key` - Adjust an integer counter
/// - `POST /flush` - Remove every entry
/// - `GET /stats` - Get cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/set", put(set_handler))
        .route("/replace", put(replace_handler))
        .route("/get", post(get_many_handler))
        .route("/get/:key", get(get_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/incr/:key", post(increment_handler))
        .route("/decr/:key", post(decrement_handler))
        .route("/flush", post(flush_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
