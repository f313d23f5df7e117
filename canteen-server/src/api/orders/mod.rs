//! Order API Module
//!
//! All mutations go through the OrderLifecycleManager; list/get/token
//! are read-only repository access.

mod handler;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // Checkout
        .route("/", post(handler::create).get(handler::list))
        // Order detail
        .route("/{id}", get(handler::get_by_id))
        // Admin status transition
        .route("/{id}/status", patch(handler::update_status))
        // Owner cancellation
        .route("/{id}/cancel", post(handler::cancel))
        // Pickup token (presentational)
        .route("/{id}/token", get(handler::token_view))
}
