//! Daily Report API Module

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

/// Report router
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/reports/daily", get(handler::daily))
}
