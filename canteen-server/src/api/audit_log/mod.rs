//! Audit Log API Module

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

/// Audit log router (admin only)
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/audit-logs", get(handler::query))
}
