//! Notification API Module
//!
//! 进程内通知缓冲的只读视图：尽力而为，重启即失。

use axum::{Json, Router, extract::State, routing::get};

use shared::message::NotificationPayload;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::AppResult;

/// Notification router
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/notifications", get(list_mine))
}

/// GET /api/notifications - 当前用户的通知，最新在前
async fn list_mine(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<NotificationPayload>>> {
    Ok(Json(state.fanout.notifications_for(&user.id)))
}
