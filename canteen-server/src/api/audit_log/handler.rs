//! Audit Log API Handlers

use axum::{
    Json,
    extract::{Query, State},
};

use crate::audit::{AuditListResponse, AuditQuery};
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

/// GET /api/audit-logs - 查询操作日志 (管理员)
pub async fn query(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<AuditQuery>,
) -> AppResult<Json<AuditListResponse>> {
    if !user.role.is_admin() {
        return Err(AppError::Forbidden(
            "Audit logs require an admin role".to_string(),
        ));
    }

    let (items, total) = state
        .audit
        .query(&query)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(AuditListResponse { items, total }))
}
