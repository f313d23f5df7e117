//! Daily Report API Handlers

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::audit::AuditAction;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::DailyReport;
use crate::utils::{AppError, AppResult};

/// Query params for the daily report
#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    /// "YYYY-MM-DD"
    pub date: String,
    pub canteen: Option<String>,
}

/// GET /api/reports/daily - 按日聚合订单状态与营收
pub async fn daily(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<DailyQuery>,
) -> AppResult<Json<DailyReport>> {
    if !user.role.is_admin() {
        return Err(AppError::Forbidden(
            "Daily reports require an admin role".to_string(),
        ));
    }

    let report = state
        .lifecycle
        .daily_report(&query.date, query.canteen)
        .await?;

    state.audit.log(
        AuditAction::ReportGenerated,
        &user.id,
        user.role.into(),
        "report",
        format!("daily:{}", report.date),
        serde_json::json!({ "canteen": report.canteen, "total_orders": report.total_orders }),
    );

    Ok(Json(report))
}
