//! 操作日志类型定义
//!
//! 所有条目只追加，不更新、不删除；读取侧才有数量限制。

use crate::db::models::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// 操作类型（枚举，非自由文本）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // ═══ 订单 ═══
    /// 结账创建订单
    OrderCreated,
    /// 管理端状态变更
    OrderStatusChanged,
    /// 用户取消订单
    OrderCancelled,

    // ═══ 优惠券 ═══
    /// 核销成功（折扣已入账单）
    CouponRedeemed,

    // ═══ 报表 ═══
    /// 日报生成
    ReportGenerated,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// 操作者类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    Student,
    Admin,
    SuperAdmin,
    System,
}

/// 操作日志条目（不可变）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RecordId>,
    /// 时间戳（Unix 毫秒）
    pub timestamp: i64,
    /// 操作类型
    pub action: AuditAction,
    /// 操作人 ID（如 "user:xxx"）
    pub actor: String,
    pub actor_kind: ActorKind,
    /// 资源类型（"order" / "coupon" / "report"）
    pub resource_type: String,
    /// 资源 ID（如 "order:xxx"）
    pub resource_id: String,
    /// 结构化详情（JSON）
    pub details: serde_json::Value,
}

/// 操作日志查询参数
#[derive(Debug, Clone, Deserialize)]
pub struct AuditQuery {
    /// 起始时间（Unix 毫秒，含）
    pub from: Option<i64>,
    /// 截止时间（Unix 毫秒，含）
    pub to: Option<i64>,
    /// 操作类型过滤
    pub action: Option<AuditAction>,
    /// 操作人过滤
    pub actor: Option<String>,
    /// 资源类型过滤
    pub resource_type: Option<String>,
    /// 分页偏移
    #[serde(default)]
    pub offset: i64,
    /// 分页大小（默认 50）
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// 操作日志列表响应
#[derive(Debug, Serialize)]
pub struct AuditListResponse {
    pub items: Vec<AuditEntry>,
    pub total: i64,
}
