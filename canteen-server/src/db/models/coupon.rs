//! Coupon Model
//!
//! 优惠券记录由外部 CRUD 模块维护；本核心只拥有下单时的
//! 有效性判定和原子核销计数。

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Discount kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CouponKind {
    /// 按小计百分比折扣
    Percentage,
    /// 固定金额折扣
    Flat,
}

/// Coupon entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RecordId>,
    /// 规范化大写的唯一码
    pub code: String,
    pub kind: CouponKind,
    pub value: f64,
    /// 折扣上限（percentage 券常用）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_discount: Option<f64>,
    /// 总核销上限，NONE = 不限
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<i64>,
    /// 已核销次数，单调递增，受 usage_limit 约束
    #[serde(default)]
    pub usage_count: i64,
    /// 生效时间（Unix 毫秒，含）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<i64>,
    /// 过期时间（Unix 毫秒，含）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default = "super::serde_helpers::default_true", deserialize_with = "serde_helpers::bool_true")]
    pub is_active: bool,
    /// 食堂范围限定，NONE = 全平台可用
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canteen: Option<String>,
}

/// Create coupon payload (seeding and tests; CRUD proper is a collaborator concern)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponCreate {
    pub code: String,
    pub kind: CouponKind,
    pub value: f64,
    #[serde(default)]
    pub max_discount: Option<f64>,
    #[serde(default)]
    pub usage_limit: Option<i64>,
    #[serde(default)]
    pub starts_at: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub canteen: Option<String>,
}
