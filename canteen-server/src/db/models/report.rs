//! Daily Report Model

use serde::{Deserialize, Serialize};

/// Per-status aggregation row (output of the GROUP BY query)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusBucket {
    pub status: String,
    pub count: i64,
    #[serde(default)]
    pub revenue: f64,
    #[serde(default)]
    pub discount: f64,
}

/// Daily report for one business day, optionally scoped to one canteen.
///
/// 只读聚合：gross_revenue 不含已取消/已拒绝的订单，
/// refunded_total 单独列出退款口径。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReport {
    /// "YYYY-MM-DD"
    pub date: String,
    pub canteen: Option<String>,
    pub total_orders: i64,
    pub status_counts: Vec<StatusBucket>,
    pub gross_revenue: f64,
    pub refunded_total: f64,
    pub discount_total: f64,
}
