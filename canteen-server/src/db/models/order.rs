//! Order Model
//!
//! 订单是平台的核心实体：创建后只能由生命周期管理器推进状态，
//! 永不物理删除（取消是一种状态，不是删除）。

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

// =============================================================================
// Order Status
// =============================================================================

/// Order status state machine
///
/// `PENDING → COOKING → READY → DELIVERED` is the admin-driven happy path;
/// `CANCELLED` / `REJECTED` are reachable from any pre-`DELIVERED` state.
/// `DELIVERED`, `CANCELLED`, `REJECTED` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Cooking,
    Ready,
    Delivered,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    /// 终态：不允许任何后续状态转移
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }

    /// 该状态对应的 timeline 字段名（每次转移只盖一个时间戳）
    pub fn timeline_field(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending_at",
            OrderStatus::Cooking => "cooking_at",
            OrderStatus::Ready => "ready_at",
            OrderStatus::Delivered => "delivered_at",
            OrderStatus::Cancelled | OrderStatus::Rejected => "cancelled_at",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Cooking => "COOKING",
            OrderStatus::Ready => "READY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment status (payment is simulated: orders are PAID at creation)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
    Failed,
}

// =============================================================================
// Timeline
// =============================================================================

/// Per-order status timeline (Unix millis), append-only.
///
/// 每个字段只在进入对应状态时盖一次时间戳，之后的转移不清除、不改写。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Timeline {
    #[serde(default)]
    pub pending_at: Option<i64>,
    #[serde(default)]
    pub cooking_at: Option<i64>,
    #[serde(default)]
    pub ready_at: Option<i64>,
    #[serde(default)]
    pub delivered_at: Option<i64>,
    #[serde(default)]
    pub cancelled_at: Option<i64>,
}

// =============================================================================
// Order
// =============================================================================

/// Line item snapshot, captured at order creation.
///
/// 菜单后续编辑不会追溯影响历史订单。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    /// 引用的菜单项 ("menu_item:<id>")
    pub menu_item: String,
    pub name: String,
    pub qty: i64,
    pub unit_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RecordId>,
    /// 取餐令牌，唯一且不可变
    pub token_number: String,
    /// 下单用户 (所有者)
    pub user: String,
    /// 所属食堂
    pub canteen: String,
    /// 可选取餐窗口
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter: Option<String>,
    pub items: Vec<OrderLine>,
    pub subtotal: f64,
    pub service_charge: f64,
    pub gst: f64,
    pub discount: f64,
    pub total_amount: f64,
    /// 实际核销的优惠码 (规范化大写，仅折扣生效时记录)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub timeline: Timeline,
    pub created_at: i64,
}

impl Order {
    /// "order:<key>" 字符串 ID（未持久化时为空串）
    pub fn id_string(&self) -> String {
        self.id.as_ref().map(|id| id.to_string()).unwrap_or_default()
    }
}

// =============================================================================
// API Request Types
// =============================================================================

/// One requested cart line (menu item reference + quantity)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineInput {
    pub menu_item: String,
    pub qty: i64,
}

/// Create order payload (checkout)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub canteen: String,
    #[serde(default)]
    pub counter: Option<String>,
    pub items: Vec<OrderLineInput>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// Admin status update payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
}

// =============================================================================
// API Response Types
// =============================================================================

/// Token lookup response (purely presentational)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenView {
    pub order_id: String,
    pub token_number: String,
    /// Renderable pickup code (deep link the kiosk/app turns into a scannable code)
    pub pickup_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Cooking.is_terminal());
        assert!(!OrderStatus::Ready.is_terminal());
    }

    #[test]
    fn test_timeline_field_mapping() {
        assert_eq!(OrderStatus::Cooking.timeline_field(), "cooking_at");
        assert_eq!(OrderStatus::Ready.timeline_field(), "ready_at");
        assert_eq!(OrderStatus::Delivered.timeline_field(), "delivered_at");
        // 取消和拒绝共用 cancelled_at
        assert_eq!(OrderStatus::Cancelled.timeline_field(), "cancelled_at");
        assert_eq!(OrderStatus::Rejected.timeline_field(), "cancelled_at");
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&OrderStatus::Cooking).unwrap();
        assert_eq!(json, "\"COOKING\"");
        let back: OrderStatus = serde_json::from_str("\"READY\"").unwrap();
        assert_eq!(back, OrderStatus::Ready);
    }
}
