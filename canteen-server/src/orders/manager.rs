//! OrderLifecycleManager - order creation, status transitions, cancellation
//!
//! This module owns every order mutation:
//! - Cart validation and menu snapshotting
//! - Coupon validation + atomic redemption (silent fallback on failure)
//! - Bill computation and token issuance (one retry on collision)
//! - Guarded status transitions (per-order serialization at the store)
//! - Event fan-out and audit entries, always derived from the row the
//!   store actually persisted
//!
//! # Checkout Flow
//!
//! ```text
//! create_order(user, req)
//!     ├─ 1. Validate cart (non-empty, canteen set, qty ≥ 1)
//!     ├─ 2. Resolve + snapshot menu items (name/price/image)
//!     ├─ 3. Coupon: validate → atomic redeem → terms (or silently none)
//!     ├─ 4. calculate_bill
//!     ├─ 5. issue_token, persist (retry once on token collision)
//!     ├─ 6. Publish order_created to user + canteen topics
//!     └─ 7. Audit entry (fire-and-forget)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use shared::message::{LifecycleEvent, NotificationPayload, OrderEventKind, Topic};
use shared::util::now_millis;

use crate::audit::{AuditAction, AuditService};
use crate::auth::CurrentUser;
use crate::billing::{self, Bill, BillLine, CouponTerms};
use crate::coupons;
use crate::db::models::{
    Coupon, CreateOrderRequest, DailyReport, Order, OrderLine, OrderStatus, PaymentStatus,
    Timeline, UpdateStatusRequest,
};
use crate::db::repository::{CouponRepository, MenuItemRepository, OrderRepository, RepoError};
use crate::notify::FanoutService;
use crate::utils::{AppError, AppResult};
use super::token::issue_token;

const RESOURCE_ORDER: &str = "order";

pub struct OrderLifecycleManager {
    orders: OrderRepository,
    menu_items: MenuItemRepository,
    coupons: CouponRepository,
    fanout: FanoutService,
    audit: Arc<AuditService>,
}

impl std::fmt::Debug for OrderLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderLifecycleManager").finish_non_exhaustive()
    }
}

impl OrderLifecycleManager {
    pub fn new(db: Surreal<Db>, fanout: FanoutService, audit: Arc<AuditService>) -> Self {
        Self {
            orders: OrderRepository::new(db.clone()),
            menu_items: MenuItemRepository::new(db.clone()),
            coupons: CouponRepository::new(db),
            fanout,
            audit,
        }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Checkout: turn a cart into a priced, token-identified order.
    pub async fn create_order(
        &self,
        actor: &CurrentUser,
        req: CreateOrderRequest,
    ) -> AppResult<Order> {
        if req.canteen.trim().is_empty() {
            return Err(AppError::Validation("Canteen is required".to_string()));
        }
        if req.items.is_empty() {
            return Err(AppError::Validation("Cart is empty".to_string()));
        }
        for line in &req.items {
            if line.qty < 1 {
                return Err(AppError::Validation(format!(
                    "Quantity must be at least 1 for {}",
                    line.menu_item
                )));
            }
        }

        let lines = self.snapshot_lines(&req).await?;

        // 优惠码无效时静默放弃折扣，订单照常创建（产品行为，不是缺陷）
        let now = now_millis();
        let redeemed = match &req.coupon_code {
            Some(code) if !code.trim().is_empty() => {
                self.try_redeem_coupon(code, &req.canteen, now).await?
            }
            _ => None,
        };
        let terms = redeemed.as_ref().map(CouponTerms::from);

        let bill_lines: Vec<BillLine> = lines
            .iter()
            .map(|l| BillLine {
                unit_price: l.unit_price,
                qty: l.qty,
            })
            .collect();
        let bill = billing::calculate_bill(&bill_lines, terms);

        let order = self
            .persist_with_token_retry(actor, &req, lines, &bill, redeemed.as_ref(), now)
            .await?;

        let order_id = order.id_string();
        let event = LifecycleEvent::new(
            OrderEventKind::OrderCreated,
            &order_id,
            order.status.as_str(),
            &order.token_number,
            vec![Topic::user(&order.user), Topic::canteen(&order.canteen)],
        )
        .with_data(&order);
        self.fanout.publish(event);

        self.fanout.push_notification(NotificationPayload::info(
            &order.user,
            "Order placed",
            format!("Your order is confirmed. Pickup token {}.", order.token_number),
            Some(order_id.clone()),
        ));

        self.audit.log(
            AuditAction::OrderCreated,
            &actor.id,
            actor.role.into(),
            RESOURCE_ORDER,
            &order_id,
            serde_json::json!({
                "token_number": order.token_number,
                "canteen": order.canteen,
                "total_amount": order.total_amount,
                "coupon_code": order.coupon_code,
            }),
        );
        if let Some(coupon) = &redeemed {
            self.audit.log(
                AuditAction::CouponRedeemed,
                &actor.id,
                actor.role.into(),
                "coupon",
                coupon.id.as_ref().map(|id| id.to_string()).unwrap_or_default(),
                serde_json::json!({ "code": coupon.code, "order": order_id }),
            );
        }

        Ok(order)
    }

    /// Resolve every referenced menu item and capture the immutable snapshot.
    async fn snapshot_lines(&self, req: &CreateOrderRequest) -> AppResult<Vec<OrderLine>> {
        let ids: Vec<String> = req.items.iter().map(|l| l.menu_item.clone()).collect();
        let found = self.menu_items.find_by_ids(&ids).await?;
        let by_id: HashMap<String, _> = found
            .into_iter()
            .filter_map(|item| item.id.clone().map(|id| (id.to_string(), item)))
            .collect();

        let mut lines = Vec::with_capacity(req.items.len());
        for input in &req.items {
            let key = if input.menu_item.contains(':') {
                input.menu_item.clone()
            } else {
                format!("menu_item:{}", input.menu_item)
            };
            let item = by_id.get(&key).ok_or_else(|| {
                AppError::NotFound(format!("Menu item {} not found", input.menu_item))
            })?;
            if !item.is_available {
                return Err(AppError::Validation(format!(
                    "Menu item {} is currently unavailable",
                    item.name
                )));
            }
            lines.push(OrderLine {
                menu_item: key,
                name: item.name.clone(),
                qty: input.qty,
                unit_price: item.price,
                image: item.image.clone(),
            });
        }
        Ok(lines)
    }

    /// Validate and atomically redeem a coupon code.
    ///
    /// Returns the post-increment coupon when the discount applies.
    /// Any rejection (unknown code, window, scope, usage bound, lost
    /// race) yields `None` — checkout proceeds without the discount.
    async fn try_redeem_coupon(
        &self,
        code: &str,
        canteen: &str,
        now: i64,
    ) -> AppResult<Option<Coupon>> {
        let Some(coupon) = self.coupons.find_by_code(code).await? else {
            tracing::debug!(code = %code, "Coupon code not found, proceeding without discount");
            return Ok(None);
        };

        let verdict = coupons::validity(&coupon, canteen, now);
        if !verdict.is_valid() {
            tracing::debug!(code = %coupon.code, ?verdict, "Coupon rejected, proceeding without discount");
            return Ok(None);
        }

        let Some(id) = coupon.id.clone() else {
            return Ok(None);
        };
        // 守卫递增：并发兑换下最后 usage_limit 个名额之外的请求在这里落空
        match self.coupons.redeem(&id).await? {
            Some(updated) => Ok(Some(updated)),
            None => {
                tracing::debug!(code = %coupon.code, "Coupon usage exhausted under race, proceeding without discount");
                Ok(None)
            }
        }
    }

    /// Persist the order; one retry with fresh randomness on token collision.
    async fn persist_with_token_retry(
        &self,
        actor: &CurrentUser,
        req: &CreateOrderRequest,
        lines: Vec<OrderLine>,
        bill: &Bill,
        redeemed: Option<&Coupon>,
        now: i64,
    ) -> AppResult<Order> {
        let mut token = issue_token();
        for attempt in 0..2 {
            let order = Order {
                id: None,
                token_number: token.clone(),
                user: actor.id.clone(),
                canteen: req.canteen.clone(),
                counter: req.counter.clone(),
                items: lines.clone(),
                subtotal: bill.subtotal,
                service_charge: bill.service_charge,
                gst: bill.gst,
                discount: bill.discount,
                total_amount: bill.total,
                coupon_code: redeemed.map(|c| c.code.clone()),
                status: OrderStatus::Pending,
                // 支付为模拟：创建即已支付
                payment_status: PaymentStatus::Paid,
                timeline: Timeline {
                    pending_at: Some(now),
                    ..Timeline::default()
                },
                created_at: now,
            };

            match self.orders.create(order).await {
                Ok(created) => return Ok(created),
                Err(RepoError::Duplicate(msg)) if attempt == 0 => {
                    tracing::warn!(token = %token, error = %msg, "Pickup token collision, retrying with fresh token");
                    token = issue_token();
                }
                Err(RepoError::Duplicate(_)) => {
                    return Err(AppError::Conflict(
                        "Could not allocate a unique pickup token, please retry".to_string(),
                    ));
                }
                Err(e) => return Err(e.into()),
            }
        }
        unreachable!("token retry loop returns on every branch")
    }

    // =========================================================================
    // Admin status transition
    // =========================================================================

    /// Admin-driven status transition.
    ///
    /// The transition itself is one guarded update at the store: two admins
    /// racing on the same order both go through, last write wins, but each
    /// request's side effects describe the row its own update returned.
    pub async fn update_status(
        &self,
        actor: &CurrentUser,
        id: &str,
        req: UpdateStatusRequest,
    ) -> AppResult<Order> {
        if !actor.role.is_admin() {
            return Err(AppError::Forbidden(
                "Order status updates require an admin role".to_string(),
            ));
        }
        if req.status == OrderStatus::Pending {
            return Err(AppError::Validation(
                "PENDING is not a valid target status".to_string(),
            ));
        }

        let now = now_millis();
        let updated = self
            .orders
            .update_status_guarded(id, req.status, req.payment_status, now)
            .await?;

        let order = match updated {
            Some(order) => order,
            // 守卫没放行：要么订单不存在，要么已处于终态
            None => {
                return match self.orders.find_by_id(id).await? {
                    None => Err(AppError::NotFound(format!("Order {} not found", id))),
                    Some(existing) => Err(AppError::BusinessRule(format!(
                        "Order in terminal state {} cannot transition",
                        existing.status
                    ))),
                };
            }
        };

        let order_id = order.id_string();
        let event = LifecycleEvent::new(
            OrderEventKind::StatusChanged,
            &order_id,
            order.status.as_str(),
            &order.token_number,
            vec![Topic::order(&order_id), Topic::canteen(&order.canteen)],
        )
        .with_data(&order);
        self.fanout.publish(event);

        if order.status == OrderStatus::Ready {
            self.fanout.push_notification(NotificationPayload::info(
                &order.user,
                "Order ready for pickup",
                format!("Your order is ready. Show token {} at the counter.", order.token_number),
                Some(order_id.clone()),
            ));
        }

        self.audit.log(
            AuditAction::OrderStatusChanged,
            &actor.id,
            actor.role.into(),
            RESOURCE_ORDER,
            &order_id,
            serde_json::json!({
                "status": order.status.as_str(),
                "payment_status": req.payment_status,
            }),
        );

        Ok(order)
    }

    // =========================================================================
    // User cancellation
    // =========================================================================

    /// Owner-only cancellation, allowed while status ∈ {PENDING, COOKING}.
    ///
    /// Sets `CANCELLED` + `REFUNDED` in one guarded update; the follow-up
    /// read only serves to tell 404 / not-owner / window-closed apart.
    pub async fn cancel_order(&self, actor: &CurrentUser, id: &str) -> AppResult<Order> {
        let now = now_millis();
        let cancelled = self.orders.cancel_guarded(id, &actor.id, now).await?;

        let order = match cancelled {
            Some(order) => order,
            None => {
                return match self.orders.find_by_id(id).await? {
                    None => Err(AppError::NotFound(format!("Order {} not found", id))),
                    Some(existing) if existing.user != actor.id => Err(AppError::Forbidden(
                        "Only the order owner may cancel".to_string(),
                    )),
                    Some(existing) => Err(AppError::Validation(format!(
                        "Order can no longer be cancelled (status {})",
                        existing.status
                    ))),
                };
            }
        };

        let order_id = order.id_string();
        let event = LifecycleEvent::new(
            OrderEventKind::OrderCancelled,
            &order_id,
            order.status.as_str(),
            &order.token_number,
            vec![Topic::order(&order_id), Topic::canteen(&order.canteen)],
        )
        .with_data(&order);
        self.fanout.publish(event);

        self.audit.log(
            AuditAction::OrderCancelled,
            &actor.id,
            actor.role.into(),
            RESOURCE_ORDER,
            &order_id,
            serde_json::json!({ "refunded": true }),
        );

        Ok(order)
    }

    // =========================================================================
    // Read side
    // =========================================================================

    /// Daily report: per-status counts + revenue totals for one business day.
    ///
    /// 口径：gross_revenue 不含已取消/已拒绝订单；refunded_total 单列。
    pub async fn daily_report(
        &self,
        date: &str,
        canteen: Option<String>,
    ) -> AppResult<DailyReport> {
        let day = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| AppError::Validation(format!("Invalid date: {} (expected YYYY-MM-DD)", date)))?;
        let from_ms = day
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or_default();
        let to_ms = from_ms + 24 * 60 * 60 * 1000;

        let buckets = self
            .orders
            .aggregate_by_status(from_ms, to_ms, canteen.clone())
            .await?;

        let mut total_orders = 0;
        let mut gross_revenue = rust_decimal::Decimal::ZERO;
        let mut refunded_total = rust_decimal::Decimal::ZERO;
        let mut discount_total = rust_decimal::Decimal::ZERO;
        for bucket in &buckets {
            total_orders += bucket.count;
            discount_total += billing::to_decimal(bucket.discount);
            match bucket.status.as_str() {
                "CANCELLED" => refunded_total += billing::to_decimal(bucket.revenue),
                "REJECTED" => {}
                _ => gross_revenue += billing::to_decimal(bucket.revenue),
            }
        }

        Ok(DailyReport {
            date: date.to_string(),
            canteen,
            total_orders,
            status_counts: buckets,
            gross_revenue: billing::to_f64(gross_revenue),
            refunded_total: billing::to_f64(refunded_total),
            discount_total: billing::to_f64(discount_total),
        })
    }
}
