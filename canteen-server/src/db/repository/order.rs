//! Order Repository
//!
//! 所有状态转移都走单条带守卫的 UPDATE（读-改-写竞态在这里消灭）：
//! 副作用只允许基于 UPDATE 返回的那一行，绝不基于转移前的读取。

use super::{BaseRepository, RepoError, RepoResult, parse_record_id};
use crate::db::models::{Order, OrderStatus, PaymentStatus, StatusBucket};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const ORDER_TABLE: &str = "order";

#[derive(Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Persist a freshly built order.
    ///
    /// `uniq_order_token` 索引冲突映射为 [`RepoError::Duplicate`]，
    /// 调用方（生命周期管理器）换一个令牌重试一次。
    pub async fn create(&self, order: Order) -> RepoResult<Order> {
        let created: Option<Order> = self
            .base
            .db()
            .create(ORDER_TABLE)
            .content(order)
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("uniq_order_token") {
                    RepoError::Duplicate(format!("Token collision: {}", msg))
                } else {
                    RepoError::Database(msg)
                }
            })?;

        created.ok_or_else(|| RepoError::Database("Failed to create order".to_string()))
    }

    /// Find order by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Order>> {
        let record_id = parse_record_id(ORDER_TABLE, id)?;
        let order: Option<Order> = self.base.db().select(record_id).await?;
        Ok(order)
    }

    /// List orders, most recent first, with optional canteen/status filter
    pub async fn find_all(
        &self,
        canteen: Option<String>,
        status: Option<OrderStatus>,
        limit: i64,
    ) -> RepoResult<Vec<Order>> {
        let mut where_parts: Vec<&str> = Vec::new();
        if canteen.is_some() {
            where_parts.push("canteen = $canteen");
        }
        if status.is_some() {
            where_parts.push("status = $status");
        }

        let where_clause = if where_parts.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", where_parts.join(" AND "))
        };
        let sql = format!(
            "SELECT * FROM order{} ORDER BY created_at DESC LIMIT $limit",
            where_clause
        );

        let mut query = self.base.db().query(sql).bind(("limit", limit));
        if let Some(canteen) = canteen {
            query = query.bind(("canteen", canteen));
        }
        if let Some(status) = status {
            query = query.bind(("status", status));
        }

        let orders: Vec<Order> = query.await?.take(0)?;
        Ok(orders)
    }

    /// Atomic admin status transition.
    ///
    /// One guarded UPDATE: only fires while the current status is
    /// non-terminal, stamps exactly the timeline field matching `target`,
    /// and optionally overwrites `payment_status`. Returns `None` when the
    /// guard rejects (missing record or terminal state) — the caller
    /// re-reads to tell the two apart.
    pub async fn update_status_guarded(
        &self,
        id: &str,
        target: OrderStatus,
        payment_status: Option<PaymentStatus>,
        now: i64,
    ) -> RepoResult<Option<Order>> {
        let record_id = parse_record_id(ORDER_TABLE, id)?;

        // timeline 字段名来自枚举，不拼接任何外部输入
        let mut sql = format!(
            "UPDATE $id SET status = $status, timeline.{} = $now",
            target.timeline_field()
        );
        if payment_status.is_some() {
            sql.push_str(", payment_status = $payment_status");
        }
        sql.push_str(
            " WHERE status NOT IN ['DELIVERED', 'CANCELLED', 'REJECTED'] RETURN AFTER",
        );

        let mut query = self
            .base
            .db()
            .query(sql)
            .bind(("id", record_id))
            .bind(("status", target))
            .bind(("now", now));
        if let Some(ps) = payment_status {
            query = query.bind(("payment_status", ps));
        }

        let updated: Vec<Order> = query.await?.take(0)?;
        Ok(updated.into_iter().next())
    }

    /// Atomic user cancellation.
    ///
    /// Guard: owner match and status still within the cancellation window
    /// (`PENDING` / `COOKING`). Sets refund in the same statement.
    pub async fn cancel_guarded(
        &self,
        id: &str,
        user: &str,
        now: i64,
    ) -> RepoResult<Option<Order>> {
        let record_id = parse_record_id(ORDER_TABLE, id)?;
        let updated: Vec<Order> = self
            .base
            .db()
            .query(
                "UPDATE $id SET status = 'CANCELLED', payment_status = 'REFUNDED', \
                 timeline.cancelled_at = $now \
                 WHERE user = $user AND status IN ['PENDING', 'COOKING'] \
                 RETURN AFTER",
            )
            .bind(("id", record_id))
            .bind(("user", user.to_string()))
            .bind(("now", now))
            .await?
            .take(0)?;
        Ok(updated.into_iter().next())
    }

    /// Per-status aggregation over one time window (daily report backend)
    pub async fn aggregate_by_status(
        &self,
        from_ms: i64,
        to_ms: i64,
        canteen: Option<String>,
    ) -> RepoResult<Vec<StatusBucket>> {
        let canteen_clause = if canteen.is_some() {
            " AND canteen = $canteen"
        } else {
            ""
        };
        let sql = format!(
            "SELECT status, count() AS count, \
             math::sum(total_amount) AS revenue, \
             math::sum(discount) AS discount \
             FROM order \
             WHERE created_at >= $from AND created_at < $to{} \
             GROUP BY status",
            canteen_clause
        );

        let mut query = self
            .base
            .db()
            .query(sql)
            .bind(("from", from_ms))
            .bind(("to", to_ms));
        if let Some(canteen) = canteen {
            query = query.bind(("canteen", canteen));
        }

        let buckets: Vec<StatusBucket> = query.await?.take(0)?;
        Ok(buckets)
    }
}
