//! Coupon Repository
//!
//! 核销计数必须用单条带守卫的 UPDATE 完成，
//! 并发兑换同一张券时不会超过 usage_limit。

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{Coupon, CouponCreate};
use surrealdb::RecordId;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const COUPON_TABLE: &str = "coupon";

#[derive(Clone)]
pub struct CouponRepository {
    base: BaseRepository,
}

impl CouponRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find a coupon by its canonical (upper-cased) code.
    ///
    /// 码比对大小写不敏感：存储时已规范化为大写，查询前先转大写。
    pub async fn find_by_code(&self, code: &str) -> RepoResult<Option<Coupon>> {
        let canonical = code.trim().to_uppercase();
        let coupons: Vec<Coupon> = self
            .base
            .db()
            .query("SELECT * FROM coupon WHERE code = $code")
            .bind(("code", canonical))
            .await?
            .take(0)?;
        Ok(coupons.into_iter().next())
    }

    /// Atomically redeem one use of a coupon.
    ///
    /// Increment succeeds only while the post-increment count stays within
    /// `usage_limit` (absent limit = unbounded) and the coupon is active.
    /// Returns `None` when the guard rejects the increment — the caller
    /// proceeds without a discount, it never retries.
    pub async fn redeem(&self, id: &RecordId) -> RepoResult<Option<Coupon>> {
        let updated: Vec<Coupon> = self
            .base
            .db()
            .query(
                "UPDATE $id SET usage_count += 1 \
                 WHERE is_active = true \
                 AND (usage_limit = NONE OR usage_count < usage_limit) \
                 RETURN AFTER",
            )
            .bind(("id", id.clone()))
            .await?
            .take(0)?;
        Ok(updated.into_iter().next())
    }

    /// Create a coupon (seeding and tests; CRUD proper lives upstream)
    pub async fn create(&self, data: CouponCreate) -> RepoResult<Coupon> {
        let coupon = Coupon {
            id: None,
            code: data.code.trim().to_uppercase(),
            kind: data.kind,
            value: data.value,
            max_discount: data.max_discount,
            usage_limit: data.usage_limit,
            usage_count: 0,
            starts_at: data.starts_at,
            expires_at: data.expires_at,
            is_active: true,
            canteen: data.canteen,
        };

        let created: Option<Coupon> = self
            .base
            .db()
            .create(COUPON_TABLE)
            .content(coupon)
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("uniq_coupon_code") {
                    RepoError::Duplicate(format!("Coupon code already exists: {}", msg))
                } else {
                    RepoError::Database(msg)
                }
            })?;

        created.ok_or_else(|| RepoError::Database("Failed to create coupon".to_string()))
    }
}
