//! Coupon validity at order time
//!
//! 券记录的增删改由外部 CRUD 模块负责；下单那一刻"这张券现在
//! 能不能用"的判定属于本核心。判定是纯函数，不改任何状态 ——
//! 原子核销（计数守卫递增）在 [`crate::db::repository::CouponRepository::redeem`]。

use crate::db::models::Coupon;

/// Why a coupon was rejected (diagnostics only; checkout never surfaces this
/// to the user — an invalid coupon silently yields no discount)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponValidity {
    Valid,
    /// now < starts_at
    NotYetActive,
    /// now > expires_at
    Expired,
    Inactive,
    UsageLimitReached,
    /// 券限定了别的食堂
    WrongCanteen,
}

impl CouponValidity {
    pub fn is_valid(&self) -> bool {
        matches!(self, CouponValidity::Valid)
    }
}

/// Evaluate a coupon against the current time and target canteen.
///
/// Pure: does not mutate usage counters. The usage check here is a
/// fast-path filter — the authoritative bound is the guarded atomic
/// increment at redemption.
pub fn validity(coupon: &Coupon, canteen: &str, now: i64) -> CouponValidity {
    if !coupon.is_active {
        return CouponValidity::Inactive;
    }
    if let Some(starts_at) = coupon.starts_at
        && now < starts_at
    {
        return CouponValidity::NotYetActive;
    }
    if let Some(expires_at) = coupon.expires_at
        && now > expires_at
    {
        return CouponValidity::Expired;
    }
    if let Some(limit) = coupon.usage_limit
        && coupon.usage_count >= limit
    {
        return CouponValidity::UsageLimitReached;
    }
    if let Some(scope) = &coupon.canteen
        && scope != canteen
    {
        return CouponValidity::WrongCanteen;
    }
    CouponValidity::Valid
}

/// `true` iff the coupon may be redeemed right now for this canteen
pub fn is_valid_now(coupon: &Coupon, canteen: &str, now: i64) -> bool {
    validity(coupon, canteen, now).is_valid()
}
