//! Billing calculation using rust_decimal for precision
//!
//! Pure arithmetic, no I/O: cart lines + optional coupon terms in,
//! a fully derived bill out. All calculations are done using `Decimal`
//! internally, then converted to `f64` for storage/serialization.

use crate::db::models::{Coupon, CouponKind};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// 每件商品固定服务费（货币单位）
pub const SERVICE_CHARGE_PER_ITEM: f64 = 2.0;

/// 商品及服务税率（5%）
pub const GST_RATE_PERCENT: f64 = 5.0;

/// One billable line: unit price × quantity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BillLine {
    pub unit_price: f64,
    pub qty: i64,
}

/// Coupon terms as seen by the calculator (already validated upstream)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CouponTerms {
    pub kind: CouponKind,
    pub value: f64,
    pub max_discount: Option<f64>,
}

impl From<&Coupon> for CouponTerms {
    fn from(coupon: &Coupon) -> Self {
        Self {
            kind: coupon.kind,
            value: coupon.value,
            max_discount: coupon.max_discount,
        }
    }
}

/// Computed bill, every field rounded to 2 decimal places (half-up)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub subtotal: f64,
    pub service_charge: f64,
    pub gst: f64,
    pub discount: f64,
    pub total: f64,
}

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Calculate the bill for a cart.
///
/// Deterministic and total:
/// 1. subtotal = Σ(unit_price × qty)
/// 2. service_charge = Σ qty × [`SERVICE_CHARGE_PER_ITEM`]
/// 3. gst = subtotal × [`GST_RATE_PERCENT`] / 100
/// 4. discount: percentage of subtotal or flat value, clamped by
///    `max_discount` when the cap is set
/// 5. total = max(subtotal + service_charge + gst − discount, 0)
///
/// 空购物车返回全零账单，本函数没有失败路径。
pub fn calculate_bill(lines: &[BillLine], coupon: Option<CouponTerms>) -> Bill {
    let mut subtotal = Decimal::ZERO;
    let mut total_quantity = Decimal::ZERO;

    for line in lines {
        let qty = Decimal::from(line.qty);
        subtotal += to_decimal(line.unit_price) * qty;
        total_quantity += qty;
    }

    let service_charge = total_quantity * to_decimal(SERVICE_CHARGE_PER_ITEM);
    let gst = subtotal * to_decimal(GST_RATE_PERCENT) / Decimal::ONE_HUNDRED;

    let discount = match coupon {
        Some(terms) => {
            let raw = match terms.kind {
                CouponKind::Percentage => {
                    subtotal * to_decimal(terms.value) / Decimal::ONE_HUNDRED
                }
                CouponKind::Flat => to_decimal(terms.value),
            };
            match terms.max_discount {
                Some(cap) => raw.min(to_decimal(cap)),
                None => raw,
            }
        }
        None => Decimal::ZERO,
    };

    // 折扣超额时总额 clamp 到 0，不允许负账单
    let total = (subtotal + service_charge + gst - discount).max(Decimal::ZERO);

    Bill {
        subtotal: to_f64(subtotal),
        service_charge: to_f64(service_charge),
        gst: to_f64(gst),
        discount: to_f64(discount),
        total: to_f64(total),
    }
}
