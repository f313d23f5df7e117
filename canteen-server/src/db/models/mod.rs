//! Database Models

pub mod coupon;
pub mod menu_item;
pub mod order;
pub mod report;
pub mod serde_helpers;

pub use coupon::{Coupon, CouponCreate, CouponKind};
pub use menu_item::{MenuItem, MenuItemCreate};
pub use order::{
    CreateOrderRequest, Order, OrderLine, OrderLineInput, OrderStatus, PaymentStatus, Timeline,
    TokenView, UpdateStatusRequest,
};
pub use report::{DailyReport, StatusBucket};
