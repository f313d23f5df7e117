//! Shared types for the canteen platform
//!
//! 前后端共用的消息载荷和工具函数：
//!
//! - **message**: 实时消息载荷 (订单生命周期事件、通知)
//! - **util**: 时间戳和取餐令牌工具

pub mod message;
pub mod util;

pub use message::{LifecycleEvent, NotificationLevel, NotificationPayload, OrderEventKind, Topic};
