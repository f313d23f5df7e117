//! 实时消息类型定义
//!
//! 这些类型在 canteen-server 和订阅端之间共享，用于
//! 进程内的订单生命周期事件扇出。

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod payload;
pub use payload::*;

/// 订阅主题
///
/// 约定格式: `order:<id>` / `user:<id>` / `canteen:<id>`。
/// 事件不携带主题时表示全局广播（平台级事件，极少使用）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic(String);

impl Topic {
    pub fn order(id: &str) -> Self {
        Topic(format!("order:{id}"))
    }

    pub fn user(id: &str) -> Self {
        Topic(format!("user:{id}"))
    }

    pub fn canteen(id: &str) -> Self {
        Topic(format!("canteen:{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 订单生命周期事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
    /// 订单创建 (结账完成)
    OrderCreated,
    /// 状态变更 (管理端驱动)
    StatusChanged,
    /// 用户取消
    OrderCancelled,
}

impl fmt::Display for OrderEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderEventKind::OrderCreated => write!(f, "order_created"),
            OrderEventKind::StatusChanged => write!(f, "status_changed"),
            OrderEventKind::OrderCancelled => write!(f, "order_cancelled"),
        }
    }
}

/// 生命周期事件 - 扇出到订阅端的消息体
///
/// `topics` 为空 = 全局广播。投递语义 at-most-once：
/// 掉线的订阅者直接错过事件，无重放缓冲。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: OrderEventKind,
    pub order_id: String,
    /// 变更后的订单状态 (SCREAMING_SNAKE_CASE)
    pub status: String,
    pub token_number: String,
    pub topics: Vec<Topic>,
    /// 附加数据 (完整订单快照等)
    pub data: Option<serde_json::Value>,
    /// Unix 毫秒
    pub timestamp: i64,
}

impl LifecycleEvent {
    pub fn new(
        kind: OrderEventKind,
        order_id: impl Into<String>,
        status: impl Into<String>,
        token_number: impl Into<String>,
        topics: Vec<Topic>,
    ) -> Self {
        Self {
            kind,
            order_id: order_id.into(),
            status: status.into(),
            token_number: token_number.into(),
            topics,
            data: None,
            timestamp: crate::util::now_millis(),
        }
    }

    /// 附带完整订单数据
    pub fn with_data<T: Serialize>(mut self, data: &T) -> Self {
        self.data = serde_json::to_value(data).ok();
        self
    }

    /// 事件是否投递给订阅了 `subscribed` 主题集的客户端
    ///
    /// 空 `topics` = 广播给所有连接的订阅者
    pub fn matches(&self, subscribed: &std::collections::HashSet<Topic>) -> bool {
        self.topics.is_empty() || self.topics.iter().any(|t| subscribed.contains(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_topic_convention() {
        assert_eq!(Topic::order("abc").as_str(), "order:abc");
        assert_eq!(Topic::user("u1").as_str(), "user:u1");
        assert_eq!(Topic::canteen("c9").as_str(), "canteen:c9");
    }

    #[test]
    fn test_event_matches_subscribed_topic() {
        let event = LifecycleEvent::new(
            OrderEventKind::OrderCreated,
            "order:1",
            "PENDING",
            "CT0001234",
            vec![Topic::user("u1"), Topic::canteen("c1")],
        );

        let mut subscribed = HashSet::new();
        subscribed.insert(Topic::canteen("c1"));
        assert!(event.matches(&subscribed));

        let mut other = HashSet::new();
        other.insert(Topic::canteen("c2"));
        assert!(!event.matches(&other));
    }

    #[test]
    fn test_empty_topics_broadcasts_to_all() {
        let event = LifecycleEvent::new(
            OrderEventKind::StatusChanged,
            "order:1",
            "READY",
            "CT0001234",
            vec![],
        );

        // 即使订阅集为空也能收到全局广播
        assert!(event.matches(&HashSet::new()));

        let mut subscribed = HashSet::new();
        subscribed.insert(Topic::order("other"));
        assert!(event.matches(&subscribed));
    }
}
