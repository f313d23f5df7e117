//! 通知扇出服务
//!
//! # 架构
//!
//! ```text
//! OrderLifecycleManager ──▶ publish(LifecycleEvent)
//!                               │
//!                    ┌──────────┴──────────┐
//!                    │   FanoutService     │
//!                    │  DashMap<id, Sub>   │  ◄── 主题过滤
//!                    └──────────┬──────────┘
//!            ┌─────────────────┼─────────────────┐
//!            ▼                 ▼                 ▼
//!       Subscriber A      Subscriber B      Subscriber C
//!      (order:<id>)      (canteen:<id>)     (user:<id>)
//! ```
//!
//! # 投递语义
//!
//! At-most-once，尽力而为：邮箱满或已关闭的订阅者直接丢事件并摘除，
//! publish 永不阻塞、永不失败 —— 订单写路径不受任何背压。
//! 无重放缓冲，无持久化队列，掉线即错过。
//!
//! 用户通知走独立的每用户有界环形缓冲（进程内，重启即失），
//! 不是无界全局列表。

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use dashmap::DashMap;
use shared::message::{LifecycleEvent, NotificationPayload, Topic};
use tokio::sync::mpsc;
use uuid::Uuid;

/// 每个订阅者的事件邮箱容量
const SUBSCRIBER_MAILBOX_CAPACITY: usize = 256;

/// 每用户通知环形缓冲容量（最旧的先挤出去）
const NOTIFICATION_RING_CAPACITY: usize = 50;

/// One connected live viewer
struct Subscriber {
    topics: HashSet<Topic>,
    tx: mpsc::Sender<LifecycleEvent>,
}

/// Injected fan-out handle — passed explicitly to the lifecycle manager,
/// never a module-level singleton.
#[derive(Clone)]
pub struct FanoutService {
    subscribers: Arc<DashMap<String, Subscriber>>,
    notifications: NotificationStore,
}

impl std::fmt::Debug for FanoutService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutService")
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}

impl FanoutService {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(DashMap::new()),
            notifications: NotificationStore::new(),
        }
    }

    /// Register a subscriber for a set of topics.
    ///
    /// 返回订阅者 ID（用于注销）和事件接收端。
    pub fn subscribe(&self, topics: Vec<Topic>) -> (String, mpsc::Receiver<LifecycleEvent>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_MAILBOX_CAPACITY);
        let id = Uuid::new_v4().to_string();
        self.subscribers.insert(
            id.clone(),
            Subscriber {
                topics: topics.into_iter().collect(),
                tx,
            },
        );
        (id, rx)
    }

    /// Remove a subscriber (disconnect)
    pub fn unsubscribe(&self, id: &str) {
        self.subscribers.remove(id);
    }

    /// Number of connected subscribers (health endpoint)
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver an event to every subscriber whose topics intersect the
    /// event's topics; an event with no topics goes to everyone.
    ///
    /// 永不阻塞：try_send 失败（邮箱满 / 接收端已掉线）就丢事件，
    /// 掉线的订阅者顺手摘除。
    pub fn publish(&self, event: LifecycleEvent) {
        let mut dead: Vec<String> = Vec::new();

        for entry in self.subscribers.iter() {
            if !event.matches(&entry.value().topics) {
                continue;
            }
            match entry.value().tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::debug!(
                        subscriber = %entry.key(),
                        kind = %event.kind,
                        "Subscriber mailbox full, dropping event"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    dead.push(entry.key().clone());
                }
            }
        }

        for id in dead {
            self.subscribers.remove(&id);
            tracing::debug!(subscriber = %id, "Removed disconnected subscriber");
        }
    }

    /// Best-effort user notification (in-memory ring, lost on restart)
    pub fn push_notification(&self, payload: NotificationPayload) {
        self.notifications.push(payload);
    }

    /// Read back a user's buffered notifications, newest first
    pub fn notifications_for(&self, user: &str) -> Vec<NotificationPayload> {
        self.notifications.for_user(user)
    }
}

impl Default for FanoutService {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounded per-user notification ring buffers
#[derive(Clone)]
struct NotificationStore {
    rings: Arc<DashMap<String, VecDeque<NotificationPayload>>>,
}

impl NotificationStore {
    fn new() -> Self {
        Self {
            rings: Arc::new(DashMap::new()),
        }
    }

    fn push(&self, payload: NotificationPayload) {
        let mut ring = self.rings.entry(payload.user.clone()).or_default();
        if ring.len() == NOTIFICATION_RING_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(payload);
    }

    fn for_user(&self, user: &str) -> Vec<NotificationPayload> {
        self.rings
            .get(user)
            .map(|ring| ring.iter().rev().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::OrderEventKind;

    fn event(topics: Vec<Topic>) -> LifecycleEvent {
        LifecycleEvent::new(
            OrderEventKind::StatusChanged,
            "order:1",
            "COOKING",
            "CT0001234",
            topics,
        )
    }

    #[tokio::test]
    async fn test_topic_filtering() {
        let fanout = FanoutService::new();
        let (_a, mut rx_a) = fanout.subscribe(vec![Topic::canteen("c1")]);
        let (_b, mut rx_b) = fanout.subscribe(vec![Topic::canteen("c2")]);

        fanout.publish(event(vec![Topic::canteen("c1")]));

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_no_topics_broadcasts_to_all() {
        let fanout = FanoutService::new();
        let (_a, mut rx_a) = fanout.subscribe(vec![Topic::order("x")]);
        let (_b, mut rx_b) = fanout.subscribe(vec![Topic::user("y")]);

        fanout.publish(event(vec![]));

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_disconnected_subscriber_is_removed() {
        let fanout = FanoutService::new();
        let (_id, rx) = fanout.subscribe(vec![Topic::order("x")]);
        assert_eq!(fanout.subscriber_count(), 1);

        drop(rx);
        // publish 不报错，顺手摘除死订阅者
        fanout.publish(event(vec![Topic::order("x")]));
        assert_eq!(fanout.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let fanout = FanoutService::new();
        fanout.publish(event(vec![Topic::order("x")]));
    }

    #[test]
    fn test_notification_ring_is_bounded() {
        let fanout = FanoutService::new();
        for i in 0..(NOTIFICATION_RING_CAPACITY + 10) {
            fanout.push_notification(NotificationPayload::info(
                "user:u1",
                format!("n{i}"),
                "body",
                None,
            ));
        }

        let notifications = fanout.notifications_for("user:u1");
        assert_eq!(notifications.len(), NOTIFICATION_RING_CAPACITY);
        // 最新的在前，最旧的 10 条已被挤出
        assert_eq!(notifications[0].title, format!("n{}", NOTIFICATION_RING_CAPACITY + 9));
    }

    #[test]
    fn test_notifications_are_per_user() {
        let fanout = FanoutService::new();
        fanout.push_notification(NotificationPayload::info("user:a", "for a", "body", None));
        fanout.push_notification(NotificationPayload::info("user:b", "for b", "body", None));

        assert_eq!(fanout.notifications_for("user:a").len(), 1);
        assert_eq!(fanout.notifications_for("user:b").len(), 1);
        assert!(fanout.notifications_for("user:c").is_empty());
    }
}
