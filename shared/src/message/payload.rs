use serde::{Deserialize, Serialize};
use std::fmt;

// ==================== Notification Level ====================

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    /// 普通信息
    Info,
    /// 警告
    Warning,
    /// 错误
    Error,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// ==================== Payloads ====================

/// 用户通知载荷 (服务端 -> 用户)
///
/// 尽力而为投递，进程内暂存，重启即失。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// 目标用户
    pub user: String,
    /// 标题
    pub title: String,
    /// 消息内容
    pub body: String,
    /// 通知级别
    pub level: NotificationLevel,
    /// 关联订单 ("order:<id>")
    pub order_id: Option<String>,
    /// Unix 毫秒
    pub created_at: i64,
}

impl NotificationPayload {
    pub fn info(
        user: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        order_id: Option<String>,
    ) -> Self {
        Self {
            user: user.into(),
            title: title.into(),
            body: body.into(),
            level: NotificationLevel::Info,
            order_id,
            created_at: crate::util::now_millis(),
        }
    }
}
