//! Identity extraction
//!
//! 认证/会话签发是外部协作方的职责；上游网关把已验证的身份放进
//! `x-user-id` / `x-user-name` / `x-user-role` 请求头，这里只做提取
//! 和角色守卫。

mod extractor;

use serde::{Deserialize, Serialize};

use crate::audit::ActorKind;

/// Role of the authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Admin,
    SuperAdmin,
}

impl Role {
    /// 管理端权限（admin 和 super_admin 均可驱动订单状态机）
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "student" => Some(Role::Student),
            "admin" => Some(Role::Admin),
            "super_admin" => Some(Role::SuperAdmin),
            _ => None,
        }
    }
}

impl From<Role> for ActorKind {
    fn from(role: Role) -> Self {
        match role {
            Role::Student => ActorKind::Student,
            Role::Admin => ActorKind::Admin,
            Role::SuperAdmin => ActorKind::SuperAdmin,
        }
    }
}

/// The authenticated caller, as delivered by the upstream gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// "user:<id>"
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_scope() {
        assert!(Role::Admin.is_admin());
        assert!(Role::SuperAdmin.is_admin());
        assert!(!Role::Student.is_admin());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("student"), Some(Role::Student));
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("super_admin"), Some(Role::SuperAdmin));
        assert_eq!(Role::parse("root"), None);
    }
}
