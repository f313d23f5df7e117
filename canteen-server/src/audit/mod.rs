//! Activity Audit Trail
//!
//! 记录"谁对哪个订单/资源做了什么"的只追加日志，独立于生命周期
//! 管理器的事务路径：日志写失败要被看见（error 级日志），但绝不
//! 使触发它的业务操作失败。

pub mod service;
pub mod storage;
pub mod types;
pub mod worker;

pub use service::{AuditLogRequest, AuditService};
pub use storage::{AuditStorage, AuditStorageError};
pub use types::{ActorKind, AuditAction, AuditEntry, AuditListResponse, AuditQuery};
pub use worker::run_audit_worker;
