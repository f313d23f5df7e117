//! 操作日志服务
//!
//! `AuditService` 通过 mpsc 通道异步接收日志请求，后台 worker
//! 落库。写入与触发它的业务操作互不拖累：订单写是唯一事实源，
//! 日志失败只记录、绝不回滚或失败主操作。

use std::sync::Arc;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use tokio::sync::mpsc;

use super::storage::{AuditStorage, AuditStorageError};
use super::types::*;

/// 发送到 AuditService 的日志请求
pub struct AuditLogRequest {
    pub action: AuditAction,
    pub actor: String,
    pub actor_kind: ActorKind,
    pub resource_type: String,
    pub resource_id: String,
    pub details: serde_json::Value,
}

/// 操作日志服务
///
/// 写入走通道（尽力而为），查询直接读 storage。
pub struct AuditService {
    storage: AuditStorage,
    tx: mpsc::Sender<AuditLogRequest>,
}

impl std::fmt::Debug for AuditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditService").finish_non_exhaustive()
    }
}

impl AuditService {
    /// 创建操作日志服务
    ///
    /// 返回服务句柄和通道接收端（交给 [`super::worker::run_audit_worker`]）。
    pub fn new(
        db: Surreal<Db>,
        buffer_size: usize,
    ) -> (Arc<Self>, mpsc::Receiver<AuditLogRequest>) {
        let (tx, rx) = mpsc::channel(buffer_size);
        let storage = AuditStorage::new(db);
        let service = Arc::new(Self { storage, tx });
        (service, rx)
    }

    /// 记录一条操作日志（非阻塞，尽力而为）
    ///
    /// 通道满时丢条目并记 error —— 订单写路径不允许任何背压。
    pub fn log(
        &self,
        action: AuditAction,
        actor: impl Into<String>,
        actor_kind: ActorKind,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        details: serde_json::Value,
    ) {
        let req = AuditLogRequest {
            action,
            actor: actor.into(),
            actor_kind,
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            details,
        };

        if let Err(e) = self.tx.try_send(req) {
            tracing::error!(error = %e, "Audit channel unavailable — audit entry dropped");
        }
    }

    /// 查询操作日志
    pub async fn query(
        &self,
        q: &AuditQuery,
    ) -> Result<(Vec<AuditEntry>, i64), AuditStorageError> {
        self.storage.query(q).await
    }

    /// 获取存储引用（worker 用）
    pub fn storage(&self) -> &AuditStorage {
        &self.storage
    }
}
