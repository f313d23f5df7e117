//! 操作日志后台 worker
//!
//! 从通道排空日志请求并落库。落库失败只记 error，不向任何
//! 业务路径传播。

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::service::AuditLogRequest;
use super::storage::AuditStorage;

/// Drain the audit channel until shutdown or channel close.
pub async fn run_audit_worker(
    storage: AuditStorage,
    mut rx: mpsc::Receiver<AuditLogRequest>,
    shutdown: CancellationToken,
) {
    tracing::info!("Audit worker started");
    loop {
        tokio::select! {
            req = rx.recv() => {
                let Some(req) = req else {
                    tracing::info!("Audit channel closed, worker exiting");
                    return;
                };
                if let Err(e) = storage
                    .append(
                        req.action,
                        req.actor,
                        req.actor_kind,
                        req.resource_type,
                        req.resource_id,
                        req.details,
                    )
                    .await
                {
                    tracing::error!(error = %e, "Failed to append audit entry");
                }
            }
            _ = shutdown.cancelled() => {
                // 排空剩余条目后退出
                while let Ok(req) = rx.try_recv() {
                    if let Err(e) = storage
                        .append(
                            req.action,
                            req.actor,
                            req.actor_kind,
                            req.resource_type,
                            req.resource_id,
                            req.details,
                        )
                        .await
                    {
                        tracing::error!(error = %e, "Failed to append audit entry during shutdown");
                    }
                }
                tracing::info!("Audit worker stopped");
                return;
            }
        }
    }
}
