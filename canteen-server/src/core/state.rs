use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use tokio_util::sync::CancellationToken;

use crate::audit::{AuditLogRequest, AuditService, run_audit_worker};
use crate::core::Config;
use crate::db::DbService;
use crate::notify::FanoutService;
use crate::orders::OrderLifecycleManager;
use crate::utils::AppError;

/// 服务器状态 - 持有所有服务的共享引用
///
/// ServerState 使用 Arc 实现浅拷贝，所有权成本极低。扇出服务和
/// 操作日志服务都是显式注入的句柄，没有模块级单例。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | Surreal<Db> | 嵌入式数据库 |
/// | fanout | FanoutService | 生命周期事件扇出 + 用户通知 |
/// | audit | Arc<AuditService> | 只追加操作日志 |
/// | lifecycle | Arc<OrderLifecycleManager> | 订单状态机 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 嵌入式数据库 (SurrealDB)
    pub db: Surreal<Db>,
    /// 事件扇出服务
    pub fanout: FanoutService,
    /// 操作日志服务
    pub audit: Arc<AuditService>,
    /// 订单生命周期管理器
    pub lifecycle: Arc<OrderLifecycleManager>,
    /// 后台任务关闭令牌
    shutdown: CancellationToken,
    /// 操作日志通道接收端（start_background_tasks 取走）
    audit_rx: Arc<std::sync::Mutex<Option<tokio::sync::mpsc::Receiver<AuditLogRequest>>>>,
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("config", &self.config)
            .field("fanout", &self.fanout)
            .finish_non_exhaustive()
    }
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录
    /// 2. 数据库 (work_dir/canteen.db)
    /// 3. 扇出服务、操作日志服务、生命周期管理器
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        std::fs::create_dir_all(&config.work_dir)
            .map_err(|e| AppError::Internal(format!("Failed to create work dir: {e}")))?;

        let db_path = config.database_path();
        let db_service = DbService::new(&db_path.to_string_lossy()).await?;
        Ok(Self::from_parts(config.clone(), db_service.db))
    }

    /// 基于内存数据库初始化（测试场景）
    pub async fn initialize_in_memory(config: &Config) -> Result<Self, AppError> {
        let db_service = DbService::memory().await?;
        Ok(Self::from_parts(config.clone(), db_service.db))
    }

    fn from_parts(config: Config, db: Surreal<Db>) -> Self {
        let fanout = FanoutService::new();
        let (audit, audit_rx) = AuditService::new(db.clone(), config.audit_buffer_size);
        let lifecycle = Arc::new(OrderLifecycleManager::new(
            db.clone(),
            fanout.clone(),
            audit.clone(),
        ));

        Self {
            config,
            db,
            fanout,
            audit,
            lifecycle,
            shutdown: CancellationToken::new(),
            audit_rx: Arc::new(std::sync::Mutex::new(Some(audit_rx))),
        }
    }

    /// 启动后台任务
    ///
    /// 必须在 `Server::run()` 之前调用。启动的任务：
    /// - 操作日志 worker（排空 mpsc 通道落库）
    pub fn start_background_tasks(&self) {
        let rx = self
            .audit_rx
            .lock()
            .expect("audit_rx mutex poisoned")
            .take();
        match rx {
            Some(rx) => {
                let storage = self.audit.storage().clone();
                let shutdown = self.shutdown.clone();
                tokio::spawn(run_audit_worker(storage, rx, shutdown));
            }
            None => {
                tracing::warn!("Background tasks already started");
            }
        }
    }

    /// 获取数据库实例
    pub fn get_db(&self) -> Surreal<Db> {
        self.db.clone()
    }

    /// 优雅关闭后台任务
    pub fn shutdown(&self) {
        tracing::info!("Shutting down background tasks");
        self.shutdown.cancel();
    }
}
