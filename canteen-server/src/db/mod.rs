//! Database Module
//!
//! Embedded SurrealDB: RocksDB on disk for the server binary,
//! in-memory engine for tests.

pub mod models;
pub mod repository;

use crate::utils::AppError;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, RocksDb};

/// 命名空间 / 数据库名
const NAMESPACE: &str = "canteen";
const DATABASE: &str = "canteen";

/// Database service — owns the embedded SurrealDB handle
#[derive(Clone)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// Open the on-disk database and apply schema definitions
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        let db = Surreal::new::<RocksDb>(db_path)
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database: {e}")))?;
        Self::init(db).await
    }

    /// In-memory database (tests and ephemeral tooling)
    pub async fn memory() -> Result<Self, AppError> {
        let db = Surreal::new::<Mem>(())
            .await
            .map_err(|e| AppError::Database(format!("Failed to open in-memory database: {e}")))?;
        Self::init(db).await
    }

    async fn init(db: Surreal<Db>) -> Result<Self, AppError> {
        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| AppError::Database(format!("Failed to select namespace: {e}")))?;

        define_schema(&db).await?;
        tracing::info!("Database ready (ns={}, db={})", NAMESPACE, DATABASE);
        Ok(Self { db })
    }
}

/// Schema definitions.
///
/// 表保持 SCHEMALESS；唯一性约束必须建索引：
/// - `uniq_order_token`: 取餐令牌全局唯一（令牌签发器靠它兜底重试）
/// - `uniq_coupon_code`: 优惠码唯一（已规范化大写）
async fn define_schema(db: &Surreal<Db>) -> Result<(), AppError> {
    db.query(
        "DEFINE TABLE IF NOT EXISTS order SCHEMALESS;
         DEFINE INDEX IF NOT EXISTS uniq_order_token ON TABLE order COLUMNS token_number UNIQUE;
         DEFINE TABLE IF NOT EXISTS coupon SCHEMALESS;
         DEFINE INDEX IF NOT EXISTS uniq_coupon_code ON TABLE coupon COLUMNS code UNIQUE;
         DEFINE TABLE IF NOT EXISTS menu_item SCHEMALESS;
         DEFINE TABLE IF NOT EXISTS activity_log SCHEMALESS;",
    )
    .await
    .map_err(|e| AppError::Database(format!("Failed to define schema: {e}")))?;
    Ok(())
}
