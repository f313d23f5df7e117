//! 操作日志存储
//!
//! `activity_log` 表只追加；这里没有 update/delete 路径。

use super::types::{ActorKind, AuditAction, AuditEntry, AuditQuery};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditStorageError {
    #[error("Audit storage error: {0}")]
    Database(String),
}

impl From<surrealdb::Error> for AuditStorageError {
    fn from(err: surrealdb::Error) -> Self {
        AuditStorageError::Database(err.to_string())
    }
}

#[derive(Clone)]
pub struct AuditStorage {
    db: Surreal<Db>,
}

impl AuditStorage {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    /// Append one entry
    pub async fn append(
        &self,
        action: AuditAction,
        actor: String,
        actor_kind: ActorKind,
        resource_type: String,
        resource_id: String,
        details: serde_json::Value,
    ) -> Result<AuditEntry, AuditStorageError> {
        let entry = AuditEntry {
            id: None,
            timestamp: shared::util::now_millis(),
            action,
            actor,
            actor_kind,
            resource_type,
            resource_id,
            details,
        };

        let created: Option<AuditEntry> =
            self.db.create("activity_log").content(entry).await?;
        created.ok_or_else(|| {
            AuditStorageError::Database("Failed to append audit entry".to_string())
        })
    }

    /// Query entries, newest first
    pub async fn query(
        &self,
        q: &AuditQuery,
    ) -> Result<(Vec<AuditEntry>, i64), AuditStorageError> {
        let mut where_parts: Vec<&str> = Vec::new();
        if q.from.is_some() {
            where_parts.push("timestamp >= $from");
        }
        if q.to.is_some() {
            where_parts.push("timestamp <= $to");
        }
        if q.action.is_some() {
            where_parts.push("action = $action");
        }
        if q.actor.is_some() {
            where_parts.push("actor = $actor");
        }
        if q.resource_type.is_some() {
            where_parts.push("resource_type = $resource_type");
        }

        let where_clause = if where_parts.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", where_parts.join(" AND "))
        };
        let sql = format!(
            "SELECT * FROM activity_log{where_clause} ORDER BY timestamp DESC LIMIT $limit START $offset;
             SELECT count() AS total FROM activity_log{where_clause} GROUP ALL;"
        );

        let mut query = self
            .db
            .query(sql)
            .bind(("limit", q.limit))
            .bind(("offset", q.offset));
        if let Some(from) = q.from {
            query = query.bind(("from", from));
        }
        if let Some(to) = q.to {
            query = query.bind(("to", to));
        }
        if let Some(action) = q.action {
            query = query.bind(("action", action));
        }
        if let Some(actor) = q.actor.clone() {
            query = query.bind(("actor", actor));
        }
        if let Some(resource_type) = q.resource_type.clone() {
            query = query.bind(("resource_type", resource_type));
        }

        let mut result = query.await?;
        let items: Vec<AuditEntry> = result.take(0)?;

        #[derive(serde::Deserialize)]
        struct TotalRow {
            total: i64,
        }
        let totals: Vec<TotalRow> = result.take(1)?;
        let total = totals.first().map(|t| t.total).unwrap_or(0);

        Ok((items, total))
    }
}
