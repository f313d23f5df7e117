//! Menu Item Model
//!
//! 菜单 CRUD 由外部模块维护；核心只在下单时读取快照字段
//! (name / price / image / is_available)。

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Menu item entity (read-mostly during order creation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RecordId>,
    pub canteen: String,
    pub name: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default = "super::serde_helpers::default_true", deserialize_with = "serde_helpers::bool_true")]
    pub is_available: bool,
}

/// Create menu item payload (seeding and tests)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItemCreate {
    pub canteen: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "super::serde_helpers::default_true")]
    pub is_available: bool,
}
