//! Menu Item Repository

use super::{BaseRepository, RepoError, RepoResult, parse_record_id};
use crate::db::models::{MenuItem, MenuItemCreate};
use surrealdb::RecordId;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const MENU_ITEM_TABLE: &str = "menu_item";

#[derive(Clone)]
pub struct MenuItemRepository {
    base: BaseRepository,
}

impl MenuItemRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Fetch all referenced menu items in one query.
    ///
    /// 下单校验用：调用方负责比对返回集合与请求行，
    /// 缺失即视为菜单项不存在。
    pub async fn find_by_ids(&self, ids: &[String]) -> RepoResult<Vec<MenuItem>> {
        let record_ids: Vec<RecordId> = ids
            .iter()
            .map(|id| parse_record_id(MENU_ITEM_TABLE, id))
            .collect::<RepoResult<_>>()?;

        let items: Vec<MenuItem> = self
            .base
            .db()
            .query("SELECT * FROM menu_item WHERE id IN $ids")
            .bind(("ids", record_ids))
            .await?
            .take(0)?;
        Ok(items)
    }

    /// Find all available items of one canteen
    pub async fn find_by_canteen(&self, canteen: &str) -> RepoResult<Vec<MenuItem>> {
        let items: Vec<MenuItem> = self
            .base
            .db()
            .query("SELECT * FROM menu_item WHERE canteen = $canteen AND is_available = true ORDER BY name")
            .bind(("canteen", canteen.to_string()))
            .await?
            .take(0)?;
        Ok(items)
    }

    /// Create a menu item (seeding and tests; CRUD proper lives upstream)
    pub async fn create(&self, data: MenuItemCreate) -> RepoResult<MenuItem> {
        let item = MenuItem {
            id: None,
            canteen: data.canteen,
            name: data.name,
            price: data.price,
            image: data.image,
            is_available: data.is_available,
        };

        let created: Option<MenuItem> = self
            .base
            .db()
            .create(MENU_ITEM_TABLE)
            .content(item)
            .await?;

        created.ok_or_else(|| RepoError::Database("Failed to create menu item".to_string()))
    }

    /// Toggle availability (used by tests to simulate menu edits)
    pub async fn set_available(&self, id: &str, available: bool) -> RepoResult<MenuItem> {
        let record_id = parse_record_id(MENU_ITEM_TABLE, id)?;
        let updated: Vec<MenuItem> = self
            .base
            .db()
            .query("UPDATE $id SET is_available = $available RETURN AFTER")
            .bind(("id", record_id))
            .bind(("available", available))
            .await?
            .take(0)?;
        updated
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Menu item {} not found", id)))
    }
}
