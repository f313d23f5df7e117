//! 落盘持久化测试
//!
//! 使用 ServerState::initialize 完整初始化（RocksDB 落盘），
//! 验证订单跨进程重启仍在、唯一索引跨重启仍然生效。

use canteen_server::db::models::{CreateOrderRequest, MenuItemCreate, OrderLineInput, OrderStatus};
use canteen_server::db::repository::{MenuItemRepository, OrderRepository};
use canteen_server::{Config, CurrentUser, Role, ServerState};

const CANTEEN: &str = "canteen:north";

#[tokio::test]
async fn test_orders_survive_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config::with_overrides(dir.path().to_string_lossy().to_string(), 0);

    let user = CurrentUser::new("user:alice", "Alice", Role::Student);

    // 第一次启动：结账一单
    let (order_id, token) = {
        let state = ServerState::initialize(&config).await.expect("initialize");
        let menu = MenuItemRepository::new(state.db.clone());
        let item = menu
            .create(MenuItemCreate {
                canteen: CANTEEN.to_string(),
                name: "Veg Thali".to_string(),
                price: 100.0,
                image: None,
                is_available: true,
            })
            .await
            .expect("seed menu item");

        let order = state
            .lifecycle
            .create_order(
                &user,
                CreateOrderRequest {
                    canteen: CANTEEN.to_string(),
                    counter: Some("counter:1".to_string()),
                    items: vec![OrderLineInput {
                        menu_item: item.id.expect("persisted id").to_string(),
                        qty: 1,
                    }],
                    coupon_code: None,
                },
            )
            .await
            .expect("checkout");
        (order.id_string(), order.token_number.clone())
        // state 在块尾 drop，释放 RocksDB 锁
    };

    // 第二次启动：订单仍在，字段完整
    let state = ServerState::initialize(&config).await.expect("reopen");
    let repo = OrderRepository::new(state.db.clone());
    let reloaded = repo
        .find_by_id(&order_id)
        .await
        .expect("query")
        .expect("order survived restart");
    assert_eq!(reloaded.token_number, token);
    assert_eq!(reloaded.status, OrderStatus::Pending);
    assert_eq!(reloaded.counter.as_deref(), Some("counter:1"));
    assert_eq!(reloaded.total_amount, 107.0);
}
