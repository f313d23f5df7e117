//! 并发不变量测试
//!
//! 命令交叉执行模式：N 个结账同时争抢同一张限量券 / 同时签发令牌，
//! 验证守卫递增和唯一索引兜底在真实并发下成立。

use std::collections::HashSet;

use canteen_server::db::models::{
    CouponCreate, CouponKind, CreateOrderRequest, MenuItemCreate, OrderLineInput,
};
use canteen_server::db::repository::{CouponRepository, MenuItemRepository};
use canteen_server::{Config, CurrentUser, Role, ServerState};

const CANTEEN: &str = "canteen:north";

/// 并发结账数
const CHECKOUT_COUNT: usize = 10;
/// 限量券名额
const COUPON_LIMIT: i64 = 3;

async fn test_state() -> ServerState {
    let config = Config::with_overrides("unused", 0);
    ServerState::initialize_in_memory(&config)
        .await
        .expect("in-memory state")
}

async fn seed_menu_item(state: &ServerState) -> String {
    let repo = MenuItemRepository::new(state.db.clone());
    let item = repo
        .create(MenuItemCreate {
            canteen: CANTEEN.to_string(),
            name: "Veg Thali".to_string(),
            price: 100.0,
            image: None,
            is_available: true,
        })
        .await
        .expect("seed menu item");
    item.id.expect("persisted id").to_string()
}

fn checkout_request(menu_item: &str, coupon_code: Option<&str>) -> CreateOrderRequest {
    CreateOrderRequest {
        canteen: CANTEEN.to_string(),
        counter: None,
        items: vec![OrderLineInput {
            menu_item: menu_item.to_string(),
            qty: 1,
        }],
        coupon_code: coupon_code.map(|c| c.to_string()),
    }
}

#[tokio::test]
async fn test_coupon_usage_bound_under_concurrent_redemption() {
    let state = test_state().await;
    let menu_item = seed_menu_item(&state).await;

    CouponRepository::new(state.db.clone())
        .create(CouponCreate {
            code: "LIMITED".to_string(),
            kind: CouponKind::Flat,
            value: 10.0,
            max_discount: None,
            usage_limit: Some(COUPON_LIMIT),
            starts_at: None,
            expires_at: None,
            canteen: None,
        })
        .await
        .expect("seed coupon");

    let mut handles = Vec::new();
    for i in 0..CHECKOUT_COUNT {
        let state = state.clone();
        let menu_item = menu_item.clone();
        handles.push(tokio::spawn(async move {
            let user = CurrentUser::new(format!("user:u{i}"), format!("U{i}"), Role::Student);
            state
                .lifecycle
                .create_order(&user, checkout_request(&menu_item, Some("LIMITED")))
                .await
        }));
    }

    let mut discounted = 0;
    let mut plain = 0;
    for handle in handles {
        // 超发之外的结账照常成功，只是没有折扣
        let order = handle.await.expect("join").expect("checkout must succeed");
        if order.discount > 0.0 {
            assert_eq!(order.discount, 10.0);
            assert_eq!(order.coupon_code.as_deref(), Some("LIMITED"));
            discounted += 1;
        } else {
            assert!(order.coupon_code.is_none());
            plain += 1;
        }
    }

    assert_eq!(discounted as i64, COUPON_LIMIT, "at most {COUPON_LIMIT} redemptions");
    assert_eq!(plain, CHECKOUT_COUNT - COUPON_LIMIT as usize);

    // usage_count 恰好触顶，绝不超发
    let coupon = CouponRepository::new(state.db.clone())
        .find_by_code("LIMITED")
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(coupon.usage_count, COUPON_LIMIT);
}

#[tokio::test]
async fn test_tokens_unique_across_concurrent_checkouts() {
    let state = test_state().await;
    let menu_item = seed_menu_item(&state).await;

    const ORDER_COUNT: usize = 20;

    let mut handles = Vec::new();
    for i in 0..ORDER_COUNT {
        let state = state.clone();
        let menu_item = menu_item.clone();
        handles.push(tokio::spawn(async move {
            let user = CurrentUser::new(format!("user:u{i}"), format!("U{i}"), Role::Student);
            state
                .lifecycle
                .create_order(&user, checkout_request(&menu_item, None))
                .await
        }));
    }

    let mut tokens = HashSet::new();
    for handle in handles {
        let order = handle.await.expect("join").expect("checkout");
        tokens.insert(order.token_number);
    }

    // 唯一索引 + 一次重试兜底：并发创建的令牌两两不同
    assert_eq!(tokens.len(), ORDER_COUNT);
}

#[tokio::test]
async fn test_concurrent_status_updates_converge() {
    use canteen_server::db::models::{OrderStatus, UpdateStatusRequest};

    let state = test_state().await;
    let menu_item = seed_menu_item(&state).await;
    let user = CurrentUser::new("user:alice", "Alice", Role::Student);
    let order = state
        .lifecycle
        .create_order(&user, checkout_request(&menu_item, None))
        .await
        .expect("checkout");
    let id = order.id_string();

    // 两个管理员同时推进同一订单：最后写入生效，
    // 每个成功请求的返回值都对应真正持久化过的那一行
    let admin_a = CurrentUser::new("user:staff-a", "A", Role::Admin);
    let admin_b = CurrentUser::new("user:staff-b", "B", Role::Admin);
    let (ra, rb) = tokio::join!(
        state.lifecycle.update_status(
            &admin_a,
            &id,
            UpdateStatusRequest {
                status: OrderStatus::Cooking,
                payment_status: None,
            },
        ),
        state.lifecycle.update_status(
            &admin_b,
            &id,
            UpdateStatusRequest {
                status: OrderStatus::Ready,
                payment_status: None,
            },
        ),
    );
    let a = ra.expect("admin A update");
    let b = rb.expect("admin B update");
    assert_eq!(a.status, OrderStatus::Cooking);
    assert_eq!(b.status, OrderStatus::Ready);

    // 持久化结果是两者之一，时间线只增不减
    let reloaded = canteen_server::db::repository::OrderRepository::new(state.db.clone())
        .find_by_id(&id)
        .await
        .expect("reload")
        .expect("exists");
    assert!(matches!(
        reloaded.status,
        OrderStatus::Cooking | OrderStatus::Ready
    ));
    assert!(reloaded.timeline.pending_at.is_some());
}
