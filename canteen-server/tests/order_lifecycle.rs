//! 订单生命周期集成测试
//!
//! 使用内存数据库完整初始化 ServerState，覆盖：
//! 结账、状态机推进、取消窗口、优惠券静默回退、时间线不可变性。

use canteen_server::db::models::{
    CouponCreate, CouponKind, CreateOrderRequest, MenuItemCreate, OrderLineInput, OrderStatus,
    PaymentStatus, UpdateStatusRequest,
};
use canteen_server::db::repository::{CouponRepository, MenuItemRepository};
use canteen_server::{AppError, Config, CurrentUser, Role, ServerState};
use shared::message::{OrderEventKind, Topic};
use shared::util::now_millis;

const CANTEEN: &str = "canteen:north";

async fn test_state() -> ServerState {
    let config = Config::with_overrides("unused", 0);
    ServerState::initialize_in_memory(&config)
        .await
        .expect("in-memory state")
}

fn student() -> CurrentUser {
    CurrentUser::new("user:alice", "Alice", Role::Student)
}

fn admin() -> CurrentUser {
    CurrentUser::new("user:staff", "Staff", Role::Admin)
}

/// 铺底菜单，返回菜单项 ID（"menu_item:<key>" 格式）
async fn seed_menu(state: &ServerState) -> Vec<String> {
    let repo = MenuItemRepository::new(state.db.clone());
    let mut ids = Vec::new();
    for (name, price) in [("Veg Thali", 100.0), ("Masala Dosa", 60.0), ("Chai", 15.0)] {
        let item = repo
            .create(MenuItemCreate {
                canteen: CANTEEN.to_string(),
                name: name.to_string(),
                price,
                image: None,
                is_available: true,
            })
            .await
            .expect("seed menu item");
        ids.push(item.id.expect("persisted id").to_string());
    }
    ids
}

fn cart(ids: &[String], qty: i64) -> CreateOrderRequest {
    CreateOrderRequest {
        canteen: CANTEEN.to_string(),
        counter: None,
        items: vec![OrderLineInput {
            menu_item: ids[0].clone(),
            qty,
        }],
        coupon_code: None,
    }
}

#[tokio::test]
async fn test_checkout_happy_path() {
    let state = test_state().await;
    let ids = seed_menu(&state).await;

    let order = state
        .lifecycle
        .create_order(&student(), cart(&ids, 2))
        .await
        .expect("checkout");

    // 账单: subtotal 200, service 4, gst 10, total 214
    assert_eq!(order.subtotal, 200.0);
    assert_eq!(order.service_charge, 4.0);
    assert_eq!(order.gst, 10.0);
    assert_eq!(order.discount, 0.0);
    assert_eq!(order.total_amount, 214.0);

    // 支付为模拟：创建即已支付
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert!(order.timeline.pending_at.is_some());
    assert!(order.timeline.cooking_at.is_none());

    // 取餐令牌已签发
    assert!(order.token_number.starts_with("CT"));
    assert_eq!(order.token_number.len(), 9);

    // 行项目快照
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].name, "Veg Thali");
    assert_eq!(order.items[0].unit_price, 100.0);
}

#[tokio::test]
async fn test_checkout_emits_creation_event() {
    let state = test_state().await;
    let ids = seed_menu(&state).await;

    let (_sub, mut rx) = state.fanout.subscribe(vec![Topic::canteen(CANTEEN)]);

    let order = state
        .lifecycle
        .create_order(&student(), cart(&ids, 1))
        .await
        .expect("checkout");

    let event = rx.try_recv().expect("creation event on canteen topic");
    assert_eq!(event.kind, OrderEventKind::OrderCreated);
    assert_eq!(event.order_id, order.id_string());
    assert_eq!(event.status, "PENDING");
}

#[tokio::test]
async fn test_empty_cart_rejected() {
    let state = test_state().await;
    seed_menu(&state).await;

    let req = CreateOrderRequest {
        canteen: CANTEEN.to_string(),
        counter: None,
        items: vec![],
        coupon_code: None,
    };
    let err = state.lifecycle.create_order(&student(), req).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn test_unavailable_item_rejected_per_line() {
    let state = test_state().await;
    let ids = seed_menu(&state).await;

    let repo = MenuItemRepository::new(state.db.clone());
    repo.set_available(&ids[0], false).await.expect("disable item");

    let err = state
        .lifecycle
        .create_order(&student(), cart(&ids, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn test_unknown_item_is_not_found() {
    let state = test_state().await;
    seed_menu(&state).await;

    let req = CreateOrderRequest {
        canteen: CANTEEN.to_string(),
        counter: None,
        items: vec![OrderLineInput {
            menu_item: "menu_item:does_not_exist".to_string(),
            qty: 1,
        }],
        coupon_code: None,
    };
    let err = state.lifecycle.create_order(&student(), req).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn test_snapshot_immune_to_menu_edits() {
    let state = test_state().await;
    let ids = seed_menu(&state).await;

    let order = state
        .lifecycle
        .create_order(&student(), cart(&ids, 1))
        .await
        .expect("checkout");

    // 菜单下架不影响已创建订单的快照
    let repo = MenuItemRepository::new(state.db.clone());
    repo.set_available(&ids[0], false).await.expect("disable item");

    let reloaded = canteen_server::db::repository::OrderRepository::new(state.db.clone())
        .find_by_id(&order.id_string())
        .await
        .expect("reload")
        .expect("exists");
    assert_eq!(reloaded.items[0].name, "Veg Thali");
    assert_eq!(reloaded.items[0].unit_price, 100.0);
}

// =============================================================================
// 优惠券
// =============================================================================

async fn seed_coupon(state: &ServerState, data: CouponCreate) {
    CouponRepository::new(state.db.clone())
        .create(data)
        .await
        .expect("seed coupon");
}

#[tokio::test]
async fn test_percentage_coupon_with_cap_applies() {
    let state = test_state().await;
    let ids = seed_menu(&state).await;
    seed_coupon(
        &state,
        CouponCreate {
            code: "save10".to_string(),
            kind: CouponKind::Percentage,
            value: 10.0,
            max_discount: Some(15.0),
            usage_limit: None,
            starts_at: None,
            expires_at: None,
            canteen: None,
        },
    )
    .await;

    let mut req = cart(&ids, 2);
    // 码大小写不敏感
    req.coupon_code = Some("SaVe10".to_string());
    let order = state
        .lifecycle
        .create_order(&student(), req)
        .await
        .expect("checkout");

    // min(10% × 200, 15) = 15 → 200 + 4 + 10 − 15 = 199
    assert_eq!(order.discount, 15.0);
    assert_eq!(order.total_amount, 199.0);
    assert_eq!(order.coupon_code.as_deref(), Some("SAVE10"));
}

#[tokio::test]
async fn test_expired_coupon_silently_ignored() {
    let state = test_state().await;
    let ids = seed_menu(&state).await;
    seed_coupon(
        &state,
        CouponCreate {
            code: "OLD".to_string(),
            kind: CouponKind::Flat,
            value: 50.0,
            max_discount: None,
            usage_limit: None,
            starts_at: None,
            expires_at: Some(now_millis() - 1_000),
            canteen: None,
        },
    )
    .await;

    let mut req = cart(&ids, 2);
    req.coupon_code = Some("OLD".to_string());
    // 过期券不报错，订单照常创建，无折扣
    let order = state
        .lifecycle
        .create_order(&student(), req)
        .await
        .expect("checkout must not fail on expired coupon");
    assert_eq!(order.discount, 0.0);
    assert_eq!(order.total_amount, 214.0);
    assert!(order.coupon_code.is_none());
}

#[tokio::test]
async fn test_wrong_canteen_coupon_silently_ignored() {
    let state = test_state().await;
    let ids = seed_menu(&state).await;
    seed_coupon(
        &state,
        CouponCreate {
            code: "SOUTHONLY".to_string(),
            kind: CouponKind::Flat,
            value: 20.0,
            max_discount: None,
            usage_limit: None,
            starts_at: None,
            expires_at: None,
            canteen: Some("canteen:south".to_string()),
        },
    )
    .await;

    let mut req = cart(&ids, 2);
    req.coupon_code = Some("SOUTHONLY".to_string());
    let order = state.lifecycle.create_order(&student(), req).await.expect("checkout");
    assert_eq!(order.discount, 0.0);
}

#[tokio::test]
async fn test_unknown_coupon_code_silently_ignored() {
    let state = test_state().await;
    let ids = seed_menu(&state).await;

    let mut req = cart(&ids, 2);
    req.coupon_code = Some("NOPE".to_string());
    let order = state.lifecycle.create_order(&student(), req).await.expect("checkout");
    assert_eq!(order.discount, 0.0);
}

// =============================================================================
// 状态机
// =============================================================================

#[tokio::test]
async fn test_status_progression_stamps_timeline_once() {
    let state = test_state().await;
    let ids = seed_menu(&state).await;
    let order = state
        .lifecycle
        .create_order(&student(), cart(&ids, 1))
        .await
        .expect("checkout");
    let id = order.id_string();

    let cooking = state
        .lifecycle
        .update_status(
            &admin(),
            &id,
            UpdateStatusRequest {
                status: OrderStatus::Cooking,
                payment_status: None,
            },
        )
        .await
        .expect("to cooking");
    assert_eq!(cooking.status, OrderStatus::Cooking);
    let cooking_at = cooking.timeline.cooking_at.expect("cooking_at stamped");

    let ready = state
        .lifecycle
        .update_status(
            &admin(),
            &id,
            UpdateStatusRequest {
                status: OrderStatus::Ready,
                payment_status: None,
            },
        )
        .await
        .expect("to ready");
    assert!(ready.timeline.ready_at.is_some());
    // 先前的时间戳不被后续转移清除或改写
    assert_eq!(ready.timeline.cooking_at, Some(cooking_at));
    assert_eq!(ready.timeline.pending_at, order.timeline.pending_at);
}

#[tokio::test]
async fn test_skipping_cooking_leaves_timeline_untouched() {
    let state = test_state().await;
    let ids = seed_menu(&state).await;
    let order = state
        .lifecycle
        .create_order(&student(), cart(&ids, 1))
        .await
        .expect("checkout");

    // 直接 Pending → Ready：cooking_at 保持未设置
    let ready = state
        .lifecycle
        .update_status(
            &admin(),
            &order.id_string(),
            UpdateStatusRequest {
                status: OrderStatus::Ready,
                payment_status: None,
            },
        )
        .await
        .expect("to ready");
    assert!(ready.timeline.ready_at.is_some());
    assert!(ready.timeline.cooking_at.is_none());
}

#[tokio::test]
async fn test_ready_pushes_user_notification() {
    let state = test_state().await;
    let ids = seed_menu(&state).await;
    let user = student();
    let order = state
        .lifecycle
        .create_order(&user, cart(&ids, 1))
        .await
        .expect("checkout");

    state
        .lifecycle
        .update_status(
            &admin(),
            &order.id_string(),
            UpdateStatusRequest {
                status: OrderStatus::Ready,
                payment_status: None,
            },
        )
        .await
        .expect("to ready");

    let notifications = state.fanout.notifications_for(&user.id);
    let ready_note = notifications
        .iter()
        .find(|n| n.title == "Order ready for pickup")
        .expect("ready notification pushed");
    assert!(ready_note.body.contains(&order.token_number));
}

#[tokio::test]
async fn test_non_admin_cannot_update_status() {
    let state = test_state().await;
    let ids = seed_menu(&state).await;
    let order = state
        .lifecycle
        .create_order(&student(), cart(&ids, 1))
        .await
        .expect("checkout");

    let err = state
        .lifecycle
        .update_status(
            &student(),
            &order.id_string(),
            UpdateStatusRequest {
                status: OrderStatus::Cooking,
                payment_status: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err:?}");
}

#[tokio::test]
async fn test_pending_is_not_a_valid_target() {
    let state = test_state().await;
    let ids = seed_menu(&state).await;
    let order = state
        .lifecycle
        .create_order(&student(), cart(&ids, 1))
        .await
        .expect("checkout");

    let err = state
        .lifecycle
        .update_status(
            &admin(),
            &order.id_string(),
            UpdateStatusRequest {
                status: OrderStatus::Pending,
                payment_status: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn test_terminal_state_is_immutable() {
    let state = test_state().await;
    let ids = seed_menu(&state).await;
    let order = state
        .lifecycle
        .create_order(&student(), cart(&ids, 1))
        .await
        .expect("checkout");
    let id = order.id_string();

    state
        .lifecycle
        .update_status(
            &admin(),
            &id,
            UpdateStatusRequest {
                status: OrderStatus::Delivered,
                payment_status: None,
            },
        )
        .await
        .expect("deliver");

    // 终态之后任何转移都是调用方错误，不是静默忽略
    for target in [OrderStatus::Cooking, OrderStatus::Cancelled, OrderStatus::Rejected] {
        let err = state
            .lifecycle
            .update_status(
                &admin(),
                &id,
                UpdateStatusRequest {
                    status: target,
                    payment_status: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)), "target {target}: got {err:?}");
    }
}

#[tokio::test]
async fn test_update_status_missing_order_is_404() {
    let state = test_state().await;

    let err = state
        .lifecycle
        .update_status(
            &admin(),
            "order:ghost",
            UpdateStatusRequest {
                status: OrderStatus::Cooking,
                payment_status: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn test_admin_can_override_payment_status() {
    let state = test_state().await;
    let ids = seed_menu(&state).await;
    let order = state
        .lifecycle
        .create_order(&student(), cart(&ids, 1))
        .await
        .expect("checkout");

    let rejected = state
        .lifecycle
        .update_status(
            &admin(),
            &order.id_string(),
            UpdateStatusRequest {
                status: OrderStatus::Rejected,
                payment_status: Some(PaymentStatus::Refunded),
            },
        )
        .await
        .expect("reject with refund");
    assert_eq!(rejected.status, OrderStatus::Rejected);
    assert_eq!(rejected.payment_status, PaymentStatus::Refunded);
    assert!(rejected.timeline.cancelled_at.is_some());
}

// =============================================================================
// 取消
// =============================================================================

#[tokio::test]
async fn test_owner_can_cancel_while_pending_or_cooking() {
    let state = test_state().await;
    let ids = seed_menu(&state).await;
    let user = student();

    for warmup in [None, Some(OrderStatus::Cooking)] {
        let order = state
            .lifecycle
            .create_order(&user, cart(&ids, 1))
            .await
            .expect("checkout");
        let id = order.id_string();

        if let Some(status) = warmup {
            state
                .lifecycle
                .update_status(
                    &admin(),
                    &id,
                    UpdateStatusRequest {
                        status,
                        payment_status: None,
                    },
                )
                .await
                .expect("warmup transition");
        }

        let cancelled = state.lifecycle.cancel_order(&user, &id).await.expect("cancel");
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
        assert!(cancelled.timeline.cancelled_at.is_some());
    }
}

#[tokio::test]
async fn test_cancel_rejected_at_ready_and_order_unchanged() {
    let state = test_state().await;
    let ids = seed_menu(&state).await;
    let user = student();
    let order = state
        .lifecycle
        .create_order(&user, cart(&ids, 1))
        .await
        .expect("checkout");
    let id = order.id_string();

    state
        .lifecycle
        .update_status(
            &admin(),
            &id,
            UpdateStatusRequest {
                status: OrderStatus::Ready,
                payment_status: None,
            },
        )
        .await
        .expect("to ready");

    let err = state.lifecycle.cancel_order(&user, &id).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");

    // 订单状态未被改动
    let reloaded = canteen_server::db::repository::OrderRepository::new(state.db.clone())
        .find_by_id(&id)
        .await
        .expect("reload")
        .expect("exists");
    assert_eq!(reloaded.status, OrderStatus::Ready);
    assert_eq!(reloaded.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn test_only_owner_may_cancel() {
    let state = test_state().await;
    let ids = seed_menu(&state).await;
    let order = state
        .lifecycle
        .create_order(&student(), cart(&ids, 1))
        .await
        .expect("checkout");

    let mallory = CurrentUser::new("user:mallory", "Mallory", Role::Student);
    let err = state
        .lifecycle
        .cancel_order(&mallory, &order.id_string())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err:?}");
}

#[tokio::test]
async fn test_cancel_missing_order_is_404() {
    let state = test_state().await;
    let err = state
        .lifecycle
        .cancel_order(&student(), "order:ghost")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}
