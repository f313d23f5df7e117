//! Canteen Server - 校园食堂订餐平台核心
//!
//! # 架构概述
//!
//! 本模块是订单生命周期与计费引擎的主入口，提供以下核心功能：
//!
//! - **订单生命周期** (`orders`): 创建 / 状态机推进 / 取消，守卫更新消灭读写竞态
//! - **计费** (`billing`): 纯函数账单计算 (rust_decimal 精确算术)
//! - **优惠券** (`coupons`): 下单时有效性判定 + 原子核销
//! - **事件扇出** (`notify`): 按主题的实时事件广播 + 每用户通知环
//! - **操作日志** (`audit`): 只追加审计轨迹，独立于业务事务路径
//! - **数据库** (`db`): 嵌入式 SurrealDB 存储
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! canteen-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── auth/          # 网关身份提取、角色守卫
//! ├── api/           # HTTP 路由和处理器
//! ├── orders/        # 订单状态机、取餐令牌
//! ├── billing/       # 账单计算
//! ├── coupons/       # 优惠券有效性
//! ├── notify/        # 事件扇出、用户通知
//! ├── audit/         # 操作日志
//! ├── db/            # 数据库层
//! └── utils/         # 工具函数
//! ```

pub mod api;
pub mod audit;
pub mod auth;
pub mod billing;
pub mod core;
pub mod coupons;
pub mod db;
pub mod notify;
pub mod orders;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, Role};
pub use core::{Config, Server, ServerState};
pub use notify::FanoutService;
pub use orders::OrderLifecycleManager;
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置环境 (dotenv + 日志)
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenv::dotenv();
    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(log_level.as_deref(), log_dir.as_deref());
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
   ______            __
  / ____/___ _____  / /____  ___  ____
 / /   / __ `/ __ \/ __/ _ \/ _ \/ __ \
/ /___/ /_/ / / / / /_/  __/  __/ / / /
\____/\__,_/_/ /_/\__/\___/\___/_/ /_/
    "#
    );
}
