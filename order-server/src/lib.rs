//! Order Server - 订单生命周期服务
//!
//! # 架构概述
//!
//! 订单从创建到审批（转为销售）或取消的完整生命周期：
//!
//! - **订单** (`orders`): 状态机、库存预留、支付核对、审批 saga
//! - **审计** (`audit`): SHA-256 哈希链审计日志
//! - **认证** (`auth`): 操作人提取与权限检查
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! order-server/src/
//! ├── core/          # 配置、状态、错误、服务器
//! ├── auth/          # 操作人、权限
//! ├── audit/         # 审计哈希链
//! ├── orders/        # 订单生命周期
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 日志等工具
//! ```

pub mod api;
pub mod audit;
pub mod auth;
pub mod core;
pub mod orders;
pub mod utils;

// Re-export 公共类型
pub use auth::CurrentActor;
pub use core::{Config, Server, ServerError, ServerState};
pub use orders::{OrderService, OrderStorage};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - 安全事件统一写入 "security" target
#[macro_export]
macro_rules! security_log {
    (WARN, $event:expr, $($arg:tt)*) => {
        tracing::warn!(
            target: "security",
            event = $event,
            timestamp = chrono::Local::now().to_rfc3339(),
            level = "WARN",
            $($arg)*
        );
    };
    (ERROR, $event:expr, $($arg:tt)*) => {
        tracing::error!(
            target: "security",
            event = $event,
            timestamp = chrono::Local::now().to_rfc3339(),
            level = "ERROR",
            $($arg)*
        );
    };
    (INFO, $event:expr, $($arg:tt)*) => {
        tracing::info!(
            target: "security",
            event = $event,
            timestamp = chrono::Local::now().to_rfc3339(),
            level = "INFO",
            $($arg)*
        );
    };
}

/// 设置运行环境: 加载 .env，初始化日志
pub fn setup_environment() -> anyhow::Result<Config> {
    // .env 不存在时忽略
    let _ = dotenv::dotenv();

    let config = Config::from_env();
    init_logger_with_file(
        Some(&config.log_level),
        Some(config.is_production()),
        config.log_dir.as_deref(),
    );
    Ok(config)
}

pub fn print_banner() {
    println!(
        r#"
   ____           __
  / __ \_________/ /__  __________
 / / / / ___/ __  / _ \/ ___/ ___/
/ /_/ / /  / /_/ /  __/ /  (__  )
\____/_/   \__,_/\___/_/  /____/
    "#
    );
}
