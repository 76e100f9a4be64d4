use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/orders | 工作目录 (orders.redb 所在位置) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (无) | 日志文件目录，未设置则只输出到终端 |
/// | PAYMENT_TOLERANCE | 1 | 支付总额允许误差 (货币单位) |
/// | SALES_TIMEOUT_MS | 5000 | 销售服务调用超时 (毫秒) |
/// | SALES_SERVICE_URL | (无) | 销售服务地址，未设置则使用进程内实现 |
/// | CATALOG_SEED_PATH | (无) | 商品库存种子文件 (JSON) |
/// | PERMISSIONS_PATH | (无) | 角色权限表 (JSON) |
/// | REQUEST_TIMEOUT_MS | 30000 | HTTP 请求超时 (毫秒) |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/orders HTTP_PORT=8080 PAYMENT_TOLERANCE=0.5 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    /// 审批时支付总额与订单总额的最大允许差额
    pub payment_tolerance: Decimal,
    /// 销售服务调用超时 (毫秒)
    pub sales_timeout_ms: u64,
    pub sales_service_url: Option<String>,
    pub catalog_seed_path: Option<String>,
    pub permissions_path: Option<String>,
    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/orders".into()),
            http_port: env_parse("HTTP_PORT").unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: env_opt("LOG_DIR"),
            payment_tolerance: env_parse("PAYMENT_TOLERANCE")
                .filter(|t: &Decimal| !t.is_sign_negative())
                .unwrap_or(Decimal::ONE),
            sales_timeout_ms: env_parse("SALES_TIMEOUT_MS").unwrap_or(5000),
            sales_service_url: env_opt("SALES_SERVICE_URL"),
            catalog_seed_path: env_opt("CATALOG_SEED_PATH"),
            permissions_path: env_opt("PERMISSIONS_PATH"),
            request_timeout_ms: env_parse("REQUEST_TIMEOUT_MS").unwrap_or(30000),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// redb 数据库文件路径
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("orders.redb")
    }

    pub fn sales_timeout(&self) -> Duration {
        Duration::from_millis(self.sales_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
