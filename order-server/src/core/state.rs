use std::sync::Arc;

use crate::auth::{PermissionGate, RolePermissionGate};
use crate::core::{Config, Result};
use crate::orders::{
    HttpSalesConversion, InMemoryCatalog, LocalSalesConversion, OrderService, OrderServiceConfig,
    OrderStorage, ProductCatalog, SalesConversion,
};

/// 服务器状态 - 持有所有服务的共享引用
///
/// 使用 Arc 实现浅拷贝，作为 axum 的 `State` 传给每个处理器。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | orders | Arc<OrderService> | 订单生命周期服务 |
/// | catalog | Arc<InMemoryCatalog> | 商品库存 |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub orders: Arc<OrderService>,
    pub catalog: Arc<InMemoryCatalog>,
}

impl ServerState {
    pub fn new(config: Config, orders: Arc<OrderService>, catalog: Arc<InMemoryCatalog>) -> Self {
        Self {
            config,
            orders,
            catalog,
        }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录
    /// 2. 数据库 (work_dir/orders.redb)
    /// 3. 商品目录 (CATALOG_SEED_PATH)
    /// 4. 权限表 (PERMISSIONS_PATH，未设置时使用内置角色)
    /// 5. 销售服务 (SALES_SERVICE_URL，未设置时使用进程内实现)
    /// 6. OrderService (从 PENDING 订单重建库存预留)
    pub async fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;

        let db_path = config.database_path();
        let storage = OrderStorage::open(&db_path)?;
        tracing::info!(path = %db_path.display(), "Order database opened");

        let catalog = match &config.catalog_seed_path {
            Some(path) => {
                let catalog = InMemoryCatalog::load_seed(path)?;
                tracing::info!(path = %path, products = catalog.len(), "Product catalog loaded");
                catalog
            }
            None => {
                tracing::warn!("CATALOG_SEED_PATH not set, starting with an empty catalog");
                InMemoryCatalog::new()
            }
        };
        let catalog = Arc::new(catalog);

        let permissions: Arc<dyn PermissionGate> = match &config.permissions_path {
            Some(path) => Arc::new(RolePermissionGate::load(path)?),
            None => {
                let default_role = if config.is_production() {
                    None
                } else {
                    Some("admin")
                };
                tracing::warn!(
                    default_role = ?default_role,
                    "PERMISSIONS_PATH not set, using built-in roles"
                );
                Arc::new(RolePermissionGate::with_default_roles(default_role))
            }
        };

        let sales: Arc<dyn SalesConversion> = match &config.sales_service_url {
            Some(url) => {
                tracing::info!(url = %url, "Using remote sales service");
                Arc::new(HttpSalesConversion::new(url.clone(), config.sales_timeout())?)
            }
            None => {
                tracing::info!("SALES_SERVICE_URL not set, using in-process sales book");
                Arc::new(LocalSalesConversion::new())
            }
        };

        if config.sales_timeout() >= config.request_timeout() {
            // 请求超时先触发时审批会被中断并回滚预留
            tracing::warn!(
                sales_timeout_ms = config.sales_timeout_ms,
                request_timeout_ms = config.request_timeout_ms,
                "SALES_TIMEOUT_MS is not below REQUEST_TIMEOUT_MS, approvals may be cut off by the request timeout"
            );
        }

        let service = OrderService::new(
            storage,
            catalog.clone() as Arc<dyn ProductCatalog>,
            permissions,
            sales,
            OrderServiceConfig {
                payment_tolerance: config.payment_tolerance,
                sales_timeout: config.sales_timeout(),
            },
        )?;

        Ok(Self::new(config.clone(), Arc::new(service), catalog))
    }

    pub fn order_service(&self) -> &Arc<OrderService> {
        &self.orders
    }
}
