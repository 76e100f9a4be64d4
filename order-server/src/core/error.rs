use thiserror::Error;

use crate::auth::PermissionConfigError;
use crate::orders::{CatalogError, OrderError, SalesError, StorageError};

/// 启动 / 运行期错误
///
/// 请求级错误走 [`crate::AppError`]，这里只覆盖初始化和服务器生命周期。
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("数据库初始化失败: {0}")]
    Storage(#[from] StorageError),

    #[error("商品目录加载失败: {0}")]
    Catalog(#[from] CatalogError),

    #[error("权限表加载失败: {0}")]
    Permissions(#[from] PermissionConfigError),

    #[error("销售服务客户端初始化失败: {0}")]
    Sales(#[from] SalesError),

    #[error("订单服务初始化失败: {0}")]
    Orders(#[from] OrderError),

    #[error("内部服务器错误: {0}")]
    Internal(#[from] anyhow::Error),
}

/// 启动流程的 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
