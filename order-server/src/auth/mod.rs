//! 认证授权模块
//!
//! - [`CurrentActor`] - 当前操作人（`X-Operator-Id` 头）
//! - [`PermissionGate`] - 权限检查接口
//! - [`RolePermissionGate`] - 基于角色表的默认实现

pub mod extractor;
pub mod gate;
pub mod permissions;

pub use extractor::{CurrentActor, OPERATOR_HEADER};
pub use gate::{PermissionConfigError, PermissionGate, PermissionTable, RolePermissionGate};
