//! Permission Definitions
//!
//! 权限字符串格式为 `module:action`。
//!
//! ## 通配符
//! - `"orders:*"` 匹配 orders 模块的所有操作
//! - `"all"` 匹配所有权限

/// 订单模块名
pub const ORDERS_MODULE: &str = "orders";

/// 可配置权限列表
pub const ALL_PERMISSIONS: &[&str] = &[
    "orders:create",  // 创建订单
    "orders:edit",    // 修改待审批订单
    "orders:approve", // 审批订单（生成销售单）
    "orders:cancel",  // 取消订单
];

/// Default role permissions
pub const DEFAULT_ADMIN_PERMISSIONS: &[&str] = &["all"];

/// 经理角色默认权限（订单全部操作）
pub const DEFAULT_MANAGER_PERMISSIONS: &[&str] = &["orders:*"];

/// 店员默认权限（开单、改单）
pub const DEFAULT_CLERK_PERMISSIONS: &[&str] = &["orders:create", "orders:edit"];

/// Get permissions for a role name
pub fn get_default_permissions(role_name: &str) -> Vec<String> {
    let perms: &[&str] = match role_name {
        "admin" => DEFAULT_ADMIN_PERMISSIONS,
        "manager" => DEFAULT_MANAGER_PERMISSIONS,
        "clerk" => DEFAULT_CLERK_PERMISSIONS,
        _ => &[],
    };
    perms.iter().map(|s| s.to_string()).collect()
}

/// Validate if a permission string is valid
pub fn is_valid_permission(permission: &str) -> bool {
    ALL_PERMISSIONS.contains(&permission) || permission == "all" || permission.ends_with(":*")
}

/// Whether a granted permission covers the required `module:action`
pub fn permission_matches(granted: &str, required: &str) -> bool {
    if granted == "all" || granted == required {
        return true;
    }
    // 处理通配符模式，如 "orders:*" 匹配 "orders:approve"
    match granted.strip_suffix(":*") {
        Some(prefix) => required
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with(':')),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_matches() {
        assert!(permission_matches("all", "orders:approve"));
        assert!(permission_matches("orders:approve", "orders:approve"));
        assert!(permission_matches("orders:*", "orders:cancel"));
        assert!(!permission_matches("orders:*", "ordersx:cancel"));
        assert!(!permission_matches("orders:edit", "orders:approve"));
        assert!(!permission_matches("reports:*", "orders:create"));
    }

    #[test]
    fn test_default_roles() {
        assert_eq!(get_default_permissions("admin"), vec!["all"]);
        assert_eq!(get_default_permissions("clerk").len(), 2);
        assert!(get_default_permissions("ghost").is_empty());
    }

    #[test]
    fn test_is_valid_permission() {
        assert!(is_valid_permission("orders:approve"));
        assert!(is_valid_permission("orders:*"));
        assert!(is_valid_permission("all"));
        assert!(!is_valid_permission("orders:refund"));
    }
}
