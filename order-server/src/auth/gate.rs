//! Permission gate
//!
//! OrderService asks the gate before every mutating operation. The default
//! implementation is a role table: each actor maps to one role, each role
//! to a list of `module:action` permissions (with `module:*` and `all`
//! wildcards).

use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use super::permissions::{get_default_permissions, is_valid_permission, permission_matches};

pub trait PermissionGate: Send + Sync {
    fn has_permission(&self, actor_id: i64, module: &str, action: &str) -> bool;
}

#[derive(Debug, Error)]
pub enum PermissionConfigError {
    #[error("Failed to read permissions file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid permissions file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Permissions file layout
///
/// ```json
/// {
///   "roles": { "manager": ["orders:*"], "clerk": ["orders:create", "orders:edit"] },
///   "users": { "1": "admin", "42": "clerk" },
///   "defaultRole": null
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionTable {
    #[serde(default)]
    pub roles: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub users: HashMap<i64, String>,
    /// Role applied to actors missing from `users`
    #[serde(default)]
    pub default_role: Option<String>,
}

/// Role-based permission gate
#[derive(Debug, Default)]
pub struct RolePermissionGate {
    table: RwLock<PermissionTable>,
}

impl RolePermissionGate {
    pub fn new(table: PermissionTable) -> Self {
        for (role, perms) in &table.roles {
            for perm in perms.iter().filter(|p| !is_valid_permission(p)) {
                tracing::warn!(role = %role, permission = %perm, "Unknown permission in role table");
            }
        }
        Self {
            table: RwLock::new(table),
        }
    }

    /// Built-in roles (admin / manager / clerk), optional fallback role
    pub fn with_default_roles(default_role: Option<&str>) -> Self {
        let roles = ["admin", "manager", "clerk"]
            .into_iter()
            .map(|r| (r.to_string(), get_default_permissions(r)))
            .collect();
        Self::new(PermissionTable {
            roles,
            users: HashMap::new(),
            default_role: default_role.map(String::from),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PermissionConfigError> {
        let content = std::fs::read_to_string(path)?;
        let table: PermissionTable = serde_json::from_str(&content)?;
        Ok(Self::new(table))
    }

    /// Assign (or reassign) a role to an actor
    pub fn assign_role(&self, actor_id: i64, role: impl Into<String>) {
        self.table.write().users.insert(actor_id, role.into());
    }

    pub fn role_of(&self, actor_id: i64) -> Option<String> {
        let table = self.table.read();
        table
            .users
            .get(&actor_id)
            .or(table.default_role.as_ref())
            .cloned()
    }
}

impl PermissionGate for RolePermissionGate {
    fn has_permission(&self, actor_id: i64, module: &str, action: &str) -> bool {
        let required = format!("{}:{}", module, action);
        let table = self.table.read();
        let Some(role) = table.users.get(&actor_id).or(table.default_role.as_ref()) else {
            return false;
        };
        table
            .roles
            .get(role)
            .is_some_and(|perms| perms.iter().any(|p| permission_matches(p, &required)))
    }
}
