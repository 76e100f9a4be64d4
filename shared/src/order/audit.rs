//! 订单审计条目
//!
//! 每条记录不可变、不可删除，带 SHA256 哈希链（prev_hash → curr_hash）。

use serde::{Deserialize, Serialize};

/// 审计操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Created,
    Edited,
    Approved,
    Cancelled,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuditAction::Created => "CREATED",
            AuditAction::Edited => "EDITED",
            AuditAction::Approved => "APPROVED",
            AuditAction::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// Line-level change recorded in an audit entry
///
/// Wire form: `{ "kind": "MODIFIED", "productId": 1, "fromQty": 5, "toQty": 3 }`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "kind",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum LineChange {
    Added { product_id: i64, to_qty: i32 },
    Removed { product_id: i64, from_qty: i32 },
    Modified {
        product_id: i64,
        from_qty: i32,
        to_qty: i32,
    },
}

impl LineChange {
    pub fn product_id(&self) -> i64 {
        match self {
            LineChange::Added { product_id, .. }
            | LineChange::Removed { product_id, .. }
            | LineChange::Modified { product_id, .. } => *product_id,
        }
    }
}

/// 审计日志条目（不可变）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// 全局递增序列号
    pub id: u64,
    pub order_id: String,
    pub action: AuditAction,
    pub actor_id: i64,
    /// Unix 毫秒
    pub timestamp: i64,
    pub changes: Vec<LineChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// 前一条审计日志哈希（首条为 "genesis"）
    pub prev_hash: String,
    /// 当前记录哈希（SHA256）
    pub curr_hash: String,
}

/// 审计链验证结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditChainVerification {
    pub total_entries: u64,
    pub chain_intact: bool,
    pub breaks: Vec<AuditChainBreak>,
}

/// 审计链断裂点
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditChainBreak {
    pub entry_id: u64,
    pub expected_prev_hash: String,
    pub actual_prev_hash: String,
    /// 条目内容被篡改（重新计算的哈希与 curr_hash 不一致）
    pub hash_mismatch: bool,
}
