//! 审计日志 redb 存储层
//!
//! Append-only 设计，没有任何删除/更新接口。
//! SHA256 哈希链确保防篡改。

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use sha2::{Digest, Sha256};
use shared::order::{AuditAction, AuditChainBreak, AuditChainVerification, AuditEntry, LineChange};
use std::sync::Arc;

use crate::orders::storage::{AUDIT_SEQ_KEY, SEQUENCE_TABLE, StorageResult};

/// Global audit log: key = sequence, value = JSON-serialized AuditEntry
const AUDIT_LOG_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("audit_log");

/// Per-order index: key = (order_id, sequence)
const ORDER_AUDIT_TABLE: TableDefinition<(&str, u64), ()> = TableDefinition::new("order_audit");

/// Chain head: key = "last_hash", value = curr_hash of the newest entry
const AUDIT_HEAD_TABLE: TableDefinition<&str, &str> = TableDefinition::new("audit_head");

const LAST_HASH_KEY: &str = "last_hash";
const GENESIS_HASH: &str = "genesis";

/// 待写入的审计内容（序列号、时间戳、哈希由日志分配）
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub order_id: String,
    pub action: AuditAction,
    pub actor_id: i64,
    pub changes: Vec<LineChange>,
    pub notes: Option<String>,
}

/// 审计日志
///
/// - 仅提供 `append` 和 `read` 方法
/// - 没有 delete/update 接口
/// - SHA256 哈希链确保完整性
#[derive(Clone)]
pub struct AuditLog {
    db: Arc<Database>,
}

impl AuditLog {
    pub(crate) fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub(crate) fn init_tables(txn: &WriteTransaction) -> StorageResult<()> {
        let _ = txn.open_table(AUDIT_LOG_TABLE)?;
        let _ = txn.open_table(ORDER_AUDIT_TABLE)?;
        let _ = txn.open_table(AUDIT_HEAD_TABLE)?;
        Ok(())
    }

    /// 追加一条审计日志（独立事务）
    pub fn append(&self, record: AuditRecord) -> StorageResult<AuditEntry> {
        let txn = self.db.begin_write()?;
        let entry = self.append_txn(&txn, record)?;
        txn.commit()?;
        Ok(entry)
    }

    /// 在调用方的写事务中追加审计日志
    ///
    /// 订单写入与审计条目同事务提交，要么都可见，要么都不可见。
    pub fn append_txn(
        &self,
        txn: &WriteTransaction,
        record: AuditRecord,
    ) -> StorageResult<AuditEntry> {
        // 1. 分配序列号
        let sequence = {
            let mut seq_table = txn.open_table(SEQUENCE_TABLE)?;
            let next = seq_table
                .get(AUDIT_SEQ_KEY)?
                .map(|g| g.value())
                .unwrap_or(0)
                + 1;
            seq_table.insert(AUDIT_SEQ_KEY, next)?;
            next
        };

        // 2. 读取链头
        let mut head_table = txn.open_table(AUDIT_HEAD_TABLE)?;
        let prev_hash = head_table
            .get(LAST_HASH_KEY)?
            .map(|g| g.value().to_string())
            .unwrap_or_else(|| GENESIS_HASH.to_string());

        // 3. 计算哈希
        let timestamp = shared::util::now_millis();
        let mut entry = AuditEntry {
            id: sequence,
            order_id: record.order_id,
            action: record.action,
            actor_id: record.actor_id,
            timestamp,
            changes: record.changes,
            notes: record.notes,
            prev_hash,
            curr_hash: String::new(),
        };
        entry.curr_hash = compute_audit_hash(&entry);

        // 4. 写入日志、索引、链头
        {
            let mut log_table = txn.open_table(AUDIT_LOG_TABLE)?;
            let value = serde_json::to_vec(&entry)?;
            log_table.insert(sequence, value.as_slice())?;
        }
        {
            let mut index_table = txn.open_table(ORDER_AUDIT_TABLE)?;
            index_table.insert((entry.order_id.as_str(), sequence), ())?;
        }
        head_table.insert(LAST_HASH_KEY, entry.curr_hash.as_str())?;

        Ok(entry)
    }

    /// 读取某订单的审计历史（从旧到新）
    pub fn read(&self, order_id: &str) -> StorageResult<Vec<AuditEntry>> {
        let read_txn = self.db.begin_read()?;
        let index_table = read_txn.open_table(ORDER_AUDIT_TABLE)?;
        let log_table = read_txn.open_table(AUDIT_LOG_TABLE)?;

        let mut entries = Vec::new();
        for result in index_table.range((order_id, 0u64)..=(order_id, u64::MAX))? {
            let (key, _) = result?;
            let (_, sequence) = key.value();
            if let Some(value) = log_table.get(sequence)? {
                entries.push(serde_json::from_slice::<AuditEntry>(value.value())?);
            }
        }
        Ok(entries)
    }

    /// 读取全部审计日志（按序列号）
    pub fn read_all(&self) -> StorageResult<Vec<AuditEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT_LOG_TABLE)?;

        let mut entries = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            entries.push(serde_json::from_slice::<AuditEntry>(value.value())?);
        }
        Ok(entries)
    }

    /// 验证整条哈希链
    ///
    /// 两类断裂：`prev_hash` 未指向上一条的 `curr_hash`（插入/删除），
    /// 或重新计算的哈希与 `curr_hash` 不一致（内容篡改）。
    pub fn verify_chain(&self) -> StorageResult<AuditChainVerification> {
        let entries = self.read_all()?;
        let mut breaks = Vec::new();
        let mut expected_prev = GENESIS_HASH.to_string();

        for entry in &entries {
            let hash_mismatch = compute_audit_hash(entry) != entry.curr_hash;
            if entry.prev_hash != expected_prev || hash_mismatch {
                breaks.push(AuditChainBreak {
                    entry_id: entry.id,
                    expected_prev_hash: expected_prev.clone(),
                    actual_prev_hash: entry.prev_hash.clone(),
                    hash_mismatch,
                });
            }
            expected_prev = entry.curr_hash.clone();
        }

        if !breaks.is_empty() {
            tracing::error!(breaks = breaks.len(), "Audit chain verification failed");
        }

        Ok(AuditChainVerification {
            total_entries: entries.len() as u64,
            chain_intact: breaks.is_empty(),
            breaks,
        })
    }
}

/// 计算审计条目的 SHA256 哈希
///
/// 除 `curr_hash` 外所有字段参与哈希：
/// - 变长字段间用 `\x00` 分隔，防止 `("ab","cd")` 与 `("abc","d")` 碰撞
/// - 定长字段（u64/i64）用 LE 字节序，无需分隔
/// - Optional 字段用 `\x00`=None / `\x01`+bytes=Some 区分
fn compute_audit_hash(entry: &AuditEntry) -> String {
    let mut hasher = Sha256::new();

    // 链接前一条哈希
    hasher.update(entry.prev_hash.as_bytes());
    hasher.update(b"\x00");

    // 定长字段
    hasher.update(entry.id.to_le_bytes());
    hasher.update(entry.timestamp.to_le_bytes());
    hasher.update(entry.actor_id.to_le_bytes());

    hasher.update(entry.order_id.as_bytes());
    hasher.update(b"\x00");

    let action_str = serde_json::to_string(&entry.action).unwrap_or_default();
    hasher.update(action_str.as_bytes());
    hasher.update(b"\x00");

    let changes_json = serde_json::to_string(&entry.changes).unwrap_or_default();
    hasher.update(changes_json.as_bytes());
    hasher.update(b"\x00");

    hash_optional(&mut hasher, entry.notes.as_deref());

    hex::encode(hasher.finalize())
}

/// Optional 字段哈希：`\x00` = None, `\x01` + bytes + `\x00` = Some
fn hash_optional(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update(b"\x01");
            hasher.update(v.as_bytes());
        }
        None => {
            hasher.update(b"\x00");
        }
    }
    hasher.update(b"\x00");
}
