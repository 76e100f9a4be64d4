//! redb-based storage layer for orders
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` (JSON) | Current order state |
//! | `audit_log` | `sequence` | `AuditEntry` (JSON) | Append-only audit chain |
//! | `order_audit` | `(order_id, sequence)` | `()` | Per-order audit index |
//! | `sequence_counter` | `"audit_seq"` / `"order_count"` | `u64` | Counters |
//! | `audit_head` | `"last_hash"` | `&str` | Hash of the newest audit entry |
//!
//! # Atomicity
//!
//! Every mutation writes the order and its audit entry in one write
//! transaction. redb allows a single writer at a time, so the
//! compare-and-set in [`OrderStorage::commit_transition`] cannot interleave
//! with another commit. Reads use read transactions and only ever see
//! committed state.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use shared::order::{AuditEntry, Order, OrderStatus};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::audit::{AuditLog, AuditRecord};

/// Table for orders: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Table for counters: key = "audit_seq" or "order_count", value = u64
pub(crate) const SEQUENCE_TABLE: TableDefinition<&str, u64> =
    TableDefinition::new("sequence_counter");

pub(crate) const AUDIT_SEQ_KEY: &str = "audit_seq";
const ORDER_COUNT_KEY: &str = "order_count";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Compare-and-set lost: the persisted order no longer matches the
    /// status/version the caller loaded
    #[error("Stale write on order {order_id}: persisted status={status}, version={version}")]
    StaleWrite {
        order_id: String,
        status: OrderStatus,
        version: u64,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Order storage backed by redb
#[derive(Clone)]
pub struct OrderStorage {
    db: Arc<Database>,
    audit: AuditLog,
}

impl OrderStorage {
    /// Open or create the database at the given path
    ///
    /// redb uses `Durability::Immediate` by default: commits are persistent
    /// as soon as `commit()` returns, and the copy-on-write file is always in
    /// a consistent state after a crash.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            // Create all tables if they don't exist
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            AuditLog::init_tables(&write_txn)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            for key in [AUDIT_SEQ_KEY, ORDER_COUNT_KEY] {
                if seq_table.get(key)?.is_none() {
                    seq_table.insert(key, 0u64)?;
                }
            }
        }
        write_txn.commit()?;

        let db = Arc::new(db);
        Ok(Self {
            audit: AuditLog::new(db.clone()),
            db,
        })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Audit log sharing this database
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    // ========== Order Counter (for order number) ==========

    /// Increment and return the order count (within transaction)
    fn next_order_count(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table
            .get(ORDER_COUNT_KEY)?
            .map(|g| g.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(ORDER_COUNT_KEY, next)?;
        Ok(next)
    }

    /// Get current order count (without incrementing)
    pub fn get_order_count(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(ORDER_COUNT_KEY)?
            .map(|g| g.value())
            .unwrap_or(0))
    }

    // ========== Order Operations ==========

    fn put_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.id.as_str(), value.as_slice())?;
        Ok(())
    }

    fn get_order_txn(&self, txn: &WriteTransaction, order_id: &str) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Persist a new order together with its CREATED audit entry
    ///
    /// Assigns `order_number` (`ORD{yyyymmdd}{10000+count}`) inside the same
    /// transaction, so numbers are unique and gap-free among committed orders.
    pub fn create_order(
        &self,
        mut order: Order,
        record: AuditRecord,
    ) -> StorageResult<(Order, AuditEntry)> {
        let txn = self.db.begin_write()?;

        let count = self.next_order_count(&txn)?;
        let date_str = chrono::Utc::now().format("%Y%m%d").to_string();
        order.order_number = format!("ORD{}{}", date_str, 10000 + count);

        self.put_order(&txn, &order)?;
        let entry = self.audit.append_txn(&txn, record)?;

        txn.commit()?;
        Ok((order, entry))
    }

    /// Compare-and-set an order mutation together with its audit entry
    ///
    /// The write only happens if the persisted order still has
    /// `expected_status` and `expected_version`; otherwise nothing is written
    /// and [`StorageError::StaleWrite`] reports what is actually stored.
    pub fn commit_transition(
        &self,
        order: &Order,
        expected_status: OrderStatus,
        expected_version: u64,
        record: AuditRecord,
    ) -> StorageResult<AuditEntry> {
        let txn = self.db.begin_write()?;

        let current = self
            .get_order_txn(&txn, &order.id)?
            .ok_or_else(|| StorageError::OrderNotFound(order.id.clone()))?;

        if current.status != expected_status || current.version != expected_version {
            txn.abort()?;
            return Err(StorageError::StaleWrite {
                order_id: current.id,
                status: current.status,
                version: current.version,
            });
        }

        self.put_order(&txn, order)?;
        let entry = self.audit.append_txn(&txn, record)?;

        txn.commit()?;
        Ok(entry)
    }

    /// Get an order by ID
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get all orders (consistent snapshot)
    pub fn get_all_orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let order: Order = serde_json::from_slice(value.value())?;
            orders.push(order);
        }
        Ok(orders)
    }

    /// Get all PENDING orders (used to rebuild the reservation ledger)
    pub fn get_pending_orders(&self) -> StorageResult<Vec<Order>> {
        Ok(self
            .get_all_orders()?
            .into_iter()
            .filter(|o| o.status == OrderStatus::Pending)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use shared::order::{AuditAction, CustomerRef, LineChange, OrderLine};

    fn create_test_order(id: &str) -> Order {
        let lines = vec![OrderLine::new(1, 3, dec!(100)), OrderLine::new(2, 2, dec!(50))];
        Order {
            id: id.to_string(),
            order_number: String::new(),
            status: OrderStatus::Pending,
            total_amount: dec!(400),
            customer: CustomerRef::Walkin {
                name: "Test".to_string(),
            },
            lines,
            notes: None,
            created_by: 1,
            created_at: shared::util::now_millis(),
            updated_at: shared::util::now_millis(),
            approved_by: None,
            approved_at: None,
            sale_ref: None,
            cancelled_by: None,
            cancelled_at: None,
            version: 1,
        }
    }

    fn record(order_id: &str, action: AuditAction) -> AuditRecord {
        AuditRecord {
            order_id: order_id.to_string(),
            action,
            actor_id: 1,
            changes: vec![LineChange::Added {
                product_id: 1,
                to_qty: 3,
            }],
            notes: None,
        }
    }

    #[test]
    fn test_create_order_assigns_number_and_audit() {
        let storage = OrderStorage::open_in_memory().unwrap();

        let (order, entry) = storage
            .create_order(create_test_order("o-1"), record("o-1", AuditAction::Created))
            .unwrap();
        assert!(order.order_number.starts_with("ORD"));
        assert!(order.order_number.ends_with("10001"));
        assert_eq!(entry.id, 1);
        assert_eq!(entry.order_id, "o-1");

        let (second, _) = storage
            .create_order(create_test_order("o-2"), record("o-2", AuditAction::Created))
            .unwrap();
        assert!(second.order_number.ends_with("10002"));
        assert_eq!(storage.get_order_count().unwrap(), 2);

        let loaded = storage.get_order("o-1").unwrap().unwrap();
        assert_eq!(loaded, order);
        assert!(storage.get_order("missing").unwrap().is_none());
    }

    #[test]
    fn test_commit_transition_compare_and_set() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let (order, _) = storage
            .create_order(create_test_order("o-1"), record("o-1", AuditAction::Created))
            .unwrap();

        let mut cancelled = order.clone();
        cancelled.status = OrderStatus::Cancelled;
        cancelled.version = 2;
        storage
            .commit_transition(
                &cancelled,
                OrderStatus::Pending,
                1,
                record("o-1", AuditAction::Cancelled),
            )
            .unwrap();

        // Same expectation again loses the compare-and-set
        let err = storage
            .commit_transition(
                &cancelled,
                OrderStatus::Pending,
                1,
                record("o-1", AuditAction::Cancelled),
            )
            .unwrap_err();
        match err {
            StorageError::StaleWrite {
                status, version, ..
            } => {
                assert_eq!(status, OrderStatus::Cancelled);
                assert_eq!(version, 2);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Losing write appended nothing
        assert_eq!(storage.audit().read("o-1").unwrap().len(), 2);
    }

    #[test]
    fn test_commit_transition_missing_order() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let order = create_test_order("ghost");
        let err = storage
            .commit_transition(
                &order,
                OrderStatus::Pending,
                1,
                record("ghost", AuditAction::Edited),
            )
            .unwrap_err();
        assert!(matches!(err, StorageError::OrderNotFound(id) if id == "ghost"));
    }

    #[test]
    fn test_pending_orders() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let (order, _) = storage
            .create_order(create_test_order("o-1"), record("o-1", AuditAction::Created))
            .unwrap();
        storage
            .create_order(create_test_order("o-2"), record("o-2", AuditAction::Created))
            .unwrap();

        let mut approved = order;
        approved.status = OrderStatus::Approved;
        approved.version = 2;
        storage
            .commit_transition(
                &approved,
                OrderStatus::Pending,
                1,
                record("o-1", AuditAction::Approved),
            )
            .unwrap();

        let pending = storage.get_pending_orders().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "o-2");
        assert_eq!(storage.get_all_orders().unwrap().len(), 2);
    }

    #[test]
    fn test_reopen_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.redb");

        {
            let storage = OrderStorage::open(&path).unwrap();
            storage
                .create_order(create_test_order("o-1"), record("o-1", AuditAction::Created))
                .unwrap();
        }

        let storage = OrderStorage::open(&path).unwrap();
        assert!(storage.get_order("o-1").unwrap().is_some());
        assert_eq!(storage.get_order_count().unwrap(), 1);
        assert_eq!(storage.audit().read("o-1").unwrap().len(), 1);
    }
}
