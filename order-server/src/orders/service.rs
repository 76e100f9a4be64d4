//! OrderService - order lifecycle orchestration
//!
//! # Mutation flow
//!
//! ```text
//! request
//!   ├─ 1. Permission check (PermissionGate, no side effects on denial)
//!   ├─ 2. Per-order lock (serializes mutations of one order)
//!   ├─ 3. Load + state guard (OrderStateMachine)
//!   ├─ 4. Reservation change (StockReservationLedger)
//!   ├─ 5. Approval only: payment check, sales hand-off
//!   └─ 6. Compare-and-set order + audit entry in one redb transaction
//! ```
//!
//! Any failure after step 4 undoes the reservation change before returning.
//!
//! # Approval saga
//!
//! ```text
//! reconcile payments ─► release reservations ─► sales.create_sale_from_order (timeout)
//!                                                   │ ok              │ err / timeout
//!                                                   ▼                 ▼
//!                                   persist APPROVED + audit    restore reservations
//!                                                                → CollaboratorUnavailable
//! ```
//!
//! The order id is the sales idempotency key, so an approval retried after a
//! timeout gets the original sale back. The released reservations are held
//! by a [`ReleasedReservations`](super::ledger::ReleasedReservations) guard,
//! so an approval future dropped during the hand-off restores them too.

use dashmap::DashMap;
use rust_decimal::Decimal;
use shared::order::{
    AuditAction, AuditChainVerification, AuditEntry, CustomerRef, LineInput, Order,
    OrderAction, OrderDetail, OrderFilter, OrderLine, OrderStatistics, OrderStatus, Payment,
    PendingOrdersSummary, ProductAvailability,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::catalog::ProductCatalog;
use super::error::{OrderError, OrderResult};
use super::ledger::StockReservationLedger;
use super::reconciler::PaymentReconciler;
use super::sales::SalesConversion;
use super::state_machine::OrderStateMachine;
use super::storage::{OrderStorage, StorageError};
use crate::audit::{AuditRecord, all_added, diff_lines};
use crate::auth::PermissionGate;
use crate::auth::permissions::ORDERS_MODULE;
use crate::security_log;

/// Tunables for [`OrderService`]
#[derive(Debug, Clone, Copy)]
pub struct OrderServiceConfig {
    /// Max |payments - total| accepted at approval
    pub payment_tolerance: Decimal,
    /// Upper bound for one sales collaborator call
    pub sales_timeout: Duration,
}

impl Default for OrderServiceConfig {
    fn default() -> Self {
        Self {
            payment_tolerance: Decimal::ONE,
            sales_timeout: Duration::from_secs(5),
        }
    }
}

pub struct OrderService {
    storage: OrderStorage,
    ledger: StockReservationLedger,
    reconciler: PaymentReconciler,
    permissions: Arc<dyn PermissionGate>,
    sales: Arc<dyn SalesConversion>,
    sales_timeout: Duration,
    /// Per-order mutation locks
    order_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for OrderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderService")
            .field("reconciler", &self.reconciler)
            .field("sales_timeout", &self.sales_timeout)
            .field("locked_orders", &self.order_locks.len())
            .finish()
    }
}

impl OrderService {
    /// Build the service and rebuild the reservation ledger from PENDING orders
    pub fn new(
        storage: OrderStorage,
        catalog: Arc<dyn ProductCatalog>,
        permissions: Arc<dyn PermissionGate>,
        sales: Arc<dyn SalesConversion>,
        config: OrderServiceConfig,
    ) -> OrderResult<Self> {
        let ledger = StockReservationLedger::new(catalog);
        ledger.rebuild(&storage.get_pending_orders()?);

        Ok(Self {
            storage,
            ledger,
            reconciler: PaymentReconciler::new(config.payment_tolerance),
            permissions,
            sales,
            sales_timeout: config.sales_timeout,
            order_locks: DashMap::new(),
        })
    }

    pub fn storage(&self) -> &OrderStorage {
        &self.storage
    }

    pub fn ledger(&self) -> &StockReservationLedger {
        &self.ledger
    }

    // ========== Mutations ==========

    /// Create a PENDING order and reserve its lines
    pub async fn create_order(
        &self,
        actor_id: i64,
        customer: CustomerRef,
        lines: Vec<LineInput>,
        notes: Option<String>,
    ) -> OrderResult<Order> {
        self.check_permission(actor_id, OrderAction::Create)?;

        validate_customer(&customer)?;
        let (lines, total_amount) = validate_lines(&lines)?;

        self.ledger.reserve_all(&lines)?;

        let now = shared::util::now_millis();
        let order = Order {
            id: uuid::Uuid::new_v4().to_string(),
            order_number: String::new(),
            status: OrderStateMachine::initial(),
            total_amount,
            customer,
            lines,
            notes: normalize_notes(notes),
            created_by: actor_id,
            created_at: now,
            updated_at: now,
            approved_by: None,
            approved_at: None,
            sale_ref: None,
            cancelled_by: None,
            cancelled_at: None,
            version: 1,
        };
        let record = AuditRecord {
            order_id: order.id.clone(),
            action: AuditAction::Created,
            actor_id,
            changes: all_added(&order.lines),
            notes: None,
        };

        let lines = order.lines.clone();
        match self.storage.create_order(order, record) {
            Ok((order, _entry)) => {
                tracing::info!(
                    order_id = %order.id,
                    order_number = %order.order_number,
                    actor_id,
                    total = %order.total_amount,
                    "Order created"
                );
                Ok(order)
            }
            Err(e) => {
                self.ledger.release_all(&lines);
                Err(e.into())
            }
        }
    }

    /// Replace the lines (and optionally notes) of a PENDING order
    ///
    /// A failed reservation adjustment leaves the order untouched. An edit
    /// that changes neither lines nor notes returns the order as-is and
    /// writes no audit entry.
    pub async fn update_order(
        &self,
        actor_id: i64,
        order_id: &str,
        lines: Vec<LineInput>,
        notes: Option<String>,
    ) -> OrderResult<Order> {
        self.check_permission(actor_id, OrderAction::Edit)?;
        let _guard = self.lock_order(order_id).await;

        let current = self.load(order_id)?;
        let next_status = OrderStateMachine::transition(current.status, OrderAction::Edit)?;
        let (new_lines, new_total) = validate_lines(&lines)?;

        let changes = diff_lines(&current.lines, &new_lines);
        let new_notes = match notes {
            Some(n) => normalize_notes(Some(n)),
            None => current.notes.clone(),
        };
        let notes_changed = new_notes != current.notes;
        if changes.is_empty() && !notes_changed && new_lines == current.lines {
            return Ok(current);
        }

        self.ledger.adjust_all(&current.lines, &new_lines)?;

        let mut updated = current.clone();
        updated.status = next_status;
        updated.total_amount = new_total;
        updated.lines = new_lines;
        updated.notes = new_notes;
        updated.updated_at = shared::util::now_millis();
        updated.version = current.version + 1;

        let record = AuditRecord {
            order_id: current.id.clone(),
            action: AuditAction::Edited,
            actor_id,
            changes,
            notes: if notes_changed { updated.notes.clone() } else { None },
        };

        if let Err(e) = self.commit(&updated, &current, OrderAction::Edit, record) {
            self.ledger.revert_adjust(&current.lines, &updated.lines);
            return Err(e);
        }

        tracing::info!(
            order_id = %updated.id,
            actor_id,
            version = updated.version,
            total = %updated.total_amount,
            "Order edited"
        );
        Ok(updated)
    }

    /// Approve a PENDING order: reconcile payments, hand off to sales, persist
    pub async fn approve_order(
        &self,
        actor_id: i64,
        order_id: &str,
        payments: Vec<Payment>,
        note: Option<String>,
    ) -> OrderResult<Order> {
        self.check_permission(actor_id, OrderAction::Approve)?;
        let _guard = self.lock_order(order_id).await;

        let current = self.load(order_id)?;
        let next_status = OrderStateMachine::transition(current.status, OrderAction::Approve)?;
        self.reconciler.reconcile(&payments, current.total_amount)?;

        // Saga step 1: release reservations (restored if this future is dropped)
        let mut released = self.ledger.release_guarded(&current.lines);

        // Saga step 2: sales hand-off, bounded
        let sale = tokio::time::timeout(
            self.sales_timeout,
            self.sales
                .create_sale_from_order(&current, &payments, &current.id),
        )
        .await;

        let sale_ref = match sale {
            Ok(Ok(sale_ref)) => sale_ref,
            Ok(Err(e)) => {
                released.restore();
                tracing::warn!(order_id = %current.id, error = %e, "Sales hand-off failed, reservations restored");
                return Err(e.into());
            }
            Err(_) => {
                released.restore();
                tracing::warn!(
                    order_id = %current.id,
                    timeout_ms = self.sales_timeout.as_millis() as u64,
                    "Sales hand-off timed out, reservations restored"
                );
                return Err(OrderError::CollaboratorUnavailable(format!(
                    "sales service timed out after {}ms",
                    self.sales_timeout.as_millis()
                )));
            }
        };

        // Saga step 3: persist
        let now = shared::util::now_millis();
        let mut approved = current.clone();
        approved.status = next_status;
        approved.approved_by = Some(actor_id);
        approved.approved_at = Some(now);
        approved.sale_ref = Some(sale_ref);
        approved.updated_at = now;
        approved.version = current.version + 1;

        let record = AuditRecord {
            order_id: current.id.clone(),
            action: AuditAction::Approved,
            actor_id,
            changes: Vec::new(),
            notes: normalize_notes(note),
        };

        if let Err(e) = self.commit(&approved, &current, OrderAction::Approve, record) {
            released.restore();
            tracing::error!(
                order_id = %current.id,
                error = %e,
                "Sale created but approval not persisted; retry reuses the sale"
            );
            return Err(e);
        }
        released.keep();

        tracing::info!(
            order_id = %approved.id,
            actor_id,
            sale_id = approved.sale_ref.as_ref().map(|s| s.sale_id.as_str()).unwrap_or_default(),
            "Order approved"
        );
        Ok(approved)
    }

    /// Cancel a PENDING order and release its reservations
    pub async fn cancel_order(
        &self,
        actor_id: i64,
        order_id: &str,
        reason: Option<String>,
    ) -> OrderResult<Order> {
        self.check_permission(actor_id, OrderAction::Cancel)?;
        let _guard = self.lock_order(order_id).await;

        let current = self.load(order_id)?;
        let next_status = OrderStateMachine::transition(current.status, OrderAction::Cancel)?;

        let now = shared::util::now_millis();
        let mut cancelled = current.clone();
        cancelled.status = next_status;
        cancelled.cancelled_by = Some(actor_id);
        cancelled.cancelled_at = Some(now);
        cancelled.updated_at = now;
        cancelled.version = current.version + 1;

        let record = AuditRecord {
            order_id: current.id.clone(),
            action: AuditAction::Cancelled,
            actor_id,
            changes: Vec::new(),
            notes: normalize_notes(reason),
        };

        self.ledger.release_all(&current.lines);
        if let Err(e) = self.commit(&cancelled, &current, OrderAction::Cancel, record) {
            self.ledger.restore_all(&current.lines);
            return Err(e);
        }

        tracing::info!(order_id = %cancelled.id, actor_id, "Order cancelled");
        Ok(cancelled)
    }

    // ========== Queries ==========

    pub fn get_order(&self, order_id: &str, with_history: bool) -> OrderResult<OrderDetail> {
        let order = self.load(order_id)?;
        let history = if with_history {
            Some(self.storage.audit().read(order_id)?)
        } else {
            None
        };
        Ok(OrderDetail { order, history })
    }

    /// Orders matching the filter, newest first
    pub fn list_orders(&self, filter: &OrderFilter) -> OrderResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .storage
            .get_all_orders()?
            .into_iter()
            .filter(|o| filter.matches(o))
            .collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.order_number.cmp(&a.order_number))
        });
        Ok(orders)
    }

    /// Audit history of an order, oldest first
    pub fn get_history(&self, order_id: &str) -> OrderResult<Vec<AuditEntry>> {
        self.load(order_id)?;
        Ok(self.storage.audit().read(order_id)?)
    }

    pub fn get_statistics(&self) -> OrderResult<OrderStatistics> {
        let mut stats = OrderStatistics::default();
        let mut pending_amount = Decimal::ZERO;
        for order in self.storage.get_all_orders()? {
            stats.total += 1;
            match order.status {
                OrderStatus::Pending => {
                    stats.pending += 1;
                    pending_amount += order.total_amount;
                }
                OrderStatus::Approved => stats.approved += 1,
                OrderStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats.pending_orders = PendingOrdersSummary {
            count: stats.pending,
            total_amount: pending_amount,
        };
        Ok(stats)
    }

    pub fn product_availability(&self, product_id: i64) -> OrderResult<ProductAvailability> {
        Ok(self.ledger.availability(product_id)?)
    }

    pub fn verify_audit_chain(&self) -> OrderResult<AuditChainVerification> {
        Ok(self.storage.audit().verify_chain()?)
    }

    // ========== Internals ==========

    fn check_permission(&self, actor_id: i64, action: OrderAction) -> OrderResult<()> {
        let perm_action = action.permission_action();
        if self
            .permissions
            .has_permission(actor_id, ORDERS_MODULE, perm_action)
        {
            return Ok(());
        }
        let permission = format!("{}:{}", ORDERS_MODULE, perm_action);
        security_log!(
            WARN,
            "permission_denied",
            actor_id = actor_id,
            required_permission = %permission
        );
        Err(OrderError::PermissionDenied {
            actor_id,
            permission,
        })
    }

    async fn lock_order(&self, order_id: &str) -> OrderLock<'_> {
        let lock = self
            .order_locks
            .entry(order_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let mut held = OrderLock {
            locks: &self.order_locks,
            order_id: order_id.to_string(),
            guard: None,
        };
        held.guard = Some(lock.lock_owned().await);
        held
    }

    fn load(&self, order_id: &str) -> OrderResult<Order> {
        self.storage
            .get_order(order_id)?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))
    }

    /// Compare-and-set against the loaded order's status and version
    fn commit(
        &self,
        next: &Order,
        loaded: &Order,
        action: OrderAction,
        record: AuditRecord,
    ) -> OrderResult<()> {
        match self
            .storage
            .commit_transition(next, loaded.status, loaded.version, record)
        {
            Ok(_) => Ok(()),
            Err(StorageError::StaleWrite { status, .. }) if status != OrderStatus::Pending => {
                Err(OrderError::InvalidStateTransition { action, status })
            }
            Err(StorageError::StaleWrite { order_id, .. }) => {
                Err(OrderError::ConcurrentModification(order_id))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Held per-order lock; the map entry goes away with its last holder
struct OrderLock<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    order_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for OrderLock<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters hold a clone, so count 1 means only the map references it
        self.locks
            .remove_if(&self.order_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

// ========== Validation ==========

fn validate_customer(customer: &CustomerRef) -> OrderResult<()> {
    match customer {
        CustomerRef::Client { client_id } if *client_id <= 0 => Err(OrderError::InvalidCustomer(
            format!("client id must be positive, got {client_id}"),
        )),
        CustomerRef::Walkin { name } if name.trim().is_empty() => Err(
            OrderError::InvalidCustomer("customer name must not be blank".to_string()),
        ),
        _ => Ok(()),
    }
}

/// Validate submitted lines, returning them with the order total
///
/// Rules: at least one line, `quantity > 0`, `unitPrice >= 0`, a submitted
/// `totalPrice` must equal `quantity * unitPrice`, and each product appears
/// at most once (audit diffs are keyed by product). Line and order totals
/// must fit in a `Decimal`.
fn validate_lines(lines: &[LineInput]) -> OrderResult<(Vec<OrderLine>, Decimal)> {
    if lines.is_empty() {
        return Err(OrderError::EmptyOrder);
    }

    let mut seen = HashSet::new();
    let mut validated = Vec::with_capacity(lines.len());
    let mut total = Decimal::ZERO;
    for (index, input) in lines.iter().enumerate() {
        if input.quantity <= 0 {
            return Err(OrderError::InvalidLine {
                index,
                reason: format!("quantity must be positive, got {}", input.quantity),
            });
        }
        if input.unit_price < Decimal::ZERO {
            return Err(OrderError::InvalidLine {
                index,
                reason: format!("unit price must not be negative, got {}", input.unit_price),
            });
        }
        if !seen.insert(input.product_id) {
            return Err(OrderError::InvalidLine {
                index,
                reason: format!("duplicate product {}", input.product_id),
            });
        }

        let line = OrderLine::checked_new(input.product_id, input.quantity, input.unit_price)
            .ok_or_else(|| OrderError::InvalidLine {
                index,
                reason: format!(
                    "line total overflows: {} x {}",
                    input.quantity, input.unit_price
                ),
            })?;
        if let Some(submitted) = input.total_price
            && submitted != line.total_price
        {
            return Err(OrderError::InvalidLine {
                index,
                reason: format!(
                    "total price {} does not match quantity * unit price = {}",
                    submitted, line.total_price
                ),
            });
        }
        total = total
            .checked_add(line.total_price)
            .ok_or_else(|| OrderError::InvalidLine {
                index,
                reason: "order total overflows".to_string(),
            })?;
        validated.push(line);
    }
    Ok((validated, total))
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::RolePermissionGate;
    use crate::orders::catalog::InMemoryCatalog;
    use crate::orders::sales::LocalSalesConversion;
    use rust_decimal_macros::dec;

    fn create_test_service(stock: &[(i64, i64)]) -> OrderService {
        let storage = OrderStorage::open_in_memory().unwrap();
        let catalog = Arc::new(InMemoryCatalog::with_stock(stock.iter().copied()));
        let gate = Arc::new(RolePermissionGate::with_default_roles(Some("admin")));
        OrderService::new(
            storage,
            catalog,
            gate,
            Arc::new(LocalSalesConversion::new()),
            OrderServiceConfig::default(),
        )
        .unwrap()
    }

    fn walkin() -> CustomerRef {
        CustomerRef::Walkin {
            name: "Ana".to_string(),
        }
    }

    #[test]
    fn test_validate_lines() {
        assert!(matches!(validate_lines(&[]), Err(OrderError::EmptyOrder)));

        let zero_qty = [LineInput::new(1, 0, dec!(10))];
        assert!(matches!(
            validate_lines(&zero_qty),
            Err(OrderError::InvalidLine { index: 0, .. })
        ));

        let negative_price = [LineInput::new(1, 1, dec!(10)), LineInput::new(2, 1, dec!(-1))];
        assert!(matches!(
            validate_lines(&negative_price),
            Err(OrderError::InvalidLine { index: 1, .. })
        ));

        let duplicate = [LineInput::new(1, 1, dec!(10)), LineInput::new(1, 2, dec!(10))];
        assert!(matches!(
            validate_lines(&duplicate),
            Err(OrderError::InvalidLine { index: 1, .. })
        ));

        let mut wrong_total = LineInput::new(1, 3, dec!(100));
        wrong_total.total_price = Some(dec!(250));
        assert!(validate_lines(&[wrong_total.clone()]).is_err());
        wrong_total.total_price = Some(dec!(300));
        let (lines, total) = validate_lines(&[wrong_total]).unwrap();
        assert_eq!(lines[0].total_price, dec!(300));
        assert_eq!(total, dec!(300));

        let free = [LineInput::new(1, 1, dec!(0))];
        assert!(validate_lines(&free).is_ok());

        let huge_line = [LineInput::new(1, 2, Decimal::MAX)];
        assert!(matches!(
            validate_lines(&huge_line),
            Err(OrderError::InvalidLine { index: 0, .. })
        ));

        let huge_total = [
            LineInput::new(1, 1, Decimal::MAX),
            LineInput::new(2, 1, Decimal::MAX),
        ];
        assert!(matches!(
            validate_lines(&huge_total),
            Err(OrderError::InvalidLine { index: 1, .. })
        ));
    }

    #[test]
    fn test_validate_customer() {
        assert!(validate_customer(&walkin()).is_ok());
        assert!(validate_customer(&CustomerRef::Client { client_id: 0 }).is_err());
        assert!(
            validate_customer(&CustomerRef::Walkin {
                name: " ".to_string()
            })
            .is_err()
        );
    }

    #[tokio::test]
    async fn test_noop_edit_writes_nothing() {
        let service = create_test_service(&[(1, 10)]);
        let order = service
            .create_order(1, walkin(), vec![LineInput::new(1, 2, dec!(5))], None)
            .await
            .unwrap();

        let same = service
            .update_order(1, &order.id, vec![LineInput::new(1, 2, dec!(5))], None)
            .await
            .unwrap();
        assert_eq!(same.version, order.version);
        assert_eq!(service.get_history(&order.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_notes_only_edit_is_audited() {
        let service = create_test_service(&[(1, 10)]);
        let order = service
            .create_order(1, walkin(), vec![LineInput::new(1, 2, dec!(5))], None)
            .await
            .unwrap();

        let edited = service
            .update_order(
                1,
                &order.id,
                vec![LineInput::new(1, 2, dec!(5))],
                Some("deliver after 5pm".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(edited.notes.as_deref(), Some("deliver after 5pm"));

        let history = service.get_history(&order.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].action, AuditAction::Edited);
        assert!(history[1].changes.is_empty());
        assert_eq!(history[1].notes.as_deref(), Some("deliver after 5pm"));
    }

    #[tokio::test]
    async fn test_order_locks_do_not_outlive_requests() {
        let service = create_test_service(&[(1, 10)]);
        let lines = || vec![LineInput::new(1, 1, dec!(5))];

        for _ in 0..3 {
            let err = service.update_order(1, "missing", lines(), None).await.unwrap_err();
            assert!(matches!(err, OrderError::OrderNotFound(_)));
            let err = service
                .approve_order(1, "missing", vec![Payment::new("Efectivo", dec!(5))], None)
                .await
                .unwrap_err();
            assert!(matches!(err, OrderError::OrderNotFound(_)));
            let err = service.cancel_order(1, "missing", None).await.unwrap_err();
            assert!(matches!(err, OrderError::OrderNotFound(_)));
        }
        assert!(service.order_locks.is_empty());

        let order = service.create_order(1, walkin(), lines(), None).await.unwrap();
        service
            .update_order(1, &order.id, vec![LineInput::new(1, 2, dec!(5))], None)
            .await
            .unwrap();
        service.cancel_order(1, &order.id, None).await.unwrap();
        let err = service.cancel_order(1, &order.id, None).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidStateTransition { .. }));
        assert!(service.order_locks.is_empty());
    }

    #[tokio::test]
    async fn test_overflowing_price_is_rejected() {
        let service = create_test_service(&[(1, 10)]);
        let err = service
            .create_order(1, walkin(), vec![LineInput::new(1, 2, Decimal::MAX)], None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidLine { index: 0, .. }));
        assert_eq!(service.ledger().reserved(1), 0);
        assert_eq!(service.storage().get_order_count().unwrap(), 0);

        let order = service
            .create_order(1, walkin(), vec![LineInput::new(1, 2, dec!(5))], None)
            .await
            .unwrap();
        let err = service
            .update_order(1, &order.id, vec![LineInput::new(1, 3, Decimal::MAX)], None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidLine { .. }));
        assert_eq!(service.ledger().reserved(1), 2);
    }

    #[tokio::test]
    async fn test_ledger_rebuilt_on_restart() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let catalog: Arc<InMemoryCatalog> = Arc::new(InMemoryCatalog::with_stock([(1, 10), (2, 10)]));
        let gate = Arc::new(RolePermissionGate::with_default_roles(Some("admin")));
        let sales = Arc::new(LocalSalesConversion::new());

        let service = OrderService::new(
            storage.clone(),
            catalog.clone(),
            gate.clone(),
            sales.clone(),
            OrderServiceConfig::default(),
        )
        .unwrap();
        let keep = service
            .create_order(1, walkin(), vec![LineInput::new(1, 3, dec!(1))], None)
            .await
            .unwrap();
        let cancel = service
            .create_order(1, walkin(), vec![LineInput::new(2, 4, dec!(1))], None)
            .await
            .unwrap();
        service.cancel_order(1, &cancel.id, None).await.unwrap();
        assert!(keep.is_pending());
        drop(service);

        let restarted =
            OrderService::new(storage, catalog, gate, sales, OrderServiceConfig::default())
                .unwrap();
        assert_eq!(restarted.ledger().reserved(1), 3);
        assert_eq!(restarted.ledger().reserved(2), 0);
    }

    #[tokio::test]
    async fn test_statistics() {
        let service = create_test_service(&[(1, 100)]);
        let a = service
            .create_order(1, walkin(), vec![LineInput::new(1, 2, dec!(10))], None)
            .await
            .unwrap();
        service
            .create_order(1, walkin(), vec![LineInput::new(1, 1, dec!(15.5))], None)
            .await
            .unwrap();
        let c = service
            .create_order(1, walkin(), vec![LineInput::new(1, 1, dec!(99))], None)
            .await
            .unwrap();
        service
            .approve_order(1, &a.id, vec![Payment::new("Efectivo", dec!(20))], None)
            .await
            .unwrap();
        service.cancel_order(1, &c.id, None).await.unwrap();

        let stats = service.get_statistics().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.approved, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.pending_orders.count, 1);
        assert_eq!(stats.pending_orders.total_amount, dec!(15.5));
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let service = create_test_service(&[(1, 100)]);
        let a = service
            .create_order(1, walkin(), vec![LineInput::new(1, 1, dec!(1))], None)
            .await
            .unwrap();
        service
            .create_order(1, walkin(), vec![LineInput::new(1, 1, dec!(1))], None)
            .await
            .unwrap();
        service.cancel_order(1, &a.id, None).await.unwrap();

        let filter = OrderFilter {
            status: Some(OrderStatus::Cancelled),
            ..Default::default()
        };
        let cancelled = service.list_orders(&filter).unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].id, a.id);
        assert_eq!(service.list_orders(&OrderFilter::default()).unwrap().len(), 2);

        let future = OrderFilter {
            from: Some(shared::util::now_millis() + 86_400_000),
            ..Default::default()
        };
        assert!(service.list_orders(&future).unwrap().is_empty());
    }
}
