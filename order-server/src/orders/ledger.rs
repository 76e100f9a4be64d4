//! Stock reservation ledger
//!
//! Tracks how many units of each product are held by PENDING orders.
//! `available = catalog stock - reserved`.
//!
//! # Concurrency
//!
//! Every counter update happens under the DashMap entry lock for that
//! product, so check-and-increment in [`StockReservationLedger::reserve`] is
//! atomic per product. Whole-order operations take one product lock at a
//! time (never two at once) and roll back what they already took on failure.
//!
//! The ledger is derived state: it is rebuilt from persisted PENDING orders
//! at startup via [`StockReservationLedger::rebuild`].

use dashmap::DashMap;
use shared::order::{Order, OrderLine, ProductAvailability};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use super::catalog::ProductCatalog;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Product {product_id} out of stock: requested {requested}, available {available}")]
    OutOfStock {
        product_id: i64,
        requested: i64,
        available: i64,
    },

    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    /// Release exceeded the reserved quantity; the counter was clamped to 0
    #[error("Reservation underflow on product {product_id}: released {released}, reserved {reserved}")]
    ReservationUnderflow {
        product_id: i64,
        released: i64,
        reserved: i64,
    },
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Sum quantities per product (ordered by product id)
fn aggregate(lines: &[OrderLine]) -> BTreeMap<i64, i64> {
    let mut map = BTreeMap::new();
    for line in lines {
        *map.entry(line.product_id).or_insert(0) += i64::from(line.quantity);
    }
    map
}

/// Reservations released by [`StockReservationLedger::release_guarded`]
#[must_use = "dropping the guard restores the reservations immediately"]
pub struct ReleasedReservations<'a> {
    ledger: &'a StockReservationLedger,
    lines: &'a [OrderLine],
    active: bool,
}

impl ReleasedReservations<'_> {
    /// Re-reserve now (compensation on a failed hand-off)
    pub fn restore(&mut self) {
        if !self.active {
            return;
        }
        self.ledger.restore_all(self.lines);
        self.active = false;
    }

    /// The release is final
    pub fn keep(mut self) {
        self.active = false;
    }
}

impl Drop for ReleasedReservations<'_> {
    fn drop(&mut self) {
        if self.active {
            tracing::warn!(
                lines = self.lines.len(),
                "Released reservations dropped before completion, restoring"
            );
            self.restore();
        }
    }
}

pub struct StockReservationLedger {
    catalog: Arc<dyn ProductCatalog>,
    reserved: DashMap<i64, i64>,
}

impl StockReservationLedger {
    pub fn new(catalog: Arc<dyn ProductCatalog>) -> Self {
        Self {
            catalog,
            reserved: DashMap::new(),
        }
    }

    /// Currently reserved quantity of a product
    pub fn reserved(&self, product_id: i64) -> i64 {
        self.reserved.get(&product_id).map(|r| *r).unwrap_or(0)
    }

    /// Stock / reserved / available read model
    pub fn availability(&self, product_id: i64) -> LedgerResult<ProductAvailability> {
        let stock = self
            .catalog
            .stock(product_id)
            .ok_or(LedgerError::ProductNotFound(product_id))?;
        let reserved = self.reserved(product_id);
        Ok(ProductAvailability {
            product_id,
            stock,
            reserved,
            available: (stock - reserved).max(0),
        })
    }

    // ========== Single product ==========

    /// Reserve `qty` units; fails without side effects if not enough is available
    pub fn reserve(&self, product_id: i64, qty: i64) -> LedgerResult<()> {
        if qty <= 0 {
            return Ok(());
        }
        let stock = self
            .catalog
            .stock(product_id)
            .ok_or(LedgerError::ProductNotFound(product_id))?;

        let mut entry = self.reserved.entry(product_id).or_insert(0);
        let available = stock - *entry;
        if available < qty {
            return Err(LedgerError::OutOfStock {
                product_id,
                requested: qty,
                available: available.max(0),
            });
        }
        *entry += qty;
        Ok(())
    }

    /// Release `qty` units, floored at 0
    ///
    /// An over-release is clamped and reported as `ReservationUnderflow`;
    /// the counter is updated either way.
    pub fn release(&self, product_id: i64, qty: i64) -> LedgerResult<()> {
        if qty <= 0 {
            return Ok(());
        }
        let mut entry = self.reserved.entry(product_id).or_insert(0);
        if *entry < qty {
            let reserved = *entry;
            *entry = 0;
            return Err(LedgerError::ReservationUnderflow {
                product_id,
                released: qty,
                reserved,
            });
        }
        *entry -= qty;
        Ok(())
    }

    /// Reserve or release the difference between two quantities
    pub fn adjust(&self, product_id: i64, from_qty: i64, to_qty: i64) -> LedgerResult<()> {
        let delta = to_qty - from_qty;
        if delta > 0 {
            self.reserve(product_id, delta)
        } else {
            self.release(product_id, -delta)
        }
    }

    /// Put back units this caller released earlier, without an availability check
    fn restore(&self, product_id: i64, qty: i64) {
        if qty <= 0 {
            return;
        }
        let stock = self.catalog.stock(product_id).unwrap_or(0);
        let mut entry = self.reserved.entry(product_id).or_insert(0);
        *entry += qty;
        if *entry > stock {
            tracing::warn!(
                product_id,
                reserved = *entry,
                stock,
                "Restored reservation exceeds stock"
            );
        }
    }

    // ========== Whole order ==========

    /// Reserve every line, all-or-nothing
    pub fn reserve_all(&self, lines: &[OrderLine]) -> LedgerResult<()> {
        let mut taken: Vec<(i64, i64)> = Vec::new();
        for (product_id, qty) in aggregate(lines) {
            if let Err(e) = self.reserve(product_id, qty) {
                self.rollback_reserved(&taken);
                return Err(e);
            }
            taken.push((product_id, qty));
        }
        Ok(())
    }

    /// Release every line
    ///
    /// Underflows are logged and do not stop the remaining releases.
    pub fn release_all(&self, lines: &[OrderLine]) {
        for (product_id, qty) in aggregate(lines) {
            self.release_logged(product_id, qty);
        }
    }

    /// Re-reserve lines released by [`Self::release_all`] (saga compensation)
    pub fn restore_all(&self, lines: &[OrderLine]) {
        for (product_id, qty) in aggregate(lines) {
            self.restore(product_id, qty);
        }
    }

    /// Release every line and hand back a guard that re-reserves them on drop
    ///
    /// Used around an await point: if the awaiting future is dropped before
    /// [`ReleasedReservations::keep`], the release is undone.
    pub fn release_guarded<'a>(&'a self, lines: &'a [OrderLine]) -> ReleasedReservations<'a> {
        self.release_all(lines);
        ReleasedReservations {
            ledger: self,
            lines,
            active: true,
        }
    }

    /// Move reservations from `old` lines to `new` lines, all-or-nothing
    ///
    /// Increases are taken first; if any fails, the increases already taken
    /// are rolled back and nothing is released. Decreases are applied only
    /// after every increase succeeded.
    pub fn adjust_all(&self, old: &[OrderLine], new: &[OrderLine]) -> LedgerResult<()> {
        let deltas = Self::deltas(old, new);

        let mut taken: Vec<(i64, i64)> = Vec::new();
        for (&product_id, &delta) in deltas.iter().filter(|(_, d)| **d > 0) {
            if let Err(e) = self.reserve(product_id, delta) {
                self.rollback_reserved(&taken);
                return Err(e);
            }
            taken.push((product_id, delta));
        }

        for (&product_id, &delta) in deltas.iter().filter(|(_, d)| **d < 0) {
            self.release_logged(product_id, -delta);
        }
        Ok(())
    }

    /// Undo a successful [`Self::adjust_all`] (used when persisting the edit fails)
    pub fn revert_adjust(&self, old: &[OrderLine], new: &[OrderLine]) {
        for (product_id, delta) in Self::deltas(old, new) {
            if delta > 0 {
                self.release_logged(product_id, delta);
            } else {
                self.restore(product_id, -delta);
            }
        }
    }

    /// Recompute reservations from persisted PENDING orders
    pub fn rebuild(&self, orders: &[Order]) {
        self.reserved.clear();
        for order in orders.iter().filter(|o| o.is_pending()) {
            for (product_id, qty) in aggregate(&order.lines) {
                *self.reserved.entry(product_id).or_insert(0) += qty;
            }
        }
        tracing::info!(
            products = self.reserved.len(),
            orders = orders.len(),
            "Reservation ledger rebuilt"
        );
    }

    fn deltas(old: &[OrderLine], new: &[OrderLine]) -> BTreeMap<i64, i64> {
        let mut deltas = aggregate(new);
        for (product_id, qty) in aggregate(old) {
            *deltas.entry(product_id).or_insert(0) -= qty;
        }
        deltas.retain(|_, d| *d != 0);
        deltas
    }

    fn rollback_reserved(&self, taken: &[(i64, i64)]) {
        for &(product_id, qty) in taken {
            self.release_logged(product_id, qty);
        }
    }

    fn release_logged(&self, product_id: i64, qty: i64) {
        if let Err(e) = self.release(product_id, qty) {
            tracing::warn!(product_id, error = %e, "Reservation underflow clamped to 0");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::catalog::InMemoryCatalog;
    use rust_decimal_macros::dec;

    fn create_test_ledger(stock: &[(i64, i64)]) -> StockReservationLedger {
        let catalog = InMemoryCatalog::with_stock(stock.iter().copied());
        StockReservationLedger::new(Arc::new(catalog))
    }

    fn line(product_id: i64, quantity: i32) -> OrderLine {
        OrderLine::new(product_id, quantity, dec!(10))
    }

    #[test]
    fn test_reserve_within_stock() {
        let ledger = create_test_ledger(&[(1, 10)]);
        ledger.reserve(1, 6).unwrap();
        ledger.reserve(1, 4).unwrap();
        assert_eq!(ledger.reserved(1), 10);

        let err = ledger.reserve(1, 1).unwrap_err();
        assert_eq!(
            err,
            LedgerError::OutOfStock {
                product_id: 1,
                requested: 1,
                available: 0
            }
        );
        assert_eq!(ledger.reserved(1), 10);
    }

    #[test]
    fn test_reserve_unknown_product() {
        let ledger = create_test_ledger(&[]);
        assert_eq!(ledger.reserve(9, 1), Err(LedgerError::ProductNotFound(9)));
        assert!(ledger.availability(9).is_err());
    }

    #[test]
    fn test_release_clamps_underflow() {
        let ledger = create_test_ledger(&[(1, 10)]);
        ledger.reserve(1, 2).unwrap();

        let err = ledger.release(1, 5).unwrap_err();
        assert_eq!(
            err,
            LedgerError::ReservationUnderflow {
                product_id: 1,
                released: 5,
                reserved: 2
            }
        );
        assert_eq!(ledger.reserved(1), 0);
    }

    #[test]
    fn test_adjust() {
        let ledger = create_test_ledger(&[(1, 10)]);
        ledger.reserve(1, 5).unwrap();
        ledger.adjust(1, 5, 3).unwrap();
        assert_eq!(ledger.reserved(1), 3);
        ledger.adjust(1, 3, 8).unwrap();
        assert_eq!(ledger.reserved(1), 8);
        assert!(ledger.adjust(1, 8, 11).is_err());
        assert_eq!(ledger.reserved(1), 8);
    }

    #[test]
    fn test_reserve_all_rolls_back() {
        let ledger = create_test_ledger(&[(1, 10), (2, 1)]);
        let err = ledger.reserve_all(&[line(1, 3), line(2, 2)]).unwrap_err();
        assert!(matches!(err, LedgerError::OutOfStock { product_id: 2, .. }));
        assert_eq!(ledger.reserved(1), 0);
        assert_eq!(ledger.reserved(2), 0);
    }

    #[test]
    fn test_reserve_all_aggregates_duplicate_products() {
        let ledger = create_test_ledger(&[(1, 5)]);
        assert!(ledger.reserve_all(&[line(1, 3), line(1, 3)]).is_err());
        assert_eq!(ledger.reserved(1), 0);
        ledger.reserve_all(&[line(1, 2), line(1, 3)]).unwrap();
        assert_eq!(ledger.reserved(1), 5);
    }

    #[test]
    fn test_adjust_all_is_all_or_nothing() {
        // product 1: 5 → 3, product 2: 1 → 20 with only 5 available
        let ledger = create_test_ledger(&[(1, 10), (2, 6)]);
        let old = vec![line(1, 5), line(2, 1)];
        ledger.reserve_all(&old).unwrap();

        let new = vec![line(1, 3), line(2, 20)];
        let err = ledger.adjust_all(&old, &new).unwrap_err();
        assert!(matches!(err, LedgerError::OutOfStock { product_id: 2, .. }));
        assert_eq!(ledger.reserved(1), 5);
        assert_eq!(ledger.reserved(2), 1);
    }

    #[test]
    fn test_adjust_all_and_revert() {
        let ledger = create_test_ledger(&[(1, 10), (2, 10), (3, 10)]);
        let old = vec![line(1, 5), line(2, 1)];
        ledger.reserve_all(&old).unwrap();

        let new = vec![line(1, 3), line(3, 4)];
        ledger.adjust_all(&old, &new).unwrap();
        assert_eq!(ledger.reserved(1), 3);
        assert_eq!(ledger.reserved(2), 0);
        assert_eq!(ledger.reserved(3), 4);

        ledger.revert_adjust(&old, &new);
        assert_eq!(ledger.reserved(1), 5);
        assert_eq!(ledger.reserved(2), 1);
        assert_eq!(ledger.reserved(3), 0);
    }

    #[test]
    fn test_release_and_restore_all() {
        let ledger = create_test_ledger(&[(1, 10), (2, 10)]);
        let lines = vec![line(1, 3), line(2, 2)];
        ledger.reserve_all(&lines).unwrap();

        ledger.release_all(&lines);
        assert_eq!(ledger.reserved(1), 0);
        assert_eq!(ledger.reserved(2), 0);

        ledger.restore_all(&lines);
        assert_eq!(ledger.reserved(1), 3);
        assert_eq!(ledger.reserved(2), 2);
    }

    #[test]
    fn test_release_guard_restores_unless_kept() {
        let ledger = create_test_ledger(&[(1, 10), (2, 10)]);
        let lines = vec![line(1, 3), line(2, 2)];
        ledger.reserve_all(&lines).unwrap();

        {
            let _released = ledger.release_guarded(&lines);
            assert_eq!(ledger.reserved(1), 0);
        }
        assert_eq!(ledger.reserved(1), 3);
        assert_eq!(ledger.reserved(2), 2);

        let mut released = ledger.release_guarded(&lines);
        released.restore();
        released.restore();
        drop(released);
        assert_eq!(ledger.reserved(1), 3);

        ledger.release_guarded(&lines).keep();
        assert_eq!(ledger.reserved(1), 0);
        assert_eq!(ledger.reserved(2), 0);
    }

    #[test]
    fn test_availability() {
        let ledger = create_test_ledger(&[(1, 10)]);
        ledger.reserve(1, 4).unwrap();
        let a = ledger.availability(1).unwrap();
        assert_eq!((a.stock, a.reserved, a.available), (10, 4, 6));
    }

    #[test]
    fn test_concurrent_reserve_never_oversells() {
        let ledger = Arc::new(create_test_ledger(&[(1, 10)]));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                std::thread::spawn(move || ledger.reserve(1, 3).is_ok())
            })
            .collect();
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(successes, 3);
        assert_eq!(ledger.reserved(1), 9);
    }
}
