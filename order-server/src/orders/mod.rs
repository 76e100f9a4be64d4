//! Order lifecycle module
//!
//! - **service**: [`OrderService`] orchestrates every create / edit / approve / cancel
//! - **state_machine**: PENDING → APPROVED | CANCELLED transitions
//! - **ledger**: stock reservations held by PENDING orders
//! - **reconciler**: payment validation at approval
//! - **sales**: sales collaborator the approval saga hands off to
//! - **storage**: redb persistence (orders + audit chain in one transaction)
//!
//! # Architecture
//!
//! ```text
//! HTTP handler ─► OrderService ─┬─► PermissionGate
//!                               ├─► OrderStateMachine
//!                               ├─► StockReservationLedger ─► ProductCatalog
//!                               ├─► PaymentReconciler
//!                               ├─► SalesConversion (approve only)
//!                               └─► OrderStorage ─► AuditLog (same redb txn)
//! ```

pub mod catalog;
pub mod error;
pub mod ledger;
pub mod reconciler;
pub mod sales;
pub mod service;
pub mod state_machine;
pub mod storage;

// Re-exports
pub use catalog::{CatalogError, InMemoryCatalog, ProductCatalog};
pub use error::{OrderError, OrderResult};
pub use ledger::{LedgerError, ReleasedReservations, StockReservationLedger};
pub use reconciler::{PaymentError, PaymentReconciler};
pub use sales::{HttpSalesConversion, LocalSalesConversion, SalesConversion, SalesError};
pub use service::{OrderService, OrderServiceConfig};
pub use state_machine::{OrderStateMachine, TransitionError};
pub use storage::{OrderStorage, StorageError};

// Re-export shared types for convenience
pub use shared::order::{CustomerRef, LineInput, Order, OrderAction, OrderStatus, Payment};
