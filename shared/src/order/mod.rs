//! Order lifecycle types
//!
//! Wire and domain types shared by the order server and its clients:
//! - Orders: lines, customer reference, status
//! - Audit: append-only history entries with typed line changes
//! - Requests: HTTP request/response bodies and list filters

pub mod audit;
pub mod request;
pub mod types;

// Re-exports
pub use audit::{AuditAction, AuditChainBreak, AuditChainVerification, AuditEntry, LineChange};
pub use request::{
    ApproveOrderRequest, CancelOrderRequest, CreateOrderRequest, OrderDetail, OrderFilter,
    OrderListQuery, OrderStatistics, PendingOrdersSummary, ProductAvailability,
    UpdateOrderRequest,
};
pub use types::*;
