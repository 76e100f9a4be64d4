//! Order service errors
//!
//! Every variant carries the context a caller needs to branch on it; the
//! conversion to [`AppError`] turns that context into structured `details`.

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::order::{OrderAction, OrderStatus};
use thiserror::Error;

use super::ledger::LedgerError;
use super::reconciler::PaymentError;
use super::sales::SalesError;
use super::state_machine::TransitionError;
use super::storage::StorageError;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Invalid line {index}: {reason}")]
    InvalidLine { index: usize, reason: String },

    #[error("Order has no lines")]
    EmptyOrder,

    #[error("Invalid customer: {0}")]
    InvalidCustomer(String),

    #[error("Product {product_id} out of stock: requested {requested}, available {available}")]
    OutOfStock {
        product_id: i64,
        requested: i64,
        available: i64,
    },

    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    #[error("Reservation underflow on product {product_id}")]
    ReservationUnderflow { product_id: i64 },

    #[error("Invalid payment at index {index}: {reason}")]
    InvalidPayment { index: usize, reason: String },

    #[error("Payments sum to {sum}, expected {expected}")]
    InvalidPaymentSum { sum: Decimal, expected: Decimal },

    #[error("Cannot {action} an order in status {status}")]
    InvalidStateTransition {
        action: OrderAction,
        status: OrderStatus,
    },

    #[error("Actor {actor_id} lacks permission {permission}")]
    PermissionDenied { actor_id: i64, permission: String },

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order {0} was modified concurrently")]
    ConcurrentModification(String),

    /// Sales collaborator failed or timed out; reservations were restored
    #[error("Sales service unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(StorageError),
}

pub type OrderResult<T> = Result<T, OrderError>;

impl OrderError {
    /// Whether the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OrderError::CollaboratorUnavailable(_) | OrderError::ConcurrentModification(_)
        )
    }
}

impl From<LedgerError> for OrderError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::OutOfStock {
                product_id,
                requested,
                available,
            } => OrderError::OutOfStock {
                product_id,
                requested,
                available,
            },
            LedgerError::ProductNotFound(id) => OrderError::ProductNotFound(id),
            LedgerError::ReservationUnderflow { product_id, .. } => {
                OrderError::ReservationUnderflow { product_id }
            }
        }
    }
}

impl From<PaymentError> for OrderError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InvalidPayment { index, reason } => {
                OrderError::InvalidPayment { index, reason }
            }
            PaymentError::InvalidPaymentSum { sum, expected } => {
                OrderError::InvalidPaymentSum { sum, expected }
            }
        }
    }
}

impl From<TransitionError> for OrderError {
    fn from(err: TransitionError) -> Self {
        OrderError::InvalidStateTransition {
            action: err.action,
            status: err.status,
        }
    }
}

impl From<SalesError> for OrderError {
    fn from(err: SalesError) -> Self {
        OrderError::CollaboratorUnavailable(err.to_string())
    }
}

impl From<StorageError> for OrderError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::OrderNotFound(id) => OrderError::OrderNotFound(id),
            other => OrderError::Storage(other),
        }
    }
}

/// 将存储错误转换为错误码
fn classify_storage_error(e: &StorageError) -> ErrorCode {
    // 先按枚举变体精确匹配
    match e {
        StorageError::Serialization(_) => return ErrorCode::InternalError,
        StorageError::OrderNotFound(_) => return ErrorCode::OrderNotFound,
        StorageError::StaleWrite { .. } => return ErrorCode::OrderConcurrentModification,
        _ => {}
    }

    // redb 错误通过字符串匹配分类
    let err_str = e.to_string().to_lowercase();

    // 磁盘空间不足
    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return ErrorCode::StorageFull;
    }

    // 内存不足
    if err_str.contains("out of memory") || err_str.contains("cannot allocate") {
        return ErrorCode::OutOfMemory;
    }

    // 数据损坏
    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return ErrorCode::StorageCorrupted;
    }

    // 默认：系统繁忙（redb 的 Database/Transaction/Table/Storage/Commit 错误）
    ErrorCode::SystemBusy
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        let message = err.to_string();
        match err {
            OrderError::InvalidLine { index, reason } => {
                AppError::with_message(ErrorCode::OrderLineInvalid, message)
                    .with_detail("index", index)
                    .with_detail("reason", reason)
            }
            OrderError::EmptyOrder => AppError::with_message(ErrorCode::OrderEmpty, message),
            OrderError::InvalidCustomer(_) => {
                AppError::with_message(ErrorCode::CustomerRefInvalid, message)
            }
            OrderError::OutOfStock {
                product_id,
                requested,
                available,
            } => AppError::with_message(ErrorCode::ProductOutOfStock, message)
                .with_detail("product_id", product_id)
                .with_detail("requested", requested)
                .with_detail("available", available),
            OrderError::ProductNotFound(product_id) => {
                AppError::with_message(ErrorCode::ProductNotFound, message)
                    .with_detail("product_id", product_id)
            }
            OrderError::ReservationUnderflow { product_id } => {
                AppError::with_message(ErrorCode::ReservationUnderflow, message)
                    .with_detail("product_id", product_id)
            }
            OrderError::InvalidPayment { index, reason } => {
                AppError::with_message(ErrorCode::PaymentInvalid, message)
                    .with_detail("index", index)
                    .with_detail("reason", reason)
            }
            OrderError::InvalidPaymentSum { sum, expected } => {
                AppError::with_message(ErrorCode::PaymentSumMismatch, message)
                    .with_detail("sum", sum.to_string())
                    .with_detail("expected", expected.to_string())
            }
            OrderError::InvalidStateTransition { action, status } => {
                AppError::with_message(ErrorCode::InvalidStateTransition, message)
                    .with_detail("action", action.as_str())
                    .with_detail("status", status.as_str())
            }
            OrderError::PermissionDenied {
                actor_id,
                permission,
            } => AppError::with_message(ErrorCode::PermissionDenied, message)
                .with_detail("actor_id", actor_id)
                .with_detail("permission", permission),
            OrderError::OrderNotFound(order_id) => {
                AppError::with_message(ErrorCode::OrderNotFound, message)
                    .with_detail("order_id", order_id)
            }
            OrderError::ConcurrentModification(order_id) => {
                AppError::with_message(ErrorCode::OrderConcurrentModification, message)
                    .with_detail("order_id", order_id)
                    .with_detail("retryable", true)
            }
            OrderError::CollaboratorUnavailable(_) => {
                AppError::with_message(ErrorCode::SalesServiceUnavailable, message)
                    .with_detail("retryable", true)
            }
            OrderError::Storage(e) => {
                let code = classify_storage_error(&e);
                tracing::error!(error = %e, error_code = %code, "Storage error occurred");
                AppError::with_message(code, message)
            }
        }
    }
}
