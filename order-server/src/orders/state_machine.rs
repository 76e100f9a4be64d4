//! 订单状态机
//!
//! ```text
//!            create
//!              │
//!              ▼
//!   edit ─► PENDING ──approve──► APPROVED
//!   ◄───────┘   │
//!               └────cancel────► CANCELLED
//! ```
//!
//! APPROVED 与 CANCELLED 为终态。持久化时的 compare-and-set 由
//! [`super::storage::OrderStorage::commit_transition`] 完成。

use shared::order::{OrderAction, OrderStatus};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Cannot {action} an order in status {status}")]
pub struct TransitionError {
    pub action: OrderAction,
    pub status: OrderStatus,
}

pub struct OrderStateMachine;

impl OrderStateMachine {
    /// Status of a newly created order
    pub const fn initial() -> OrderStatus {
        OrderStatus::Pending
    }

    /// Target status of `action` applied to `status`
    pub fn transition(status: OrderStatus, action: OrderAction) -> Result<OrderStatus, TransitionError> {
        match (status, action) {
            (OrderStatus::Pending, OrderAction::Edit) => Ok(OrderStatus::Pending),
            (OrderStatus::Pending, OrderAction::Approve) => Ok(OrderStatus::Approved),
            (OrderStatus::Pending, OrderAction::Cancel) => Ok(OrderStatus::Cancelled),
            (status, action) => Err(TransitionError { action, status }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_transitions() {
        assert_eq!(OrderStateMachine::initial(), OrderStatus::Pending);
        assert_eq!(
            OrderStateMachine::transition(OrderStatus::Pending, OrderAction::Edit),
            Ok(OrderStatus::Pending)
        );
        assert_eq!(
            OrderStateMachine::transition(OrderStatus::Pending, OrderAction::Approve),
            Ok(OrderStatus::Approved)
        );
        assert_eq!(
            OrderStateMachine::transition(OrderStatus::Pending, OrderAction::Cancel),
            Ok(OrderStatus::Cancelled)
        );
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for status in [OrderStatus::Approved, OrderStatus::Cancelled] {
            for action in [
                OrderAction::Create,
                OrderAction::Edit,
                OrderAction::Approve,
                OrderAction::Cancel,
            ] {
                assert_eq!(
                    OrderStateMachine::transition(status, action),
                    Err(TransitionError { action, status })
                );
            }
        }
    }

    #[test]
    fn test_create_is_not_a_transition() {
        assert!(OrderStateMachine::transition(OrderStatus::Pending, OrderAction::Create).is_err());
    }

    #[test]
    fn test_error_message() {
        let err = TransitionError {
            action: OrderAction::Approve,
            status: OrderStatus::Cancelled,
        };
        assert_eq!(err.to_string(), "Cannot APPROVE an order in status CANCELLED");
    }
}
