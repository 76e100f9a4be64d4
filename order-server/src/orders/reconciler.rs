//! Payment reconciliation at approval time
//!
//! Pure validation: no side effects, safe to retry.

use rust_decimal::Decimal;
use shared::order::Payment;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("Invalid payment at index {index}: {reason}")]
    InvalidPayment { index: usize, reason: String },

    #[error("Payments sum to {sum}, expected {expected}")]
    InvalidPaymentSum { sum: Decimal, expected: Decimal },
}

#[derive(Debug, Clone, Copy)]
pub struct PaymentReconciler {
    tolerance: Decimal,
}

impl Default for PaymentReconciler {
    fn default() -> Self {
        Self::new(Decimal::ONE)
    }
}

impl PaymentReconciler {
    pub fn new(tolerance: Decimal) -> Self {
        Self {
            tolerance: tolerance.abs(),
        }
    }

    pub fn tolerance(&self) -> Decimal {
        self.tolerance
    }

    /// Check payments against the order total
    ///
    /// Rules, in order:
    /// 1. at least one payment; each names a method and has `amount > 0`
    /// 2. `|sum - total| <= tolerance`
    ///
    /// Returns the payment sum on success.
    pub fn reconcile(&self, payments: &[Payment], total: Decimal) -> Result<Decimal, PaymentError> {
        if payments.is_empty() {
            return Err(PaymentError::InvalidPayment {
                index: 0,
                reason: "at least one payment is required".to_string(),
            });
        }

        for (index, payment) in payments.iter().enumerate() {
            if payment.method.trim().is_empty() {
                return Err(PaymentError::InvalidPayment {
                    index,
                    reason: "payment method is required".to_string(),
                });
            }
            if payment.amount <= Decimal::ZERO {
                return Err(PaymentError::InvalidPayment {
                    index,
                    reason: format!("amount must be positive, got {}", payment.amount),
                });
            }
        }

        let sum: Decimal = payments.iter().map(|p| p.amount).sum();
        if (sum - total).abs() > self.tolerance {
            return Err(PaymentError::InvalidPaymentSum {
                sum,
                expected: total,
            });
        }
        Ok(sum)
    }
}
