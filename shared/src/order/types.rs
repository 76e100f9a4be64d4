//! Order domain types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Status
// ============================================================================

/// 订单状态
///
/// `Approved` 和 `Cancelled` 为终态，只有 `Pending` 可以被修改。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Approved,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Approved => "APPROVED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(OrderStatus::Pending),
            "APPROVED" => Ok(OrderStatus::Approved),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// Lifecycle operation requested on an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderAction {
    Create,
    Edit,
    Approve,
    Cancel,
}

impl OrderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderAction::Create => "CREATE",
            OrderAction::Edit => "EDIT",
            OrderAction::Approve => "APPROVE",
            OrderAction::Cancel => "CANCEL",
        }
    }

    /// Permission action name checked against the permission gate
    pub fn permission_action(&self) -> &'static str {
        match self {
            OrderAction::Create => "create",
            OrderAction::Edit => "edit",
            OrderAction::Approve => "approve",
            OrderAction::Cancel => "cancel",
        }
    }
}

impl std::fmt::Display for OrderAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Customer
// ============================================================================

/// 客户引用：注册客户 或 散客名称（二选一）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum CustomerRef {
    /// Registered client record
    Client { client_id: i64 },
    /// Free-text customer name
    Walkin { name: String },
}

// ============================================================================
// Lines
// ============================================================================

/// Order line as submitted by a caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineInput {
    pub product_id: i64,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    /// Optional; when present it must equal `quantity * unitPrice`
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub total_price: Option<Decimal>,
}

impl LineInput {
    pub fn new(product_id: i64, quantity: i32, unit_price: Decimal) -> Self {
        Self {
            product_id,
            quantity,
            unit_price,
            total_price: None,
        }
    }
}

/// Persisted order line (`total_price = quantity * unit_price`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: i64,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
}

impl OrderLine {
    /// Panics if `quantity * unit_price` overflows; use [`Self::checked_new`]
    /// for submitted input
    pub fn new(product_id: i64, quantity: i32, unit_price: Decimal) -> Self {
        Self {
            product_id,
            quantity,
            unit_price,
            total_price: unit_price * Decimal::from(quantity),
        }
    }

    /// `None` if the line total does not fit in a `Decimal`
    pub fn checked_new(product_id: i64, quantity: i32, unit_price: Decimal) -> Option<Self> {
        let total_price = unit_price.checked_mul(Decimal::from(quantity))?;
        Some(Self {
            product_id,
            quantity,
            unit_price,
            total_price,
        })
    }
}

// ============================================================================
// Order
// ============================================================================

/// Reference to the sale created from an approved order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SaleRef {
    pub sale_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_number: Option<String>,
}

/// Order aggregate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    /// Human-readable number, e.g. `ORD2024030110001`
    pub order_number: String,
    pub status: OrderStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub customer: CustomerRef,
    pub lines: Vec<OrderLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_by: i64,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_ref: Option<SaleRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<i64>,
    /// Incremented on every persisted mutation (compare-and-set token)
    pub version: u64,
}

impl Order {
    /// Sum of line totals
    pub fn computed_total(&self) -> Decimal {
        sum_lines(&self.lines)
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }
}

/// Sum of `total_price` over a line list
pub fn sum_lines(lines: &[OrderLine]) -> Decimal {
    lines.iter().map(|l| l.total_price).sum()
}

// ============================================================================
// Payment
// ============================================================================

/// Payment proposed at approval time (handed to the sales service, not persisted)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub method: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Payment {
    pub fn new(method: impl Into<String>, amount: Decimal) -> Self {
        Self {
            method: method.into(),
            amount,
            note: None,
        }
    }
}
