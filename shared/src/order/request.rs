//! HTTP request / response bodies for the order API

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::audit::AuditEntry;
use super::types::{CustomerRef, LineInput, Order, OrderStatus, Payment};
use crate::error::{AppError, ErrorCode};
use crate::util::{day_end_millis, day_start_millis};

/// `POST /api/orders`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub client_id: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub details: Vec<LineInput>,
}

impl CreateOrderRequest {
    /// Resolve `clientId` / `customerName` into a single customer reference
    ///
    /// Exactly one of the two must be given; a blank name counts as missing.
    pub fn customer_ref(&self) -> Result<CustomerRef, AppError> {
        let name = self
            .customer_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        match (self.client_id, name) {
            (Some(client_id), None) => Ok(CustomerRef::Client { client_id }),
            (None, Some(name)) => Ok(CustomerRef::Walkin {
                name: name.to_string(),
            }),
            (Some(_), Some(_)) => Err(AppError::with_message(
                ErrorCode::CustomerRefInvalid,
                "clientId and customerName are mutually exclusive",
            )),
            (None, None) => Err(AppError::with_message(
                ErrorCode::CustomerRefInvalid,
                "either clientId or customerName is required",
            )),
        }
    }
}

/// `PATCH /api/orders/{id}`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub details: Vec<LineInput>,
    /// Replaces the order notes when present
    #[serde(default)]
    pub notes: Option<String>,
}

/// `POST /api/orders/{id}/approve`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApproveOrderRequest {
    #[serde(default)]
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// `DELETE /api/orders/{id}` (body optional)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// `GET /api/orders` query string
///
/// Dates are `YYYY-MM-DD` calendar days in UTC, both bounds inclusive.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OrderListQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
}

impl OrderListQuery {
    pub fn into_filter(self) -> Result<OrderFilter, AppError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(s.parse::<OrderStatus>().map_err(|e| {
                AppError::with_message(ErrorCode::InvalidRequest, e).with_detail("status", s)
            })?),
        };
        let from = parse_date("dateFrom", self.date_from.as_deref())?.map(day_start_millis);
        let to = parse_date("dateTo", self.date_to.as_deref())?.map(day_end_millis);

        if let (Some(f), Some(t)) = (from, to)
            && f > t
        {
            return Err(AppError::with_message(
                ErrorCode::ValueOutOfRange,
                "dateFrom must not be after dateTo",
            ));
        }

        Ok(OrderFilter { status, from, to })
    }
}

fn parse_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                AppError::with_message(
                    ErrorCode::InvalidRequest,
                    format!("{field} must be a YYYY-MM-DD date"),
                )
                .with_detail("field", field)
                .with_detail("value", v)
            }),
    }
}

/// Parsed list filter (timestamps are Unix millis, inclusive)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl OrderFilter {
    /// Filter on creation time
    pub fn matches(&self, order: &Order) -> bool {
        self.status.is_none_or(|s| order.status == s)
            && self.from.is_none_or(|f| order.created_at >= f)
            && self.to.is_none_or(|t| order.created_at <= t)
    }
}

/// `GET /api/orders/{id}` response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<AuditEntry>>,
}

/// `GET /api/orders/statistics` response
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatistics {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub cancelled: u64,
    pub pending_orders: PendingOrdersSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingOrdersSummary {
    pub count: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

/// `GET /api/products/{id}/availability` response
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProductAvailability {
    pub product_id: i64,
    pub stock: i64,
    pub reserved: i64,
    pub available: i64,
}
