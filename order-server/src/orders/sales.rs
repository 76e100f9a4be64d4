//! Sales conversion collaborator
//!
//! Turns an approved order plus its payments into a completed sale. Callers
//! pass the order id as idempotency key: a retried approval must get the
//! same sale back instead of a second one.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use shared::order::{CustomerRef, Order, OrderLine, Payment, SaleRef};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SalesError {
    #[error("Sales service request failed: {0}")]
    Transport(String),

    #[error("Sales service rejected the sale (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Sales service returned an invalid response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait SalesConversion: Send + Sync {
    async fn create_sale_from_order(
        &self,
        order: &Order,
        payments: &[Payment],
        idempotency_key: &str,
    ) -> Result<SaleRef, SalesError>;
}

// ============================================================================
// HTTP implementation
// ============================================================================

/// Request body sent to the sales service
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSaleRequest<'a> {
    order_id: &'a str,
    order_number: &'a str,
    customer: &'a CustomerRef,
    lines: &'a [OrderLine],
    #[serde(with = "rust_decimal::serde::float")]
    total_amount: rust_decimal::Decimal,
    payments: &'a [Payment],
}

/// `POST {base_url}/sales` with an `Idempotency-Key` header
#[derive(Debug, Clone)]
pub struct HttpSalesConversion {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSalesConversion {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SalesError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SalesError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SalesConversion for HttpSalesConversion {
    async fn create_sale_from_order(
        &self,
        order: &Order,
        payments: &[Payment],
        idempotency_key: &str,
    ) -> Result<SaleRef, SalesError> {
        let body = CreateSaleRequest {
            order_id: &order.id,
            order_number: &order.order_number,
            customer: &order.customer,
            lines: &order.lines,
            total_amount: order.total_amount,
            payments,
        };

        let resp = self
            .client
            .post(format!("{}/sales", self.base_url))
            .header("Idempotency-Key", idempotency_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SalesError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SalesError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        resp.json::<SaleRef>()
            .await
            .map_err(|e| SalesError::InvalidResponse(e.to_string()))
    }
}

// ============================================================================
// In-process implementation
// ============================================================================

/// In-process sales book, deduplicated by idempotency key
///
/// Receipt numbers follow `FAC{yyyymmdd}{10000+count}`.
#[derive(Debug, Default)]
pub struct LocalSalesConversion {
    sales: DashMap<String, SaleRef>,
    counter: AtomicU64,
}

impl LocalSalesConversion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct sales created
    pub fn sale_count(&self) -> usize {
        self.sales.len()
    }
}

#[async_trait]
impl SalesConversion for LocalSalesConversion {
    async fn create_sale_from_order(
        &self,
        order: &Order,
        _payments: &[Payment],
        idempotency_key: &str,
    ) -> Result<SaleRef, SalesError> {
        let sale = self
            .sales
            .entry(idempotency_key.to_string())
            .or_insert_with(|| {
                let count = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
                let date_str = chrono::Utc::now().format("%Y%m%d").to_string();
                tracing::debug!(order_id = %order.id, "Local sale created");
                SaleRef {
                    sale_id: shared::util::snowflake_id().to_string(),
                    receipt_number: Some(format!("FAC{}{}", date_str, 10000 + count)),
                }
            })
            .clone();
        Ok(sale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use shared::order::OrderStatus;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_order() -> Order {
        Order {
            id: "order-1".to_string(),
            order_number: "ORD2024030110001".to_string(),
            status: OrderStatus::Pending,
            total_amount: dec!(400),
            customer: CustomerRef::Client { client_id: 3 },
            lines: vec![OrderLine::new(1, 4, dec!(100))],
            notes: None,
            created_by: 1,
            created_at: 0,
            updated_at: 0,
            approved_by: None,
            approved_at: None,
            sale_ref: None,
            cancelled_by: None,
            cancelled_at: None,
            version: 1,
        }
    }

    #[tokio::test]
    async fn test_local_sales_dedupes_by_key() {
        let sales = LocalSalesConversion::new();
        let order = create_test_order();
        let payments = vec![Payment::new("Efectivo", dec!(400))];

        let first = sales
            .create_sale_from_order(&order, &payments, &order.id)
            .await
            .unwrap();
        let retry = sales
            .create_sale_from_order(&order, &payments, &order.id)
            .await
            .unwrap();

        assert_eq!(first, retry);
        assert_eq!(sales.sale_count(), 1);
        assert!(first.receipt_number.unwrap().ends_with("10001"));
    }

    #[tokio::test]
    async fn test_http_sales_sends_idempotency_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sales"))
            .and(header("Idempotency-Key", "order-1"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "saleId": "sale-77",
                "receiptNumber": "FAC2024030110001"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sales = HttpSalesConversion::new(server.uri(), Duration::from_secs(2)).unwrap();
        let order = create_test_order();
        let sale = sales
            .create_sale_from_order(&order, &[Payment::new("Tarjeta", dec!(400))], &order.id)
            .await
            .unwrap();

        assert_eq!(sale.sale_id, "sale-77");
        assert_eq!(sale.receipt_number.as_deref(), Some("FAC2024030110001"));
    }

    #[tokio::test]
    async fn test_http_sales_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sales"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let sales = HttpSalesConversion::new(server.uri(), Duration::from_secs(2)).unwrap();
        let order = create_test_order();
        let err = sales
            .create_sale_from_order(&order, &[], &order.id)
            .await
            .unwrap_err();

        match err {
            SalesError::Rejected { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "maintenance");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_http_sales_invalid_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sales"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let sales = HttpSalesConversion::new(server.uri(), Duration::from_secs(2)).unwrap();
        let order = create_test_order();
        let err = sales
            .create_sale_from_order(&order, &[], &order.id)
            .await
            .unwrap_err();
        assert!(matches!(err, SalesError::InvalidResponse(_)));
    }
}
