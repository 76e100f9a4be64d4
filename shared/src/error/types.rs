//! Error envelope shared by the order service and its HTTP clients
//!
//! Domain errors (out of stock, payment mismatch, illegal transition, ...)
//! are converted into [`AppError`] at the service boundary and serialized
//! as [`ApiResponse`] with `data` absent.

use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Error returned to API callers
///
/// Callers branch on [`AppError::code`]; `details` carries the context
/// fields (product id, requested quantity, expected total, ...).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    /// e.g. `{"product_id": 2, "requested": 6, "available": 5}`
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Error with the code's default message
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Attach one context field (product id, order status, payment sum ...)
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.as_ref().and_then(|d| d.get(key))
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// Missing or unparsable operator header
    pub fn not_authenticated() -> Self {
        Self::new(ErrorCode::NotAuthenticated)
    }

    /// Malformed query or body that serde accepted but the handler cannot use
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidRequest, msg)
    }
}

/// Response envelope for every order API endpoint
///
/// Success: `{ "code": 0, "message": "OK", "data": ... }`.
/// Failure: `{ "code": 6003, "message": "...", "details": { ... } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: Some(0),
            message: "OK".to_string(),
            data: Some(data),
            details: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn error(err: &AppError) -> Self {
        Self {
            code: Some(err.code.code()),
            message: err.message.clone(),
            data: None,
            details: err.details.clone(),
        }
    }
}

impl<T> From<AppError> for ApiResponse<T> {
    fn from(err: AppError) -> Self {
        Self {
            code: Some(err.code.code()),
            message: err.message,
            data: None,
            details: err.details,
        }
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

// ===== Axum Integration =====

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = self.http_status();
        let body = ApiResponse::<()>::error(&self);

        // Log system errors
        if matches!(self.code.category(), super::category::ErrorCategory::System) {
            tracing::error!(
                code = %self.code,
                message = %self.message,
                "System error occurred"
            );
        }

        (status, Json(body)).into_response()
    }
}

impl<T: Serialize> axum::response::IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = match self.code {
            None | Some(0) => StatusCode::OK,
            Some(code) => ErrorCode::try_from(code)
                .map(|c| c.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        };

        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_new() {
        let err = AppError::new(ErrorCode::OrderNotFound);
        assert_eq!(err.code, ErrorCode::OrderNotFound);
        assert_eq!(err.message, "Order not found");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_app_error_with_detail() {
        let err = AppError::with_message(ErrorCode::ProductOutOfStock, "out of stock")
            .with_detail("product_id", 2)
            .with_detail("available", 5);

        assert_eq!(err.detail("product_id"), Some(&Value::from(2)));
        assert_eq!(err.detail("available"), Some(&Value::from(5)));
        assert!(err.detail("missing").is_none());
    }

    #[test]
    fn test_api_response_error_carries_details() {
        let err = AppError::with_message(ErrorCode::PaymentSumMismatch, "mismatch")
            .with_detail("sum", "395")
            .with_detail("expected", "400");
        let resp = ApiResponse::<()>::error(&err);
        assert_eq!(resp.code, Some(5006));
        assert_eq!(resp.message, "mismatch");
        assert!(resp.data.is_none());
        assert_eq!(resp.details.unwrap().len(), 2);
    }

    #[test]
    fn test_api_response_success_serialization() {
        let resp = ApiResponse::success(vec![1, 2, 3]);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["code"], 0);
        assert_eq!(json["message"], "OK");
        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_convenience_constructors() {
        let err = AppError::not_authenticated();
        assert_eq!(err.code, ErrorCode::NotAuthenticated);
        assert_eq!(err.http_status(), StatusCode::UNAUTHORIZED);

        let err = AppError::invalid_request("Invalid cancel body");
        assert_eq!(err.code, ErrorCode::InvalidRequest);
        assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
    }
}
