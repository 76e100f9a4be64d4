//! Operator Extractor
//!
//! 网关已完成认证，本服务从 `X-Operator-Id` 头读取操作人 ID。

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::AppError;
use crate::security_log;

/// 操作人 ID 请求头
pub const OPERATOR_HEADER: &str = "x-operator-id";

/// 当前操作人
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentActor {
    pub id: i64,
}

impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Check if already extracted
        if let Some(actor) = parts.extensions.get::<CurrentActor>() {
            return Ok(*actor);
        }

        let header = parts
            .headers
            .get(OPERATOR_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim);

        let id = match header {
            Some(value) => value.parse::<i64>().map_err(|_| {
                security_log!(WARN, "operator_invalid", value = %value, uri = ?parts.uri);
                AppError::not_authenticated().with_detail("header", OPERATOR_HEADER)
            })?,
            None => {
                security_log!(WARN, "operator_missing", uri = ?parts.uri);
                return Err(AppError::not_authenticated().with_detail("header", OPERATOR_HEADER));
            }
        };

        let actor = CurrentActor { id };
        parts.extensions.insert(actor);
        Ok(actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ErrorCode;

    async fn extract(req: http::Request<()>) -> Result<CurrentActor, AppError> {
        let (mut parts, _) = req.into_parts();
        CurrentActor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_extracts_operator_id() {
        let req = http::Request::builder()
            .header("X-Operator-Id", " 42 ")
            .body(())
            .unwrap();
        assert_eq!(extract(req).await.unwrap(), CurrentActor { id: 42 });
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthenticated() {
        let req = http::Request::builder().body(()).unwrap();
        let err = extract(req).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAuthenticated);
        assert_eq!(err.http_status(), http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_non_numeric_header_is_unauthenticated() {
        let req = http::Request::builder()
            .header("X-Operator-Id", "bob")
            .body(())
            .unwrap();
        assert_eq!(
            extract(req).await.unwrap_err().code,
            ErrorCode::NotAuthenticated
        );
    }
}
