//! Order API Handlers

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use shared::order::{
    ApproveOrderRequest, AuditEntry, CancelOrderRequest, CreateOrderRequest, Order, OrderDetail,
    OrderListQuery, OrderStatistics, UpdateOrderRequest,
};

use crate::auth::CurrentActor;
use crate::core::ServerState;
use crate::utils::{ApiResponse, AppError, AppResult};

/// Query params for order detail
#[derive(Debug, Default, Deserialize)]
pub struct DetailQuery {
    #[serde(default)]
    pub history: bool,
}

/// GET /api/orders
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    let filter = query.into_filter()?;
    let orders = state.orders.list_orders(&filter)?;
    Ok(Json(ApiResponse::success(orders)))
}

/// GET /api/orders/statistics
pub async fn statistics(
    State(state): State<ServerState>,
) -> AppResult<Json<ApiResponse<OrderStatistics>>> {
    let stats = state.orders.get_statistics()?;
    Ok(Json(ApiResponse::success(stats)))
}

/// GET /api/orders/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Query(query): Query<DetailQuery>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let detail = state.orders.get_order(&id, query.history)?;
    Ok(Json(ApiResponse::success(detail)))
}

/// GET /api/orders/{id}/history
pub async fn history(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<AuditEntry>>>> {
    let entries = state.orders.get_history(&id)?;
    Ok(Json(ApiResponse::success(entries)))
}

/// POST /api/orders
pub async fn create(
    State(state): State<ServerState>,
    actor: CurrentActor,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Order>>)> {
    let customer = payload.customer_ref()?;
    let order = state
        .orders
        .create_order(actor.id, customer, payload.details, payload.notes)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

/// PATCH /api/orders/{id}
pub async fn update(
    State(state): State<ServerState>,
    actor: CurrentActor,
    Path(id): Path<String>,
    Json(payload): Json<UpdateOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state
        .orders
        .update_order(actor.id, &id, payload.details, payload.notes)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// POST /api/orders/{id}/approve
pub async fn approve(
    State(state): State<ServerState>,
    actor: CurrentActor,
    Path(id): Path<String>,
    Json(payload): Json<ApproveOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state
        .orders
        .approve_order(actor.id, &id, payload.payments, payload.notes)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// DELETE /api/orders/{id}
///
/// The body is optional; an empty body cancels without a reason.
pub async fn cancel(
    State(state): State<ServerState>,
    actor: CurrentActor,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<ApiResponse<Order>>> {
    let payload: CancelOrderRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CancelOrderRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::invalid_request(format!("Invalid cancel body: {}", e)))?
    };
    let order = state
        .orders
        .cancel_order(actor.id, &id, payload.reason)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}
