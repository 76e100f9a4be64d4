//! Product API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::order::ProductAvailability;

use crate::core::ServerState;
use crate::utils::{ApiResponse, AppResult};

/// GET /api/products/{id}/availability - 库存 / 已预留 / 可用
pub async fn availability(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<ProductAvailability>>> {
    let availability = state.orders.product_availability(id)?;
    Ok(Json(ApiResponse::success(availability)))
}
