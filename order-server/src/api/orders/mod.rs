//! Order API Module
//!
//! | 路径 | 方法 | 说明 | 权限 |
//! |------|------|------|------|
//! | /api/orders | GET | 订单列表 (status, dateFrom, dateTo) | - |
//! | /api/orders | POST | 创建订单 | orders:create |
//! | /api/orders/statistics | GET | 订单统计 | - |
//! | /api/orders/{id} | GET | 订单详情 (?history=true) | - |
//! | /api/orders/{id} | PATCH | 修改明细 | orders:edit |
//! | /api/orders/{id} | DELETE | 取消订单 | orders:cancel |
//! | /api/orders/{id}/approve | POST | 审批 (转为销售) | orders:approve |
//! | /api/orders/{id}/history | GET | 审计历史 | - |
//!
//! Mutations require the `X-Operator-Id` header; permission checks happen
//! inside `OrderService`.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/statistics", get(handler::statistics))
        .route(
            "/{id}",
            get(handler::get_by_id)
                .patch(handler::update)
                .delete(handler::cancel),
        )
        .route("/{id}/approve", post(handler::approve))
        .route("/{id}/history", get(handler::history))
}
