//! Audit API Handlers

use axum::{Json, extract::State};
use shared::order::AuditChainVerification;

use crate::core::ServerState;
use crate::utils::{ApiResponse, AppResult};

/// GET /api/audit/verify - 验证审计链完整性
pub async fn verify_chain(
    State(state): State<ServerState>,
) -> AppResult<Json<ApiResponse<AuditChainVerification>>> {
    let verification = state.orders.verify_audit_chain()?;
    if !verification.chain_intact {
        tracing::error!(
            breaks = verification.breaks.len(),
            total = verification.total_entries,
            "Audit chain verification failed"
        );
    }
    Ok(Json(ApiResponse::success(verification)))
}
