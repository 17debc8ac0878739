use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::handlers::ledger_failure;
use crate::ledger::Ledger;
use crate::models::{ApiResponse, Oracle};
use crate::services::OracleRegistry;

pub async fn list_oracles(State(registry): State<Arc<OracleRegistry>>) -> Json<ApiResponse<Vec<Oracle>>> {
    Json(ApiResponse::ok(registry.snapshot().await))
}

pub async fn get_operational_status(
    State(ledger): State<Arc<dyn Ledger>>,
) -> Result<Json<ApiResponse<bool>>, (StatusCode, Json<ApiResponse<bool>>)> {
    let operational = ledger
        .is_operational()
        .await
        .map_err(|e| ledger_failure("isOperational", e))?;
    Ok(Json(ApiResponse::ok(operational)))
}
