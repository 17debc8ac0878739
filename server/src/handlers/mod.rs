//! API handlers for the FlightSurety oracle server

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use crate::error::LedgerError;
use crate::ledger::{Address, Ledger};
use crate::models::ApiResponse;

pub mod flights;
pub mod oracle;

pub use flights::{buy_insurance, fetch_flight_status, register_flight, withdraw_credits};
pub use oracle::{get_operational_status, list_oracles};

pub async fn root() -> &'static str {
    "FlightSurety Oracle Server"
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn api_info() -> Json<Value> {
    Json(json!({
        "message": "An API for use with your Dapp!"
    }))
}

/// Proxies the app contract's active airline list.
///
/// Unlike the `/api` routes this returns the bare array, or a 500 carrying the
/// ledger error.
pub async fn active_airlines(
    State(ledger): State<Arc<dyn Ledger>>,
) -> Result<Json<Vec<Address>>, (StatusCode, Json<Value>)> {
    match ledger.active_airlines().await {
        Ok(airlines) => Ok(Json(airlines)),
        Err(e) => {
            error!(error = %e, "getActiveAirlines failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            ))
        }
    }
}

/// Maps a failed ledger send to an HTTP error in the `ApiResponse` envelope.
pub(crate) fn ledger_failure<T>(action: &str, e: LedgerError) -> (StatusCode, Json<ApiResponse<T>>) {
    let status = match e {
        LedgerError::Reverted(_) | LedgerError::Rpc { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::BAD_GATEWAY,
    };
    error!(action, error = %e, "ledger call failed");
    (status, Json(ApiResponse::err(format!("{action} failed: {e}"))))
}

/// Unwraps a JSON body, reporting malformed input as a 400 in the
/// `ApiResponse` envelope instead of axum's plain-text rejection.
pub(crate) fn json_body<B, T>(
    payload: Result<Json<B>, JsonRejection>,
) -> Result<B, (StatusCode, Json<ApiResponse<T>>)> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::err(format!("Invalid request body: {}", rejection.body_text()))),
        )
    })
}

pub(crate) fn validation_failure<T>(e: validator::ValidationErrors) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::err(format!("Validation error: {e}"))),
    )
}
