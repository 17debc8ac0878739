//! Passenger and airline actions forwarded to the app contract

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use validator::Validate;

use crate::app_state::AppState;
use crate::handlers::{json_body, ledger_failure, validation_failure};
use crate::ledger::U256;
use crate::models::{
    ApiResponse, BuyInsuranceRequest, FlightStatusRequest, RegisterFlightRequest, TxReceipt,
    WithdrawCreditsRequest,
};

type TxResult = Result<Json<ApiResponse<TxReceipt>>, (StatusCode, Json<ApiResponse<TxReceipt>>)>;

fn receipt(tx_hash: String) -> Json<ApiResponse<TxReceipt>> {
    Json(ApiResponse::ok(TxReceipt { tx_hash }))
}

pub async fn register_flight(
    State(state): State<AppState>,
    payload: Result<Json<RegisterFlightRequest>, JsonRejection>,
) -> TxResult {
    let request = json_body(payload)?;
    request.validate().map_err(validation_failure)?;

    let tx_hash = state
        .ledger
        .register_flight(request.airline, &request.flight, request.timestamp)
        .await
        .map_err(|e| ledger_failure("registerFlight", e))?;
    info!(airline = %request.airline, flight = %request.flight, %tx_hash, "flight registered");
    Ok(receipt(tx_hash))
}

/// Asks the contract for a status, which emits the request the oracles answer.
pub async fn fetch_flight_status(
    State(state): State<AppState>,
    payload: Result<Json<FlightStatusRequest>, JsonRejection>,
) -> TxResult {
    let request = json_body(payload)?;
    request.validate().map_err(validation_failure)?;

    let tx_hash = state
        .ledger
        .fetch_flight_status(
            state.operator,
            request.airline,
            &request.flight,
            request.timestamp,
        )
        .await
        .map_err(|e| ledger_failure("fetchFlightStatus", e))?;
    info!(flight = %request.flight, timestamp = request.timestamp, %tx_hash, "flight status requested");
    Ok(receipt(tx_hash))
}

pub async fn buy_insurance(
    State(state): State<AppState>,
    payload: Result<Json<BuyInsuranceRequest>, JsonRejection>,
) -> TxResult {
    let request = json_body(payload)?;
    request.validate().map_err(validation_failure)?;

    let tx_hash = state
        .ledger
        .buy_insurance(request.passenger, &request.flight, U256::from(request.amount))
        .await
        .map_err(|e| ledger_failure("buyInsurance", e))?;
    info!(passenger = %request.passenger, flight = %request.flight, amount = request.amount, %tx_hash, "insurance bought");
    Ok(receipt(tx_hash))
}

pub async fn withdraw_credits(
    State(state): State<AppState>,
    payload: Result<Json<WithdrawCreditsRequest>, JsonRejection>,
) -> TxResult {
    let request = json_body(payload)?;
    let tx_hash = state
        .ledger
        .withdraw_credits(request.passenger)
        .await
        .map_err(|e| ledger_failure("withdrawCredits", e))?;
    info!(passenger = %request.passenger, %tx_hash, "credits withdrawn");
    Ok(receipt(tx_hash))
}
