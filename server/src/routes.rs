//! Route definitions for the FlightSurety oracle server

use axum::{
    routing::{get, post},
    Router,
};

use crate::app_state::AppState;
use crate::handlers::*;

/// Full router with state applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(api_routes())
        .merge(oracle_routes())
        .merge(flight_routes())
        .with_state(state)
}

// Endpoints consumed by the DApp
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api", get(api_info))
        .route("/activeAirlines", get(active_airlines))
}

// Oracle registry and contract status
pub fn oracle_routes() -> Router<AppState> {
    Router::new()
        .route("/api/oracles", get(list_oracles))
        .route("/api/operational", get(get_operational_status))
}

// Flight and insurance actions
pub fn flight_routes() -> Router<AppState> {
    Router::new()
        .route("/api/flights", post(register_flight))
        .route("/api/flights/status", post(fetch_flight_status))
        .route("/api/insurance", post(buy_insurance))
        .route("/api/credits/withdraw", post(withdraw_credits))
}
