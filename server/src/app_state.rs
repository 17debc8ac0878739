//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::ledger::{Address, Ledger};
use crate::services::OracleRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn Ledger>,
    pub registry: Arc<OracleRegistry>,
    /// Account that sends operator-initiated transactions
    pub operator: Address,
}

impl AppState {
    pub fn new(ledger: Arc<dyn Ledger>, registry: Arc<OracleRegistry>, operator: Address) -> Self {
        Self {
            ledger,
            registry,
            operator,
        }
    }
}

impl FromRef<AppState> for Arc<dyn Ledger> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.ledger.clone()
    }
}

impl FromRef<AppState> for Arc<OracleRegistry> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.registry.clone()
    }
}
