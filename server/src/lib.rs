//! FlightSurety Oracle Server Library
//!
//! Off-chain coordinator for the FlightSurety contracts: registers oracle
//! identities, answers on-chain flight status requests and exposes a small
//! REST API for the DApp.

pub mod app_state;
pub mod config;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod routes;
pub mod services;
