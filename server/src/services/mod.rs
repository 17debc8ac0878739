//! Coordinator services: startup sequencing, oracle registry and the
//! request listener/responder

pub mod account_service;
pub mod event_monitoring_service;
pub mod oracle_registry;
pub mod oracle_service;

pub use account_service::{initialize_accounts, AccountSetup};
pub use event_monitoring_service::{BlockCursor, RequestListener};
pub use oracle_registry::{register_oracles, OracleRegistry, RegistrationReport};
pub use oracle_service::{RequestResponder, ResponseAttempt, ResponseOutcome};
