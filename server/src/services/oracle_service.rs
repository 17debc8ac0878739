//! Responding to oracle requests on behalf of every registered oracle
//!
//! The contract picks one index per request and only accepts responses from
//! oracles holding it. Indexes are opaque off-chain, so every (oracle, index)
//! pair is tried until one response is accepted. The ledger stays the final
//! arbiter: stopping after the first acceptance only avoids wasted
//! transactions, and attempts already in flight may still land.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::ledger::{Address, Ledger};
use crate::models::{Oracle, OracleRequestEvent, OracleResponse, StatusCode, StatusPolicy};
use crate::services::oracle_registry::OracleRegistry;

/// Shared "has any oracle been accepted for this request" flag.
///
/// Written once by the first accepted submission, read by every other attempt
/// of the same request.
#[derive(Debug, Clone, Default)]
pub struct ResponseAttempt {
    settled: Arc<AtomicBool>,
}

impl ResponseAttempt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }

    pub fn settle(&self) {
        self.settled.store(true, Ordering::Release);
    }
}

/// Result of one (oracle, index) attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptResult {
    Accepted { oracle: Address, index: u8 },
    Rejected,
    Skipped,
}

/// Summary of handling one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseOutcome {
    pub status: StatusCode,
    /// (oracle, index) pairs handed to a task
    pub dispatched: usize,
    /// Pairs that found the request already settled before submitting
    pub skipped: usize,
    pub rejected: usize,
    /// Oracle and index whose response was accepted, if any
    pub accepted: Option<(Address, u8)>,
}

pub struct RequestResponder {
    ledger: Arc<dyn Ledger>,
    registry: Arc<OracleRegistry>,
    policy: StatusPolicy,
    concurrency: usize,
}

impl RequestResponder {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        registry: Arc<OracleRegistry>,
        policy: StatusPolicy,
        concurrency: usize,
    ) -> Self {
        Self {
            ledger,
            registry,
            policy,
            concurrency: concurrency.max(1),
        }
    }

    /// Picks a status for `request` and submits it from registered oracles
    /// until one response is accepted.
    pub async fn respond(&self, request: OracleRequestEvent) -> ResponseOutcome {
        let status = self.policy.select(request.timestamp, Utc::now());
        info!(
            airline = %request.airline,
            flight = %request.flight,
            timestamp = request.timestamp,
            status = status.label(),
            "oracle request received"
        );

        let oracles = self.registry.snapshot().await;
        let request = Arc::new(request);
        let attempt = ResponseAttempt::new();
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        let mut dispatched = 0;

        'dispatch: for oracle in &oracles {
            for &index in &oracle.indexes {
                let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                    break 'dispatch;
                };
                if attempt.is_settled() {
                    break 'dispatch;
                }

                dispatched += 1;
                let ledger = Arc::clone(&self.ledger);
                let request = Arc::clone(&request);
                let attempt = attempt.clone();
                let oracle = oracle.clone();
                tasks.spawn(async move {
                    let result = submit(ledger.as_ref(), &oracle, index, &request, status, &attempt).await;
                    drop(permit);
                    result
                });
            }
        }

        let mut outcome = ResponseOutcome {
            status,
            dispatched,
            skipped: 0,
            rejected: 0,
            accepted: None,
        };
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(AttemptResult::Accepted { oracle, index }) => {
                    // A late in-flight acceptance does not replace the first one.
                    if outcome.accepted.is_none() {
                        outcome.accepted = Some((oracle, index));
                    }
                }
                Ok(AttemptResult::Rejected) => outcome.rejected += 1,
                Ok(AttemptResult::Skipped) => outcome.skipped += 1,
                Err(join_error) => {
                    warn!(error = %join_error, "oracle response task failed");
                    outcome.rejected += 1;
                }
            }
        }

        match outcome.accepted {
            Some((oracle, index)) => info!(
                flight = %request.flight,
                %oracle,
                index,
                status = status.label(),
                dispatched = outcome.dispatched,
                "oracle response accepted"
            ),
            None => warn!(
                flight = %request.flight,
                dispatched = outcome.dispatched,
                "no oracle response was accepted"
            ),
        }

        outcome
    }
}

async fn submit(
    ledger: &dyn Ledger,
    oracle: &Oracle,
    index: u8,
    request: &OracleRequestEvent,
    status: StatusCode,
    attempt: &ResponseAttempt,
) -> AttemptResult {
    if attempt.is_settled() {
        return AttemptResult::Skipped;
    }

    if status.credits_insurees() {
        match ledger
            .credit_insurees(oracle.address, oracle.address, &request.flight)
            .await
        {
            Ok(tx_hash) => info!(flight = %request.flight, %tx_hash, "insurees credited"),
            Err(err) => debug!(flight = %request.flight, oracle = %oracle.address, error = %err, "creditInsurees rejected"),
        }
        if attempt.is_settled() {
            return AttemptResult::Skipped;
        }
    }

    let response = OracleResponse::for_request(request, index, status);
    match ledger.submit_oracle_response(oracle.address, &response).await {
        Ok(_) => {
            attempt.settle();
            AttemptResult::Accepted {
                oracle: oracle.address,
                index,
            }
        }
        Err(err) => {
            // Most indexes do not match the request; rejection is the normal case.
            debug!(oracle = %oracle.address, index, error = %err, "oracle response rejected");
            AttemptResult::Rejected
        }
    }
}
