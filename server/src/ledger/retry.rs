//! Bounded retry with exponential backoff for transport failures

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::error::LedgerError;

const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// Whether repeating a request can have side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idempotency {
    /// Reads may be repeated on any transient failure.
    Read,
    /// Sends are only repeated when the node was never reached.
    Write,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
        }
    }

    fn should_retry(&self, err: &LedgerError, idempotency: Idempotency, attempt: u32) -> bool {
        if attempt >= self.max_retries {
            return false;
        }
        match idempotency {
            Idempotency::Read => err.is_transient(),
            Idempotency::Write => matches!(err, LedgerError::Connection(_)),
        }
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
            .min(MAX_BACKOFF)
    }

    pub async fn run<T, F, Fut>(
        &self,
        method: &str,
        idempotency: Idempotency,
        mut op: F,
    ) -> Result<T, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if self.should_retry(&err, idempotency, attempt) => {
                    let backoff = self.backoff(attempt);
                    attempt += 1;
                    warn!(method, attempt, backoff_ms = backoff.as_millis() as u64, error = %err, "retrying ledger call");
                    sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
