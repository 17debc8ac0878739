use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::services::oracle_service::{RequestResponder, ResponseOutcome};

/// Upper bound on blocks scanned per poll, to keep `eth_getLogs` requests small.
const MAX_BLOCK_RANGE: u64 = 200;

/// Last block whose events were dispatched. `None` until the first poll.
///
/// Shared so a restarted listener resumes where the previous one stopped.
pub type BlockCursor = Arc<Mutex<Option<u64>>>;

/// Watches the app contract for `OracleRequest` events and hands each one to
/// the responder.
pub struct RequestListener {
    ledger: Arc<dyn Ledger>,
    responder: Arc<RequestResponder>,
    poll_interval: Duration,
    cursor: BlockCursor,
}

impl RequestListener {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        responder: Arc<RequestResponder>,
        poll_interval: Duration,
    ) -> Self {
        Self::with_cursor(ledger, responder, poll_interval, BlockCursor::default())
    }

    pub fn with_cursor(
        ledger: Arc<dyn Ledger>,
        responder: Arc<RequestResponder>,
        poll_interval: Duration,
        cursor: BlockCursor,
    ) -> Self {
        Self {
            ledger,
            responder,
            poll_interval,
            cursor,
        }
    }

    pub async fn cursor(&self) -> Option<u64> {
        *self.cursor.lock().await
    }

    /// Polls forever. Poll failures are logged and retried on the next tick.
    pub async fn start(self) {
        info!(poll_interval_secs = self.poll_interval.as_secs(), "oracle request listener started");

        loop {
            if let Err(err) = self.poll_once().await {
                error!(error = %err, "oracle request poll failed");
            }

            sleep(self.poll_interval).await;
        }
    }

    /// Fetches new request events and spawns one responder run per event.
    ///
    /// The first poll starts at the current head, so requests emitted before
    /// startup are not answered.
    pub async fn poll_once(&self) -> Result<Vec<JoinHandle<ResponseOutcome>>, LedgerError> {
        let mut cursor_guard = self.cursor.lock().await;
        let latest = self.ledger.latest_block().await?;
        let from_block = match *cursor_guard {
            Some(cursor) => cursor.saturating_add(1),
            None => latest,
        };
        if from_block > latest {
            return Ok(Vec::new());
        }

        let to_block = latest.min(from_block.saturating_add(MAX_BLOCK_RANGE - 1));
        let events = self.ledger.oracle_requests(from_block, to_block).await?;
        *cursor_guard = Some(to_block);

        debug!(from_block, to_block, events = events.len(), "oracle request poll complete");

        Ok(events
            .into_iter()
            .map(|event| {
                let responder = Arc::clone(&self.responder);
                tokio::spawn(async move { responder.respond(event).await })
            })
            .collect())
    }
}
