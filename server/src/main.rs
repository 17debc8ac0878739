//! FlightSurety Oracle Server
//!
//! Registers the node's accounts as oracles, answers `OracleRequest` events
//! emitted by the FlightSurety app contract, and serves the DApp's REST API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use tokio::time::{sleep, Duration};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use flightsurety_server::app_state::AppState;
use flightsurety_server::config::Config;
use flightsurety_server::ledger::{Ledger, RpcLedger};
use flightsurety_server::routes;
use flightsurety_server::services::{
    initialize_accounts, register_oracles, BlockCursor, OracleRegistry, RequestListener,
    RequestResponder,
};

const LISTENER_SUPERVISOR_MAX_BACKOFF_SECONDS: u64 = 30;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("flightsurety_server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    let ledger: Arc<dyn Ledger> =
        Arc::new(RpcLedger::new(&config).context("failed to build ledger client")?);
    let registry = Arc::new(OracleRegistry::new());

    let setup = initialize_accounts(ledger.as_ref(), &config.contracts, config.funding_value)
        .await
        .context("account initialization failed")?;
    if !setup.funded {
        warn!(operator = %setup.operator, "operator is not funded; airline actions may be rejected");
    }

    // REST comes up as soon as accounts are ready, oracle registration continues behind it.
    let app = routes::router(AppState::new(
        Arc::clone(&ledger),
        Arc::clone(&registry),
        setup.operator,
    ))
    .layer(TraceLayer::new_for_http())
    .layer(build_cors_layer(&config.cors_allowed_origins));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server starting on {}", addr);
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let report = register_oracles(ledger.as_ref(), &setup.addresses())
        .await
        .context("oracle registration failed")?;
    let oracles = if config.strict_registration {
        report.into_strict().context("oracle registration failed")?
    } else {
        for failure in &report.failures {
            warn!(error = %failure, "oracle left unregistered");
        }
        report.oracles
    };
    registry.install(oracles).await;
    info!(oracles = registry.len().await, "oracle registry ready");

    let responder = Arc::new(RequestResponder::new(
        Arc::clone(&ledger),
        Arc::clone(&registry),
        config.status_policy,
        config.responder_concurrency,
    ));
    spawn_listener_supervisor(Arc::clone(&ledger), responder, config.poll_interval);

    server.await.context("server task failed")??;
    Ok(())
}

/// Keeps the request listener alive, restarting it with backoff if it dies.
fn spawn_listener_supervisor(
    ledger: Arc<dyn Ledger>,
    responder: Arc<RequestResponder>,
    poll_interval: Duration,
) {
    tokio::spawn(async move {
        let cursor = BlockCursor::default();
        let mut restart_count: u32 = 0;
        loop {
            let listener = RequestListener::with_cursor(
                Arc::clone(&ledger),
                Arc::clone(&responder),
                poll_interval,
                Arc::clone(&cursor),
            );
            let handle = tokio::spawn(listener.start());

            match handle.await {
                Ok(()) => {
                    info!("oracle request listener exited cleanly; stopping supervisor");
                    break;
                }
                Err(join_error) => {
                    if join_error.is_panic() {
                        error!("oracle request listener panicked; restarting");
                    } else {
                        error!(error = %join_error, "oracle request listener task failed; restarting");
                    }
                }
            }

            restart_count = restart_count.saturating_add(1);
            let backoff_seconds = (2u64.saturating_pow(restart_count.min(5)))
                .min(LISTENER_SUPERVISOR_MAX_BACKOFF_SECONDS);
            warn!(restart_count, backoff_seconds, "oracle request listener restart backoff");
            sleep(Duration::from_secs(backoff_seconds)).await;
        }
    });
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allowed_origins = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(false)
}
