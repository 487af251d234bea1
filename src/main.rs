use std::sync::Arc;
use std::time::Duration;

use courier_dispatch::api;
use courier_dispatch::config::Config;
use courier_dispatch::engine::rate_limit::{run_counter_sweeper, MemoryCounterStore};
use courier_dispatch::error::AppError;
use courier_dispatch::state::{AppState, Collaborators};
use courier_dispatch::store::memory::MemoryStore;
use courier_dispatch::store::postgres::PgStore;
use courier_dispatch::store::{ActorDirectory, OrderStore};
use courier_dispatch::upstream::geocoder::HttpGeoResolver;
use courier_dispatch::upstream::pricing::HttpPriceQuoter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let (orders, actors): (Arc<dyn OrderStore>, Arc<dyn ActorDirectory>) =
        match &config.database_url {
            Some(url) => {
                let store = Arc::new(PgStore::connect(url, config.database_max_connections).await?);
                tracing::info!("using postgres store");
                (store.clone(), store)
            }
            None => {
                let store = Arc::new(MemoryStore::new());
                tracing::warn!("DATABASE_URL not set; deliveries are kept in memory");
                (store.clone(), store)
            }
        };

    let http = reqwest::Client::builder()
        .timeout(config.engine.upstream_timeout)
        .build()
        .map_err(|err| AppError::Internal(format!("failed to build http client: {err}")))?;

    let counters = Arc::new(MemoryCounterStore::new());
    tokio::spawn(run_counter_sweeper(
        counters.clone(),
        config.engine.rate_limit_window.max(Duration::from_secs(1)),
    ));

    let state = AppState::new(
        config.engine.clone(),
        Collaborators {
            orders,
            actors,
            geo: Arc::new(HttpGeoResolver::new(http.clone(), config.geocoder.clone())),
            quoter: Arc::new(HttpPriceQuoter::new(http, config.pricing_base_url.clone())),
            counters,
        },
    );

    let app = api::rest::router(Arc::new(state));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
