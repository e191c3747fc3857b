// src/bin/api_server.rs

use anyhow::Context;
use realstack::app::{Clock, SystemClock};
use realstack::infra::config::{Config, LedgerMode, StoreBackend};
use realstack::infra::logging::{init_logging, LoggingConfig};
use realstack::infra::metrics::install_recorder;
use realstack::infra::solana::{InMemoryLedger, SolanaLedger, TokenLedger};
use realstack::storage::{MemoryStore, PgStore};
use realstack::transport::http::auth::ApiKeyRegistry;
use realstack::transport::http::middleware::SecuritySettings;
use realstack::transport::http::{create_router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_logging(if config.log_json {
        LoggingConfig::production()
    } else {
        LoggingConfig::default()
    });

    let prometheus = if config.metrics_enabled {
        Some(install_recorder().context("failed to install Prometheus recorder")?)
    } else {
        info!("metrics disabled; /metrics will answer 503");
        None
    };

    let api_keys = ApiKeyRegistry::parse(&config.api_keys).context("REALSTACK_API_KEYS is invalid")?;
    if api_keys.is_empty() {
        warn!("no API keys configured; every authenticated endpoint will answer 401");
    } else {
        info!(keys = api_keys.len(), "API keys loaded");
    }

    let ledger: Arc<dyn TokenLedger> = match config.ledger_mode {
        LedgerMode::Solana => {
            let solana = config
                .solana
                .as_ref()
                .context("Solana settings missing for LEDGER_MODE=solana")?;
            let ledger = SolanaLedger::new(solana)?;
            info!(
                rpc_url = %solana.rpc_url,
                program_id = %ledger.program_id(),
                payer = %ledger.payer_pubkey(),
                "Solana ledger configured"
            );
            Arc::new(ledger)
        }
        LedgerMode::Memory => {
            warn!("LEDGER_MODE=memory: tokenization is simulated and nothing reaches a cluster");
            Arc::new(InMemoryLedger::new())
        }
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let state = match config.store_backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set when STORE_BACKEND=postgres")?;
            let store = PgStore::connect(url, config.database_max_connections).await?;
            info!(max_connections = config.database_max_connections, "PostgreSQL store ready");
            AppState::new(Arc::new(store), ledger, clock, api_keys, &config.rate_limit)?
        }
        StoreBackend::Memory => {
            warn!("STORE_BACKEND=memory: data is lost on restart");
            AppState::new(Arc::new(MemoryStore::new()), ledger, clock, api_keys, &config.rate_limit)?
        }
    };
    let mut state = state
        .with_security(SecuritySettings {
            hsts_enabled: config.hsts_enabled,
        })
        .with_cors_origins(config.cors_allowed_origins.clone());
    if let Some(handle) = prometheus {
        state = state.with_prometheus(handle);
    }

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "API server listening");
    info!("Swagger UI available at http://{}/swagger-ui", config.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("API server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
