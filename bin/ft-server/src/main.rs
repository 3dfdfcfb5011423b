//! Fintrack Server
//!
//! REST API for users, ledger entries, summaries and budgets.
//!
//! ## Configuration
//!
//! Settings come from a TOML file (`FINTRACK_CONFIG`, `config.toml`,
//! `fintrack.toml` or `./config/config.toml`) with environment overrides:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FINTRACK_HTTP_HOST` | `0.0.0.0` | Listen address |
//! | `FINTRACK_HTTP_PORT` | `5315` | HTTP API port |
//! | `FINTRACK_REQUEST_TIMEOUT_SECS` | `30` | Per-request deadline |
//! | `FINTRACK_DB_SOURCE` | - | PostgreSQL connection URL |
//! | `FINTRACK_DB_MAX_CONNECTIONS` | `10` | Pool size |
//! | `FINTRACK_TOKEN_SYMMETRIC_KEY` | - | Token signing key, at least 32 bytes |
//! | `FINTRACK_ACCESS_TOKEN_TTL_SECS` | `86400` | Session token lifetime |
//! | `FINTRACK_DEV_MODE` | `false` | Use the in-memory store when no database is set |
//! | `RUST_LOG` | `info` | Log level |
//! | `LOG_FORMAT` | `text` | `json` or `text` |

use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::{net::TcpListener, signal};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use ft_config::AppConfig;
use ft_platform::{
    router, AppState, Argon2Config, InMemoryStore, JwtMaker, PasswordPolicy, PasswordService,
    PgBudgetRepository, PgLedgerRepository, PgUserRepository, TokenMaker, MIGRATOR,
};

#[tokio::main]
async fn main() -> Result<()> {
    ft_common::logging::init_logging("ft-server");

    info!("Starting Fintrack Server");

    let config = AppConfig::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    let token_maker: Arc<dyn TokenMaker> = Arc::new(JwtMaker::new(&config.auth.token_symmetric_key)?);
    let password_service = Arc::new(PasswordService::new(
        Argon2Config::default(),
        PasswordPolicy::default(),
    )?);

    let ttl_secs = i64::try_from(config.auth.access_token_ttl_secs)
        .context("auth.access_token_ttl_secs out of range")?;
    let access_token_ttl = chrono::Duration::try_seconds(ttl_secs)
        .context("auth.access_token_ttl_secs out of range")?;

    let state = if config.database.source.is_empty() {
        warn!("No database configured, using the in-memory store (dev mode)");
        let store = Arc::new(InMemoryStore::new());
        AppState::new(
            token_maker,
            password_service,
            store.clone(),
            store.clone(),
            store,
            access_token_ttl,
        )
    } else {
        info!(max_connections = config.database.max_connections, "Connecting to PostgreSQL");
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .acquire_timeout(StdDuration::from_secs(config.database.acquire_timeout_secs))
            .connect(&config.database.source)
            .await
            .context("failed to connect to database")?;

        MIGRATOR.run(&pool).await.context("failed to run migrations")?;
        info!("Database migrations applied");

        AppState::new(
            token_maker,
            password_service,
            Arc::new(PgUserRepository::new(pool.clone())),
            Arc::new(PgLedgerRepository::new(pool.clone())),
            Arc::new(PgBudgetRepository::new(pool)),
            access_token_ttl,
        )
    };

    // Dropping a timed-out or disconnected request's future abandons any
    // in-flight authorization lookups along with it.
    let app: Router = router(state)
        .layer(TimeoutLayer::new(StdDuration::from_secs(config.http.request_timeout_secs)))
        .layer(TraceLayer::new_for_http());

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Fintrack Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received...");
}
