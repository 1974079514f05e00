//! Application entry point for the `keg-monitor-bridge` service.
//!
//! Startup sequence:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Establishing a PostgreSQL connection pool and creating the schema
//! - Restoring pour history and preferences, then starting the coordinator
//! - Discovering kegs over REST and starting the stream, poll and reset tasks
//! - Mounting all API routes via the `routes` gateway (EMBP pattern)
//!
//! On Ctrl-C / SIGTERM open event streams are closed and the HTTP server
//! drains. The data sources are then aborted and the coordinator flushes
//! the history before the process exits.
//!
//! # Environment Variables
//! - `DATABASE_URL` (**required**) – PostgreSQL connection string
//! - `KEG_STREAM_URL` (**required**) – WebSocket URL of the keg device
//! - `KEG_LOG_LEVEL` (optional) – log verbosity (default: `info`)
//! - `KEG_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! See [`config::load_from_env`] for the remaining knobs.
use std::{env, sync::Arc};

use axum::Router;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use anyhow::Result;

mod config;
mod coordinator;
mod entities;
mod export;
mod history;
mod models;
mod pour;
mod preferences;
mod publisher;
mod registry;
mod routes;
mod schema;
mod sources;
mod store;

use coordinator::KegCoordinator;
use sources::KegApiClient;
use store::PgStore;

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_pool_max)
        .connect(&cfg.db_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    tracing::info!("Successfully connected to database");

    schema::create_schema(&pool).await?;

    let store = Arc::new(PgStore::new(pool.clone()));
    let coordinator = KegCoordinator::load(
        store,
        cfg.options.clone(),
        cfg.history_max,
        cfg.static_dir.clone(),
    )
    .await;
    let (handle, coordinator_task) = coordinator.spawn();

    let client = KegApiClient::from_stream_url(&cfg.stream_url)?;
    tracing::info!("Keg REST API at {}", client.base_url());

    match sources::discover(&client, &handle).await {
        Ok(count) if count > 0 => tracing::info!("Discovered {} kegs", count),
        Ok(_) => {}
        Err(e) => tracing::error!("Initial discovery failed: {}", e),
    }

    let source_tasks = vec![
        tokio::spawn(sources::run_stream_listener(
            cfg.stream_url.clone(),
            handle.clone(),
            cfg.reconnect_delay,
        )),
        tokio::spawn(sources::run_poll(
            client.clone(),
            handle.clone(),
            cfg.poll_interval,
        )),
        tokio::spawn(sources::run_daily_reset(handle.clone(), cfg.reset_interval)),
    ];

    // Build app from routes gateway (EMBP)
    let state = routes::AppState::new(handle.clone(), client, cfg.static_dir.clone());
    let draining = state.clone();
    let app: Router = routes::router(state);

    tracing::info!("Listening on {}", cfg.listen_addr);
    let listener = tokio::net::TcpListener::bind(cfg.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            draining.begin_shutdown();
        })
        .await?;

    tracing::info!("Shutting down");
    for task in source_tasks {
        task.abort();
    }
    handle.shutdown().await;
    if let Err(e) = coordinator_task.await {
        tracing::error!("Coordinator task failed: {}", e);
    }
    pool.close().await;

    Ok(())
}

// ---

/// Resolve on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    // ---
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize the global tracing subscriber for structured logging.
///
/// - Color output controlled by TTY detection and `FORCE_COLOR`
///   (`1|true|yes` forces on, `0|false|no` forces off)
/// - Span events controlled by `KEG_SPAN_EVENTS`:
///   `"full"`, `"enter_exit"`, otherwise CLOSE only
/// - `RUST_LOG` wins when set; otherwise `KEG_LOG_LEVEL` (default `info`)
fn init_tracing() {
    // ---
    let span_events = match env::var("KEG_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("KEG_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn,tungstenite=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
