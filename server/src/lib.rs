//! HTTP backend for the Cloudflare Email Routing dashboard.
//!
//! The dashboard talks to this service only; this service talks to
//! Cloudflare with the stored API token.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::Method;
use axum::routing::{delete, get};
use axum::Router;
use mailroute::{AppConfig, CloudflareGateway, Database, DatabaseError, SecretError};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub mod error;
pub mod handlers;
pub mod state;

use handlers::{config, email_routing, health, zones};
pub use state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to open database: {0}")]
    Database(#[from] DatabaseError),

    #[error("Invalid token key: {0}")]
    TokenKey(#[from] SecretError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

/// Installs the global tracing subscriber and forwards `log` records from
/// the library into it. Filtering follows `RUST_LOG` (default `info`).
pub fn init_logging(json: bool) -> Result<(), ServerError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = if json {
        tracing::subscriber::set_global_default(
            tracing_subscriber::fmt().json().with_env_filter(filter).finish(),
        )
    } else {
        tracing::subscriber::set_global_default(
            tracing_subscriber::fmt().with_env_filter(filter).finish(),
        )
    };
    installed.map_err(|e| ServerError::Logging(e.to_string()))?;

    tracing_log::LogTracer::init().map_err(|e| ServerError::Logging(e.to_string()))
}

/// Builds the API router with every route mounted under `base_path`.
///
/// `base_path` is either empty or starts with `/` and has no trailing slash.
pub fn build_router(state: AppState, base_path: &str) -> Router {
    let api = Router::new()
        .route(
            "/cloudflare/config",
            get(config::get_config)
                .post(config::save_config)
                .put(config::save_config),
        )
        .route(
            "/config",
            get(config::get_config)
                .post(config::save_config)
                .put(config::save_config),
        )
        .route("/cloudflare/config/reveal", get(config::reveal_config))
        .route("/cloudflare/zones", get(zones::list_zones))
        .route("/zones", get(zones::list_zones))
        .route(
            "/email-routing",
            get(email_routing::list_routes).post(email_routing::create_route),
        )
        .route("/email-routing/{id}", delete(email_routing::delete_route))
        .route("/health", get(health::health))
        .with_state(state);

    let app = if base_path.is_empty() {
        api
    } else {
        Router::new().nest(base_path, api)
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    app.layer(TraceLayer::new_for_http()).layer(cors)
}

/// Opens the database, binds the listener and serves until a shutdown signal.
pub async fn start_server(config: AppConfig) -> Result<(), ServerError> {
    info!("Using database at {:?}", config.database_path);
    let db = Database::open(&config.database_path)?;

    let cipher = config.secret_cipher()?;
    if cipher.is_none() {
        warn!("MAILROUTE_TOKEN_KEY not set, stored credentials are not encrypted");
    }
    if config.reveal_secrets {
        warn!("MAILROUTE_REVEAL_SECRETS is on: config reads include plain secret values (_full)");
    }

    let gateway = CloudflareGateway::new(config.cloudflare_api_base.clone());
    let state = AppState::new(db, gateway, cipher, config.reveal_secrets);
    let app = build_router(state, &config.base_path);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!("Server running on http://{}{}", addr, config.base_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
