use axum::http::{header, HeaderValue, Method};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod constants;
mod db;
mod error;
mod integrations;
mod models;
mod services;
mod utils;

use config::{Config, StoreKind};
use constants::API_VERSION;
use db::Database;
use integrations::{local_wallet::LocalWalletConnector, postgrest::PostgrestStore};
use services::{
    address_lock::AddressLocks,
    identity_store::{IdentityStore, MemoryIdentityStore},
    identity_sync::IdentitySyncCoordinator,
    username_update::UsernameUpdateCoordinator,
    wallet_session::WalletSession,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snake_identity=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting snake identity service");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("API Version: {}", API_VERSION);
    tracing::info!(
        "Chain: {} (testnet: {})",
        config.starknet_chain_id,
        config.is_testnet()
    );

    let store = build_store(&config).await?;
    tracing::info!("Identity store: {}", config.identity_store.as_str());

    // Sync and rename share one lock table so they never interleave per address.
    let locks = AddressLocks::new();
    let connector = LocalWalletConnector::from_config(&config);
    if !connector.is_configured() {
        tracing::warn!("No wallet credentials configured; connect will report no wallet detected");
    }
    let session = WalletSession::new(
        Arc::new(connector),
        Arc::new(IdentitySyncCoordinator::new(store.clone(), locks.clone())),
        Arc::new(UsernameUpdateCoordinator::new(store.clone(), locks)),
    );

    let app_state = api::AppState {
        session: Arc::new(session),
        config: config.clone(),
        store_kind: store.kind(),
    };

    let app = build_router(app_state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn IdentityStore>> {
    let store: Arc<dyn IdentityStore> = match config.identity_store {
        StoreKind::Postgres => {
            let db = Database::new(config).await?;
            tracing::info!("Running database migrations...");
            db.run_migrations().await?;
            Arc::new(db)
        }
        StoreKind::Rest => Arc::new(PostgrestStore::new(
            config.backend_url.clone(),
            config.backend_api_key.clone(),
        )),
        StoreKind::Memory => {
            tracing::warn!("Using in-memory identity store; records are lost on restart");
            Arc::new(MemoryIdentityStore::new())
        }
    };
    Ok(store)
}

fn build_router(state: api::AppState) -> Router {
    let cors = cors_from_config(&state.config);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Wallet session
        .route("/api/v1/wallet/connect", post(api::wallet::connect))
        .route("/api/v1/wallet/disconnect", post(api::wallet::disconnect))
        .route("/api/v1/wallet/session", get(api::wallet::get_session))
        // Player identity
        .route("/api/v1/player", get(api::profile::get_player))
        .route("/api/v1/player/username", put(api::profile::update_username))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, PartialEq)]
enum CorsPolicy {
    AnyOrigin,
    Origins(Vec<HeaderValue>),
    SameOriginOnly,
}

fn cors_policy(config: &Config) -> CorsPolicy {
    let raw = config.cors_allowed_origins.trim();
    if raw == "*" {
        return CorsPolicy::AnyOrigin;
    }

    let allowed = parse_origins(raw);
    if !allowed.is_empty() {
        return CorsPolicy::Origins(allowed);
    }
    if config.is_development() {
        tracing::warn!("No valid CORS origins configured; allowing any origin in development");
        return CorsPolicy::AnyOrigin;
    }
    tracing::warn!(
        "No valid CORS origins configured in {}; cross-origin requests are rejected",
        config.environment
    );
    CorsPolicy::SameOriginOnly
}

fn parse_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<HeaderValue>() {
            Ok(origin) => Some(origin),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", s);
                None
            }
        })
        .collect()
}

fn cors_from_config(config: &Config) -> CorsLayer {
    match cors_policy(config) {
        CorsPolicy::AnyOrigin => CorsLayer::very_permissive(),
        CorsPolicy::Origins(allowed) => CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET, Method::POST, Method::PUT])
            .allow_headers([header::CONTENT_TYPE]),
        CorsPolicy::SameOriginOnly => CorsLayer::new(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        return;
    }
    tracing::info!("Shutting down");
}
