//! REST surface for the loyalty ledger.
//!
//! Thin translation layer: handlers decode requests, call into
//! [`crate::core`], and map [`crate::errors::Error`] onto HTTP status codes.
//! No business logic lives here.

pub mod handlers;

use crate::config::settings::{Config, StaticBranchDirectory};
use crate::errors::Result;
use axum::routing::{get, post};
use axum::Router;
use sea_orm::DatabaseConnection;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state handed to every handler.
///
/// The connection is held behind an `Arc` because `DatabaseConnection` is
/// not `Clone` when sea-orm's `mock` feature is enabled (it is in this
/// crate's test builds).
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub branches: Arc<StaticBranchDirectory>,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/loyalty/accounts/ensure", post(handlers::ensure_account))
        .route("/loyalty/accounts/:id", get(handlers::get_account))
        .route(
            "/loyalty/accounts/:id/transactions",
            get(handlers::list_transactions),
        )
        .route("/loyalty/accounts/:id/adjust", post(handlers::adjust_points))
        .route(
            "/loyalty/customers/:id/accounts",
            get(handlers::list_customer_accounts),
        )
        .route("/loyalty/earn", post(handlers::process_order))
        .route("/loyalty/redeem", post(handlers::redeem))
        .route(
            "/loyalty/check-redemption",
            post(handlers::check_redemption),
        )
        .route("/loyalty/transfer", post(handlers::transfer))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds and serves the REST API until the process is stopped.
pub async fn serve(
    config: &Config,
    db: DatabaseConnection,
    branches: Arc<StaticBranchDirectory>,
) -> Result<()> {
    let state = AppState {
        db: Arc::new(db),
        branches,
    };
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| crate::errors::Error::Config {
            message: format!("Invalid server address: {e}"),
        })?;

    info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
