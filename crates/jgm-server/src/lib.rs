//! Just Go Market core API.
//!
//! Routes:
//!
//! - `GET /` static status document, never touches the database.
//! - `GET /health` database connectivity check.
//! - `/auth/*` token issuance, see [`auth`].
//! - `/products`, `/stores`, `/transactions` CRUD, behind bearer auth.

pub mod api;
pub mod api_products;
pub mod api_stores;
pub mod api_transactions;
pub mod auth;
pub mod config;
pub mod extract;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch},
    Extension, Json, Router,
};
use config::{LoggingConfig, Settings};
use jgm_db::DbPool;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Name reported by `GET /`.
pub const SYSTEM_NAME: &str = "Just Go Market";

/// Maximum request body size (1 MiB).
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool. Each request checks out its own session.
    pub pool: DbPool,
    /// Validated settings, loaded once at startup.
    pub settings: Arc<Settings>,
}

/// Installs the global tracing subscriber.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Handler for `GET /`.
async fn root(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "system": SYSTEM_NAME,
        "status": "online",
        "environment": state.settings.environment,
    }))
}

/// Handler for `GET /health`.
///
/// Any failure, whether checking out a session or running the query, is
/// logged and answered with the same generic 500.
async fn health(Extension(state): Extension<Arc<AppState>>) -> Result<Json<Value>, api::ApiError> {
    let check = api::with_session(&state.pool, |conn| {
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| {
                tracing::error!(error = %e, "health check query failed");
                api::ApiError::InternalServerError(e.to_string())
            })
    })
    .await;

    match check {
        Ok(_) => Ok(Json(json!({ "database": "connected" }))),
        Err(_) => Err(api::ApiError::InternalServerError(
            "Database connection failed".to_string(),
        )),
    }
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/products",
            get(api_products::list_products_handler).post(api_products::create_product_handler),
        )
        .route(
            "/products/{sku}",
            get(api_products::get_product_handler)
                .put(api_products::update_product_handler)
                .delete(api_products::delete_product_handler),
        )
        .route(
            "/stores",
            get(api_stores::list_stores_handler).post(api_stores::create_store_handler),
        )
        .route(
            "/stores/{id}",
            get(api_stores::get_store_handler)
                .put(api_stores::update_store_handler)
                .delete(api_stores::delete_store_handler),
        )
        .route(
            "/transactions",
            get(api_transactions::list_transactions_handler)
                .post(api_transactions::create_transaction_handler),
        )
        .route(
            "/transactions/{id}",
            get(api_transactions::get_transaction_handler),
        )
        .route(
            "/transactions/{id}/status",
            patch(api_transactions::update_status_handler),
        )
        .route_layer(axum::middleware::from_fn(auth::auth_middleware));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth::router())
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
