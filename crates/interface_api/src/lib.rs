//! HTTP API layer
//!
//! REST surface over the reconciliation engine using axum. The tenant id is
//! taken from the `X-Tenant-Id` header on every call; authentication and
//! tenant resolution live outside this crate.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, config::ApiConfig};
//!
//! let app = create_router(engine, ApiConfig::default());
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod tenant;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use domain_ledger::ReconciliationEngine;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{advances, credits, health, payables, receivables, utilizations};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: ReconciliationEngine,
    pub config: ApiConfig,
}

/// Creates the main API router
pub fn create_router(engine: ReconciliationEngine, config: ApiConfig) -> Router {
    let state = AppState { engine, config };

    let payable_routes = Router::new()
        .route("/", post(payables::create))
        .route("/:id", get(payables::detail))
        .route("/:id", delete(payables::delete))
        .route("/:id/payments", post(payables::register_payment))
        .route("/:id/credit-applications", post(payables::apply_credit))
        .route("/:id/advance-applications", post(payables::apply_advance))
        .route("/:id/installments", post(payables::generate_installments));

    let receivable_routes = Router::new()
        .route("/", post(receivables::create))
        .route("/:id", get(receivables::detail))
        .route("/:id", delete(receivables::delete))
        .route("/:id/receipts", post(receivables::register_receipt))
        .route("/:id/installments", post(receivables::generate_installments));

    let advance_routes = Router::new()
        .route("/", post(advances::create))
        .route("/:id", get(advances::detail))
        .route("/:id", put(advances::update_total))
        .route("/:id", delete(advances::delete));

    let credit_routes = Router::new()
        .route("/", post(credits::create))
        .route("/:id", get(credits::detail))
        .route("/:id", put(credits::update_total))
        .route("/:id", delete(credits::delete));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/payables", payable_routes)
        .nest("/receivables", receivable_routes)
        .nest("/advances", advance_routes)
        .nest("/credits", credit_routes)
        .route("/utilizations/:id", delete(utilizations::reverse))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
