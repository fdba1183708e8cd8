//! # dotrack-api: HTTP Surface for Delivery-Order Tracking
//!
//! Thin axum layer over [`dotrack_workflow::WorkflowEngine`]. Handlers
//! translate JSON to domain input, call the engine as the authenticated
//! caller, and translate the result back. No workflow rule lives here.
//!
//! ## API Surface
//!
//! | Prefix                 | Module               | Domain                 |
//! |------------------------|----------------------|------------------------|
//! | `/v1/orders/*`         | [`routes::orders`]   | Order lifecycle, audit |
//! | `/v1/orders/{id}/issues`, `/v1/issues/*` | [`routes::issues`] | Issues |
//! | `/health/*`            | [`routes::health`]   | Probes (no auth)       |
//! | `/openapi.json`        | [`openapi`]          | Generated OpenAPI      |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → AuthMiddleware → Handler
//! ```

pub mod auth;
pub mod error;
pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Assemble the application router with all routes and middleware.
///
/// Health probes are mounted outside the auth middleware so they remain
/// reachable without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        secret: state.config.auth_token.clone(),
    };

    let api = Router::new()
        .merge(routes::orders::router())
        .merge(routes::issues::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(axum::Extension(auth_config));

    Router::new()
        .merge(routes::health::router())
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
