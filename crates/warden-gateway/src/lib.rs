//! Warden HTTP Gateway.
//!
//! Runs every request through the Warden filter chain before it reaches a
//! handler. `/health` is mounted outside the chain so health checks never need
//! credentials.
//!
//! # Example
//!
//! ```ignore
//! use warden_gateway::{assembly, create_router, GatewayConfig};
//!
//! let state = assembly::build_state(&GatewayConfig::default())?;
//! let app = create_router(state);
//! ```

pub mod assembly;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;

pub use config::{Args, Command, GatewayConfig, IdentitySource};
pub use error::AppError;
pub use middleware::CurrentPrincipal;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use warden_core::RequestFilterChain;

/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Request filter chain.
    pub chain: Arc<RequestFilterChain>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl AppState {
    /// Create new application state.
    pub fn new(chain: RequestFilterChain, config: GatewayConfig) -> Self {
        Self {
            chain: Arc::new(chain),
            config,
        }
    }
}

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // The fallback sits under the security layer so unmatched paths are
    // still subject to the rule table. Routes merged after the layer
    // bypass it.
    Router::new()
        .merge(routes::hello::routes())
        .fallback(not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::security_filter,
        ))
        .merge(routes::health::routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Reached only when the filter chain allowed a request no handler serves.
async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
