//! bapi-api - REST facade over BAPI remote calls
//!
//! Every route resolves the configured destination, checks a session out of
//! its pool and runs one remote function. Mutating routes go through the
//! [`TransactionOrchestrator`](bapi_core::TransactionOrchestrator) so the
//! backend either commits or rolls back before the response is written.
//!
//! # Usage
//!
//! ```ignore
//! use bapi_api::{create_router, AppState};
//!
//! let state = AppState::new(Arc::new(registry), "SAP_DEST");
//! let router = create_router(state);
//! ```

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the REST router with the given application state
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(|| async { "OK" }))
        // Business partners
        .route(
            "/business-partners",
            post(handlers::business_partners::create_partner),
        )
        .route(
            "/business-partners/{id}",
            get(handlers::business_partners::get_partner)
                .put(handlers::business_partners::update_partner)
                .delete(handlers::business_partners::delete_partner),
        )
        // Users
        .route("/users", post(handlers::users::create_user))
        .route(
            "/users/{username}",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        // Flights (read-only)
        .route("/flights", get(handlers::flights::list_flights))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
