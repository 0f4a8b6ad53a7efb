//! HTTP API for authgate.

pub mod error;
pub mod handlers;
pub mod interceptor;


use std::sync::Arc;

use axum::Router;
use axum::extract::FromRef;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::auth::TokenValidator;
use crate::service::AuthService;

pub use error::{ApiError, AuthRejection};
pub use interceptor::{Authenticated, Authorized, require_role};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub validator: Arc<TokenValidator>,
}

impl AppState {
    pub fn new(auth: Arc<AuthService>, validator: Arc<TokenValidator>) -> Self {
        Self { auth, validator }
    }
}

impl FromRef<AppState> for Arc<TokenValidator> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.validator)
    }
}

/// Build the application router with request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/register", post(handlers::register))
        .route("/api/account/login", post(handlers::account_login))
        .route("/api/user/profile", get(handlers::profile))
        .route("/api/admin/dashboard", get(handlers::admin_dashboard))
        .route("/api/sample/admin", get(handlers::sample_admin))
        .route("/api/sample/user", get(handlers::sample_user))
        .route("/api/sample/guest", get(handlers::sample_guest))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
