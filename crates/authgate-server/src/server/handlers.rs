//! Route handlers.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Serialize;
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiError;
use super::interceptor::{Admin, Authenticated, Authorized, Guest, User};
use crate::error::AuthError;
use crate::service::models::{
    AccountLoginResponse, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
};

/// Unparseable JSON is reported as a validation failure on the body.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| AuthError::field("body", rejection.body_text()).into())
}

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.to_string(),
    })
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let req = body(payload)?;
    Ok(Json(state.auth.login(&req).await?))
}

/// `POST /api/auth/register`
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let req = body(payload)?;
    Ok(Json(state.auth.register(&req).await?))
}

/// `POST /api/account/login`
pub async fn account_login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AccountLoginResponse>, ApiError> {
    let req = body(payload)?;
    Ok(Json(state.auth.account_login(&req).await?))
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub message: String,
    pub username: String,
    pub roles: Vec<String>,
}

/// `GET /api/user/profile`
pub async fn profile(Authenticated(claims): Authenticated) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        message: "Welcome to your profile".into(),
        roles: claims.role.iter().map(ToString::to_string).collect(),
        username: claims.name,
    })
}

/// `GET /api/admin/dashboard`
pub async fn admin_dashboard(_: Authorized<Admin>) -> Json<MessageResponse> {
    message("Welcome to Admin Dashboard")
}

pub async fn sample_admin(_: Authorized<Admin>) -> Json<MessageResponse> {
    message("This endpoint is accessible only to Admins.")
}

pub async fn sample_user(_: Authorized<User>) -> Json<MessageResponse> {
    message("This endpoint is accessible only to Users.")
}

pub async fn sample_guest(_: Authorized<Guest>) -> Json<MessageResponse> {
    message("This endpoint is accessible only to Guests.")
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
