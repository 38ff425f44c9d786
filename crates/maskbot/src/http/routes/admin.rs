//! Admin endpoints: login, admin accounts, users, settings, broadcast
//!
//! Everything except `POST /login` requires a bearer token.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use maskcore::auth::{hash_password, verify_password};
use maskcore::storage::models::{Admin, Setting, User, UserFields};

use super::{catalog, required, required_text};
use crate::http::error::ApiError;
use crate::http::extract::{AdminSession, ApiJson};
use crate::http::server::AppState;
use crate::telegram::broadcast::{broadcast, BroadcastReport};

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
}

#[derive(Deserialize)]
pub struct SettingRequest {
    pub key: Option<String>,
    pub value: Option<String>,
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub message: Option<String>,
}

/// POST /api/admin/login
async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let username = required_text(req.username, "username")?;
    let password = required(req.password.filter(|p| !p.is_empty()), "password")?;

    let admin = state.db.admins().find_by_username(&username).await?;
    let valid = admin
        .as_ref()
        .is_some_and(|admin| verify_password(&password, &admin.password_hash));
    if !valid {
        tracing::warn!(username = %username, "Rejected admin login");
        return Err(ApiError::Unauthorized("invalid credentials".to_string()));
    }

    let token = state.tokens.issue(&username)?;
    tracing::info!(username = %username, "Admin logged in");
    Ok(Json(LoginResponse { token, username }))
}

/// POST /api/admin/create - add another admin
async fn create_admin(
    admin: AdminSession,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> Result<(StatusCode, Json<Admin>), ApiError> {
    let username = required_text(req.username, "username")?;
    let password = required(req.password.filter(|p| !p.is_empty()), "password")?;

    let hash = hash_password(&password)?;
    let created = state.db.admins().create(&username, &hash).await?;
    tracing::info!(by = %admin.username, username = %created.username, "Admin account created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/admin/users
async fn list_users(_admin: AdminSession, State(state): State<Arc<AppState>>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.db.users().list().await?))
}

/// PUT /api/admin/users/{telegramId}
async fn update_user(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(telegram_id): Path<String>,
    ApiJson(fields): ApiJson<UserFields>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .db
        .users()
        .update(&telegram_id, &fields)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;
    Ok(Json(user))
}

/// DELETE /api/admin/users/{telegramId}
async fn delete_user(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(telegram_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.db.users().delete(&telegram_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("user"))
    }
}

/// GET /api/admin/settings
async fn list_settings(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Setting>>, ApiError> {
    Ok(Json(state.db.settings().list().await?))
}

/// POST /api/admin/settings - upsert by key
async fn save_setting(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SettingRequest>,
) -> Result<Json<Setting>, ApiError> {
    let key = required_text(req.key, "key")?;
    let value = required(req.value, "value")?;
    Ok(Json(state.db.settings().upsert(&key, &value).await?))
}

/// POST /api/admin/send-message - broadcast to every reachable user
async fn send_message(
    admin: AdminSession,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> Result<Json<BroadcastReport>, ApiError> {
    let message = required_text(req.message, "message")?;
    let bot = state
        .bot
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("telegram bot is not configured".to_string()))?;

    tracing::info!(by = %admin.username, "Starting broadcast");
    Ok(Json(broadcast(bot, &state.db, &message).await?))
}

/// Admin routes, relative to `/api/admin`
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/create", post(create_admin))
        .route("/users", get(list_users))
        .route("/users/{telegram_id}", put(update_user).delete(delete_user))
        .route("/settings", get(list_settings).post(save_setting))
        .route("/send-message", post(send_message))
        .merge(catalog::router())
}
