//! Endpoints used by the client app (no authentication)

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use maskcore::storage::models::{MaskDetails, User, UserFields, UserMask, Video};

use super::{required, required_text};
use crate::http::error::ApiError;
use crate::http::extract::{lenient, ApiJson, IdPath};
use crate::http::server::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub telegram_id: Option<String>,
    pub first_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub telegram_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMaskRequest {
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub mask_id: Option<i32>,
}

/// Usage instructions of one mask
#[derive(Debug, Serialize)]
pub struct MaskInstructions {
    pub id: i32,
    pub name: String,
    pub instructions: Option<String>,
}

/// POST /api/register - create the user unless it already exists
async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let telegram_id = required_text(req.telegram_id, "telegramId")?;
    let user = state
        .db
        .users()
        .register(&telegram_id, req.first_name.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

async fn find_user(state: &AppState, telegram_id: &str) -> Result<User, ApiError> {
    state
        .db
        .users()
        .find_by_telegram_id(telegram_id)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))
}

/// GET /api/user/{telegramId}
async fn get_user(State(state): State<Arc<AppState>>, Path(telegram_id): Path<String>) -> Result<Json<User>, ApiError> {
    Ok(Json(find_user(&state, &telegram_id).await?))
}

/// POST /api/profile - partial profile update
async fn update_profile(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ProfileRequest>,
) -> Result<Json<User>, ApiError> {
    let telegram_id = required_text(req.telegram_id, "telegramId")?;
    let fields = UserFields {
        first_name: req.first_name,
        last_name: req.last_name,
        phone: req.phone,
        is_bot_available: None,
    };

    let user = state
        .db
        .users()
        .update(&telegram_id, &fields)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;
    Ok(Json(user))
}

/// GET /api/user/{telegramId}/masks
async fn user_masks(
    State(state): State<Arc<AppState>>,
    Path(telegram_id): Path<String>,
) -> Result<Json<Vec<MaskDetails>>, ApiError> {
    let user = find_user(&state, &telegram_id).await?;
    Ok(Json(state.db.masks().list_for_user(user.id).await?))
}

/// POST /api/user/{telegramId}/add-mask - idempotent
async fn add_mask(
    State(state): State<Arc<AppState>>,
    Path(telegram_id): Path<String>,
    ApiJson(req): ApiJson<AddMaskRequest>,
) -> Result<Json<UserMask>, ApiError> {
    let mask_id = required(req.mask_id, "maskId")?;
    let user = find_user(&state, &telegram_id).await?;
    if state.db.masks().find(mask_id).await?.is_none() {
        return Err(ApiError::not_found("mask"));
    }

    Ok(Json(state.db.masks().add_to_user(user.id, mask_id).await?))
}

/// GET /api/masks - every mask with features, reviews and extra fields
async fn list_masks(State(state): State<Arc<AppState>>) -> Result<Json<Vec<MaskDetails>>, ApiError> {
    Ok(Json(state.db.masks().list().await?))
}

/// GET /api/masks/{id}
async fn get_mask(State(state): State<Arc<AppState>>, IdPath(id): IdPath) -> Result<Json<MaskDetails>, ApiError> {
    let mask = state
        .db
        .masks()
        .find_details(id)
        .await?
        .ok_or_else(|| ApiError::not_found("mask"))?;
    Ok(Json(mask))
}

/// GET /api/masks/{id}/instructions
async fn mask_instructions(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Json<MaskInstructions>, ApiError> {
    let mask = state
        .db
        .masks()
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found("mask"))?;

    Ok(Json(MaskInstructions {
        id: mask.id,
        name: mask.name,
        instructions: mask.instructions,
    }))
}

/// GET /api/videos
async fn list_videos(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Video>>, ApiError> {
    Ok(Json(state.db.videos().list().await?))
}

/// GET /api/videos/{id}
async fn get_video(State(state): State<Arc<AppState>>, IdPath(id): IdPath) -> Result<Json<Video>, ApiError> {
    let video = state
        .db
        .videos()
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found("video"))?;
    Ok(Json(video))
}

/// Public routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/profile", post(update_profile))
        .route("/api/user/{telegram_id}", get(get_user))
        .route("/api/user/{telegram_id}/masks", get(user_masks))
        .route("/api/user/{telegram_id}/add-mask", post(add_mask))
        .route("/api/masks", get(list_masks))
        .route("/api/masks/{id}", get(get_mask))
        .route("/api/masks/{id}/instructions", get(mask_instructions))
        .route("/api/videos", get(list_videos))
        .route("/api/videos/{id}", get(get_video))
}
