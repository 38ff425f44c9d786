//! Admin catalogue management: masks, videos, features, reviews, extra fields
//!
//! Mounted under `/api/admin`. Updates are partial; deletes answer 204, or
//! 404 when nothing matched.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;

use maskcore::storage::models::{
    ExtraField, Feature, FeatureFields, Mask, MaskFields, Review, ReviewFields, Video, VideoFields,
};

use super::{required, required_text};
use crate::http::error::ApiError;
use crate::http::extract::{lenient, AdminSession, ApiJson, ApiQuery, IdPath};
use crate::http::server::AppState;

/// Maps a delete outcome onto 204/404.
fn deleted(found: bool, resource: &str) -> Result<StatusCode, ApiError> {
    if found {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(resource))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskFilter {
    pub mask_id: Option<i32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeatureRequest {
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub mask_id: Option<i32>,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub mask_id: Option<i32>,
    pub author: Option<String>,
    pub text: Option<String>,
    pub rating: Option<i16>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExtraFieldRequest {
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub mask_id: Option<i32>,
    pub name: Option<String>,
    pub value: Option<String>,
}

// --- masks ---

async fn create_mask(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    ApiJson(fields): ApiJson<MaskFields>,
) -> Result<(StatusCode, Json<Mask>), ApiError> {
    let name = required_text(fields.name.clone(), "name")?;
    let mask = state.db.masks().create(&name, &fields).await?;
    Ok((StatusCode::CREATED, Json(mask)))
}

async fn update_mask(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
    ApiJson(fields): ApiJson<MaskFields>,
) -> Result<Json<Mask>, ApiError> {
    let mask = state
        .db
        .masks()
        .update(id, &fields)
        .await?
        .ok_or_else(|| ApiError::not_found("mask"))?;
    Ok(Json(mask))
}

async fn delete_mask(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<StatusCode, ApiError> {
    deleted(state.db.masks().delete(id).await?, "mask")
}

// --- videos ---

async fn create_video(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    ApiJson(fields): ApiJson<VideoFields>,
) -> Result<(StatusCode, Json<Video>), ApiError> {
    let title = required_text(fields.title.clone(), "title")?;
    let url = required_text(fields.url.clone(), "url")?;
    let video = state.db.videos().create(&title, &url, &fields).await?;
    Ok((StatusCode::CREATED, Json(video)))
}

async fn update_video(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
    ApiJson(fields): ApiJson<VideoFields>,
) -> Result<Json<Video>, ApiError> {
    let video = state
        .db
        .videos()
        .update(id, &fields)
        .await?
        .ok_or_else(|| ApiError::not_found("video"))?;
    Ok(Json(video))
}

async fn delete_video(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<StatusCode, ApiError> {
    deleted(state.db.videos().delete(id).await?, "video")
}

// --- features ---

async fn list_features(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<MaskFilter>,
) -> Result<Json<Vec<Feature>>, ApiError> {
    Ok(Json(state.db.features().list(filter.mask_id).await?))
}

async fn create_feature(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateFeatureRequest>,
) -> Result<(StatusCode, Json<Feature>), ApiError> {
    let mask_id = required(req.mask_id, "maskId")?;
    let title = required_text(req.title, "title")?;
    let feature = state
        .db
        .features()
        .create(mask_id, &title, req.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(feature)))
}

async fn update_feature(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
    ApiJson(fields): ApiJson<FeatureFields>,
) -> Result<Json<Feature>, ApiError> {
    let feature = state
        .db
        .features()
        .update(id, &fields)
        .await?
        .ok_or_else(|| ApiError::not_found("feature"))?;
    Ok(Json(feature))
}

async fn delete_feature(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<StatusCode, ApiError> {
    deleted(state.db.features().delete(id).await?, "feature")
}

// --- reviews ---

async fn list_reviews(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<MaskFilter>,
) -> Result<Json<Vec<Review>>, ApiError> {
    Ok(Json(state.db.reviews().list(filter.mask_id).await?))
}

async fn create_review(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    let mask_id = required(req.mask_id, "maskId")?;
    let author = required_text(req.author, "author")?;
    let text = required_text(req.text, "text")?;
    let review = state
        .db
        .reviews()
        .create(mask_id, &author, &text, req.rating)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

async fn update_review(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
    ApiJson(fields): ApiJson<ReviewFields>,
) -> Result<Json<Review>, ApiError> {
    let review = state
        .db
        .reviews()
        .update(id, &fields)
        .await?
        .ok_or_else(|| ApiError::not_found("review"))?;
    Ok(Json(review))
}

async fn delete_review(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<StatusCode, ApiError> {
    deleted(state.db.reviews().delete(id).await?, "review")
}

// --- extra fields ---

async fn create_extra_field(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateExtraFieldRequest>,
) -> Result<(StatusCode, Json<ExtraField>), ApiError> {
    let mask_id = required(req.mask_id, "maskId")?;
    let name = required_text(req.name, "name")?;
    let value = required(req.value, "value")?;
    let field = state.db.extra_fields().create(mask_id, &name, &value).await?;
    Ok((StatusCode::CREATED, Json(field)))
}

async fn delete_extra_field(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<StatusCode, ApiError> {
    deleted(state.db.extra_fields().delete(id).await?, "extra field")
}

/// Catalogue routes, relative to `/api/admin`
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/masks", post(create_mask))
        .route("/masks/{id}", put(update_mask).delete(delete_mask))
        .route("/videos", post(create_video))
        .route("/videos/{id}", put(update_video).delete(delete_video))
        .route("/features", get(list_features).post(create_feature))
        .route("/features/{id}", put(update_feature).delete(delete_feature))
        .route("/reviews", get(list_reviews).post(create_review))
        .route("/reviews/{id}", put(update_review).delete(delete_review))
        .route("/extra-fields", post(create_extra_field))
        .route("/extra-fields/{id}", delete(delete_extra_field))
}
