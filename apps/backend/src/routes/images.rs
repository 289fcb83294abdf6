//! Card image endpoints

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Extension, Json,
};

use crate::error::{ApiError, Result};
use crate::models::Card;
use crate::routes::auth::AuthenticatedUser;
use crate::routes::cards::card_not_found;
use crate::routes::delete_images;
use crate::services::storage::{image_extension, StorageError, StorageService};
use crate::AppState;

/// PUT /api/cards/:id/image
pub async fn upload(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(card_id): Path<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Card>> {
    let storage = storage(&state)?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Content-Type header is required".to_string()))?;
    let extension = image_extension(content_type).ok_or_else(|| {
        ApiError::BadRequest(format!("Unsupported image type: {}", content_type))
    })?;

    if body.is_empty() {
        return Err(ApiError::BadRequest("Image body is empty".to_string()));
    }
    if body.len() > state.config.max_image_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "image is {} bytes, limit is {}",
            body.len(),
            state.config.max_image_bytes
        )));
    }

    if state.db.get_card(auth.user_id, card_id).await?.is_none() {
        return Err(card_not_found(card_id));
    }

    let key = StorageService::make_image_key(auth.user_id, card_id, extension);
    let mime = content_type.split(';').next().unwrap_or(content_type).trim();
    storage.put_object(&key, body.to_vec(), mime).await?;

    let Some((before, after)) = state
        .db
        .set_card_image(auth.user_id, card_id, Some(&key))
        .await?
    else {
        // Card vanished between the check and the update
        delete_images(&state, &[key]).await;
        return Err(card_not_found(card_id));
    };

    if let Some(old_key) = before.image_key {
        delete_images(&state, &[old_key]).await;
    }

    tracing::info!(card_id, "Card image uploaded");
    Ok(Json(after.to_api_card()))
}

/// GET /api/cards/:id/image
pub async fn download(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(card_id): Path<i64>,
) -> Result<Response> {
    let storage = storage(&state)?;

    let key = state
        .db
        .get_card(auth.user_id, card_id)
        .await?
        .and_then(|card| card.image_key)
        .ok_or_else(|| ApiError::NotFound(format!("Card {} has no image", card_id)))?;

    let object = storage.get_object(&key).await.map_err(|e| match e {
        StorageError::NotFound(_) => {
            ApiError::NotFound(format!("Card {} has no image", card_id))
        }
        other => other.into(),
    })?;

    let content_type = object
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Ok(([(header::CONTENT_TYPE, content_type)], object.bytes).into_response())
}

/// DELETE /api/cards/:id/image
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(card_id): Path<i64>,
) -> Result<Json<Card>> {
    storage(&state)?;

    let (before, after) = state
        .db
        .set_card_image(auth.user_id, card_id, None)
        .await?
        .ok_or_else(|| card_not_found(card_id))?;

    if let Some(old_key) = before.image_key {
        delete_images(&state, &[old_key]).await;
        tracing::info!(card_id, "Card image deleted");
    }

    Ok(Json(after.to_api_card()))
}

fn storage(state: &AppState) -> Result<Arc<StorageService>> {
    state.storage.clone().ok_or(ApiError::StorageUnavailable)
}
