//! Card endpoints

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::routes::{delete_images, required_text};
use crate::AppState;

/// GET /api/cards/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(card_id): Path<i64>,
) -> Result<Json<Card>> {
    let card = state
        .db
        .get_card(auth.user_id, card_id)
        .await?
        .ok_or_else(|| card_not_found(card_id))?;

    Ok(Json(card.to_api_card()))
}

/// PUT /api/cards/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(card_id): Path<i64>,
    Json(request): Json<UpdateCardRequest>,
) -> Result<Json<Card>> {
    let front = request
        .front
        .as_deref()
        .map(|f| required_text("front", f))
        .transpose()?;
    let back = request
        .back
        .as_deref()
        .map(|b| required_text("back", b))
        .transpose()?;

    let card = state
        .db
        .update_card_content(auth.user_id, card_id, front, back)
        .await?
        .ok_or_else(|| card_not_found(card_id))?;

    Ok(Json(card.to_api_card()))
}

/// DELETE /api/cards/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(card_id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    let deleted = state.db.delete_card(auth.user_id, card_id).await?;

    if let Some(key) = deleted.as_ref().and_then(|c| c.image_key.clone()) {
        delete_images(&state, &[key]).await;
    }

    Ok(Json(serde_json::json!({ "deleted": deleted.is_some() })))
}

/// GET /api/cards/:id/reviews
pub async fn reviews(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(card_id): Path<i64>,
) -> Result<Json<ReviewHistoryResponse>> {
    if state.db.get_card(auth.user_id, card_id).await?.is_none() {
        return Err(card_not_found(card_id));
    }

    let reviews = state.db.get_card_reviews(auth.user_id, card_id).await?;
    Ok(Json(ReviewHistoryResponse {
        card_id,
        reviews: reviews.iter().map(DbReview::to_api_entry).collect(),
    }))
}

pub(crate) fn card_not_found(card_id: i64) -> ApiError {
    ApiError::NotFound(format!("Card {} not found", card_id))
}
