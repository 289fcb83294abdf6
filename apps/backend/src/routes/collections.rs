//! Collection endpoints

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::routes::{delete_images, required_text};
use crate::AppState;

const MAX_NAME_LEN: usize = 200;

/// GET /api/collections
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<CollectionListResponse>> {
    let collections = state.db.list_collections(auth.user_id, Utc::now()).await?;
    Ok(Json(CollectionListResponse { collections }))
}

/// POST /api/collections
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(request): Json<CreateCollectionRequest>,
) -> Result<Json<CollectionSummary>> {
    let name = collection_name(&request.name)?;
    let description = request
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    let collection = state
        .db
        .create_collection(auth.user_id, name, description)
        .await?;

    Ok(Json(collection))
}

/// GET /api/collections/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(collection_id): Path<i64>,
) -> Result<Json<CollectionSummary>> {
    let collection = state
        .db
        .get_collection(auth.user_id, collection_id, Utc::now())
        .await?
        .ok_or_else(|| not_found(collection_id))?;

    Ok(Json(collection))
}

/// PUT /api/collections/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(collection_id): Path<i64>,
    Json(request): Json<UpdateCollectionRequest>,
) -> Result<Json<CollectionSummary>> {
    let name = request.name.as_deref().map(collection_name).transpose()?;
    let description = request.description.as_deref().map(str::trim);

    let updated = state
        .db
        .update_collection(auth.user_id, collection_id, name, description)
        .await?;
    if !updated {
        return Err(not_found(collection_id));
    }

    let collection = state
        .db
        .get_collection(auth.user_id, collection_id, Utc::now())
        .await?
        .ok_or_else(|| not_found(collection_id))?;

    Ok(Json(collection))
}

/// DELETE /api/collections/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(collection_id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    let deleted = match state
        .db
        .delete_collection(auth.user_id, collection_id)
        .await?
    {
        Some(image_keys) => {
            delete_images(&state, &image_keys).await;
            true
        }
        None => false,
    };

    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

/// GET /api/collections/:id/cards
pub async fn list_cards(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(collection_id): Path<i64>,
) -> Result<Json<CardListResponse>> {
    if !state.db.owns_collection(auth.user_id, collection_id).await? {
        return Err(not_found(collection_id));
    }

    let cards = state.db.list_cards(auth.user_id, collection_id).await?;
    Ok(Json(CardListResponse {
        cards: cards.iter().map(DbCard::to_api_card).collect(),
    }))
}

/// POST /api/collections/:id/cards
pub async fn create_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(collection_id): Path<i64>,
    Json(request): Json<CreateCardRequest>,
) -> Result<Json<Card>> {
    let front = required_text("front", &request.front)?;
    let back = required_text("back", &request.back)?;

    if !state.db.owns_collection(auth.user_id, collection_id).await? {
        return Err(not_found(collection_id));
    }

    let card = state
        .db
        .create_card(collection_id, front, back, Utc::now())
        .await?;

    Ok(Json(card.to_api_card()))
}

fn collection_name(raw: &str) -> Result<&str> {
    let name = required_text("name", raw)?;
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::BadRequest(format!(
            "name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name)
}

fn not_found(collection_id: i64) -> ApiError {
    ApiError::NotFound(format!("Collection {} not found", collection_id))
}
