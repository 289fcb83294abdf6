//! Study endpoints

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::routes::cards::card_not_found;
use crate::services::review::{parse_grade, plan_review};
use crate::AppState;

const DEFAULT_DUE_LIMIT: i64 = 50;
const MAX_DUE_LIMIT: i64 = 500;

/// GET /api/study/due
pub async fn due(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<DueQuery>,
) -> Result<Json<DueCardsResponse>> {
    if let Some(collection_id) = query.collection_id {
        if !state.db.owns_collection(auth.user_id, collection_id).await? {
            return Err(ApiError::NotFound(format!(
                "Collection {} not found",
                collection_id
            )));
        }
    }

    let limit = query
        .limit
        .unwrap_or(DEFAULT_DUE_LIMIT)
        .clamp(1, MAX_DUE_LIMIT);
    let now = Utc::now();

    let cards = state
        .db
        .get_due_cards(auth.user_id, query.collection_id, now, limit)
        .await?;
    let total_due = state
        .db
        .count_due_cards(auth.user_id, query.collection_id, now)
        .await?;

    Ok(Json(DueCardsResponse {
        cards: cards.iter().map(DbCard::to_api_card).collect(),
        total_due,
    }))
}

/// POST /api/study/review
pub async fn review(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(payload): Json<SubmitReviewRequest>,
) -> Result<Json<SubmitReviewResponse>> {
    // Reject bad grades before touching the database
    if let ReviewPayload::Graded { grade } = &payload.payload {
        parse_grade(grade)?;
    }

    let now = Utc::now();
    let scheduler = state.scheduler.as_ref();
    let (card, planned) = state
        .db
        .apply_review(auth.user_id, payload.card_id, now, |card| {
            plan_review(scheduler, card.difficulty(), &payload.payload, now)
        })
        .await?
        .ok_or_else(|| card_not_found(payload.card_id))?;

    tracing::info!(
        card_id = card.id,
        grade = planned.grade.map(Grade::as_str),
        from = %planned.previous_difficulty,
        to = %planned.next_difficulty,
        "Review applied"
    );

    Ok(Json(SubmitReviewResponse {
        card_id: card.id,
        grade: planned.grade,
        previous_difficulty: planned.previous_difficulty,
        next_difficulty: planned.next_difficulty,
        interval_days: planned.interval_days,
        next_due_at: planned.next_due_at,
    }))
}

/// GET /api/study/stats
pub async fn stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<StudyStatsResponse>> {
    let stats = state.db.get_study_stats(auth.user_id, Utc::now()).await?;
    Ok(Json(stats))
}
