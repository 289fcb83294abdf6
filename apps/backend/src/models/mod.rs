//! Database models and API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Re-export shared types from recall-core
pub use recall_core::{Difficulty, Grade};

// === Database Entity Types ===

/// Registered account
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Login session; only the token hash is persisted
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Collection with card counts
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CollectionSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub card_count: i64,
    pub due_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Card stored in PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub struct DbCard {
    pub id: i64,
    pub collection_id: i64,
    pub front: String,
    pub back: String,
    pub image_key: Option<String>,
    pub difficulty: i16,
    pub due_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbCard {
    /// Stored difficulty, clamped into range.
    pub fn difficulty(&self) -> Difficulty {
        Difficulty::clamped(self.difficulty as i64)
    }

    /// Convert to API card type
    pub fn to_api_card(&self) -> Card {
        Card {
            id: self.id,
            collection_id: self.collection_id,
            front: self.front.clone(),
            back: self.back.clone(),
            has_image: self.image_key.is_some(),
            difficulty: self.difficulty(),
            due_at: self.due_at,
            last_reviewed_at: self.last_reviewed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Review log record
#[derive(Debug, Clone, FromRow)]
pub struct DbReview {
    pub id: Uuid,
    pub card_id: i64,
    pub user_id: Uuid,
    pub grade: Option<String>,
    pub difficulty_before: i16,
    pub difficulty_after: i16,
    pub due_before: DateTime<Utc>,
    pub due_after: DateTime<Utc>,
    pub reviewed_at: DateTime<Utc>,
}

impl DbReview {
    /// Convert to API history entry
    pub fn to_api_entry(&self) -> ReviewEntry {
        ReviewEntry {
            id: self.id,
            grade: self.grade.as_deref().and_then(|g| g.parse().ok()),
            difficulty_before: Difficulty::clamped(self.difficulty_before as i64),
            difficulty_after: Difficulty::clamped(self.difficulty_after as i64),
            due_before: self.due_before,
            due_after: self.due_after,
            reviewed_at: self.reviewed_at,
        }
    }
}

/// Scheduling decision for one review, before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedReview {
    pub grade: Option<Grade>,
    pub previous_difficulty: Difficulty,
    pub next_difficulty: Difficulty,
    pub next_due_at: DateTime<Utc>,
    pub interval_days: Option<u32>,
}

// === API Request/Response Types ===

/// Card as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    pub collection_id: i64,
    pub front: String,
    pub back: String,
    pub has_image: bool,
    pub difficulty: Difficulty,
    pub due_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Auth types
#[derive(Debug, Serialize, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user_id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

// Collection types
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCollectionRequest {
    pub name: String,
    pub description: Option<String>,
}

/// Partial update; an empty description clears it
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateCollectionRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionListResponse {
    pub collections: Vec<CollectionSummary>,
}

// Card types
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCardRequest {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateCardRequest {
    pub front: Option<String>,
    pub back: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CardListResponse {
    pub cards: Vec<Card>,
}

// Study types
#[derive(Debug, Serialize, Deserialize)]
pub struct DueQuery {
    pub collection_id: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DueCardsResponse {
    pub cards: Vec<Card>,
    pub total_due: i64,
}

/// What the client reports about a review.
///
/// Either a grade for the server to schedule, or a next state the client
/// already computed. The grade is kept as raw JSON so that a non-string
/// value is reported as an invalid grade rather than a malformed body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReviewPayload {
    Graded {
        grade: serde_json::Value,
    },
    Precomputed {
        #[serde(alias = "newDifficulty")]
        new_difficulty: i64,
        #[serde(alias = "newReviewDueAt")]
        new_review_due_at: DateTime<Utc>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitReviewRequest {
    #[serde(alias = "cardId")]
    pub card_id: i64,
    #[serde(flatten)]
    pub payload: ReviewPayload,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitReviewResponse {
    pub card_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<Grade>,
    pub previous_difficulty: Difficulty,
    pub next_difficulty: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_days: Option<u32>,
    pub next_due_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub id: Uuid,
    /// Absent when the client sent a precomputed schedule
    pub grade: Option<Grade>,
    pub difficulty_before: Difficulty,
    pub difficulty_after: Difficulty,
    pub due_before: DateTime<Utc>,
    pub due_after: DateTime<Utc>,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewHistoryResponse {
    pub card_id: i64,
    pub reviews: Vec<ReviewEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StudyStatsResponse {
    pub total_cards: i64,
    pub due_now: i64,
    pub reviews_today: i64,
    /// Card counts indexed by difficulty 0..=5
    pub difficulty_histogram: [i64; 6],
}
