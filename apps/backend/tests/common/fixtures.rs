//! Test fixtures and factory functions for request bodies.

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

/// Password used for every fixture account.
pub const PASSWORD: &str = "correct horse battery";

/// Generate a unique username to avoid collisions between test runs.
pub fn unique_username(prefix: &str) -> String {
    format!("{}_{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

/// Create a register or login request body.
pub fn credentials(username: &str, password: &str) -> serde_json::Value {
    json!({ "username": username, "password": password })
}

/// Create a collection request body.
pub fn create_collection_request(name: &str, description: Option<&str>) -> serde_json::Value {
    match description {
        Some(d) => json!({ "name": name, "description": d }),
        None => json!({ "name": name }),
    }
}

/// Create a card request body.
pub fn create_card_request(front: &str, back: &str) -> serde_json::Value {
    json!({ "front": front, "back": back })
}

/// Create a graded review request body.
pub fn graded_review_request(card_id: i64, grade: &str) -> serde_json::Value {
    json!({ "card_id": card_id, "grade": grade })
}

/// Create a review request body with a client-computed schedule.
pub fn precomputed_review_request(
    card_id: i64,
    new_difficulty: i64,
    new_review_due_at: DateTime<Utc>,
) -> serde_json::Value {
    json!({
        "cardId": card_id,
        "newDifficulty": new_difficulty,
        "newReviewDueAt": new_review_due_at,
    })
}
