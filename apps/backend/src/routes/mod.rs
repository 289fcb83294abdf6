pub mod auth;
pub mod cards;
pub mod collections;
pub mod images;
pub mod study;

use crate::error::{ApiError, Result};
use crate::AppState;

/// Trim a required text field, rejecting blank input.
pub(crate) fn required_text<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(trimmed)
}

/// Best-effort removal of stored images once their rows are gone.
pub(crate) async fn delete_images(state: &AppState, keys: &[String]) {
    let Some(storage) = state.storage.as_ref() else {
        return;
    };
    for key in keys {
        if let Err(e) = storage.delete_object(key).await {
            tracing::warn!("Failed to delete image {}: {}", key, e);
        }
    }
}
