//! Authentication middleware and account endpoints

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
    Extension, Json,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::{CredentialsRequest, LoginResponse, MeResponse, RegisterResponse};
use crate::services::password::{
    generate_token, hash_password, hash_token, verify_password, verify_unknown_user,
};
use crate::AppState;

const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 1024;

/// Authenticated user info stored in request extensions
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

/// Auth middleware - resolves the bearer token to a live session
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization format".to_string()))?;

    let session = state
        .db
        .get_active_session(&hash_token(token), Utc::now())
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired session".to_string()))?;

    state.db.touch_session(session.id).await?;

    request.extensions_mut().insert(AuthenticatedUser {
        user_id: session.user_id,
        session_id: session.id,
    });

    Ok(next.run(request).await)
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<RegisterResponse>> {
    let username = normalize_username(&payload.username)?;
    validate_password(&payload.password)?;

    let password_hash = hash_password(&payload.password)?;
    let user = state.db.create_user(&username, &password_hash).await?;

    tracing::info!("Registered new user: {}", user.id);

    Ok(Json(RegisterResponse {
        user_id: user.id,
        username: user.username,
    }))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>> {
    let invalid = || ApiError::Unauthorized("Invalid username or password".to_string());

    let username = payload.username.trim().to_lowercase();
    let Some(user) = state.db.get_user_by_username(&username).await? else {
        verify_unknown_user(&payload.password);
        return Err(invalid());
    };

    if !verify_password(&payload.password, &user.password_hash) {
        tracing::info!("Failed login for user: {}", user.id);
        return Err(invalid());
    }

    let now = Utc::now();
    state.db.delete_expired_sessions(user.id, now).await?;

    let token = generate_token();
    let expires_at = now + Duration::hours(state.config.session_ttl_hours);
    state
        .db
        .create_session(user.id, &hash_token(&token), expires_at)
        .await?;

    tracing::info!("User logged in: {}", user.id);

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        expires_at,
    }))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let revoked = state.db.delete_session(auth.session_id).await?;
    Ok(Json(serde_json::json!({ "logged_out": revoked })))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<MeResponse>> {
    let user = state
        .db
        .get_user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    Ok(Json(MeResponse {
        user_id: user.id,
        username: user.username,
        created_at: user.created_at,
    }))
}

/// Trim and lowercase a username, rejecting anything outside `[a-z0-9_.-]{3,64}`.
fn normalize_username(raw: &str) -> Result<String> {
    let username = raw.trim().to_lowercase();
    let len = username.chars().count();
    if !(3..=64).contains(&len) {
        return Err(ApiError::BadRequest(
            "username must be between 3 and 64 characters".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(ApiError::BadRequest(
            "username may only contain letters, digits, '_', '-' and '.'".to_string(),
        ));
    }
    Ok(username)
}

fn validate_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(ApiError::BadRequest("password is too long".to_string()));
    }
    Ok(())
}
