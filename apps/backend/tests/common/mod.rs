//! Common test utilities and fixtures for integration tests.
//!
//! This module provides shared test infrastructure including:
//! - TestContext for setting up test environment with database
//! - Helpers for creating users, sessions, collections and cards
//!
//! # Requirements
//! Integration tests require a PostgreSQL database (set DATABASE_URL env var).
//! Image storage is disabled unless a context is built with
//! [`TestContext::with_unreachable_storage`].

pub mod fixtures;

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use recall_backend::config::Config;
use recall_backend::db::Database;
use recall_backend::models::DbCard;
use recall_backend::services::password::{generate_token, hash_password, hash_token};
use recall_backend::services::storage::StorageService;
use recall_backend::{app, AppState};

/// Test context containing database connection and router.
///
/// Requires DATABASE_URL environment variable to be set.
pub struct TestContext {
    pub db: Arc<Database>,
    app: Router,
}

/// A registered user with a live session.
pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

impl TestContext {
    /// Create a new test context.
    ///
    /// # Panics
    /// Panics if DATABASE_URL is not set or database connection fails.
    pub async fn new() -> Self {
        Self::build(None).await
    }

    /// Create a test context whose image storage points at a closed port,
    /// so every S3 call fails.
    pub async fn with_unreachable_storage() -> Self {
        let storage = StorageService::new(
            "recall-test".to_string(),
            "auto".to_string(),
            Some("http://127.0.0.1:9".to_string()),
            "test-access-key".to_string(),
            "test-secret-key".to_string(),
        );
        Self::build(Some(storage)).await
    }

    async fn build(storage: Option<StorageService>) -> Self {
        dotenvy::dotenv().ok();

        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");

        let db = Database::connect(&database_url, 5)
            .await
            .expect("Failed to connect to test database");

        db.run_migrations()
            .await
            .expect("Failed to run migrations");

        let state = AppState::new(db, storage, Config::with_database_url(database_url));
        let db = state.db.clone();

        Self {
            db,
            app: app(state),
        }
    }

    /// Get the router for use with axum-test.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Start an in-process test server.
    pub fn server(&self) -> TestServer {
        TestServer::new(self.router()).expect("Failed to start test server")
    }

    /// Create a user with a unique name and a session token.
    pub async fn create_test_user(&self) -> TestUser {
        let username = fixtures::unique_username("user");
        let password_hash = hash_password(fixtures::PASSWORD).expect("Failed to hash password");
        let user = self
            .db
            .create_user(&username, &password_hash)
            .await
            .expect("Failed to create test user");

        let token = generate_token();
        self.db
            .create_session(user.id, &hash_token(&token), Utc::now() + Duration::hours(1))
            .await
            .expect("Failed to create test session");

        TestUser { id: user.id, token }
    }

    /// Create a collection owned by the user and return its ID.
    pub async fn create_test_collection(&self, user_id: Uuid, name: &str) -> i64 {
        self.db
            .create_collection(user_id, name, None)
            .await
            .expect("Failed to create test collection")
            .id
    }

    /// Create a card that became due at `due_at`.
    pub async fn create_test_card(
        &self,
        collection_id: i64,
        front: &str,
        due_at: DateTime<Utc>,
    ) -> DbCard {
        self.db
            .create_card(collection_id, front, "answer", due_at)
            .await
            .expect("Failed to create test card")
    }

    /// Force a card's scheduling state.
    pub async fn set_card_schedule(&self, card_id: i64, difficulty: i16, due_at: DateTime<Utc>) {
        sqlx::query("UPDATE cards SET difficulty = $2, due_at = $3 WHERE id = $1")
            .bind(card_id)
            .bind(difficulty)
            .bind(due_at)
            .execute(self.db.pool())
            .await
            .expect("Failed to set card schedule");
    }

    /// Format authorization header value.
    pub fn auth_header_value(token: &str) -> String {
        format!("Bearer {}", token)
    }

    /// Clean up test data for a user.
    ///
    /// Sessions, collections, cards and reviews cascade from the user row.
    pub async fn cleanup_user(&self, user_id: Uuid) {
        let _ = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(self.db.pool())
            .await;
    }
}
