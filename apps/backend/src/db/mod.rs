//! PostgreSQL database operations

use chrono::{DateTime, NaiveTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;

const CARD_COLUMNS: &str = "c.id, c.collection_id, c.front, c.back, c.image_key, c.difficulty, \
                            c.due_at, c.last_reviewed_at, c.created_at, c.updated_at";

/// Database wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL and create connection pool
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ApiError::Migration(e.to_string()))?;
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // === User Repository ===

    /// Create a user; a taken username is a conflict
    pub async fn create_user(&self, username: &str, password_hash: &str) -> Result<User> {
        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(ApiError::Conflict(
                format!("username '{}' is already taken", username),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Get user by username
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Get user by ID
    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    // === Session Repository ===

    /// Store a new session for a hashed token
    pub async fn create_session(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token_hash, created_at, last_seen_at, expires_at
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    /// Get an unexpired session by token hash
    pub async fn get_active_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, token_hash, created_at, last_seen_at, expires_at
            FROM sessions
            WHERE token_hash = $1 AND expires_at > $2
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Update session last_seen_at timestamp
    pub async fn touch_session(&self, session_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET last_seen_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Revoke a session
    pub async fn delete_session(&self, session_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Drop a user's expired sessions
    pub async fn delete_expired_sessions(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND expires_at <= $2")
            .bind(user_id)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // === Collection Repository ===

    /// Create a collection owned by a user
    pub async fn create_collection(
        &self,
        user_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<CollectionSummary> {
        let collection = sqlx::query_as::<_, CollectionSummary>(
            r#"
            INSERT INTO collections (user_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, 0::BIGINT as card_count, 0::BIGINT as due_count,
                      created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;

        Ok(collection)
    }

    /// List a user's collections with card and due counts
    pub async fn list_collections(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<CollectionSummary>> {
        let collections = sqlx::query_as::<_, CollectionSummary>(
            r#"
            SELECT
                col.id, col.name, col.description,
                COUNT(c.id) as card_count,
                COUNT(CASE WHEN c.due_at <= $2 THEN 1 END) as due_count,
                col.created_at, col.updated_at
            FROM collections col
            LEFT JOIN cards c ON c.collection_id = col.id
            WHERE col.user_id = $1
            GROUP BY col.id
            ORDER BY col.name, col.id
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(collections)
    }

    /// Get one owned collection with counts
    pub async fn get_collection(
        &self,
        user_id: Uuid,
        collection_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<CollectionSummary>> {
        let collection = sqlx::query_as::<_, CollectionSummary>(
            r#"
            SELECT
                col.id, col.name, col.description,
                COUNT(c.id) as card_count,
                COUNT(CASE WHEN c.due_at <= $3 THEN 1 END) as due_count,
                col.created_at, col.updated_at
            FROM collections col
            LEFT JOIN cards c ON c.collection_id = col.id
            WHERE col.user_id = $1 AND col.id = $2
            GROUP BY col.id
            "#,
        )
        .bind(user_id)
        .bind(collection_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(collection)
    }

    /// Check that a collection exists and belongs to the user
    pub async fn owns_collection(&self, user_id: Uuid, collection_id: i64) -> Result<bool> {
        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM collections WHERE id = $1 AND user_id = $2)",
        )
        .bind(collection_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(owned)
    }

    /// Update name and/or description; `Some("")` clears the description.
    /// Returns false if the collection is not owned by the user.
    pub async fn update_collection(
        &self,
        user_id: Uuid,
        collection_id: i64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE collections
            SET name = COALESCE($3, name),
                description = CASE
                    WHEN $4::TEXT IS NULL THEN description
                    ELSE NULLIF($4, '')
                END,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(collection_id)
        .bind(user_id)
        .bind(name)
        .bind(description)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a collection and, by cascade, its cards.
    /// Returns the image keys of the deleted cards.
    pub async fn delete_collection(
        &self,
        user_id: Uuid,
        collection_id: i64,
    ) -> Result<Option<Vec<String>>> {
        let mut tx = self.pool.begin().await?;

        let image_keys: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT c.image_key
            FROM cards c
            JOIN collections col ON col.id = c.collection_id
            WHERE col.id = $1 AND col.user_id = $2 AND c.image_key IS NOT NULL
            "#,
        )
        .bind(collection_id)
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM collections WHERE id = $1 AND user_id = $2")
            .bind(collection_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(image_keys))
    }

    // === Card Repository ===

    /// Create a new card: difficulty 0, due immediately
    pub async fn create_card(
        &self,
        collection_id: i64,
        front: &str,
        back: &str,
        now: DateTime<Utc>,
    ) -> Result<DbCard> {
        let card = sqlx::query_as::<_, DbCard>(
            r#"
            INSERT INTO cards (collection_id, front, back, difficulty, due_at)
            VALUES ($1, $2, $3, 0, $4)
            RETURNING id, collection_id, front, back, image_key, difficulty,
                      due_at, last_reviewed_at, created_at, updated_at
            "#,
        )
        .bind(collection_id)
        .bind(front)
        .bind(back)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(card)
    }

    /// Cards in an owned collection
    pub async fn list_cards(&self, user_id: Uuid, collection_id: i64) -> Result<Vec<DbCard>> {
        let sql = format!(
            r#"
            SELECT {CARD_COLUMNS}
            FROM cards c
            JOIN collections col ON col.id = c.collection_id
            WHERE col.id = $1 AND col.user_id = $2
            ORDER BY c.id
            "#
        );
        let cards = sqlx::query_as::<_, DbCard>(&sql)
            .bind(collection_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(cards)
    }

    /// Get a card if its collection belongs to the user
    pub async fn get_card(&self, user_id: Uuid, card_id: i64) -> Result<Option<DbCard>> {
        let sql = format!(
            r#"
            SELECT {CARD_COLUMNS}
            FROM cards c
            JOIN collections col ON col.id = c.collection_id
            WHERE c.id = $1 AND col.user_id = $2
            "#
        );
        let card = sqlx::query_as::<_, DbCard>(&sql)
            .bind(card_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(card)
    }

    /// Update front and/or back text; scheduling fields are untouched
    pub async fn update_card_content(
        &self,
        user_id: Uuid,
        card_id: i64,
        front: Option<&str>,
        back: Option<&str>,
    ) -> Result<Option<DbCard>> {
        let card = sqlx::query_as::<_, DbCard>(
            r#"
            UPDATE cards c
            SET front = COALESCE($3, c.front),
                back = COALESCE($4, c.back),
                updated_at = NOW()
            FROM collections col
            WHERE c.id = $1 AND col.id = c.collection_id AND col.user_id = $2
            RETURNING c.id, c.collection_id, c.front, c.back, c.image_key, c.difficulty,
                      c.due_at, c.last_reviewed_at, c.created_at, c.updated_at
            "#,
        )
        .bind(card_id)
        .bind(user_id)
        .bind(front)
        .bind(back)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    /// Set or clear a card's image key, returning the card before and after
    pub async fn set_card_image(
        &self,
        user_id: Uuid,
        card_id: i64,
        image_key: Option<&str>,
    ) -> Result<Option<(DbCard, DbCard)>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            SELECT {CARD_COLUMNS}
            FROM cards c
            JOIN collections col ON col.id = c.collection_id
            WHERE c.id = $1 AND col.user_id = $2
            FOR UPDATE OF c
            "#
        );
        let Some(before) = sqlx::query_as::<_, DbCard>(&sql)
            .bind(card_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let after = sqlx::query_as::<_, DbCard>(
            r#"
            UPDATE cards
            SET image_key = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, collection_id, front, back, image_key, difficulty,
                      due_at, last_reviewed_at, created_at, updated_at
            "#,
        )
        .bind(card_id)
        .bind(image_key)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some((before, after)))
    }

    /// Delete an owned card, returning the deleted row
    pub async fn delete_card(&self, user_id: Uuid, card_id: i64) -> Result<Option<DbCard>> {
        let card = sqlx::query_as::<_, DbCard>(
            r#"
            DELETE FROM cards c
            USING collections col
            WHERE c.id = $1 AND col.id = c.collection_id AND col.user_id = $2
            RETURNING c.id, c.collection_id, c.front, c.back, c.image_key, c.difficulty,
                      c.due_at, c.last_reviewed_at, c.created_at, c.updated_at
            "#,
        )
        .bind(card_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    // === Study Repository ===

    /// Cards due at `now`, oldest due date first, scoped to the user's collections
    pub async fn get_due_cards(
        &self,
        user_id: Uuid,
        collection_id: Option<i64>,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<DbCard>> {
        let sql = format!(
            r#"
            SELECT {CARD_COLUMNS}
            FROM cards c
            JOIN collections col ON col.id = c.collection_id
            WHERE col.user_id = $1
              AND ($2::BIGINT IS NULL OR col.id = $2)
              AND c.due_at <= $3
            ORDER BY c.due_at, c.id
            LIMIT $4
            "#
        );
        let cards = sqlx::query_as::<_, DbCard>(&sql)
            .bind(user_id)
            .bind(collection_id)
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(cards)
    }

    /// Number of due cards in scope, ignoring any limit
    pub async fn count_due_cards(
        &self,
        user_id: Uuid,
        collection_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM cards c
            JOIN collections col ON col.id = c.collection_id
            WHERE col.user_id = $1
              AND ($2::BIGINT IS NULL OR col.id = $2)
              AND c.due_at <= $3
            "#,
        )
        .bind(user_id)
        .bind(collection_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Lock an owned card, let `plan` decide its next state, then persist
    /// the new difficulty and due date together with a review log entry.
    ///
    /// Returns `None` if the card does not exist or belongs to someone else.
    pub async fn apply_review<F>(
        &self,
        user_id: Uuid,
        card_id: i64,
        now: DateTime<Utc>,
        plan: F,
    ) -> Result<Option<(DbCard, PlannedReview)>>
    where
        F: FnOnce(&DbCard) -> Result<PlannedReview>,
    {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            SELECT {CARD_COLUMNS}
            FROM cards c
            JOIN collections col ON col.id = c.collection_id
            WHERE c.id = $1 AND col.user_id = $2
            FOR UPDATE OF c
            "#
        );
        let Some(card) = sqlx::query_as::<_, DbCard>(&sql)
            .bind(card_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let planned = plan(&card)?;

        let updated = sqlx::query_as::<_, DbCard>(
            r#"
            UPDATE cards
            SET difficulty = $2, due_at = $3, last_reviewed_at = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, collection_id, front, back, image_key, difficulty,
                      due_at, last_reviewed_at, created_at, updated_at
            "#,
        )
        .bind(card_id)
        .bind(planned.next_difficulty.value() as i16)
        .bind(planned.next_due_at)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO reviews (card_id, user_id, grade, difficulty_before, difficulty_after,
                                 due_before, due_after, reviewed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(card_id)
        .bind(user_id)
        .bind(planned.grade.map(|g| g.as_str()))
        .bind(planned.previous_difficulty.value() as i16)
        .bind(planned.next_difficulty.value() as i16)
        .bind(card.due_at)
        .bind(planned.next_due_at)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some((updated, planned)))
    }

    /// Review history of a card, newest first
    pub async fn get_card_reviews(&self, user_id: Uuid, card_id: i64) -> Result<Vec<DbReview>> {
        let reviews = sqlx::query_as::<_, DbReview>(
            r#"
            SELECT id, card_id, user_id, grade, difficulty_before, difficulty_after,
                   due_before, due_after, reviewed_at
            FROM reviews
            WHERE card_id = $1 AND user_id = $2
            ORDER BY reviewed_at DESC
            "#,
        )
        .bind(card_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    /// Study statistics across all of the user's collections
    pub async fn get_study_stats(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<StudyStatsResponse> {
        let histogram_rows: Vec<(i16, i64)> = sqlx::query_as(
            r#"
            SELECT c.difficulty, COUNT(*)
            FROM cards c
            JOIN collections col ON col.id = c.collection_id
            WHERE col.user_id = $1
            GROUP BY c.difficulty
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut difficulty_histogram = [0i64; 6];
        for (difficulty, count) in histogram_rows {
            let level = Difficulty::clamped(difficulty as i64).value() as usize;
            difficulty_histogram[level] += count;
        }

        let due_now = self.count_due_cards(user_id, None, now).await?;

        let start_of_day = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let reviews_today: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM reviews
            WHERE user_id = $1 AND reviewed_at >= $2 AND reviewed_at <= $3
            "#,
        )
        .bind(user_id)
        .bind(start_of_day)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(StudyStatsResponse {
            total_cards: difficulty_histogram.iter().sum(),
            due_now,
            reviews_today,
            difficulty_histogram,
        })
    }
}
