//! PostgreSQL implementations of PollQuestionRepository and PostRepository

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument};

use friended_core::entities::{PollQuestion, Post, PostsFeedResult};
use friended_core::error::DomainError;
use friended_core::feed::FeedQuery;
use friended_core::traits::{
    PollQuestionRepository, PostListQuery, PostRepository, PostSideEffects, RepoResult,
};
use friended_core::value_objects::{Gender, Snowflake};

use crate::mappers::{raw_id, raw_ids};
use crate::models::{PollQuestionModel, PostModel};

use super::error::{map_db_error, map_unique_violation, post_not_found};
use super::feed::{build_feed_query, POST_COLUMNS};

// ============================================================================
// Poll questions
// ============================================================================

#[derive(Clone)]
pub struct PgPollQuestionRepository {
    pool: PgPool,
}

impl PgPollQuestionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PollQuestionRepository for PgPollQuestionRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<PollQuestion>> {
        let result = sqlx::query_as::<_, PollQuestionModel>(
            r"
            SELECT id, text, post_display_format, intro_only, hidden, created_at
            FROM poll_questions
            WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(PollQuestion::from))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_by_ids(&self, ids: &[Snowflake]) -> RepoResult<Vec<PollQuestion>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, PollQuestionModel>(
            r"
            SELECT id, text, post_display_format, intro_only, hidden, created_at
            FROM poll_questions
            WHERE id = ANY($1)
            ",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(PollQuestion::from).collect())
    }

    #[instrument(skip(self))]
    async fn list_visible(&self) -> RepoResult<Vec<PollQuestion>> {
        let rows = sqlx::query_as::<_, PollQuestionModel>(
            r"
            SELECT id, text, post_display_format, intro_only, hidden, created_at
            FROM poll_questions
            WHERE hidden = FALSE
            ORDER BY created_at DESC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(PollQuestion::from).collect())
    }
}

// ============================================================================
// Posts
// ============================================================================

/// PostgreSQL implementation of PostRepository
#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_list_filters(qb: &mut QueryBuilder<'static, Postgres>, query: &PostListQuery) {
    qb.push(" WHERE p.deleted = FALSE");
    if let Some(user_id) = query.user_id {
        qb.push(" AND p.user_id = ");
        qb.push_bind(user_id.into_inner());
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND p.response_text ILIKE ");
        qb.push_bind(format!("%{}%", escape_like(search)));
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[async_trait]
impl PostRepository for PgPostRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Post>> {
        let result = sqlx::query_as::<_, PostModel>(
            r"
            SELECT id, user_id, poll_question_id, response_text, external_image_url, mood,
                   background_color, gender, dob, location_id, flag_count, deleted,
                   needs_moderation, moderated, rating_count, user_last_active_at,
                   created_at, updated_at
            FROM posts
            WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Post::from))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_by_ids(&self, ids: &[Snowflake]) -> RepoResult<Vec<Post>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, PostModel>(
            r"
            SELECT id, user_id, poll_question_id, response_text, external_image_url, mood,
                   background_color, gender, dob, location_id, flag_count, deleted,
                   needs_moderation, moderated, rating_count, user_last_active_at,
                   created_at, updated_at
            FROM posts
            WHERE id = ANY($1)
            ",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    #[instrument(skip(self))]
    async fn exists_for_question(&self, user_id: Snowflake, question_id: Snowflake) -> RepoResult<bool> {
        let result = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS(
                SELECT 1 FROM posts
                WHERE user_id = $1 AND poll_question_id = $2 AND deleted = FALSE
            )
            ",
        )
        .bind(user_id.into_inner())
        .bind(question_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result)
    }

    #[instrument(skip(self))]
    async fn count_by_user(&self, user_id: Snowflake) -> RepoResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*) FROM posts WHERE user_id = $1 AND deleted = FALSE
            ",
        )
        .bind(user_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(count)
    }

    #[instrument(skip(self))]
    async fn latest_by_user(&self, user_id: Snowflake) -> RepoResult<Option<Post>> {
        let result = sqlx::query_as::<_, PostModel>(
            r"
            SELECT id, user_id, poll_question_id, response_text, external_image_url, mood,
                   background_color, gender, dob, location_id, flag_count, deleted,
                   needs_moderation, moderated, rating_count, user_last_active_at,
                   created_at, updated_at
            FROM posts
            WHERE user_id = $1 AND deleted = FALSE
            ORDER BY created_at DESC
            LIMIT 1
            ",
        )
        .bind(user_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Post::from))
    }

    #[instrument(skip(self, post, effects), fields(post_id = %post.id, user_id = %post.user_id))]
    async fn create(&self, post: &Post, effects: &PostSideEffects) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        sqlx::query(
            r"
            INSERT INTO posts (id, user_id, poll_question_id, response_text, external_image_url,
                               mood, background_color, gender, dob, location_id, flag_count,
                               deleted, needs_moderation, moderated, rating_count,
                               user_last_active_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ",
        )
        .bind(post.id.into_inner())
        .bind(post.user_id.into_inner())
        .bind(post.poll_question_id.into_inner())
        .bind(&post.response_text)
        .bind(&post.external_image_url)
        .bind(&post.mood)
        .bind(&post.background_color)
        .bind(post.gender.as_str())
        .bind(post.dob)
        .bind(raw_id(post.location_id))
        .bind(post.flag_count)
        .bind(post.deleted)
        .bind(post.needs_moderation)
        .bind(post.moderated)
        .bind(post.rating_count)
        .bind(post.user_last_active_at)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, || DomainError::AlreadyPosted))?;

        sqlx::query(
            r"
            UPDATE users
            SET posts_count = posts_count + 1,
                hidden_reason = COALESCE($2, hidden_reason),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(post.user_id.into_inner())
        .bind(&effects.hidden_reason)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        sqlx::query(
            r"
            INSERT INTO user_settings (user_id, next_post_allowed, purchased_posts_used)
            VALUES ($1, $2, CASE WHEN $3 THEN 1 ELSE 0 END)
            ON CONFLICT (user_id) DO UPDATE
            SET next_post_allowed = EXCLUDED.next_post_allowed,
                purchased_posts_used = user_settings.purchased_posts_used
                    + CASE WHEN $3 THEN 1 ELSE 0 END,
                updated_at = NOW()
            ",
        )
        .bind(post.user_id.into_inner())
        .bind(effects.next_post_allowed)
        .bind(effects.consume_purchased_post)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, post), fields(post_id = %post.id))]
    async fn update(&self, post: &Post) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE posts
            SET response_text = $2, external_image_url = $3, mood = $4, background_color = $5,
                flag_count = $6, deleted = $7, needs_moderation = $8, moderated = $9,
                user_last_active_at = $10, created_at = $11, updated_at = $12
            WHERE id = $1
            ",
        )
        .bind(post.id.into_inner())
        .bind(&post.response_text)
        .bind(&post.external_image_url)
        .bind(&post.mood)
        .bind(&post.background_color)
        .bind(post.flag_count)
        .bind(post.deleted)
        .bind(post.needs_moderation)
        .bind(post.moderated)
        .bind(post.user_last_active_at)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(post_not_found(post.id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list(&self, query: &PostListQuery) -> RepoResult<Vec<Post>> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(POST_COLUMNS);
        qb.push(" FROM posts p");
        push_list_filters(&mut qb, query);
        qb.push(" ORDER BY p.created_at DESC, p.id DESC");
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
        }
        if let Some(offset) = query.offset {
            qb.push(" OFFSET ");
            qb.push_bind(offset);
        }

        let rows = qb
            .build_query_as::<PostModel>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self, query: &PostListQuery) -> RepoResult<i64> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p");
        push_list_filters(&mut qb, query);

        qb.build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    #[instrument(skip(self, query), fields(stage = query.stage.as_str(), viewer = %query.viewer_id))]
    async fn feed(&self, query: &FeedQuery) -> RepoResult<Vec<Post>> {
        let mut qb = build_feed_query(query);
        let rows = qb
            .build_query_as::<PostModel>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        debug!(count = rows.len(), "Feed stage fetched");
        Ok(rows.into_iter().map(Post::from).collect())
    }

    #[instrument(skip(self))]
    async fn add_skip(&self, user_id: Snowflake, post_id: Snowflake) -> RepoResult<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO post_skips (user_id, post_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, post_id) DO NOTHING
            ",
        )
        .bind(user_id.into_inner())
        .bind(post_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn rate(&self, user_id: Snowflake, post_id: Snowflake, value: i32) -> RepoResult<i32> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        sqlx::query(
            r"
            INSERT INTO ratings (user_id, post_id, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, post_id) DO UPDATE
            SET value = EXCLUDED.value, updated_at = NOW()
            ",
        )
        .bind(user_id.into_inner())
        .bind(post_id.into_inner())
        .bind(value)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let rating_count = sqlx::query_scalar::<_, i32>(
            r"
            UPDATE posts
            SET rating_count = (
                SELECT COUNT(*)::INTEGER FROM ratings WHERE post_id = $1 AND value > 0
            )
            WHERE id = $1
            RETURNING rating_count
            ",
        )
        .bind(post_id.into_inner())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| post_not_found(post_id))?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(rating_count)
    }

    #[instrument(skip(self, post_ids), fields(count = post_ids.len()))]
    async fn liked_post_ids(&self, user_id: Snowflake, post_ids: &[Snowflake]) -> RepoResult<Vec<Snowflake>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_scalar::<_, i64>(
            r"
            SELECT post_id FROM ratings
            WHERE user_id = $1 AND post_id = ANY($2) AND value > 0
            ",
        )
        .bind(user_id.into_inner())
        .bind(raw_ids(post_ids))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(Snowflake::new).collect())
    }

    #[instrument(skip(self))]
    async fn add_page_view(&self, user_id: Snowflake, post_id: Snowflake) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO page_views (user_id, post_id) VALUES ($1, $2)
            ",
        )
        .bind(user_id.into_inner())
        .bind(post_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, blocked_ids))]
    async fn page_view_count(&self, post_id: Snowflake, blocked_ids: &[Snowflake]) -> RepoResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r"
            SELECT
                (SELECT COUNT(*) FROM ratings r JOIN users u ON u.id = r.user_id
                 WHERE r.post_id = $1 AND r.value <> 0
                   AND (u.hidden_reason IS NULL OR u.hidden_reason = '')
                   AND r.user_id <> ALL($2))
              + (SELECT COUNT(*) FROM user_messages m JOIN users u ON u.id = m.user_id
                 WHERE m.initiating_post_id = $1
                   AND (u.hidden_reason IS NULL OR u.hidden_reason = '')
                   AND m.user_id <> ALL($2))
            ",
        )
        .bind(post_id.into_inner())
        .bind(raw_ids(blocked_ids))
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(count)
    }

    #[instrument(skip(self))]
    async fn sync_author_fields(
        &self,
        user_id: Snowflake,
        gender: Gender,
        dob: Option<NaiveDate>,
        location_id: Option<Snowflake>,
    ) -> RepoResult<u64> {
        let result = sqlx::query(
            r"
            UPDATE posts SET gender = $2, dob = $3, location_id = $4 WHERE user_id = $1
            ",
        )
        .bind(user_id.into_inner())
        .bind(gender.as_str())
        .bind(dob)
        .bind(raw_id(location_id))
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn touch_user_activity(&self, user_id: Snowflake, at: DateTime<Utc>) -> RepoResult<()> {
        sqlx::query(
            r"
            UPDATE posts SET user_last_active_at = $2
            WHERE id = (
                SELECT id FROM posts
                WHERE user_id = $1 AND deleted = FALSE
                ORDER BY created_at DESC
                LIMIT 1
            )
            ",
        )
        .bind(user_id.into_inner())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn moderate_pending(&self, user_id: Snowflake, primary_photo_url: Option<&str>) -> RepoResult<u64> {
        let result = sqlx::query(
            r"
            UPDATE posts p
            SET moderated = TRUE,
                external_image_url = CASE
                    WHEN q.intro_only AND $2::TEXT IS NOT NULL THEN $2::TEXT
                    ELSE p.external_image_url
                END,
                updated_at = NOW()
            FROM poll_questions q
            WHERE q.id = p.poll_question_id
              AND p.user_id = $1
              AND p.needs_moderation = TRUE
              AND p.moderated = FALSE
            ",
        )
        .bind(user_id.into_inner())
        .bind(primary_photo_url)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn filter_terms(&self) -> RepoResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r"
            SELECT term FROM post_filter_terms
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self, result), fields(user_id = %result.user_id, time_filter = %result.time_filter))]
    async fn record_feed_result(&self, result: &PostsFeedResult) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO posts_feed_results (id, user_id, num_results, gender_filter, mood_filter,
                                            location_filter, time_filter, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(result.id.into_inner())
        .bind(result.user_id.into_inner())
        .bind(result.num_results)
        .bind(&result.gender_filter)
        .bind(&result.mood_filter)
        .bind(&result.location_filter)
        .bind(&result.time_filter)
        .bind(result.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }
}
