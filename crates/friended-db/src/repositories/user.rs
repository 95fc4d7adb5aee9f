//! PostgreSQL implementation of UserRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use friended_core::entities::User;
use friended_core::error::DomainError;
use friended_core::traits::{RepoResult, UserRepository};
use friended_core::value_objects::Snowflake;

use crate::mappers::{raw_id, raw_ids};
use crate::models::UserModel;

use super::error::{map_db_error, map_unique_violation, user_not_found};

/// PostgreSQL implementation of UserRepository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<User>> {
        let result = sqlx::query_as::<_, UserModel>(
            r"
            SELECT id, first_name, last_name, email, dob, estimated_dob, gender, admin,
                   provider, provider_id, uuid, hidden_reason, ban_reason, external_image_url,
                   location_id, posts_count, messages_received_count, active_conversations_count,
                   last_active_at, created_at, updated_at
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(User::from))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_by_ids(&self, ids: &[Snowflake]) -> RepoResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, UserModel>(
            r"
            SELECT id, first_name, last_name, email, dob, estimated_dob, gender, admin,
                   provider, provider_id, uuid, hidden_reason, ban_reason, external_image_url,
                   location_id, posts_count, messages_received_count, active_conversations_count,
                   last_active_at, created_at, updated_at
            FROM users
            WHERE id = ANY($1)
            ",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let result = sqlx::query_as::<_, UserModel>(
            r"
            SELECT id, first_name, last_name, email, dob, estimated_dob, gender, admin,
                   provider, provider_id, uuid, hidden_reason, ban_reason, external_image_url,
                   location_id, posts_count, messages_received_count, active_conversations_count,
                   last_active_at, created_at, updated_at
            FROM users
            WHERE LOWER(email) = LOWER($1)
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(User::from))
    }

    #[instrument(skip(self))]
    async fn find_by_provider(&self, provider: &str, provider_id: &str) -> RepoResult<Option<User>> {
        let result = sqlx::query_as::<_, UserModel>(
            r"
            SELECT id, first_name, last_name, email, dob, estimated_dob, gender, admin,
                   provider, provider_id, uuid, hidden_reason, ban_reason, external_image_url,
                   location_id, posts_count, messages_received_count, active_conversations_count,
                   last_active_at, created_at, updated_at
            FROM users
            WHERE provider = $1 AND provider_id = $2
            ORDER BY created_at
            LIMIT 1
            ",
        )
        .bind(provider)
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(User::from))
    }

    #[instrument(skip(self, digest))]
    async fn find_by_refresh_token(&self, digest: &str) -> RepoResult<Option<User>> {
        let result = sqlx::query_as::<_, UserModel>(
            r"
            SELECT id, first_name, last_name, email, dob, estimated_dob, gender, admin,
                   provider, provider_id, uuid, hidden_reason, ban_reason, external_image_url,
                   location_id, posts_count, messages_received_count, active_conversations_count,
                   last_active_at, created_at, updated_at
            FROM users
            WHERE refresh_token = $1
            ",
        )
        .bind(digest)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(User::from))
    }

    #[instrument(skip(self))]
    async fn email_exists(&self, email: &str) -> RepoResult<bool> {
        let result = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))
            ",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result)
    }

    #[instrument(skip(self))]
    async fn other_account_on_device(
        &self,
        uuid: &str,
        exclude: Snowflake,
    ) -> RepoResult<Option<User>> {
        let result = sqlx::query_as::<_, UserModel>(
            r"
            SELECT id, first_name, last_name, email, dob, estimated_dob, gender, admin,
                   provider, provider_id, uuid, hidden_reason, ban_reason, external_image_url,
                   location_id, posts_count, messages_received_count, active_conversations_count,
                   last_active_at, created_at, updated_at
            FROM users
            WHERE uuid = $1 AND id <> $2 AND admin = FALSE
            ORDER BY id
            LIMIT 1
            ",
        )
        .bind(uuid)
        .bind(exclude.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(User::from))
    }

    #[instrument(skip(self, user, password_hash), fields(user_id = %user.id))]
    async fn create(&self, user: &User, password_hash: &str) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO users (id, first_name, last_name, email, password_hash, dob, estimated_dob,
                               gender, admin, provider, provider_id, uuid, hidden_reason,
                               ban_reason, external_image_url, location_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ",
        )
        .bind(user.id.into_inner())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(password_hash)
        .bind(user.dob)
        .bind(user.estimated_dob)
        .bind(user.gender.as_str())
        .bind(user.admin)
        .bind(&user.provider)
        .bind(&user.provider_id)
        .bind(&user.uuid)
        .bind(&user.hidden_reason)
        .bind(&user.ban_reason)
        .bind(&user.external_image_url)
        .bind(raw_id(user.location_id))
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, || DomainError::EmailAlreadyExists))?;

        Ok(())
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn update(&self, user: &User) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET first_name = $2, last_name = $3, email = $4, dob = $5, estimated_dob = $6,
                gender = $7, provider = $8, provider_id = $9, uuid = $10, hidden_reason = $11,
                ban_reason = $12, external_image_url = $13, location_id = $14, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(user.id.into_inner())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(user.dob)
        .bind(user.estimated_dob)
        .bind(user.gender.as_str())
        .bind(&user.provider)
        .bind(&user.provider_id)
        .bind(&user.uuid)
        .bind(&user.hidden_reason)
        .bind(&user.ban_reason)
        .bind(&user.external_image_url)
        .bind(raw_id(user.location_id))
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, || DomainError::EmailAlreadyExists))?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(user.id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_password_hash(&self, id: Snowflake) -> RepoResult<Option<String>> {
        let result = sqlx::query_scalar::<_, String>(
            r"
            SELECT password_hash FROM users WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result)
    }

    #[instrument(skip(self, digest))]
    async fn set_refresh_token(&self, id: Snowflake, digest: Option<&str>) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE users SET refresh_token = $2, updated_at = NOW() WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .bind(digest)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn is_unbanded(&self, id: Snowflake) -> RepoResult<bool> {
        let result = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS(SELECT 1 FROM unbanded_users WHERE user_id = $1)
            ",
        )
        .bind(id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result)
    }

    #[instrument(skip(self))]
    async fn touch_last_active(&self, id: Snowflake, at: DateTime<Utc>) -> RepoResult<()> {
        sqlx::query(
            r"
            UPDATE users SET last_active_at = $2 WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgUserRepository>();
    }
}
