//! PostgreSQL implementations of photos, friendships and blocks

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use friended_core::entities::{Friendship, UserPhoto};
use friended_core::traits::{
    BlockRepository, FriendshipRepository, PhotoRepository, RepoResult,
};
use friended_core::value_objects::Snowflake;

use crate::mappers::raw_ids;
use crate::models::{FriendshipModel, UserPhotoModel};

use super::error::map_db_error;

// ============================================================================
// Photos
// ============================================================================

#[derive(Clone)]
pub struct PgPhotoRepository {
    pool: PgPool,
}

impl PgPhotoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PhotoRepository for PgPhotoRepository {
    #[instrument(skip(self, photo), fields(photo_id = %photo.id))]
    async fn create(&self, photo: &UserPhoto) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO user_photos (id, user_id, url, order_index, needs_moderation, moderated,
                                     deleted, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(photo.id.into_inner())
        .bind(photo.user_id.into_inner())
        .bind(&photo.url)
        .bind(photo.order_index)
        .bind(photo.needs_moderation)
        .bind(photo.moderated)
        .bind(photo.deleted)
        .bind(photo.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_user(&self, user_id: Snowflake) -> RepoResult<Vec<UserPhoto>> {
        self.find_by_users(&[user_id]).await
    }

    #[instrument(skip(self, user_ids), fields(count = user_ids.len()))]
    async fn find_by_users(&self, user_ids: &[Snowflake]) -> RepoResult<Vec<UserPhoto>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, UserPhotoModel>(
            r"
            SELECT id, user_id, url, order_index, needs_moderation, moderated, deleted, created_at
            FROM user_photos
            WHERE user_id = ANY($1) AND deleted = FALSE
            ORDER BY user_id, order_index, created_at
            ",
        )
        .bind(raw_ids(user_ids))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(UserPhoto::from).collect())
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_by_ids(&self, ids: &[Snowflake]) -> RepoResult<Vec<UserPhoto>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, UserPhotoModel>(
            r"
            SELECT id, user_id, url, order_index, needs_moderation, moderated, deleted, created_at
            FROM user_photos
            WHERE id = ANY($1)
            ",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(UserPhoto::from).collect())
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn set_moderated(&self, ids: &[Snowflake]) -> RepoResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r"
            UPDATE user_photos SET moderated = TRUE WHERE id = ANY($1)
            ",
        )
        .bind(raw_ids(ids))
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn set_deleted(&self, ids: &[Snowflake]) -> RepoResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r"
            UPDATE user_photos SET deleted = TRUE WHERE id = ANY($1)
            ",
        )
        .bind(raw_ids(ids))
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }
}

// ============================================================================
// Friendships
// ============================================================================

#[derive(Clone)]
pub struct PgFriendshipRepository {
    pool: PgPool,
}

impl PgFriendshipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FriendshipRepository for PgFriendshipRepository {
    #[instrument(skip(self))]
    async fn find(&self, user_id: Snowflake, friend_id: Snowflake) -> RepoResult<Option<Friendship>> {
        let result = sqlx::query_as::<_, FriendshipModel>(
            r"
            SELECT user_id, friend_id, status, created_at
            FROM friendships
            WHERE user_id = $1 AND friend_id = $2
            ",
        )
        .bind(user_id.into_inner())
        .bind(friend_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Friendship::from))
    }

    #[instrument(skip(self))]
    async fn find_between(&self, a: Snowflake, b: Snowflake) -> RepoResult<Vec<Friendship>> {
        let rows = sqlx::query_as::<_, FriendshipModel>(
            r"
            SELECT user_id, friend_id, status, created_at
            FROM friendships
            WHERE (user_id = $1 AND friend_id = $2) OR (user_id = $2 AND friend_id = $1)
            ",
        )
        .bind(a.into_inner())
        .bind(b.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(Friendship::from).collect())
    }

    #[instrument(skip(self))]
    async fn create(&self, friendship: &Friendship) -> RepoResult<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO friendships (user_id, friend_id, status, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, friend_id) DO NOTHING
            ",
        )
        .bind(friendship.user_id.into_inner())
        .bind(friendship.friend_id.into_inner())
        .bind(friendship.status.as_str())
        .bind(friendship.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn accept_pair(&self, a: Snowflake, b: Snowflake) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO friendships (user_id, friend_id, status)
            VALUES ($1, $2, 'accepted'), ($2, $1, 'accepted')
            ON CONFLICT (user_id, friend_id) DO UPDATE SET status = 'accepted'
            ",
        )
        .bind(a.into_inner())
        .bind(b.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_between(&self, a: Snowflake, b: Snowflake) -> RepoResult<u64> {
        let result = sqlx::query(
            r"
            DELETE FROM friendships
            WHERE (user_id = $1 AND friend_id = $2) OR (user_id = $2 AND friend_id = $1)
            ",
        )
        .bind(a.into_inner())
        .bind(b.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn requesters_of(&self, user_id: Snowflake) -> RepoResult<Vec<Friendship>> {
        let rows = sqlx::query_as::<_, FriendshipModel>(
            r"
            SELECT user_id, friend_id, status, created_at
            FROM friendships
            WHERE friend_id = $1
            ",
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(Friendship::from).collect())
    }

    #[instrument(skip(self))]
    async fn friend_ids(&self, user_id: Snowflake) -> RepoResult<Vec<Snowflake>> {
        let rows = sqlx::query_scalar::<_, i64>(
            r"
            SELECT friend_id FROM friendships WHERE user_id = $1 AND status = 'accepted'
            UNION
            SELECT user_id FROM friendships WHERE friend_id = $1 AND status = 'accepted'
            ",
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(Snowflake::new).collect())
    }
}

// ============================================================================
// Blocks
// ============================================================================

#[derive(Clone)]
pub struct PgBlockRepository {
    pool: PgPool,
}

impl PgBlockRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlockRepository for PgBlockRepository {
    #[instrument(skip(self))]
    async fn create(&self, user_id: Snowflake, blocked_user_id: Snowflake) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO user_blocks (user_id, blocked_user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, blocked_user_id) DO NOTHING
            ",
        )
        .bind(user_id.into_inner())
        .bind(blocked_user_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn blocked_ids(&self, user_id: Snowflake) -> RepoResult<Vec<Snowflake>> {
        let rows = sqlx::query_scalar::<_, i64>(
            r"
            SELECT blocked_user_id FROM user_blocks WHERE user_id = $1 AND blocked_user_id <> $1
            UNION
            SELECT user_id FROM user_blocks WHERE blocked_user_id = $1 AND user_id <> $1
            ",
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(Snowflake::new).collect())
    }

    #[instrument(skip(self))]
    async fn is_blocked_between(&self, a: Snowflake, b: Snowflake) -> RepoResult<bool> {
        let result = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS(
                SELECT 1 FROM user_blocks
                WHERE (user_id = $1 AND blocked_user_id = $2)
                   OR (user_id = $2 AND blocked_user_id = $1)
            )
            ",
        )
        .bind(a.into_inner())
        .bind(b.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repos_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgPhotoRepository>();
        assert_send_sync::<PgFriendshipRepository>();
        assert_send_sync::<PgBlockRepository>();
    }
}
