//! PostgreSQL implementations of the per-user account tables: settings, locations and
//! devices

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use friended_core::entities::{Device, Location, UserSettings};
use friended_core::feed::BoundingBox;
use friended_core::traits::{
    DeviceRepository, LocationRepository, RepoResult, UserSettingsRepository,
};
use friended_core::value_objects::Snowflake;

use crate::mappers::raw_id;
use crate::models::{DeviceModel, LocationModel, UserSettingsModel};

use super::error::map_db_error;

// ============================================================================
// User settings
// ============================================================================

#[derive(Clone)]
pub struct PgUserSettingsRepository {
    pool: PgPool,
}

impl PgUserSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserSettingsRepository for PgUserSettingsRepository {
    #[instrument(skip(self))]
    async fn find_or_default(&self, user_id: Snowflake) -> RepoResult<UserSettings> {
        let result = sqlx::query_as::<_, UserSettingsModel>(
            r"
            SELECT user_id, purchased_posts, purchased_posts_used, next_post_allowed,
                   pro_subscription_expiration, subscription_state, feed_filter_min,
                   feed_filter_max, location_type, client_version
            FROM user_settings
            WHERE user_id = $1
            ",
        )
        .bind(user_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map_or_else(|| UserSettings::new(user_id), UserSettings::from))
    }

    #[instrument(skip(self, settings), fields(user_id = %settings.user_id))]
    async fn save(&self, settings: &UserSettings) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO user_settings (user_id, purchased_posts, purchased_posts_used,
                                       next_post_allowed, pro_subscription_expiration,
                                       subscription_state, feed_filter_min, feed_filter_max,
                                       location_type, client_version, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET purchased_posts = EXCLUDED.purchased_posts,
                purchased_posts_used = EXCLUDED.purchased_posts_used,
                next_post_allowed = EXCLUDED.next_post_allowed,
                pro_subscription_expiration = EXCLUDED.pro_subscription_expiration,
                subscription_state = EXCLUDED.subscription_state,
                feed_filter_min = EXCLUDED.feed_filter_min,
                feed_filter_max = EXCLUDED.feed_filter_max,
                location_type = EXCLUDED.location_type,
                client_version = EXCLUDED.client_version,
                updated_at = NOW()
            ",
        )
        .bind(settings.user_id.into_inner())
        .bind(settings.purchased_posts)
        .bind(settings.purchased_posts_used)
        .bind(settings.next_post_allowed)
        .bind(settings.pro_subscription_expiration)
        .bind(&settings.subscription_state)
        .bind(settings.feed_filter_min)
        .bind(settings.feed_filter_max)
        .bind(&settings.location_type)
        .bind(&settings.client_version)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }
}

// ============================================================================
// Locations
// ============================================================================

#[derive(Clone)]
pub struct PgLocationRepository {
    pool: PgPool,
}

impl PgLocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocationRepository for PgLocationRepository {
    #[instrument(skip(self))]
    async fn create(&self, location: &Location) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO locations (id, latitude, longitude) VALUES ($1, $2, $3)
            ",
        )
        .bind(location.id.into_inner())
        .bind(location.latitude)
        .bind(location.longitude)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Location>> {
        let result = sqlx::query_as::<_, LocationModel>(
            r"
            SELECT id, latitude, longitude FROM locations WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Location::from))
    }

    #[instrument(skip(self))]
    async fn find_within(&self, bounds: &BoundingBox) -> RepoResult<Vec<Location>> {
        let rows = sqlx::query_as::<_, LocationModel>(
            r"
            SELECT id, latitude, longitude
            FROM locations
            WHERE latitude BETWEEN $1 AND $2
              AND longitude BETWEEN $3 AND $4
            ",
        )
        .bind(bounds.min_lat)
        .bind(bounds.max_lat)
        .bind(bounds.min_lon)
        .bind(bounds.max_lon)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(Location::from).collect())
    }
}

// ============================================================================
// Devices
// ============================================================================

#[derive(Clone)]
pub struct PgDeviceRepository {
    pool: PgPool,
}

impl PgDeviceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceRepository for PgDeviceRepository {
    #[instrument(skip(self))]
    async fn find_by_uuid(&self, uuid: &str) -> RepoResult<Option<Device>> {
        let result = sqlx::query_as::<_, DeviceModel>(
            r"
            SELECT id, uuid, user_id, is_blacklisted FROM devices WHERE uuid = $1
            ",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Device::from))
    }

    #[instrument(skip(self))]
    async fn create(&self, device: &Device) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO devices (id, uuid, user_id, is_blacklisted)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (uuid) DO NOTHING
            ",
        )
        .bind(device.id.into_inner())
        .bind(&device.uuid)
        .bind(raw_id(device.user_id))
        .bind(device.is_blacklisted)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn update(&self, device: &Device) -> RepoResult<()> {
        sqlx::query(
            r"
            UPDATE devices
            SET user_id = $2, is_blacklisted = $3, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(device.id.into_inner())
        .bind(raw_id(device.user_id))
        .bind(device.is_blacklisted)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_referral(
        &self,
        device_id: Snowflake,
        referring_device_id: Snowflake,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO referrals (device_id, referring_device_id)
            VALUES ($1, $2)
            ON CONFLICT (device_id) DO NOTHING
            ",
        )
        .bind(device_id.into_inner())
        .bind(referring_device_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repos_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgUserSettingsRepository>();
        assert_send_sync::<PgLocationRepository>();
        assert_send_sync::<PgDeviceRepository>();
    }
}
