//! User, settings, location and device database models

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

/// Database model for users table
#[derive(Debug, Clone, FromRow)]
pub struct UserModel {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub dob: Option<NaiveDate>,
    pub estimated_dob: bool,
    pub gender: String,
    pub admin: bool,
    pub provider: Option<String>,
    pub provider_id: Option<String>,
    pub uuid: Option<String>,
    pub hidden_reason: Option<String>,
    pub ban_reason: Option<String>,
    pub external_image_url: Option<String>,
    pub location_id: Option<i64>,
    pub posts_count: i32,
    pub messages_received_count: i32,
    pub active_conversations_count: i32,
    pub last_active_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserSettingsModel {
    pub user_id: i64,
    pub purchased_posts: i32,
    pub purchased_posts_used: i32,
    pub next_post_allowed: Option<DateTime<Utc>>,
    pub pro_subscription_expiration: Option<DateTime<Utc>>,
    pub subscription_state: Option<String>,
    pub feed_filter_min: Option<NaiveDate>,
    pub feed_filter_max: Option<NaiveDate>,
    pub location_type: Option<String>,
    pub client_version: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct LocationModel {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, FromRow)]
pub struct DeviceModel {
    pub id: i64,
    pub uuid: String,
    pub user_id: Option<i64>,
    pub is_blacklisted: bool,
}
