//! Photo and friendship database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct UserPhotoModel {
    pub id: i64,
    pub user_id: i64,
    pub url: String,
    pub order_index: i32,
    pub needs_moderation: bool,
    pub moderated: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct FriendshipModel {
    pub user_id: i64,
    pub friend_id: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
