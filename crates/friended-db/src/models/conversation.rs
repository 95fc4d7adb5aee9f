//! Conversation and message database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct ConversationModel {
    pub id: i64,
    pub initiating_user_id: i64,
    pub target_user_id: i64,
    pub initiating_message_id: Option<i64>,
    pub most_recent_message_id: Option<i64>,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub hidden_by_initiating_user: bool,
    pub hidden_by_target_user: bool,
    pub unread_count_initiating_user: i32,
    pub unread_count_target_user: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserMessageModel {
    pub id: i64,
    pub user_id: i64,
    pub recipient_user_id: i64,
    pub conversation_id: Option<i64>,
    pub initiating_post_id: Option<i64>,
    pub guess_game_id: Option<i64>,
    pub text: String,
    pub read_by_recipient: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
