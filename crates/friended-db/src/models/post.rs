//! Poll question and post database models

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct PollQuestionModel {
    pub id: i64,
    pub text: String,
    pub post_display_format: String,
    pub intro_only: bool,
    pub hidden: bool,
    pub created_at: DateTime<Utc>,
}

/// Database model for posts table
#[derive(Debug, Clone, FromRow)]
pub struct PostModel {
    pub id: i64,
    pub user_id: i64,
    pub poll_question_id: i64,
    pub response_text: String,
    pub external_image_url: Option<String>,
    pub mood: String,
    pub background_color: Option<String>,
    pub gender: String,
    pub dob: Option<NaiveDate>,
    pub location_id: Option<i64>,
    pub flag_count: i32,
    pub deleted: bool,
    pub needs_moderation: bool,
    pub moderated: bool,
    pub rating_count: i32,
    pub user_last_active_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
