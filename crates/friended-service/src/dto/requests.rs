//! Request DTOs for API endpoints
//!
//! Bodies implement `Deserialize` and `Validate`; query strings only `Deserialize`.

use chrono::NaiveDate;
use friended_core::Snowflake;
use serde::Deserialize;
use validator::Validate;

// ============================================================================
// Auth Requests
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub refresh_token: String,
}

/// Email sign up
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    #[validate(length(min = 6, max = 40, message = "Password must be between 6 and 40 characters"))]
    pub password: String,

    #[validate(length(max = 50, message = "first_name is too long (maximum is 50 characters)"))]
    pub first_name: Option<String>,

    #[validate(length(max = 50, message = "last_name is too long (maximum is 50 characters)"))]
    pub last_name: Option<String>,

    pub dob: Option<NaiveDate>,

    pub gender: Option<String>,
}

/// Credentials issued by a third-party provider
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExternalToken {
    #[validate(length(min = 1, message = "provider is required"))]
    pub provider: String,
    pub access_token: Option<String>,
    pub provider_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExternalAuthRequest {
    #[validate(nested)]
    pub token: ExternalToken,
    /// Device uuid of the installation signing in
    pub device_id: Option<String>,
    /// Device uuid of the installation that referred this one
    pub referring_device_id: Option<String>,
}

// ============================================================================
// User Requests
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(max = 50, message = "first_name is too long (maximum is 50 characters)"))]
    pub first_name: Option<String>,

    #[validate(length(max = 50, message = "last_name is too long (maximum is 50 characters)"))]
    pub last_name: Option<String>,

    pub dob: Option<NaiveDate>,

    pub gender: Option<String>,

    #[validate(range(min = -90.0, max = 90.0, message = "latitude is out of range"))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0, message = "longitude is out of range"))]
    pub longitude: Option<f64>,

    pub client_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddPhotoRequest {
    #[validate(url(message = "image_url must be a URL"))]
    pub image_url: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ModeratePhotosRequest {
    #[serde(default)]
    pub moderated: Vec<Snowflake>,
    #[serde(default)]
    pub rejected: Vec<Snowflake>,
}

// ============================================================================
// Post Requests
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PostFields {
    #[validate(length(min = 1, message = "response_text can't be blank"))]
    pub response_text: String,
    pub image_url: Option<String>,
    pub mood: Option<String>,
    pub background_color: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(nested)]
    pub post: PostFields,
    /// Used by `POST /posts`; the nested route takes it from the path
    pub poll_question_id: Option<Snowflake>,
    #[serde(rename = "ignore-limit", default)]
    pub ignore_limit: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostChanges {
    pub response_text: Option<String>,
    pub mood: Option<String>,
    pub image_url: Option<String>,
    pub background_color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[serde(default)]
    pub post: PostChanges,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RatePostRequest {
    #[validate(range(min = -1, max = 1, message = "value must be -1, 0 or 1"))]
    pub value: i32,
}

/// `GET /posts` query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostIndexParams {
    pub user_id: Option<Snowflake>,
    pub search: Option<String>,
    pub max: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /posts/feed` query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedParams {
    pub max: Option<usize>,
    /// Comma separated post ids
    pub skip: Option<String>,
    pub gender: Option<String>,
    pub mood: Option<String>,
    pub location_type: Option<String>,
}

// ============================================================================
// Message Requests
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessageRequest {
    pub recipient_user_id: Snowflake,

    #[validate(length(min = 1, message = "text can't be blank"))]
    pub text: String,

    pub initiating_post_id: Option<Snowflake>,
}

// ============================================================================
// Guess Game Requests
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameIndexParams {
    pub filter: Option<String>,
    #[serde(default)]
    pub unique_people: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionParams {
    pub question_id: Option<Snowflake>,
    pub game_id: Option<Snowflake>,
    pub about_user_id: Option<Snowflake>,
    pub max: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AnswerRequest {
    pub about_user_id: Option<Snowflake>,
    pub guess_game_choice_id: Option<Snowflake>,
    pub guess_game_choice_ids: Option<Vec<Snowflake>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnswerParams {
    pub game_id: Option<Snowflake>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AboutUserParams {
    pub about_user_id: Option<Snowflake>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuessParams {
    pub user_id: Option<Snowflake>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AnswerAnonymouslyRequest {
    pub about_user_id: Option<Snowflake>,
    #[validate(length(min = 1, message = "uuid is required"))]
    pub uuid: String,
    pub source: Option<String>,
    #[serde(default)]
    pub choice_ids: Vec<Snowflake>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateAnonymousNameRequest {
    pub uuid: Option<String>,
    pub name: Option<String>,
}
