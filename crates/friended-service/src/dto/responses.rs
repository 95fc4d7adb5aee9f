//! Response DTOs for API endpoints
//!
//! All response DTOs implement `Serialize` for JSON output.
//! Snowflake IDs are serialized as strings for JavaScript compatibility.

use chrono::{DateTime, NaiveDate, Utc};
use friended_core::guess::AnonRanking;
use friended_core::{Gender, Snowflake};
use serde::Serialize;

// ============================================================================
// Common Response Types
// ============================================================================

/// `{"result": ...}` wrapper
#[derive(Debug, Serialize)]
pub struct ResultResponse<T> {
    pub result: T,
}

impl<T> ResultResponse<T> {
    pub fn new(result: T) -> Self {
        Self { result }
    }
}

impl ResultResponse<&'static str> {
    /// `{"result": "success"}`
    pub fn success() -> Self {
        Self { result: "success" }
    }
}

/// `{"results": [...]}` with optional paging metadata
#[derive(Debug, Serialize)]
pub struct ResultsResponse<T> {
    pub results: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
}

impl<T> ResultsResponse<T> {
    pub fn new(results: Vec<T>) -> Self {
        Self {
            results,
            max: None,
            offset: None,
            total: None,
        }
    }

    pub fn paged(results: Vec<T>, max: i64, offset: i64, total: i64) -> Self {
        Self {
            results,
            max: Some(max),
            offset: Some(offset),
            total: Some(total),
        }
    }
}

// ============================================================================
// User Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PhotoResponse {
    pub id: Snowflake,
    pub user_id: Snowflake,
    pub url: String,
    pub order_index: i32,
    pub needs_moderation: bool,
    pub moderated: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationResponse {
    pub id: Snowflake,
    pub latitude: f64,
    pub longitude: f64,
}

/// User as seen by a viewer. Current-user and friendship fields are only present
/// when they apply.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Snowflake,
    pub first_name: String,
    pub last_name: String,
    pub dob: Option<NaiveDate>,
    pub estimated_dob: bool,
    pub gender: Gender,
    pub admin: bool,
    pub provider: Option<String>,
    pub external_image_url: Option<String>,
    pub posts_count: i32,
    pub last_active_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub is_subscribed: bool,
    pub user_photos: Vec<PhotoResponse>,
    pub location: Option<LocationResponse>,

    // Current user only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds_until_post_allowed: Option<i64>,

    // Other users only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_friend: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_a_friend: Option<&'static str>,
}

/// Compact user embedded in posts, conversations and games
#[derive(Debug, Clone, Serialize)]
pub struct UserSummaryResponse {
    pub id: Snowflake,
    pub first_name: String,
    pub gender: Gender,
    pub dob: Option<NaiveDate>,
    pub external_image_url: Option<String>,
    pub last_active_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSettingsResponse {
    pub purchased_posts_remaining: i32,
    pub next_post_allowed: Option<DateTime<Utc>>,
    pub pro_subscription_expiration: Option<DateTime<Utc>>,
    pub subscription_state: Option<String>,
    pub feed_filter_min: Option<NaiveDate>,
    pub feed_filter_max: Option<NaiveDate>,
    pub location_type: Option<String>,
    pub client_version: Option<String>,
}

// ============================================================================
// Auth Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub expires_on: DateTime<Utc>,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub expires_on: DateTime<Utc>,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferralResponse {
    pub device_id: String,
    pub referring_device_id: String,
}

#[derive(Debug, Serialize)]
pub struct ExternalAuthUser {
    #[serde(flatten)]
    pub user: UserResponse,
    pub post_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral: Option<ReferralResponse>,
    pub user_settings: UserSettingsResponse,
    pub is_new: bool,
}

#[derive(Debug, Serialize)]
pub struct ExternalAuthResponse {
    pub id: Snowflake,
    pub expires_on: DateTime<Utc>,
    pub refresh_by: Option<DateTime<Utc>>,
    pub user_id: Snowflake,
    pub provider: String,
    pub access_token: String,
    pub refresh_token: String,
    pub user: ExternalAuthUser,
}

// ============================================================================
// Post Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PollQuestionResponse {
    pub id: Snowflake,
    pub text: String,
    pub post_display_format: String,
    pub intro_only: bool,
}

/// Post JSON. Author denormalisations stay private; the image is exposed as `image_url`.
#[derive(Debug, Clone, Serialize)]
pub struct PostResponse {
    pub id: Snowflake,
    pub user_id: Snowflake,
    pub poll_question_id: Snowflake,
    pub response_text: String,
    pub image_url: Option<String>,
    pub mood: String,
    pub background_color: Option<String>,
    pub flag_count: i32,
    pub deleted: bool,
    pub needs_moderation: bool,
    pub moderated: bool,
    pub rating_count: i32,
    pub user_last_active_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_question: Option<PollQuestionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummaryResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked_by_current_user: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_view_count: Option<i64>,
}

// ============================================================================
// Conversation Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub id: Snowflake,
    pub user_id: Snowflake,
    pub recipient_user_id: Snowflake,
    pub conversation_id: Option<Snowflake>,
    pub initiating_post_id: Option<Snowflake>,
    pub guess_game_id: Option<Snowflake>,
    pub text: String,
    pub read_by_recipient: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationResponse {
    pub id: Snowflake,
    pub initiating_user_id: Snowflake,
    pub target_user_id: Snowflake,
    pub initiating_message_id: Option<Snowflake>,
    pub most_recent_message_id: Option<Snowflake>,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub unread_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_user: Option<UserSummaryResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initiating_user: Option<UserSummaryResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_user: Option<UserSummaryResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_reply: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConversationMessagesResponse {
    pub conversation: ConversationResponse,
    pub messages: Vec<MessageResponse>,
}

// ============================================================================
// Guess Game Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ChoiceResponse {
    pub id: Snowflake,
    pub question_id: Snowflake,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionResponse {
    pub id: Snowflake,
    pub text: String,
    pub choices: Vec<ChoiceResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerResponse {
    pub id: Snowflake,
    pub by_user_id: Snowflake,
    pub about_user_id: Snowflake,
    pub question_id: Snowflake,
    pub choice_id: Snowflake,
    pub game_id: Option<Snowflake>,
    pub is_correct: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Text of the chosen option
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameResponse {
    pub id: Snowflake,
    pub by_user_id: Snowflake,
    pub about_user_id: Snowflake,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_guessing_done: bool,
    pub current_guesses: usize,
    pub total_guesses_needed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_user_photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<AnswerResponse>>,
}

#[derive(Debug, Serialize)]
pub struct GamesResponse {
    pub games: Vec<GameResponse>,
}

#[derive(Debug, Serialize)]
pub struct GameEnvelope {
    pub game: GameResponse,
}

#[derive(Debug, Serialize)]
pub struct SingleQuestionResponse {
    pub about_user: UserResponse,
    pub guess_game_question: QuestionResponse,
}

#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about_user: Option<UserResponse>,
    pub guess_game_questions: Vec<QuestionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions_for_me: Option<Vec<QuestionResponse>>,
}

/// Either a single question or a list, depending on the query
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum QuestionsPage {
    Single(SingleQuestionResponse),
    Many(QuestionsResponse),
}

#[derive(Debug, Serialize)]
pub struct AnswerResultResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<AnswerResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<AnswerResponse>>,
    pub about_user: UserResponse,
    pub game: Option<GameResponse>,
}

#[derive(Debug, Serialize)]
pub struct AnswersResponse {
    pub answers: Vec<AnswerResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuesserResponse {
    pub id: Snowflake,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PopularGuessResponse {
    pub num_answers: usize,
    pub choice: ChoiceResponse,
    pub users: Vec<GuesserResponse>,
}

#[derive(Debug, Serialize)]
pub struct PopularGuessesResponse {
    pub popular_guesses: Vec<PopularGuessResponse>,
}

/// Share link, or the reason it is not offered yet
#[derive(Debug, Serialize)]
pub struct ShareLinkResponse {
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub max_guesses: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anonymous_guesser_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anonymous_friend_count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct GuessPageResponse {
    pub about_user: UserSummaryResponse,
    pub guess_game_questions: Vec<QuestionResponse>,
}

#[derive(Debug, Serialize)]
pub struct RankingsResponse {
    pub rankings: Vec<AnonRanking>,
}

#[derive(Debug, Serialize)]
pub struct AnonymousNameResponse {
    pub message: &'static str,
    pub name: String,
}

// ============================================================================
// Health Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub database: bool,
    pub redis: bool,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

impl ReadinessResponse {
    pub fn ready(database: bool, redis: bool) -> Self {
        Self {
            status: if database && redis { "ready" } else { "not_ready" },
            checks: HealthChecks { database, redis },
        }
    }
}
