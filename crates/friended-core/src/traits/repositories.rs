//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation. Operations that must be atomic, such as creating a
//! post together with its account side effects or writing a guess game message under
//! row locks, are single methods so the implementation owns the transaction.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::entities::{
    AnonGuessGameAnswer, Conversation, Device, Friendship, GuessGame, GuessGameAnswer,
    GuessGameChoice, GuessGameQuestion, Location, PollQuestion, Post, PostReply, PostsFeedResult,
    User, UserMessage, UserPhoto, UserSettings,
};
use crate::error::DomainError;
use crate::feed::{BoundingBox, FeedQuery};
use crate::value_objects::{Gender, Snowflake};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// User Repository
// ============================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<User>>;

    async fn find_by_ids(&self, ids: &[Snowflake]) -> RepoResult<Vec<User>>;

    /// Case-insensitive email lookup
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;

    async fn find_by_provider(&self, provider: &str, provider_id: &str) -> RepoResult<Option<User>>;

    /// Find the user holding a refresh token, by its SHA-256 digest
    async fn find_by_refresh_token(&self, digest: &str) -> RepoResult<Option<User>>;

    async fn email_exists(&self, email: &str) -> RepoResult<bool>;

    /// A non-admin user other than `exclude` who signed in from `uuid`
    async fn other_account_on_device(
        &self,
        uuid: &str,
        exclude: Snowflake,
    ) -> RepoResult<Option<User>>;

    async fn create(&self, user: &User, password_hash: &str) -> RepoResult<()>;

    /// Persist profile, moderation and device fields
    async fn update(&self, user: &User) -> RepoResult<()>;

    async fn get_password_hash(&self, id: Snowflake) -> RepoResult<Option<String>>;

    /// Store (or clear) the refresh token digest
    async fn set_refresh_token(&self, id: Snowflake, digest: Option<&str>) -> RepoResult<()>;

    /// Users exempt from feed age banding
    async fn is_unbanded(&self, id: Snowflake) -> RepoResult<bool>;

    async fn touch_last_active(&self, id: Snowflake, at: DateTime<Utc>) -> RepoResult<()>;
}

// ============================================================================
// User Settings Repository
// ============================================================================

#[async_trait]
pub trait UserSettingsRepository: Send + Sync {
    /// Stored settings, or defaults when the user has none yet
    async fn find_or_default(&self, user_id: Snowflake) -> RepoResult<UserSettings>;

    /// Insert or update
    async fn save(&self, settings: &UserSettings) -> RepoResult<()>;
}

// ============================================================================
// Location Repository
// ============================================================================

#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn create(&self, location: &Location) -> RepoResult<()>;

    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Location>>;

    async fn find_within(&self, bounds: &BoundingBox) -> RepoResult<Vec<Location>>;
}

// ============================================================================
// Device Repository
// ============================================================================

#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn find_by_uuid(&self, uuid: &str) -> RepoResult<Option<Device>>;

    async fn create(&self, device: &Device) -> RepoResult<()>;

    async fn update(&self, device: &Device) -> RepoResult<()>;

    /// Record that `device_id` was referred by `referring_device_id`.
    /// Returns false when the device already has a referral.
    async fn create_referral(
        &self,
        device_id: Snowflake,
        referring_device_id: Snowflake,
    ) -> RepoResult<bool>;
}

// ============================================================================
// Photo Repository
// ============================================================================

#[async_trait]
pub trait PhotoRepository: Send + Sync {
    async fn create(&self, photo: &UserPhoto) -> RepoResult<()>;

    /// Non-deleted photos of a user
    async fn find_by_user(&self, user_id: Snowflake) -> RepoResult<Vec<UserPhoto>>;

    async fn find_by_users(&self, user_ids: &[Snowflake]) -> RepoResult<Vec<UserPhoto>>;

    async fn find_by_ids(&self, ids: &[Snowflake]) -> RepoResult<Vec<UserPhoto>>;

    async fn set_moderated(&self, ids: &[Snowflake]) -> RepoResult<u64>;

    async fn set_deleted(&self, ids: &[Snowflake]) -> RepoResult<u64>;
}

// ============================================================================
// Friendship Repository
// ============================================================================

#[async_trait]
pub trait FriendshipRepository: Send + Sync {
    async fn find(&self, user_id: Snowflake, friend_id: Snowflake) -> RepoResult<Option<Friendship>>;

    /// Rows in either direction between two users
    async fn find_between(&self, a: Snowflake, b: Snowflake) -> RepoResult<Vec<Friendship>>;

    /// Insert a row; returns false when it already existed
    async fn create(&self, friendship: &Friendship) -> RepoResult<bool>;

    /// Mark both directions accepted, creating the missing row
    async fn accept_pair(&self, a: Snowflake, b: Snowflake) -> RepoResult<()>;

    async fn delete_between(&self, a: Snowflake, b: Snowflake) -> RepoResult<u64>;

    /// Rows whose `friend_id` is `user_id`: everyone who asked to befriend them
    async fn requesters_of(&self, user_id: Snowflake) -> RepoResult<Vec<Friendship>>;

    /// Accepted friends in either direction
    async fn friend_ids(&self, user_id: Snowflake) -> RepoResult<Vec<Snowflake>>;
}

// ============================================================================
// Block Repository
// ============================================================================

#[async_trait]
pub trait BlockRepository: Send + Sync {
    async fn create(&self, user_id: Snowflake, blocked_user_id: Snowflake) -> RepoResult<()>;

    /// Users `user_id` blocked plus users who blocked them
    async fn blocked_ids(&self, user_id: Snowflake) -> RepoResult<Vec<Snowflake>>;

    async fn is_blocked_between(&self, a: Snowflake, b: Snowflake) -> RepoResult<bool>;
}

// ============================================================================
// Poll Question Repository
// ============================================================================

#[async_trait]
pub trait PollQuestionRepository: Send + Sync {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<PollQuestion>>;

    async fn find_by_ids(&self, ids: &[Snowflake]) -> RepoResult<Vec<PollQuestion>>;

    async fn list_visible(&self) -> RepoResult<Vec<PollQuestion>>;
}

// ============================================================================
// Post Repository
// ============================================================================

/// Account changes written in the same transaction as a new post
#[derive(Debug, Clone)]
pub struct PostSideEffects {
    /// Set on the author when the post trips the solicitation filter
    pub hidden_reason: Option<String>,
    pub next_post_allowed: DateTime<Utc>,
    pub consume_purchased_post: bool,
}

/// Filters for listing posts outside the feed
#[derive(Debug, Clone, Default)]
pub struct PostListQuery {
    pub user_id: Option<Snowflake>,
    /// Case-insensitive substring of the response text
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Post>>;

    async fn find_by_ids(&self, ids: &[Snowflake]) -> RepoResult<Vec<Post>>;

    /// Whether the user has a live post for the question
    async fn exists_for_question(&self, user_id: Snowflake, question_id: Snowflake) -> RepoResult<bool>;

    async fn count_by_user(&self, user_id: Snowflake) -> RepoResult<i64>;

    async fn latest_by_user(&self, user_id: Snowflake) -> RepoResult<Option<Post>>;

    /// Insert the post and apply `effects` to the author atomically
    async fn create(&self, post: &Post, effects: &PostSideEffects) -> RepoResult<()>;

    async fn update(&self, post: &Post) -> RepoResult<()>;

    /// Live posts, newest first
    async fn list(&self, query: &PostListQuery) -> RepoResult<Vec<Post>>;

    async fn count(&self, query: &PostListQuery) -> RepoResult<i64>;

    /// One feed stage
    async fn feed(&self, query: &FeedQuery) -> RepoResult<Vec<Post>>;

    /// Returns false when the user had already skipped the post
    async fn add_skip(&self, user_id: Snowflake, post_id: Snowflake) -> RepoResult<bool>;

    /// Upsert a rating and return the refreshed like count
    async fn rate(&self, user_id: Snowflake, post_id: Snowflake, value: i32) -> RepoResult<i32>;

    async fn liked_post_ids(&self, user_id: Snowflake, post_ids: &[Snowflake]) -> RepoResult<Vec<Snowflake>>;

    async fn add_page_view(&self, user_id: Snowflake, post_id: Snowflake) -> RepoResult<()>;

    /// Ratings plus replies from senders outside `blocked_ids`
    async fn page_view_count(&self, post_id: Snowflake, blocked_ids: &[Snowflake]) -> RepoResult<i64>;

    /// Copy the author's denormalised fields onto all of their posts
    async fn sync_author_fields(
        &self,
        user_id: Snowflake,
        gender: Gender,
        dob: Option<NaiveDate>,
        location_id: Option<Snowflake>,
    ) -> RepoResult<u64>;

    /// Bump `user_last_active_at` on the author's latest post
    async fn touch_user_activity(&self, user_id: Snowflake, at: DateTime<Utc>) -> RepoResult<()>;

    /// Clear moderation on the author's pending posts; intro posts take `primary_photo_url`
    async fn moderate_pending(&self, user_id: Snowflake, primary_photo_url: Option<&str>) -> RepoResult<u64>;

    async fn filter_terms(&self) -> RepoResult<Vec<String>>;

    async fn record_feed_result(&self, result: &PostsFeedResult) -> RepoResult<()>;
}

// ============================================================================
// Conversation Repository
// ============================================================================

/// A direct message to deliver
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub message: UserMessage,
    /// Id used when no conversation exists yet between the pair
    pub new_conversation_id: Snowflake,
    /// Friends get conversations that do not expire
    pub activate: bool,
}

/// Guess game message to create or rewrite
#[derive(Debug, Clone)]
pub struct GameMessageWrite {
    pub game_id: Snowflake,
    pub by_user_id: Snowflake,
    pub about_user_id: Snowflake,
    pub text: String,
    pub new_message_id: Snowflake,
    pub new_conversation_id: Snowflake,
}

#[derive(Debug, Clone)]
pub struct DeliveredMessage {
    pub message: UserMessage,
    pub conversation: Conversation,
    /// False when an existing game message was rewritten
    pub created: bool,
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Conversation>>;

    async fn find_between(&self, a: Snowflake, b: Snowflake) -> RepoResult<Option<Conversation>>;

    /// Conversations the user has not hidden that are active or unexpired, latest first
    async fn list_for_user(&self, user_id: Snowflake, now: DateTime<Utc>) -> RepoResult<Vec<Conversation>>;

    /// Store a message, creating or reopening the conversation under a recipient row lock
    async fn send_message(&self, outgoing: &OutgoingMessage) -> RepoResult<DeliveredMessage>;

    /// Create or rewrite a game's message under game and recipient row locks
    async fn write_game_message(&self, write: &GameMessageWrite) -> RepoResult<DeliveredMessage>;

    async fn messages(&self, conversation_id: Snowflake) -> RepoResult<Vec<UserMessage>>;

    /// Mark messages to `reader` read and refresh unread counters
    async fn mark_read(&self, conversation_id: Snowflake, reader: Snowflake) -> RepoResult<()>;

    async fn update_visibility(&self, conversation: &Conversation) -> RepoResult<()>;

    async fn activate_between(&self, a: Snowflake, b: Snowflake) -> RepoResult<()>;

    /// Replies to a post from visible senders outside `blocked_ids`, most recent first
    async fn replies_to_post(&self, post_id: Snowflake, blocked_ids: &[Snowflake]) -> RepoResult<Vec<PostReply>>;
}

// ============================================================================
// Guess Game Repository
// ============================================================================

#[async_trait]
pub trait GuessGameRepository: Send + Sync {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<GuessGame>>;

    /// Newest game for the pair still collecting guesses
    async fn find_open_game(&self, by: Snowflake, about: Snowflake) -> RepoResult<Option<GuessGame>>;

    async fn create(&self, game: &GuessGame) -> RepoResult<()>;

    async fn set_have_all_answers(&self, id: Snowflake, value: bool) -> RepoResult<()>;

    /// Games whose about user is `user_id`, newest first
    async fn games_about(&self, user_id: Snowflake) -> RepoResult<Vec<GuessGame>>;

    async fn answers_for_game(&self, game_id: Snowflake) -> RepoResult<Vec<GuessGameAnswer>>;

    async fn find_answer(
        &self,
        question_id: Snowflake,
        by: Snowflake,
        about: Snowflake,
    ) -> RepoResult<Option<GuessGameAnswer>>;

    /// Fails with `AlreadyAnswered` on a duplicate (question, by, about)
    async fn create_answer(&self, answer: &GuessGameAnswer) -> RepoResult<()>;

    async fn update_answer(&self, answer: &GuessGameAnswer) -> RepoResult<()>;

    /// Answers a user gave about themselves, newest first
    async fn self_answers(&self, user_id: Snowflake) -> RepoResult<Vec<GuessGameAnswer>>;

    /// Other users' guesses about `about` for one question
    async fn guesses_for_question(&self, about: Snowflake, question_id: Snowflake) -> RepoResult<Vec<GuessGameAnswer>>;

    /// Other users' guesses about `about`
    async fn guesses_about(&self, about: Snowflake) -> RepoResult<Vec<GuessGameAnswer>>;

    async fn guessed_question_ids(&self, by: Snowflake, about: Snowflake) -> RepoResult<Vec<Snowflake>>;

    async fn create_anon_answers(&self, answers: &[AnonGuessGameAnswer]) -> RepoResult<()>;

    async fn anon_answers_about(&self, user_id: Snowflake) -> RepoResult<Vec<AnonGuessGameAnswer>>;

    async fn rename_anon(&self, uuid: &str, name: &str) -> RepoResult<u64>;
}

// ============================================================================
// Guess Question Repository
// ============================================================================

#[async_trait]
pub trait GuessQuestionRepository: Send + Sync {
    async fn list_visible(&self) -> RepoResult<Vec<GuessGameQuestion>>;

    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<GuessGameQuestion>>;

    async fn find_by_ids(&self, ids: &[Snowflake]) -> RepoResult<Vec<GuessGameQuestion>>;

    /// Visible choices for the questions
    async fn choices_for(&self, question_ids: &[Snowflake]) -> RepoResult<Vec<GuessGameChoice>>;

    async fn find_choice(&self, id: Snowflake) -> RepoResult<Option<GuessGameChoice>>;

    async fn find_choices(&self, ids: &[Snowflake]) -> RepoResult<Vec<GuessGameChoice>>;
}
