//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::Snowflake;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("User not found: {0}")]
    UserNotFound(Snowflake),

    #[error("This post has been removed")]
    PostNotFound(Snowflake),

    #[error("Poll question not found: {0}")]
    PollQuestionNotFound(Snowflake),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(Snowflake),

    #[error("Game id is invalid.")]
    GameNotFound(Snowflake),

    #[error("Invalid question id.")]
    GuessQuestionNotFound(Snowflake),

    #[error("Invalid choice id.")]
    GuessChoiceNotFound(Snowflake),

    #[error("Photo not found: {0}")]
    PhotoNotFound(Snowflake),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("{0}")]
    ValidationError(String),

    #[error("Email is invalid")]
    InvalidEmail,

    #[error("Gender must be male, female or unknown")]
    InvalidGender(String),

    #[error("Password must be between {min} and {max} characters")]
    PasswordLength { min: usize, max: usize },

    #[error("{field} is too long (maximum is {max} characters)")]
    NameTooLong { field: &'static str, max: usize },

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    #[error("You are not allowed to modify this post")]
    NotPostOwner,

    #[error("You are not a participant in this conversation")]
    NotConversationParticipant,

    #[error("You are not a participant in this game.")]
    NotGameParticipant,

    #[error("This user is not available")]
    UserBlocked,

    #[error("Admin access required")]
    AdminRequired,

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    #[error("Email has already been taken")]
    EmailAlreadyExists,

    #[error("You've already posted this icebreaker before")]
    AlreadyPosted,

    #[error("You have already answered this question.")]
    AlreadyAnswered,

    // =========================================================================
    // Business Rule Violations
    // =========================================================================
    #[error("You are not allowed to post for {} minutes", .seconds / 60)]
    PostLimitExceeded { seconds: i64 },

    #[error("{0}")]
    AccountBanned(String),

    #[error("no friend request to remove")]
    NoFriendship,

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for logs and API responses
    pub fn code(&self) -> &'static str {
        match self {
            // Not Found
            Self::UserNotFound(_) => "UNKNOWN_USER",
            Self::PostNotFound(_) => "UNKNOWN_POST",
            Self::PollQuestionNotFound(_) => "UNKNOWN_POLL_QUESTION",
            Self::ConversationNotFound(_) => "UNKNOWN_CONVERSATION",
            Self::GameNotFound(_) => "UNKNOWN_GAME",
            Self::GuessQuestionNotFound(_) => "UNKNOWN_GUESS_QUESTION",
            Self::GuessChoiceNotFound(_) => "UNKNOWN_GUESS_CHOICE",
            Self::PhotoNotFound(_) => "UNKNOWN_PHOTO",

            // Validation
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidEmail => "INVALID_EMAIL",
            Self::InvalidGender(_) => "INVALID_GENDER",
            Self::PasswordLength { .. } => "INVALID_PASSWORD",
            Self::NameTooLong { .. } => "NAME_TOO_LONG",

            // Authorization
            Self::NotPostOwner => "NOT_POST_OWNER",
            Self::NotConversationParticipant => "NOT_CONVERSATION_PARTICIPANT",
            Self::NotGameParticipant => "NOT_GAME_PARTICIPANT",
            Self::UserBlocked => "USER_BLOCKED",
            Self::AdminRequired => "ADMIN_REQUIRED",

            // Conflict
            Self::EmailAlreadyExists => "EMAIL_ALREADY_EXISTS",
            Self::AlreadyPosted => "ALREADY_POSTED",
            Self::AlreadyAnswered => "ALREADY_ANSWERED",

            // Business Rules
            Self::PostLimitExceeded { .. } => "POST_LIMIT_EXCEEDED",
            Self::AccountBanned(_) => "ACCOUNT_BANNED",
            Self::NoFriendship => "NO_FRIENDSHIP",

            // Infrastructure
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::CacheError(_) => "CACHE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_)
                | Self::PostNotFound(_)
                | Self::PollQuestionNotFound(_)
                | Self::ConversationNotFound(_)
                | Self::PhotoNotFound(_)
        )
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_)
                | Self::InvalidEmail
                | Self::InvalidGender(_)
                | Self::PasswordLength { .. }
                | Self::NameTooLong { .. }
        )
    }

    /// Check if this is an authorization error.
    ///
    /// Guess game lookups answer 403 rather than 404, so their misses count here.
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            Self::NotPostOwner
                | Self::NotConversationParticipant
                | Self::NotGameParticipant
                | Self::UserBlocked
                | Self::AdminRequired
                | Self::GameNotFound(_)
                | Self::GuessQuestionNotFound(_)
                | Self::GuessChoiceNotFound(_)
                | Self::AlreadyAnswered
                | Self::PostLimitExceeded { .. }
                | Self::NoFriendship
        )
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::EmailAlreadyExists)
    }
}
