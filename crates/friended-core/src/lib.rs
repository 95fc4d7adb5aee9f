//! # friended-core
//!
//! Domain layer for the Friended backend: entities, value objects, feed and guess game
//! rules, notification events, and the repository traits the database crate implements.
//! This crate has no dependency on infrastructure (database, web framework, cache).

pub mod entities;
pub mod error;
pub mod events;
pub mod feed;
pub mod guess;
pub mod traits;
pub mod validation;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    AnonGuessGameAnswer, Conversation, Device, FriendState, Friendship, FriendshipStatus,
    GuessGame, GuessGameAnswer, GuessGameChoice, GuessGameQuestion, Location, PollQuestion, Post,
    PostReply, PostsFeedResult, User, UserMessage, UserPhoto, UserSettings,
};
pub use error::DomainError;
pub use events::{Notification, NotificationKind};
pub use feed::{AgeRange, FeedQuery, FeedRules, FeedStage, DEFAULT_AGE_RANGES};
pub use guess::GuessRules;
pub use traits::{
    BlockRepository, ConversationRepository, DeviceRepository, FriendshipRepository,
    GuessGameRepository, GuessQuestionRepository, LocationRepository, PhotoRepository,
    PollQuestionRepository, PostRepository, RepoResult, UserRepository, UserSettingsRepository,
};
pub use value_objects::{ClientVersion, Gender, Snowflake, SnowflakeGenerator, SnowflakeParseError};
