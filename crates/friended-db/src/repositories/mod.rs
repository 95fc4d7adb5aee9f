//! Repository implementations
//!
//! PostgreSQL implementations of the repository traits defined in friended-core.
//! The feed statement lives in `feed` and is shared by the post repository.

mod account;
mod conversation;
mod error;
mod feed;
mod guess_game;
mod post;
mod social;
mod user;

pub use account::{PgDeviceRepository, PgLocationRepository, PgUserSettingsRepository};
pub use conversation::PgConversationRepository;
pub use guess_game::{PgGuessGameRepository, PgGuessQuestionRepository};
pub use post::{PgPollQuestionRepository, PgPostRepository};
pub use social::{PgBlockRepository, PgFriendshipRepository, PgPhotoRepository};
pub use user::PgUserRepository;
