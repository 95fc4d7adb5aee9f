//! Database models - SQLx-compatible structs for PostgreSQL tables

mod conversation;
mod guess_game;
mod post;
mod social;
mod user;

pub use conversation::{ConversationModel, UserMessageModel};
pub use guess_game::{
    AnonGuessGameAnswerModel, GuessGameAnswerModel, GuessGameChoiceModel, GuessGameModel,
    GuessGameQuestionModel,
};
pub use post::{PollQuestionModel, PostModel};
pub use social::{FriendshipModel, UserPhotoModel};
pub use user::{DeviceModel, LocationModel, UserModel, UserSettingsModel};
