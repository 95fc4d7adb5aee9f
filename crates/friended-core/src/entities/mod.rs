//! Domain entities

mod conversation;
mod guess_game;
mod photo;
mod post;
mod user;

pub use conversation::{expiry_from, Conversation, PostReply, UserMessage, CONVERSATION_TTL_HOURS};
pub use guess_game::{
    AnonGuessGameAnswer, GuessGame, GuessGameAnswer, GuessGameChoice, GuessGameQuestion,
};
pub use photo::{my_primary_photo, primary_photo, UserPhoto};
pub use post::{
    find_filtered_term, full_text, suspension_reason, PollQuestion, Post, PostsFeedResult, Rating,
    DEFAULT_MOOD, PLACEHOLDER,
};
pub use user::{
    years_before, Device, FriendState, Friendship, FriendshipStatus, Location, User, UserSettings,
    BLACKLISTED_DEVICE_REASON, UNDERAGE_REASON,
};
