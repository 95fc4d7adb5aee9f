//! Business logic services
//!
//! This module contains all service layer implementations that handle
//! business logic, validation, and orchestration of domain operations.

pub mod auth;
pub mod block;
pub mod context;
pub mod conversation;
pub mod error;
pub mod feed;
pub mod friend;
pub mod guess_game;
pub mod identity;
pub mod jobs;
pub mod notifier;
pub mod photo;
pub mod post;
pub mod user;

// Re-export all services for convenience
pub use auth::AuthService;
pub use block::BlockService;
pub use context::{ServiceContext, ServiceContextBuilder, ServiceRules};
pub use conversation::ConversationService;
pub use error::{ServiceError, ServiceResult};
pub use feed::FeedService;
pub use friend::FriendService;
pub use guess_game::GuessGameService;
pub use identity::{FacebookGraphClient, IdentityError, IdentityProvider, ProviderProfile};
pub use notifier::{NotificationPublisher, Notifier};
pub use photo::PhotoService;
pub use post::PostService;
pub use user::UserService;
