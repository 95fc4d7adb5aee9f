//! # friended-service
//!
//! Application layer containing business logic, services, and DTOs.
//!
//! Services borrow a [`ServiceContext`] and orchestrate repositories, the identity
//! provider and the push notifier. Work that should not delay a response, such as
//! grading guesses or telling friends about a new post, runs as background jobs.

pub mod dto;
pub mod services;

pub use services::{
    AuthService, BlockService, ConversationService, FacebookGraphClient, FeedService,
    FriendService, GuessGameService, IdentityError, IdentityProvider, Notifier,
    NotificationPublisher, PhotoService, PostService, ProviderProfile, ServiceContext,
    ServiceContextBuilder, ServiceError, ServiceResult, ServiceRules, UserService,
};
