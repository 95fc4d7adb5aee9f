//! Data transfer objects for API requests and responses
//!
//! This module provides:
//! - Request DTOs with validation for API inputs
//! - Response DTOs for serializing API outputs
//! - Mappers for converting domain entities to DTOs

pub mod mappers;
pub mod requests;
pub mod responses;

pub use requests::{
    AboutUserParams, AddPhotoRequest, AnswerAnonymouslyRequest, AnswerParams, AnswerRequest,
    CreatePostRequest, ExternalAuthRequest, ExternalToken, FeedParams, GameIndexParams,
    GuessParams, LoginRequest, ModeratePhotosRequest, PostChanges, PostFields, PostIndexParams,
    QuestionParams, RatePostRequest, RefreshTokenRequest, RegisterRequest, SendMessageRequest,
    UpdateAnonymousNameRequest, UpdatePostRequest, UpdateUserRequest,
};

pub use responses::{
    AnonymousNameResponse, AnswerResponse, AnswerResultResponse, AnswersResponse, ChoiceResponse,
    ConversationMessagesResponse, ConversationResponse, ExternalAuthResponse, ExternalAuthUser,
    GameEnvelope, GameResponse, GamesResponse, GuessPageResponse, GuesserResponse, HealthChecks,
    HealthResponse, LocationResponse, LoginResponse, MessageResponse, PhotoResponse,
    PollQuestionResponse, PopularGuessResponse, PopularGuessesResponse, PostResponse,
    QuestionResponse, QuestionsPage, QuestionsResponse, RankingsResponse, ReadinessResponse,
    ReferralResponse, RefreshResponse, ResultResponse, ResultsResponse, ShareLinkResponse,
    SingleQuestionResponse, UserResponse, UserSettingsResponse, UserSummaryResponse,
};
