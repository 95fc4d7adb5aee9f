//! Service context - dependency container for services
//!
//! Holds all repositories, the notifier, the identity provider and the tunables
//! needed by services. The context is cheap to clone so background jobs can own one.

use std::sync::Arc;

use friended_cache::SharedRedisPool;
use friended_common::auth::JwtService;
use friended_common::{AppConfig, PostingConfig};
use friended_core::traits::{
    BlockRepository, ConversationRepository, DeviceRepository, FriendshipRepository,
    GuessGameRepository, GuessQuestionRepository, LocationRepository, PhotoRepository,
    PollQuestionRepository, PostRepository, UserRepository, UserSettingsRepository,
};
use friended_core::{FeedRules, GuessRules, Snowflake, SnowflakeGenerator};
use friended_db::PgPool;

use super::error::{ServiceError, ServiceResult};
use super::identity::IdentityProvider;
use super::notifier::Notifier;

/// Business tunables resolved from configuration
#[derive(Debug, Clone)]
pub struct ServiceRules {
    pub feed: FeedRules,
    pub guess: GuessRules,
    pub posting: PostingConfig,
    /// Base URL used when building share links
    pub public_url: String,
}

impl ServiceRules {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            feed: config.rules.feed_rules(),
            guess: config.rules.guess_rules(),
            posting: config.rules.posting.clone(),
            public_url: config.api.public_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for ServiceRules {
    fn default() -> Self {
        Self {
            feed: FeedRules::default(),
            guess: GuessRules::default(),
            posting: PostingConfig::default(),
            public_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Service context containing all dependencies
///
/// This is the main dependency container that gets passed to all services.
/// It provides access to:
/// - Database repositories
/// - The push notifier
/// - The identity provider used by external sign in
/// - JWT service for authentication
/// - Snowflake generator for ID generation
#[derive(Clone)]
pub struct ServiceContext {
    // Database pool
    pool: PgPool,

    // Redis pool
    redis_pool: SharedRedisPool,

    // Repositories
    user_repo: Arc<dyn UserRepository>,
    settings_repo: Arc<dyn UserSettingsRepository>,
    location_repo: Arc<dyn LocationRepository>,
    device_repo: Arc<dyn DeviceRepository>,
    photo_repo: Arc<dyn PhotoRepository>,
    friendship_repo: Arc<dyn FriendshipRepository>,
    block_repo: Arc<dyn BlockRepository>,
    poll_question_repo: Arc<dyn PollQuestionRepository>,
    post_repo: Arc<dyn PostRepository>,
    conversation_repo: Arc<dyn ConversationRepository>,
    guess_game_repo: Arc<dyn GuessGameRepository>,
    guess_question_repo: Arc<dyn GuessQuestionRepository>,

    // Collaborators
    notifier: Notifier,
    identity_provider: Arc<dyn IdentityProvider>,

    // Services
    jwt_service: Arc<JwtService>,
    snowflake_generator: Arc<SnowflakeGenerator>,
    rules: Arc<ServiceRules>,
}

impl ServiceContext {
    // === Pools ===

    /// Get the PostgreSQL connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get the Redis connection pool
    pub fn redis_pool(&self) -> &SharedRedisPool {
        &self.redis_pool
    }

    // === Repositories ===

    pub fn user_repo(&self) -> &dyn UserRepository {
        self.user_repo.as_ref()
    }

    pub fn settings_repo(&self) -> &dyn UserSettingsRepository {
        self.settings_repo.as_ref()
    }

    pub fn location_repo(&self) -> &dyn LocationRepository {
        self.location_repo.as_ref()
    }

    pub fn device_repo(&self) -> &dyn DeviceRepository {
        self.device_repo.as_ref()
    }

    pub fn photo_repo(&self) -> &dyn PhotoRepository {
        self.photo_repo.as_ref()
    }

    pub fn friendship_repo(&self) -> &dyn FriendshipRepository {
        self.friendship_repo.as_ref()
    }

    pub fn block_repo(&self) -> &dyn BlockRepository {
        self.block_repo.as_ref()
    }

    pub fn poll_question_repo(&self) -> &dyn PollQuestionRepository {
        self.poll_question_repo.as_ref()
    }

    pub fn post_repo(&self) -> &dyn PostRepository {
        self.post_repo.as_ref()
    }

    pub fn conversation_repo(&self) -> &dyn ConversationRepository {
        self.conversation_repo.as_ref()
    }

    pub fn guess_game_repo(&self) -> &dyn GuessGameRepository {
        self.guess_game_repo.as_ref()
    }

    pub fn guess_question_repo(&self) -> &dyn GuessQuestionRepository {
        self.guess_question_repo.as_ref()
    }

    // === Collaborators ===

    /// Get the push notifier
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn identity_provider(&self) -> &dyn IdentityProvider {
        self.identity_provider.as_ref()
    }

    // === Services ===

    /// Get the JWT service
    pub fn jwt_service(&self) -> &JwtService {
        self.jwt_service.as_ref()
    }

    /// Generate a new Snowflake ID
    pub fn generate_id(&self) -> Snowflake {
        self.snowflake_generator.generate()
    }

    pub fn rules(&self) -> &ServiceRules {
        &self.rules
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("pool", &"PgPool")
            .field("redis_pool", &"SharedRedisPool")
            .field("repositories", &"...")
            .field("rules", &self.rules)
            .finish()
    }
}

/// Builder for creating ServiceContext with custom configuration
#[derive(Default)]
pub struct ServiceContextBuilder {
    pool: Option<PgPool>,
    redis_pool: Option<SharedRedisPool>,
    user_repo: Option<Arc<dyn UserRepository>>,
    settings_repo: Option<Arc<dyn UserSettingsRepository>>,
    location_repo: Option<Arc<dyn LocationRepository>>,
    device_repo: Option<Arc<dyn DeviceRepository>>,
    photo_repo: Option<Arc<dyn PhotoRepository>>,
    friendship_repo: Option<Arc<dyn FriendshipRepository>>,
    block_repo: Option<Arc<dyn BlockRepository>>,
    poll_question_repo: Option<Arc<dyn PollQuestionRepository>>,
    post_repo: Option<Arc<dyn PostRepository>>,
    conversation_repo: Option<Arc<dyn ConversationRepository>>,
    guess_game_repo: Option<Arc<dyn GuessGameRepository>>,
    guess_question_repo: Option<Arc<dyn GuessQuestionRepository>>,
    notifier: Option<Notifier>,
    identity_provider: Option<Arc<dyn IdentityProvider>>,
    jwt_service: Option<Arc<JwtService>>,
    snowflake_generator: Option<Arc<SnowflakeGenerator>>,
    rules: Option<ServiceRules>,
}

fn required<T>(value: Option<T>, name: &'static str) -> ServiceResult<T> {
    value.ok_or(ServiceError::MissingDependency(name))
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn redis_pool(mut self, redis_pool: SharedRedisPool) -> Self {
        self.redis_pool = Some(redis_pool);
        self
    }

    pub fn user_repo(mut self, repo: Arc<dyn UserRepository>) -> Self {
        self.user_repo = Some(repo);
        self
    }

    pub fn settings_repo(mut self, repo: Arc<dyn UserSettingsRepository>) -> Self {
        self.settings_repo = Some(repo);
        self
    }

    pub fn location_repo(mut self, repo: Arc<dyn LocationRepository>) -> Self {
        self.location_repo = Some(repo);
        self
    }

    pub fn device_repo(mut self, repo: Arc<dyn DeviceRepository>) -> Self {
        self.device_repo = Some(repo);
        self
    }

    pub fn photo_repo(mut self, repo: Arc<dyn PhotoRepository>) -> Self {
        self.photo_repo = Some(repo);
        self
    }

    pub fn friendship_repo(mut self, repo: Arc<dyn FriendshipRepository>) -> Self {
        self.friendship_repo = Some(repo);
        self
    }

    pub fn block_repo(mut self, repo: Arc<dyn BlockRepository>) -> Self {
        self.block_repo = Some(repo);
        self
    }

    pub fn poll_question_repo(mut self, repo: Arc<dyn PollQuestionRepository>) -> Self {
        self.poll_question_repo = Some(repo);
        self
    }

    pub fn post_repo(mut self, repo: Arc<dyn PostRepository>) -> Self {
        self.post_repo = Some(repo);
        self
    }

    pub fn conversation_repo(mut self, repo: Arc<dyn ConversationRepository>) -> Self {
        self.conversation_repo = Some(repo);
        self
    }

    pub fn guess_game_repo(mut self, repo: Arc<dyn GuessGameRepository>) -> Self {
        self.guess_game_repo = Some(repo);
        self
    }

    pub fn guess_question_repo(mut self, repo: Arc<dyn GuessQuestionRepository>) -> Self {
        self.guess_question_repo = Some(repo);
        self
    }

    pub fn notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.identity_provider = Some(provider);
        self
    }

    pub fn jwt_service(mut self, service: Arc<JwtService>) -> Self {
        self.jwt_service = Some(service);
        self
    }

    pub fn snowflake_generator(mut self, generator: Arc<SnowflakeGenerator>) -> Self {
        self.snowflake_generator = Some(generator);
        self
    }

    pub fn rules(mut self, rules: ServiceRules) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::MissingDependency` naming the first dependency not set.
    /// Rules fall back to their defaults.
    pub fn build(self) -> ServiceResult<ServiceContext> {
        Ok(ServiceContext {
            pool: required(self.pool, "pool")?,
            redis_pool: required(self.redis_pool, "redis_pool")?,
            user_repo: required(self.user_repo, "user_repo")?,
            settings_repo: required(self.settings_repo, "settings_repo")?,
            location_repo: required(self.location_repo, "location_repo")?,
            device_repo: required(self.device_repo, "device_repo")?,
            photo_repo: required(self.photo_repo, "photo_repo")?,
            friendship_repo: required(self.friendship_repo, "friendship_repo")?,
            block_repo: required(self.block_repo, "block_repo")?,
            poll_question_repo: required(self.poll_question_repo, "poll_question_repo")?,
            post_repo: required(self.post_repo, "post_repo")?,
            conversation_repo: required(self.conversation_repo, "conversation_repo")?,
            guess_game_repo: required(self.guess_game_repo, "guess_game_repo")?,
            guess_question_repo: required(self.guess_question_repo, "guess_question_repo")?,
            notifier: required(self.notifier, "notifier")?,
            identity_provider: required(self.identity_provider, "identity_provider")?,
            jwt_service: required(self.jwt_service, "jwt_service")?,
            snowflake_generator: required(self.snowflake_generator, "snowflake_generator")?,
            rules: Arc::new(self.rules.unwrap_or_default()),
        })
    }
}
