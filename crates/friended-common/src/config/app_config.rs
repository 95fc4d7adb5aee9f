//! Application configuration structs
//!
//! Infrastructure settings come from environment variables (a `.env` file is honoured).
//! Business rules for the feed, posting and the guess game are layered from an optional
//! config file plus `FRIENDED__`-prefixed environment variables.

use friended_core::{AgeRange, FeedRules, GuessRules, DEFAULT_AGE_RANGES};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub api: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub snowflake: SnowflakeConfig,
    pub facebook: FacebookConfig,
    pub rules: BusinessRules,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// Base URL used when building links such as the guess game share link
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default)]
    pub run_migrations: bool,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    /// Seconds
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64,
}

/// Rate limiting configuration. Zero disables the limiter.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    #[serde(default = "default_burst")]
    pub burst: u32,
}

impl RateLimitConfig {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.requests_per_second > 0 && self.burst > 0
    }
}

/// CORS configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Snowflake ID generator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SnowflakeConfig {
    #[serde(default)]
    pub worker_id: u16,
}

/// Facebook Graph API settings
#[derive(Debug, Clone, Deserialize)]
pub struct FacebookConfig {
    #[serde(default = "default_graph_url")]
    pub graph_url: String,
}

/// Tunable business rules
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusinessRules {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub posting: PostingConfig,
    #[serde(default)]
    pub guess_game: GuessGameConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub flag_threshold: i32,
    pub posts_feed_timebox_hours: i64,
    pub posts_feed_recent_window_minutes: i64,
    pub last_active_window_minutes: i64,
    pub active_users_limit: i64,
    pub post_feed_age_banding: bool,
    pub location_distance_miles: f64,
    /// `[[min, max], ...]`
    pub age_ranges: Vec<[u32; 2]>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        let rules = FeedRules::default();
        Self {
            flag_threshold: rules.flag_threshold,
            posts_feed_timebox_hours: rules.timebox_hours,
            posts_feed_recent_window_minutes: rules.recent_window_minutes,
            last_active_window_minutes: rules.last_active_window_minutes,
            active_users_limit: rules.active_users_limit,
            post_feed_age_banding: rules.age_banding,
            location_distance_miles: rules.location_distance_miles,
            age_ranges: DEFAULT_AGE_RANGES.iter().map(|r| [r.min, r.max]).collect(),
        }
    }
}

impl From<&FeedConfig> for FeedRules {
    fn from(c: &FeedConfig) -> Self {
        Self {
            flag_threshold: c.flag_threshold,
            timebox_hours: c.posts_feed_timebox_hours,
            recent_window_minutes: c.posts_feed_recent_window_minutes,
            last_active_window_minutes: c.last_active_window_minutes,
            active_users_limit: c.active_users_limit,
            age_banding: c.post_feed_age_banding,
            age_ranges: c.age_ranges.iter().map(|[min, max]| AgeRange::new(*min, *max)).collect(),
            location_distance_miles: c.location_distance_miles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PostingConfig {
    /// Seconds between posts for regular users
    pub allowed_post_interval_secs: i64,
    /// Seconds between posts for pro subscribers
    pub premium_post_interval_secs: i64,
    /// Boosted posts come back to the top after this many minutes
    pub boost_interval_minutes: i64,
    /// Free pro days granted to a referrer
    pub referral_pro_days: i64,
    pub minimum_age: u32,
}

impl Default for PostingConfig {
    fn default() -> Self {
        Self {
            allowed_post_interval_secs: 14_400,
            premium_post_interval_secs: 3_600,
            boost_interval_minutes: 20,
            referral_pro_days: 30,
            minimum_age: 18,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GuessGameConfig {
    pub max_game_questions: usize,
    pub anon_max_guesses: usize,
    pub min_self_answers_to_share: usize,
    pub min_client_version: String,
    pub score_job_delay_ms: u64,
    pub anonymous_friend_threshold: f64,
}

impl Default for GuessGameConfig {
    fn default() -> Self {
        let rules = GuessRules::default();
        Self {
            max_game_questions: rules.max_game_questions,
            anon_max_guesses: rules.anon_max_guesses,
            min_self_answers_to_share: rules.min_self_answers_to_share,
            min_client_version: rules.min_client_version,
            score_job_delay_ms: rules.score_job_delay_ms,
            anonymous_friend_threshold: rules.anonymous_friend_threshold,
        }
    }
}

impl From<&GuessGameConfig> for GuessRules {
    fn from(c: &GuessGameConfig) -> Self {
        Self {
            max_game_questions: c.max_game_questions,
            anon_max_guesses: c.anon_max_guesses,
            min_self_answers_to_share: c.min_self_answers_to_share,
            min_client_version: c.min_client_version.clone(),
            score_job_delay_ms: c.score_job_delay_ms,
            anonymous_friend_threshold: c.anonymous_friend_threshold,
        }
    }
}

impl BusinessRules {
    /// Layer `path` (any format the `config` crate understands, optional) under
    /// `FRIENDED__SECTION__KEY` environment overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("FRIENDED")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| ConfigError::Rules(e.to_string()))
    }

    #[must_use]
    pub fn feed_rules(&self) -> FeedRules {
        FeedRules::from(&self.feed)
    }

    #[must_use]
    pub fn guess_rules(&self) -> GuessRules {
        GuessRules::from(&self.guess_game)
    }
}

// Default value functions
fn default_app_name() -> String {
    "friended".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_public_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_access_token_expiry() -> i64 {
    86_400 // 1 day
}

fn default_requests_per_second() -> u32 {
    10
}

fn default_burst() -> u32 {
    50
}

fn default_graph_url() -> String {
    "https://graph.facebook.com/v3.2".to_string()
}

fn default_rules_file() -> String {
    "config/friended".to_string()
}

fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        Err(_) => Ok(None),
    }
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let port = parse_var("API_PORT")?.ok_or(ConfigError::MissingVar("API_PORT"))?;
        let rules_file = env::var("FRIENDED_CONFIG").unwrap_or_else(|_| default_rules_file());

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env::var("APP_ENV")
                    .ok()
                    .and_then(|s| Environment::parse(&s))
                    .unwrap_or_default(),
            },
            api: ServerConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| default_host()),
                port,
                public_url: env::var("PUBLIC_URL").unwrap_or_else(|_| default_public_url()),
            },
            database: DatabaseConfig {
                url: require_var("DATABASE_URL")?,
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS")?
                    .unwrap_or_else(default_max_connections),
                min_connections: parse_var("DATABASE_MIN_CONNECTIONS")?
                    .unwrap_or_else(default_min_connections),
                run_migrations: parse_var("DATABASE_RUN_MIGRATIONS")?.unwrap_or(false),
            },
            redis: RedisConfig {
                url: require_var("REDIS_URL")?,
                max_connections: parse_var("REDIS_MAX_CONNECTIONS")?
                    .unwrap_or_else(default_redis_max_connections),
            },
            jwt: JwtConfig {
                secret: require_var("JWT_SECRET")?,
                access_token_expiry: parse_var("JWT_ACCESS_TOKEN_EXPIRY")?
                    .unwrap_or_else(default_access_token_expiry),
            },
            rate_limit: RateLimitConfig {
                requests_per_second: parse_var("RATE_LIMIT_REQUESTS_PER_SECOND")?
                    .unwrap_or_else(default_requests_per_second),
                burst: parse_var("RATE_LIMIT_BURST")?.unwrap_or_else(default_burst),
            },
            cors: CorsConfig {
                allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                    .ok()
                    .map(|s| {
                        s.split(',')
                            .map(str::trim)
                            .filter(|o| !o.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            snowflake: SnowflakeConfig {
                worker_id: parse_var("WORKER_ID")?.unwrap_or(0),
            },
            facebook: FacebookConfig {
                graph_url: env::var("FACEBOOK_GRAPH_URL").unwrap_or_else(|_| default_graph_url()),
            },
            rules: BusinessRules::load(&rules_file)?,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),

    #[error("Invalid business rules: {0}")]
    Rules(String),
}
