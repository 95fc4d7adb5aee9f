//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, BusinessRules, ConfigError, CorsConfig, DatabaseConfig, Environment,
    FacebookConfig, FeedConfig, GuessGameConfig, JwtConfig, PostingConfig, RateLimitConfig,
    RedisConfig, ServerConfig, SnowflakeConfig,
};
