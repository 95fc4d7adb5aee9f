//! # friended-common
//!
//! Shared utilities including configuration, error handling, authentication, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{
    digest_refresh_token, generate_password, hash_password, verify_password, AccessToken, Claims,
    JwtService, RefreshToken, TokenType,
};
pub use config::{
    AppConfig, AppSettings, BusinessRules, ConfigError, CorsConfig, DatabaseConfig, Environment,
    FacebookConfig, JwtConfig, PostingConfig, RateLimitConfig, RedisConfig, ServerConfig,
    SnowflakeConfig,
};
pub use error::{domain_status, AppError, AppResult, ErrorResponse};
pub use telemetry::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    TracingConfig, TracingError,
};
