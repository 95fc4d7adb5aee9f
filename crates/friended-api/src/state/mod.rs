//! Handler state
//!
//! Handlers reach every Friended service through the shared [`ServiceContext`]. The
//! router layers only need a slice of [`AppConfig`], kept here as [`HttpSettings`].

use std::sync::Arc;
use std::time::Duration;

use friended_common::{AppConfig, CorsConfig, JwtService, RateLimitConfig};
use friended_service::ServiceContext;

/// Config read by the middleware stack when the router is built
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub production: bool,
}

impl From<&AppConfig> for HttpSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            rate_limit: config.rate_limit.clone(),
            cors: config.cors.clone(),
            production: config.app.env.is_production(),
        }
    }
}

/// Reachability of Postgres and Redis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreHealth {
    pub database: bool,
    pub redis: bool,
}

impl StoreHealth {
    pub fn all_up(&self) -> bool {
        self.database && self.redis
    }
}

#[derive(Clone)]
pub struct AppState {
    services: Arc<ServiceContext>,
    http: Arc<HttpSettings>,
}

impl AppState {
    pub fn new(services: ServiceContext, config: &AppConfig) -> Self {
        Self {
            services: Arc::new(services),
            http: Arc::new(HttpSettings::from(config)),
        }
    }

    pub fn services(&self) -> &ServiceContext {
        &self.services
    }

    pub fn http(&self) -> &HttpSettings {
        &self.http
    }

    /// Verifies bearer tokens for [`crate::extractors::AuthUser`]
    pub fn jwt(&self) -> &JwtService {
        self.services.jwt_service()
    }

    /// Check out a Postgres connection and ping Redis, each within `timeout`
    pub async fn check_stores(&self, timeout: Duration) -> StoreHealth {
        let database = tokio::time::timeout(timeout, self.services.pool().acquire())
            .await
            .is_ok_and(|conn| conn.is_ok());
        let redis = tokio::time::timeout(timeout, self.services.redis_pool().ping())
            .await
            .is_ok_and(|pong| pong.is_ok());
        StoreHealth { database, redis }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("production", &self.http.production)
            .field("rate_limited", &self.http.rate_limit.is_enabled())
            .finish_non_exhaustive()
    }
}
