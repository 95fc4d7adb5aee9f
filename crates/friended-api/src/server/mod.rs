//! Server setup and initialization
//!
//! Provides the main application builder and server runner.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use friended_cache::{Publisher, RedisPool};
use friended_common::{AppConfig, AppError, JwtService};
use friended_core::SnowflakeGenerator;
use friended_db::{
    create_pool, run_migrations, DatabaseConfig, PgBlockRepository, PgConversationRepository,
    PgDeviceRepository, PgFriendshipRepository, PgGuessGameRepository, PgGuessQuestionRepository,
    PgLocationRepository, PgPhotoRepository, PgPollQuestionRepository, PgPostRepository,
    PgUserRepository, PgUserSettingsRepository,
};
use friended_service::{FacebookGraphClient, Notifier, ServiceContextBuilder, ServiceRules};
use tokio::net::TcpListener;
use tracing::info;

use crate::middleware::apply_middleware;
use crate::routes::{create_router, health_routes};
use crate::state::AppState;

/// Snowflake worker ids fit in 10 bits
const MAX_WORKER_ID: u16 = 1024;

/// Build the complete Axum application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let http = state.http();
    let api = apply_middleware(create_router(), &http.rate_limit, &http.cors, http.production);

    api.merge(health_routes()).with_state(state)
}

/// Initialize all dependencies and create AppState
pub async fn create_app_state(config: AppConfig) -> Result<AppState, AppError> {
    if config.snowflake.worker_id >= MAX_WORKER_ID {
        return Err(AppError::Config(format!(
            "SNOWFLAKE_WORKER_ID must be below {MAX_WORKER_ID}"
        )));
    }

    info!("Connecting to PostgreSQL...");
    let pool = create_pool(&DatabaseConfig::from(&config.database))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!("PostgreSQL connection established");

    if config.database.run_migrations {
        run_migrations(&pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
    }

    info!("Connecting to Redis...");
    let redis_pool = RedisPool::from_config(&config.redis).map_err(|e| AppError::Cache(e.to_string()))?;
    let notifier = Notifier::new(Arc::new(Publisher::new(redis_pool.clone())));
    info!("Redis connection established");

    let jwt_service = Arc::new(JwtService::new(&config.jwt.secret, config.jwt.access_token_expiry));
    let snowflake_generator = Arc::new(SnowflakeGenerator::new(config.snowflake.worker_id));
    let identity_provider = Arc::new(FacebookGraphClient::new(config.facebook.graph_url.clone()));

    let service_context = ServiceContextBuilder::new()
        .pool(pool.clone())
        .redis_pool(Arc::new(redis_pool))
        .user_repo(Arc::new(PgUserRepository::new(pool.clone())))
        .settings_repo(Arc::new(PgUserSettingsRepository::new(pool.clone())))
        .location_repo(Arc::new(PgLocationRepository::new(pool.clone())))
        .device_repo(Arc::new(PgDeviceRepository::new(pool.clone())))
        .photo_repo(Arc::new(PgPhotoRepository::new(pool.clone())))
        .friendship_repo(Arc::new(PgFriendshipRepository::new(pool.clone())))
        .block_repo(Arc::new(PgBlockRepository::new(pool.clone())))
        .poll_question_repo(Arc::new(PgPollQuestionRepository::new(pool.clone())))
        .post_repo(Arc::new(PgPostRepository::new(pool.clone())))
        .conversation_repo(Arc::new(PgConversationRepository::new(pool.clone())))
        .guess_game_repo(Arc::new(PgGuessGameRepository::new(pool.clone())))
        .guess_question_repo(Arc::new(PgGuessQuestionRepository::new(pool)))
        .notifier(notifier)
        .identity_provider(identity_provider)
        .jwt_service(jwt_service)
        .snowflake_generator(snowflake_generator)
        .rules(ServiceRules::from_config(&config))
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    Ok(AppState::new(service_context, &config))
}

/// Run the HTTP server until Ctrl+C
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Run the complete server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .api
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid API address {}: {e}", config.api.address())))?;

    let state = create_app_state(config).await?;
    run_server(create_app(state), addr).await
}
