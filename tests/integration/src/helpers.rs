//! Test helpers for integration tests
//!
//! Provides utilities for spawning test servers, making HTTP requests
//! and seeding rows the API has no endpoint for.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDate;
use friended_api::{create_app, create_app_state};
use friended_common::AppConfig;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Random 44-bit id for seeded rows, far below any generated snowflake
fn next_seed_id() -> i64 {
    (uuid::Uuid::new_v4().as_u64_pair().0 >> 20) as i64
}

/// Feed related columns of `user_settings`
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FeedSettingsRow {
    pub feed_filter_min: Option<NaiveDate>,
    pub feed_filter_max: Option<NaiveDate>,
    pub location_type: Option<String>,
}

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub pool: PgPool,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server
    pub async fn start() -> Result<Self> {
        let config = test_config()?;
        Self::start_with_config(config).await
    }

    /// Start a test server with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let state = create_app_state(config).await?;
        let pool = state.services().pool().clone();
        let app = create_app(state);

        // Port 0 lets the OS pick a free port
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            pool,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    fn authed(builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder.header("Authorization", format!("Bearer {token}"))
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        Ok(self.client.get(self.url(path)).send().await?)
    }

    /// Make a GET request with auth token
    pub async fn get_auth(&self, path: &str, token: &str) -> Result<Response> {
        Ok(Self::authed(self.client.get(self.url(path)), token).send().await?)
    }

    /// Make a POST request with JSON body
    pub async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<Response> {
        Ok(self.client.post(self.url(path)).json(body).send().await?)
    }

    /// Make a POST request with auth token
    pub async fn post_auth<T: Serialize>(&self, path: &str, token: &str, body: &T) -> Result<Response> {
        Ok(Self::authed(self.client.post(self.url(path)), token)
            .json(body)
            .send()
            .await?)
    }

    /// Make a PUT request with auth token
    pub async fn put_auth<T: Serialize>(&self, path: &str, token: &str, body: &T) -> Result<Response> {
        Ok(Self::authed(self.client.put(self.url(path)), token)
            .json(body)
            .send()
            .await?)
    }

    /// Make a DELETE request with auth token
    pub async fn delete_auth(&self, path: &str, token: &str) -> Result<Response> {
        Ok(Self::authed(self.client.delete(self.url(path)), token).send().await?)
    }

    /// Insert a poll question and return its id
    pub async fn seed_poll_question(&self, text: &str, intro_only: bool) -> Result<String> {
        let id = next_seed_id();
        sqlx::query("INSERT INTO poll_questions (id, text, intro_only) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(text)
            .bind(intro_only)
            .execute(&self.pool)
            .await?;
        Ok(id.to_string())
    }

    /// Insert a guess game question with its choices; returns (question id, choice ids)
    pub async fn seed_guess_question(&self, text: &str, my_text: &str, choices: &[&str]) -> Result<(String, Vec<String>)> {
        let question_id = next_seed_id();
        sqlx::query("INSERT INTO guess_game_questions (id, text, my_text) VALUES ($1, $2, $3)")
            .bind(question_id)
            .bind(text)
            .bind(my_text)
            .execute(&self.pool)
            .await?;

        let mut choice_ids = Vec::with_capacity(choices.len());
        for choice in choices {
            let choice_id = next_seed_id();
            sqlx::query("INSERT INTO guess_game_choices (id, question_id, text) VALUES ($1, $2, $3)")
                .bind(choice_id)
                .bind(question_id)
                .bind(*choice)
                .execute(&self.pool)
                .await?;
            choice_ids.push(choice_id.to_string());
        }

        Ok((question_id.to_string(), choice_ids))
    }

    /// Overwrite the author fields copied onto a post
    pub async fn set_post_author_fields(&self, post_id: &str, gender: &str, dob: Option<NaiveDate>) -> Result<()> {
        sqlx::query("UPDATE posts SET gender = $2, dob = $3 WHERE id = $1")
            .bind(post_id.parse::<i64>()?)
            .bind(gender)
            .bind(dob)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Feed band and location type stored for a user
    pub async fn feed_settings(&self, user_id: &str) -> Result<Option<FeedSettingsRow>> {
        let row = sqlx::query_as::<_, FeedSettingsRow>(
            "SELECT feed_filter_min, feed_filter_max, location_type FROM user_settings WHERE user_id = $1",
        )
        .bind(user_id.parse::<i64>()?)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Replace a user's stored feed band
    pub async fn set_feed_band(&self, user_id: &str, min: Option<NaiveDate>, max: Option<NaiveDate>) -> Result<()> {
        sqlx::query("UPDATE user_settings SET feed_filter_min = $2, feed_filter_max = $3 WHERE user_id = $1")
            .bind(user_id.parse::<i64>()?)
            .bind(min)
            .bind(max)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// `(time_filter, num_results)` of every feed result row for a user, oldest first
    pub async fn feed_results(&self, user_id: &str) -> Result<Vec<(String, i32)>> {
        let rows = sqlx::query_as::<_, (String, i32)>(
            "SELECT time_filter, num_results FROM posts_feed_results WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id.parse::<i64>()?)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Make a user an admin
    pub async fn make_admin(&self, user_id: &str) -> Result<()> {
        sqlx::query("UPDATE users SET admin = TRUE WHERE id = $1")
            .bind(user_id.parse::<i64>()?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Create a test configuration with migrations enabled and no rate limit
pub fn test_config() -> Result<AppConfig> {
    dotenvy::dotenv().ok();

    let mut config = AppConfig::from_env().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;
    config.database.run_migrations = true;
    config.rate_limit.requests_per_second = 0;

    Ok(config)
}

/// Helper to check if test environment is available
pub async fn check_test_env() -> bool {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("Skipping test: DATABASE_URL not set");
        return false;
    }

    if std::env::var("REDIS_URL").is_err() {
        eprintln!("Skipping test: REDIS_URL not set");
        return false;
    }

    if std::env::var("JWT_SECRET").is_err() {
        eprintln!("Skipping test: JWT_SECRET not set");
        return false;
    }

    true
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(response: Response, expected_status: StatusCode) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {}, got {}. Body: {}", expected_status, status, body);
    }
    Ok(response.json().await?)
}

/// Assert response status without parsing body
pub async fn assert_status(response: Response, expected_status: StatusCode) -> Result<()> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {}, got {}. Body: {}", expected_status, status, body);
    }
    Ok(())
}
