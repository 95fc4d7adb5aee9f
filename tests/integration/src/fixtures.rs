//! Test fixtures and data generators
//!
//! Provides reusable request bodies and a signed-up user for integration tests.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::helpers::{assert_json, TestServer};

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Email sign up request
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

impl RegisterRequest {
    pub fn unique(first_name: &str) -> Self {
        let suffix = unique_suffix();
        Self {
            email: format!("{}{suffix}.{}@example.com", first_name.to_lowercase(), std::process::id()),
            password: "TestPass123!".to_string(),
            first_name: first_name.to_string(),
            last_name: "Tester".to_string(),
            gender: None,
        }
    }

    pub fn with_gender(mut self, gender: &str) -> Self {
        self.gender = Some(gender.to_string());
        self
    }
}

/// Login request
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn from_register(reg: &RegisterRequest) -> Self {
        Self {
            email: reg.email.clone(),
            password: reg.password.clone(),
        }
    }
}

/// Login and sign up response
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub user: UserSummary,
    pub expires_on: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// The fields tests read back from user JSON
#[derive(Debug, Clone, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub first_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A signed-up user with a valid access token
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: String,
    pub first_name: String,
    pub token: String,
    pub refresh_token: String,
    pub registration: RegisterRequest,
}

impl TestUser {
    /// Sign up a fresh user through the API
    pub async fn register(server: &TestServer, first_name: &str) -> Result<Self> {
        Self::register_with(server, RegisterRequest::unique(first_name)).await
    }

    pub async fn register_with(server: &TestServer, registration: RegisterRequest) -> Result<Self> {
        let response = server.post("/users", &registration).await?;
        let auth: AuthResponse = assert_json(response, StatusCode::CREATED).await?;
        Ok(Self {
            id: auth.user.id,
            first_name: auth.user.first_name,
            token: auth.access_token,
            refresh_token: auth.refresh_token,
            registration,
        })
    }
}

/// Body for creating a post
pub fn post_body(response_text: &str) -> Value {
    json!({ "post": { "response_text": response_text } })
}

/// Body for creating a post past the posting interval
pub fn post_body_ignoring_limit(response_text: &str) -> Value {
    json!({ "post": { "response_text": response_text }, "ignore-limit": true })
}

/// Body for sending a direct message
pub fn message_body(recipient_user_id: &str, text: &str) -> Value {
    json!({ "recipient_user_id": recipient_user_id, "text": text })
}

/// Body for a guess game answer
pub fn answer_body(about_user_id: &str, choice_id: &str) -> Value {
    json!({ "about_user_id": about_user_id, "guess_game_choice_id": choice_id })
}
