//! Third-party identity lookups used by external sign in

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, instrument};

/// Profile returned by an identity provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProviderProfile {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    /// `MM/DD/YYYY`, or partial when the user hides their birth year
    #[serde(default)]
    pub birthday: Option<String>,
}

impl ProviderProfile {
    pub fn birth_date(&self) -> Option<NaiveDate> {
        self.birthday
            .as_deref()
            .and_then(|b| NaiveDate::parse_from_str(b, "%m/%d/%Y").ok())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("identity provider rejected the token: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a Facebook access token to the profile it belongs to
    async fn facebook_profile(&self, access_token: &str) -> Result<ProviderProfile, IdentityError>;
}

/// Facebook Graph API client
#[derive(Debug, Clone)]
pub struct FacebookGraphClient {
    http: reqwest::Client,
    graph_url: String,
}

impl FacebookGraphClient {
    pub const PROFILE_FIELDS: &'static str = "id,first_name,last_name,email,gender,birthday";

    pub fn new(graph_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            graph_url: graph_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn profile_url(&self) -> String {
        format!("{}/me", self.graph_url)
    }
}

#[async_trait]
impl IdentityProvider for FacebookGraphClient {
    #[instrument(skip(self, access_token))]
    async fn facebook_profile(&self, access_token: &str) -> Result<ProviderProfile, IdentityError> {
        let response = self
            .http
            .get(self.profile_url())
            .query(&[("fields", Self::PROFILE_FIELDS), ("access_token", access_token)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Rejected(format!("{status}: {body}")));
        }

        let profile: ProviderProfile = response.json().await?;
        if profile.id.is_empty() {
            return Err(IdentityError::Rejected("profile without id".to_string()));
        }
        debug!(provider_id = %profile.id, "Facebook profile resolved");
        Ok(profile)
    }
}
