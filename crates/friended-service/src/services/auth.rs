//! Authentication service
//!
//! Email sign up and login, Facebook and Snapchat sign in, refresh token rotation and
//! logout. Access tokens are JWTs; refresh tokens are opaque and stored as digests.

use chrono::Utc;
use friended_common::auth::{
    digest_refresh_token, generate_password, hash_password, verify_password, AccessToken,
    RefreshToken,
};
use friended_common::AppError;
use friended_core::entities::{User, BLACKLISTED_DEVICE_REASON};
use friended_core::validation::{check_email, check_gender, check_name, check_password};
use friended_core::{Device, DomainError, Gender, Snowflake};
use tracing::{info, instrument, warn};

use crate::dto::{
    ExternalAuthRequest, ExternalAuthResponse, ExternalAuthUser, LoginRequest, LoginResponse,
    ReferralResponse, RefreshResponse, RefreshTokenRequest, RegisterRequest, ResultResponse,
    UserSettingsResponse,
};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::identity::ProviderProfile;
use super::user::UserService;

pub const FACEBOOK: &str = "facebook";
pub const SNAPCHAT: &str = "snapchat";

/// Message shown when a device already belongs to another account
fn duplicate_account_message(provider: Option<&str>) -> String {
    format!(
        "You seem to already have an account registered using {}. Try logging in with that \
         before contacting support@friendedmail.com.",
        provider.unwrap_or("email")
    )
}

fn facebook_picture_url(facebook_id: &str) -> String {
    format!("https://graph.facebook.com/{facebook_id}/picture?width=400")
}

/// Authentication service
pub struct AuthService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AuthService<'a> {
    /// Create a new AuthService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Register a new user with email and password
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<LoginResponse> {
        let email = request.email.trim().to_lowercase();
        check_email(&email)?;
        check_password(&request.password)?;

        let first_name = request.first_name.unwrap_or_default().trim().to_string();
        let last_name = request.last_name.unwrap_or_default().trim().to_string();
        check_name("first_name", &first_name)?;
        check_name("last_name", &last_name)?;

        let gender = match request.gender.as_deref() {
            Some(g) => check_gender(g)?,
            None => Gender::Unknown,
        };

        if self.ctx.user_repo().email_exists(&email).await? {
            return Err(DomainError::EmailAlreadyExists.into());
        }

        let mut user = User::new(self.ctx.generate_id(), first_name);
        user.last_name = last_name;
        user.email = Some(email);
        user.gender = gender;
        user.dob = request.dob;
        let banned = user.apply_age_restriction(
            Utc::now().date_naive(),
            self.ctx.rules().posting.minimum_age,
        );

        let password_hash = hash_password(&request.password)?;
        self.ctx.user_repo().create(&user, &password_hash).await?;

        if banned {
            warn!(user_id = %user.id, "Registration with underage date of birth");
            return Err(DomainError::AccountBanned(user.ban_reason.unwrap_or_default()).into());
        }

        info!(user_id = %user.id, "User registered successfully");

        self.login_response(&user).await
    }

    /// Login with email and password
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> ServiceResult<LoginResponse> {
        let email = request.email.trim().to_lowercase();
        let user = self
            .ctx
            .user_repo()
            .find_by_email(&email)
            .await?
            .ok_or_else(|| {
                warn!("Login failed: user not found");
                ServiceError::App(AppError::InvalidCredentials)
            })?;

        let password_hash = self
            .ctx
            .user_repo()
            .get_password_hash(user.id)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %user.id, "Login failed: no password hash");
                ServiceError::App(AppError::InvalidCredentials)
            })?;

        if !verify_password(&request.password, &password_hash)? {
            warn!(user_id = %user.id, "Login failed: invalid password");
            return Err(ServiceError::App(AppError::InvalidCredentials));
        }

        if let Some(reason) = user.ban_reason.clone().filter(|r| !r.is_empty()) {
            warn!(user_id = %user.id, "Login refused: account banned");
            return Err(DomainError::AccountBanned(reason).into());
        }

        info!(user_id = %user.id, "User logged in successfully");

        self.login_response(&user).await
    }

    /// Exchange a refresh token for a new access token, rotating the refresh token
    #[instrument(skip(self, request))]
    pub async fn refresh(&self, request: RefreshTokenRequest) -> ServiceResult<RefreshResponse> {
        let digest = digest_refresh_token(request.refresh_token.trim());
        let user = self
            .ctx
            .user_repo()
            .find_by_refresh_token(&digest)
            .await?
            .ok_or_else(|| {
                warn!("Refresh failed: unknown token");
                ServiceError::App(AppError::InvalidRefreshToken)
            })?;

        if let Some(reason) = user.ban_reason.clone().filter(|r| !r.is_empty()) {
            return Err(DomainError::AccountBanned(reason).into());
        }

        let (access, refresh_token) = self.issue_tokens(&user).await?;
        info!(user_id = %user.id, "Tokens refreshed");

        Ok(RefreshResponse {
            expires_on: access.expires_on,
            access_token: access.token,
            refresh_token,
        })
    }

    /// Forget the stored refresh token
    #[instrument(skip(self))]
    pub async fn logout(&self, user_id: Snowflake) -> ServiceResult<ResultResponse<&'static str>> {
        self.ctx.user_repo().set_refresh_token(user_id, None).await?;
        info!(user_id = %user_id, "User logged out");
        Ok(ResultResponse::success())
    }

    /// Sign in through Facebook or Snapchat, creating the account on first use
    #[instrument(skip(self, request), fields(provider = %request.token.provider))]
    pub async fn external_auth(&self, request: ExternalAuthRequest) -> ServiceResult<ExternalAuthResponse> {
        let provider = request.token.provider.trim().to_lowercase();

        let mut device = match request.device_id.as_deref().filter(|d| !d.is_empty()) {
            Some(uuid) => Some(self.find_or_create_device(uuid).await?),
            None => None,
        };
        let referring_device = match request.referring_device_id.as_deref().filter(|d| !d.is_empty()) {
            Some(uuid) => self.ctx.device_repo().find_by_uuid(uuid).await?,
            None => None,
        };

        let (mut user, is_new) = match provider.as_str() {
            FACEBOOK => {
                let token = request.token.access_token.as_deref().unwrap_or_default();
                let profile = self
                    .ctx
                    .identity_provider()
                    .facebook_profile(token)
                    .await
                    .map_err(|e| {
                        warn!(error = %e, "Facebook profile lookup failed");
                        ServiceError::App(AppError::AuthFailed("Facebook API access failed.".to_string()))
                    })?;
                match self.ctx.user_repo().find_by_provider(FACEBOOK, &profile.id).await? {
                    Some(user) => (user, false),
                    None => (self.user_from_facebook(&profile), true),
                }
            }
            SNAPCHAT => {
                let provider_id = request
                    .token
                    .provider_id
                    .as_deref()
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| ServiceError::App(AppError::BadRequest("provider_id is required".to_string())))?;
                match self.ctx.user_repo().find_by_provider(SNAPCHAT, provider_id).await? {
                    Some(user) => (user, false),
                    None => {
                        let mut user = User::new(self.ctx.generate_id(), "");
                        user.provider = Some(SNAPCHAT.to_string());
                        user.provider_id = Some(provider_id.to_string());
                        user.estimated_dob = true;
                        (user, true)
                    }
                }
            }
            other => {
                warn!(provider = other, "Unknown auth provider");
                return Err(ServiceError::App(AppError::BadRequest(format!(
                    "Unknown provider: {other}"
                ))));
            }
        };

        self.save_user_and_device(&mut user, is_new, device.as_mut()).await?;

        let referral = match (&device, &referring_device) {
            (Some(device), Some(referring)) if device.id != referring.id => {
                self.apply_referral(&user, device, referring).await?
            }
            _ => None,
        };

        if let Some(reason) = user.ban_reason.clone().filter(|r| !r.is_empty()) {
            warn!(user_id = %user.id, "External sign in refused: account banned");
            return Err(ServiceError::App(AppError::AuthFailed(reason)));
        }

        let (access, refresh_token) = self.issue_tokens(&user).await?;

        let mut rendered = UserService::new(self.ctx).render(&user, &user).await?;
        rendered.seconds_until_post_allowed = Some(0);
        let post_count = self.ctx.post_repo().count_by_user(user.id).await?;
        let settings = self.ctx.settings_repo().find_or_default(user.id).await?;

        info!(user_id = %user.id, provider = %provider, is_new, "External sign in");

        Ok(ExternalAuthResponse {
            id: self.ctx.generate_id(),
            expires_on: access.expires_on,
            refresh_by: None,
            user_id: user.id,
            provider,
            access_token: access.token,
            refresh_token,
            user: ExternalAuthUser {
                user: rendered,
                post_count,
                referral,
                user_settings: UserSettingsResponse::from(&settings),
                is_new,
            },
        })
    }

    fn user_from_facebook(&self, profile: &ProviderProfile) -> User {
        let mut user = User::new(
            self.ctx.generate_id(),
            profile.first_name.clone().unwrap_or_default(),
        );
        user.last_name = profile.last_name.clone().unwrap_or_default();
        user.email = profile.email.clone().map(|e| e.to_lowercase());
        user.gender = Gender::coerce(profile.gender.as_deref());
        user.dob = profile.birth_date();
        user.estimated_dob = false;
        user.provider = Some(FACEBOOK.to_string());
        user.provider_id = Some(profile.id.clone());
        user.external_image_url = Some(facebook_picture_url(&profile.id));
        user
    }

    async fn find_or_create_device(&self, uuid: &str) -> ServiceResult<Device> {
        if let Some(device) = self.ctx.device_repo().find_by_uuid(uuid).await? {
            return Ok(device);
        }
        let device = Device {
            id: self.ctx.generate_id(),
            uuid: uuid.to_string(),
            user_id: None,
            is_blacklisted: false,
        };
        self.ctx.device_repo().create(&device).await?;
        Ok(device)
    }

    /// Persist the user and tie the device to it.
    ///
    /// A blacklisted device hides the account, and a device may carry only one account.
    async fn save_user_and_device(
        &self,
        user: &mut User,
        is_new: bool,
        device: Option<&mut Device>,
    ) -> ServiceResult<()> {
        let now = Utc::now();

        if let Some(device) = device.as_deref() {
            user.uuid = Some(device.uuid.clone());
            if device.is_blacklisted {
                user.hidden_reason = Some(BLACKLISTED_DEVICE_REASON.to_string());
            }
            if is_new {
                if let Some(other) = self
                    .ctx
                    .user_repo()
                    .other_account_on_device(&device.uuid, user.id)
                    .await?
                {
                    warn!(device_id = %device.id, other_user_id = %other.id, "Device already has an account");
                    return Err(ServiceError::App(AppError::AuthFailed(
                        duplicate_account_message(other.provider.as_deref()),
                    )));
                }
            }
        }

        user.apply_age_restriction(now.date_naive(), self.ctx.rules().posting.minimum_age);
        user.last_active_at = Some(now);
        user.updated_at = now;

        if is_new {
            let password_hash = hash_password(&generate_password())?;
            self.ctx.user_repo().create(user, &password_hash).await?;
            info!(user_id = %user.id, "User created from external provider");
        } else {
            self.ctx.user_repo().update(user).await?;
        }

        if let Some(device) = device {
            device.user_id = Some(user.id);
            device.is_blacklisted = user.is_hidden();
            self.ctx.device_repo().update(device).await?;
        }

        Ok(())
    }

    async fn apply_referral(
        &self,
        user: &User,
        device: &Device,
        referring: &Device,
    ) -> ServiceResult<Option<ReferralResponse>> {
        if !self.ctx.device_repo().create_referral(device.id, referring.id).await? {
            return Ok(None);
        }

        let mut settings = self.ctx.settings_repo().find_or_default(user.id).await?;
        settings.grant_free_pro(Utc::now(), self.ctx.rules().posting.referral_pro_days);
        self.ctx.settings_repo().save(&settings).await?;

        info!(user_id = %user.id, referring_device_id = %referring.id, "Referral applied");

        Ok(Some(ReferralResponse {
            device_id: device.uuid.clone(),
            referring_device_id: referring.uuid.clone(),
        }))
    }

    /// Mint an access token and a fresh refresh token, storing the refresh digest
    async fn issue_tokens(&self, user: &User) -> ServiceResult<(AccessToken, String)> {
        let refresh = RefreshToken::generate();
        self.ctx
            .user_repo()
            .set_refresh_token(user.id, Some(&refresh.digest))
            .await?;
        let access = self.ctx.jwt_service().issue(user.id)?;
        self.ctx.user_repo().touch_last_active(user.id, Utc::now()).await?;
        Ok((access, refresh.token))
    }

    async fn login_response(&self, user: &User) -> ServiceResult<LoginResponse> {
        let (access, refresh_token) = self.issue_tokens(user).await?;
        let rendered = UserService::new(self.ctx).render(user, user).await?;
        Ok(LoginResponse {
            user: rendered,
            expires_on: access.expires_on,
            access_token: access.token,
            refresh_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_account_message_names_provider() {
        let message = duplicate_account_message(Some("facebook"));
        assert!(message.starts_with("You seem to already have an account registered using facebook."));
        assert!(duplicate_account_message(None).contains("registered using email."));
    }

    #[test]
    fn test_facebook_picture_url() {
        assert_eq!(
            facebook_picture_url("123"),
            "https://graph.facebook.com/123/picture?width=400"
        );
    }
}
