//! Token handlers
//!
//! Email login, refresh token rotation, Facebook/Snapchat sign in and logout.

use axum::{extract::State, Json};
use friended_service::dto::{
    ExternalAuthRequest, ExternalAuthResponse, LoginRequest, LoginResponse, RefreshResponse,
    RefreshTokenRequest, ResultResponse,
};
use friended_service::AuthService;

use crate::extractors::{AuthUser, ValidatedJson};
use crate::response::ApiResult;
use crate::state::AppState;

/// Login with email and password
///
/// POST /tokens/login
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let service = AuthService::new(state.services());
    Ok(Json(service.login(request).await?))
}

/// Exchange a refresh token for a new token pair
///
/// POST /tokens/refresh
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RefreshTokenRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let service = AuthService::new(state.services());
    Ok(Json(service.refresh(request).await?))
}

/// Sign in with a third-party provider
///
/// POST /tokens/external_auth
pub async fn external_auth(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ExternalAuthRequest>,
) -> ApiResult<Json<ExternalAuthResponse>> {
    let service = AuthService::new(state.services());
    Ok(Json(service.external_auth(request).await?))
}

/// Forget the stored refresh token
///
/// DELETE /tokens
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ResultResponse<&'static str>>> {
    let service = AuthService::new(state.services());
    Ok(Json(service.logout(auth.user_id).await?))
}
