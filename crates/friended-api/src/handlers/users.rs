//! User handlers
//!
//! Sign up, profiles, friendships, blocks and photos.

use axum::{extract::State, Json};
use friended_service::dto::{
    AddPhotoRequest, LoginResponse, ModeratePhotosRequest, PhotoResponse, RegisterRequest,
    ResultResponse, ResultsResponse, UpdateUserRequest, UserResponse,
};
use friended_service::{AuthService, BlockService, FriendService, PhotoService, UserService};

use crate::extractors::{AuthUser, IdPath, ValidatedJson};
use crate::response::{ApiResult, Created};
use crate::state::AppState;

/// Sign up with email and password
///
/// POST /users
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> ApiResult<Created<Json<LoginResponse>>> {
    let service = AuthService::new(state.services());
    Ok(Created(Json(service.register(request).await?)))
}

/// GET /users/current
pub async fn current_user(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<UserResponse>> {
    let service = UserService::new(state.services());
    Ok(Json(service.current_user(auth.user_id).await?))
}

/// PUT /users/current
pub async fn update_current_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    let service = UserService::new(state.services());
    Ok(Json(service.update_current(auth.user_id, request).await?))
}

/// GET /users/:id
pub async fn show_user(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(user_id): IdPath,
) -> ApiResult<Json<UserResponse>> {
    let service = UserService::new(state.services());
    Ok(Json(service.show(auth.user_id, user_id).await?))
}

/// GET /users/current/friends
pub async fn friends(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ResultsResponse<UserResponse>>> {
    let service = FriendService::new(state.services());
    Ok(Json(service.list(auth.user_id).await?))
}

/// Send or accept a friend request
///
/// POST /users/:id/friends
pub async fn add_friend(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(user_id): IdPath,
) -> ApiResult<Json<UserResponse>> {
    let service = FriendService::new(state.services());
    Ok(Json(service.request(auth.user_id, user_id).await?))
}

/// Unfriend, or cancel a pending request
///
/// DELETE /users/:id/friends
pub async fn remove_friend(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(user_id): IdPath,
) -> ApiResult<Json<ResultResponse<&'static str>>> {
    let service = FriendService::new(state.services());
    Ok(Json(service.remove(auth.user_id, user_id).await?))
}

/// POST /users/:id/user_blocks
pub async fn block_user(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(user_id): IdPath,
) -> ApiResult<Json<ResultResponse<&'static str>>> {
    let service = BlockService::new(state.services());
    Ok(Json(service.block(auth.user_id, user_id).await?))
}

/// POST /users/current/photos
pub async fn add_photo(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<AddPhotoRequest>,
) -> ApiResult<Json<PhotoResponse>> {
    let service = PhotoService::new(state.services());
    Ok(Json(service.add(auth.user_id, request).await?))
}

/// Approve and reject photos (admin only)
///
/// POST /mod/user_photos
pub async fn moderate_photos(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<ModeratePhotosRequest>,
) -> ApiResult<Json<ResultResponse<&'static str>>> {
    let service = PhotoService::new(state.services());
    Ok(Json(service.moderate(auth.user_id, request).await?))
}
