//! Post handlers
//!
//! Poll question answers, the feed and the per-post actions.

use axum::{extract::State, Json};
use friended_service::dto::{
    ConversationResponse, CreatePostRequest, FeedParams, PostIndexParams, PostResponse,
    RatePostRequest, ResultResponse, ResultsResponse, UpdatePostRequest,
};
use friended_service::{FeedService, PostService};

use crate::extractors::{AuthUser, IdPath, QueryParams, ValidatedJson};
use crate::response::ApiResult;
use crate::state::AppState;

/// Answer the poll question named in the path
///
/// POST /poll_questions/:id/posts
pub async fn create_for_question(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(poll_question_id): IdPath,
    ValidatedJson(request): ValidatedJson<CreatePostRequest>,
) -> ApiResult<Json<PostResponse>> {
    let service = PostService::new(state.services());
    Ok(Json(service.create(auth.user_id, Some(poll_question_id), request).await?))
}

/// Answer the poll question named in the body
///
/// POST /posts
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<CreatePostRequest>,
) -> ApiResult<Json<PostResponse>> {
    let service = PostService::new(state.services());
    Ok(Json(service.create(auth.user_id, None, request).await?))
}

/// GET /posts
pub async fn index(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(params): QueryParams<PostIndexParams>,
) -> ApiResult<Json<ResultsResponse<PostResponse>>> {
    let service = PostService::new(state.services());
    Ok(Json(service.index(auth.user_id, params).await?))
}

/// GET /posts/feed
pub async fn feed(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(params): QueryParams<FeedParams>,
) -> ApiResult<Json<ResultsResponse<PostResponse>>> {
    let service = FeedService::new(state.services());
    Ok(Json(service.feed(auth.user_id, params).await?))
}

/// GET /posts/:id
pub async fn show(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(post_id): IdPath,
) -> ApiResult<Json<ResultResponse<PostResponse>>> {
    let service = PostService::new(state.services());
    Ok(Json(service.show(auth.user_id, post_id).await?))
}

/// PUT /posts/:id
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(post_id): IdPath,
    ValidatedJson(request): ValidatedJson<UpdatePostRequest>,
) -> ApiResult<Json<PostResponse>> {
    let service = PostService::new(state.services());
    Ok(Json(service.update(auth.user_id, post_id, request).await?))
}

/// DELETE /posts/:id
pub async fn destroy(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(post_id): IdPath,
) -> ApiResult<Json<ResultResponse<&'static str>>> {
    let service = PostService::new(state.services());
    Ok(Json(service.destroy(auth.user_id, post_id).await?))
}

/// POST /posts/:id/flag
pub async fn flag(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(post_id): IdPath,
) -> ApiResult<Json<PostResponse>> {
    let service = PostService::new(state.services());
    Ok(Json(service.flag(auth.user_id, post_id).await?))
}

/// POST /posts/:id/repost
pub async fn repost(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(post_id): IdPath,
) -> ApiResult<Json<PostResponse>> {
    let service = PostService::new(state.services());
    Ok(Json(service.repost(auth.user_id, post_id).await?))
}

/// POST /posts/:id/boost
pub async fn boost(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(post_id): IdPath,
) -> ApiResult<Json<PostResponse>> {
    let service = PostService::new(state.services());
    Ok(Json(service.boost(auth.user_id, post_id).await?))
}

/// POST /posts/:id/ratings
pub async fn rate(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(post_id): IdPath,
    ValidatedJson(request): ValidatedJson<RatePostRequest>,
) -> ApiResult<Json<PostResponse>> {
    let service = PostService::new(state.services());
    Ok(Json(service.rate(auth.user_id, post_id, request.value).await?))
}

/// Conversations started by replies to the post (owner only)
///
/// GET /posts/:id/conversations
pub async fn conversations(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(post_id): IdPath,
) -> ApiResult<Json<ResultsResponse<ConversationResponse>>> {
    let service = PostService::new(state.services());
    Ok(Json(service.conversations(auth.user_id, post_id).await?))
}
