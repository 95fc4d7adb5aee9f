//! Message and conversation handlers

use axum::{extract::State, Json};
use friended_service::dto::{
    ConversationMessagesResponse, ConversationResponse, MessageResponse, ResultResponse,
    ResultsResponse, SendMessageRequest,
};
use friended_service::ConversationService;

use crate::extractors::{AuthUser, IdPath, ValidatedJson};
use crate::response::{ApiResult, Created};
use crate::state::AppState;

/// POST /messages
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<SendMessageRequest>,
) -> ApiResult<Created<Json<MessageResponse>>> {
    let service = ConversationService::new(state.services());
    Ok(Created(Json(service.send(auth.user_id, request).await?)))
}

/// GET /conversations
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ResultsResponse<ConversationResponse>>> {
    let service = ConversationService::new(state.services());
    Ok(Json(service.list(auth.user_id).await?))
}

/// GET /conversations/:id/messages
pub async fn messages(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(conversation_id): IdPath,
) -> ApiResult<Json<ConversationMessagesResponse>> {
    let service = ConversationService::new(state.services());
    Ok(Json(service.messages(auth.user_id, conversation_id).await?))
}

/// DELETE /conversations/:id
pub async fn hide(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(conversation_id): IdPath,
) -> ApiResult<Json<ResultResponse<&'static str>>> {
    let service = ConversationService::new(state.services());
    Ok(Json(service.hide(auth.user_id, conversation_id).await?))
}
