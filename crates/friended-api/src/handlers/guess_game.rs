//! Guess game handlers
//!
//! `guess`, `answer_anonymously` and `update_anonymous_name` back the public share
//! page and take no access token.

use axum::{extract::State, Json};
use friended_service::dto::{
    AboutUserParams, AnonymousNameResponse, AnswerAnonymouslyRequest, AnswerParams, AnswerRequest,
    AnswerResultResponse, AnswersResponse, GameEnvelope, GameIndexParams, GamesResponse,
    GuessPageResponse, GuessParams, PopularGuessesResponse, QuestionParams, QuestionsPage,
    RankingsResponse, ShareLinkResponse, UpdateAnonymousNameRequest,
};
use friended_service::GuessGameService;

use crate::extractors::{AuthUser, IdPath, QueryParams, ValidatedJson};
use crate::response::ApiResult;
use crate::state::AppState;

/// Games about the viewer
///
/// GET /guess_game
pub async fn index(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(params): QueryParams<GameIndexParams>,
) -> ApiResult<Json<GamesResponse>> {
    let service = GuessGameService::new(state.services());
    Ok(Json(service.index(auth.user_id, params).await?))
}

/// GET /guess_game/:id
pub async fn show(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(game_id): IdPath,
) -> ApiResult<Json<GameEnvelope>> {
    let service = GuessGameService::new(state.services());
    Ok(Json(service.show(auth.user_id, game_id).await?))
}

/// GET /guess_game/questions
pub async fn questions(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(params): QueryParams<QuestionParams>,
) -> ApiResult<Json<QuestionsPage>> {
    let service = GuessGameService::new(state.services());
    Ok(Json(service.questions(auth.user_id, params).await?))
}

/// POST /guess_game/answer
pub async fn answer(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<AnswerRequest>,
) -> ApiResult<Json<AnswerResultResponse>> {
    let service = GuessGameService::new(state.services());
    Ok(Json(service.answer(auth.user_id, request).await?))
}

/// GET /guess_game/answers
pub async fn answers(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(params): QueryParams<AnswerParams>,
) -> ApiResult<Json<AnswersResponse>> {
    let service = GuessGameService::new(state.services());
    Ok(Json(service.answers(auth.user_id, params).await?))
}

/// GET /guess_game/popular_guesses
pub async fn popular_guesses(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(params): QueryParams<AboutUserParams>,
) -> ApiResult<Json<PopularGuessesResponse>> {
    let service = GuessGameService::new(state.services());
    Ok(Json(service.popular_guesses(auth.user_id, params).await?))
}

/// GET /guess_game/link
pub async fn link(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<ShareLinkResponse>> {
    let service = GuessGameService::new(state.services());
    Ok(Json(service.link(auth.user_id).await?))
}

/// GET /guess_game/guess
pub async fn guess(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<GuessParams>,
) -> ApiResult<Json<GuessPageResponse>> {
    let service = GuessGameService::new(state.services());
    Ok(Json(service.guess(params).await?))
}

/// POST /guess_game/answer_anonymously
pub async fn answer_anonymously(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<AnswerAnonymouslyRequest>,
) -> ApiResult<Json<RankingsResponse>> {
    let service = GuessGameService::new(state.services());
    Ok(Json(service.answer_anonymously(request).await?))
}

/// POST /guess_game/update_anonymous_name
pub async fn update_anonymous_name(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<UpdateAnonymousNameRequest>,
) -> ApiResult<Json<AnonymousNameResponse>> {
    let service = GuessGameService::new(state.services());
    Ok(Json(service.update_anonymous_name(request).await?))
}
