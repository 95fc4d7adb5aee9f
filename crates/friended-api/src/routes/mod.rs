//! Route definitions
//!
//! API routes are mounted at the root; health routes are kept apart so they skip
//! rate limiting.

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::handlers::{conversations, guess_game, health, posts, tokens, users};
use crate::state::AppState;

/// Create the API router with all routes except health
pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(token_routes())
        .merge(user_routes())
        .merge(post_routes())
        .merge(conversation_routes())
        .merge(guess_game_routes())
}

/// Health check routes (exported separately to bypass rate limiting)
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
}

fn token_routes() -> Router<AppState> {
    Router::new()
        .route("/tokens", delete(tokens::logout))
        .route("/tokens/login", post(tokens::login))
        .route("/tokens/refresh", post(tokens::refresh))
        .route("/tokens/external_auth", post(tokens::external_auth))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(users::register))
        .route(
            "/users/current",
            get(users::current_user).put(users::update_current_user),
        )
        .route("/users/current/friends", get(users::friends))
        .route("/users/current/photos", post(users::add_photo))
        .route("/users/:id", get(users::show_user))
        .route(
            "/users/:id/friends",
            post(users::add_friend).delete(users::remove_friend),
        )
        .route("/users/:id/user_blocks", post(users::block_user))
        .route("/mod/user_photos", post(users::moderate_photos))
}

fn post_routes() -> Router<AppState> {
    Router::new()
        .route("/poll_questions/:id/posts", post(posts::create_for_question))
        .route("/posts", get(posts::index).post(posts::create))
        .route("/posts/feed", get(posts::feed))
        .route(
            "/posts/:id",
            get(posts::show).put(posts::update).delete(posts::destroy),
        )
        .route("/posts/:id/flag", post(posts::flag))
        .route("/posts/:id/repost", post(posts::repost))
        .route("/posts/:id/boost", post(posts::boost))
        .route("/posts/:id/ratings", post(posts::rate))
        .route("/posts/:id/conversations", get(posts::conversations))
}

fn conversation_routes() -> Router<AppState> {
    Router::new()
        .route("/messages", post(conversations::send_message))
        .route("/conversations", get(conversations::list))
        .route("/conversations/:id", delete(conversations::hide))
        .route("/conversations/:id/messages", get(conversations::messages))
}

fn guess_game_routes() -> Router<AppState> {
    Router::new()
        .route("/guess_game", get(guess_game::index))
        .route("/guess_game/questions", get(guess_game::questions))
        .route("/guess_game/answer", post(guess_game::answer))
        .route("/guess_game/answers", get(guess_game::answers))
        .route("/guess_game/popular_guesses", get(guess_game::popular_guesses))
        .route("/guess_game/link", get(guess_game::link))
        .route("/guess_game/guess", get(guess_game::guess))
        .route("/guess_game/answer_anonymously", post(guess_game::answer_anonymously))
        .route("/guess_game/update_anonymous_name", post(guess_game::update_anonymous_name))
        .route("/guess_game/:id", get(guess_game::show))
}
