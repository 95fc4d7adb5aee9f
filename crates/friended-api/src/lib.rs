//! # friended-api
//!
//! REST API server built with Axum framework.
//!
//! Routes are mounted at the root, matching the paths the mobile clients call
//! (`/tokens`, `/users`, `/posts`, `/conversations`, `/guess_game`).

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use server::{create_app, create_app_state, run};
pub use state::AppState;
