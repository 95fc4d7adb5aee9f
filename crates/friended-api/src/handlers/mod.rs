//! Route handlers
//!
//! All HTTP request handlers organized by domain.

pub mod conversations;
pub mod guess_game;
pub mod health;
pub mod posts;
pub mod tokens;
pub mod users;
