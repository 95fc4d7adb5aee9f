//! Guess game rules: completion, scoring and notification text

mod rankings;
mod scoring;

pub use rankings::{popular_guesses, rank_anonymous, AnonRanking, PopularGuess};
pub use scoring::{
    guessing_done_message, has_all_answers, is_scored, score, score_percent, scored_message,
    GameMessage, UNSUPPORTED_CLIENT_MESSAGE,
};

/// Tunables for the guess game
#[derive(Debug, Clone, PartialEq)]
pub struct GuessRules {
    /// Guesses needed before a game is complete
    pub max_game_questions: usize,
    /// Questions offered through the public share link
    pub anon_max_guesses: usize,
    /// Self answers required before the share link is offered
    pub min_self_answers_to_share: usize,
    /// Clients older than this cannot display game results
    pub min_client_version: String,
    pub score_job_delay_ms: u64,
    /// Anonymous guessers at or above this score count as friends
    pub anonymous_friend_threshold: f64,
}

impl Default for GuessRules {
    fn default() -> Self {
        Self {
            max_game_questions: 5,
            anon_max_guesses: 10,
            min_self_answers_to_share: 5,
            min_client_version: "2.5.0".to_string(),
            score_job_delay_ms: 1000,
            anonymous_friend_threshold: 0.5,
        }
    }
}
