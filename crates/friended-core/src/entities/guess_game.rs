//! Guess game records
//!
//! A user answers personality questions about themselves (self answers, no game) and
//! guesses other users' answers. Guesses by one user about another are grouped into a
//! [`GuessGame`] until `max_game_questions` answers exist, after which the game is
//! complete and scored once the other user has answered every guessed question.

use chrono::{DateTime, Utc};

use crate::entities::post::PLACEHOLDER;
use crate::value_objects::Snowflake;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessGameQuestion {
    pub id: Snowflake,
    /// Question asked about someone else, `%@` is their first name
    pub text: String,
    /// Question asked about yourself
    pub my_text: String,
    pub hidden: bool,
}

impl GuessGameQuestion {
    /// Question text for the viewer: about `name` when given, otherwise about yourself
    pub fn text_for(&self, name: Option<&str>) -> String {
        match name {
            Some(name) => self.text.replace(PLACEHOLDER, name),
            None => self.my_text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessGameChoice {
    pub id: Snowflake,
    pub question_id: Snowflake,
    pub text: String,
    pub my_text: Option<String>,
    pub hidden: bool,
}

impl GuessGameChoice {
    /// `my_text` is the first-person wording shown when answering about yourself
    pub fn text_for(&self, about_self: bool) -> &str {
        match (&self.my_text, about_self) {
            (Some(mine), true) if !mine.is_empty() => mine,
            _ => &self.text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessGame {
    pub id: Snowflake,
    pub by_user_id: Snowflake,
    pub about_user_id: Snowflake,
    pub user_message_id: Option<Snowflake>,
    pub have_all_answers: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GuessGame {
    pub fn new(id: Snowflake, by_user_id: Snowflake, about_user_id: Snowflake) -> Self {
        let now = Utc::now();
        Self {
            id,
            by_user_id,
            about_user_id,
            user_message_id: None,
            have_all_answers: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn is_participant(&self, user_id: Snowflake) -> bool {
        self.by_user_id == user_id || self.about_user_id == user_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessGameAnswer {
    pub id: Snowflake,
    pub by_user_id: Snowflake,
    pub about_user_id: Snowflake,
    pub question_id: Snowflake,
    pub choice_id: Snowflake,
    /// `None` for self answers
    pub game_id: Option<Snowflake>,
    /// Unknown until the about user answers the question themselves
    pub is_correct: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GuessGameAnswer {
    pub fn new(
        id: Snowflake,
        by_user_id: Snowflake,
        about_user_id: Snowflake,
        choice: &GuessGameChoice,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            by_user_id,
            about_user_id,
            question_id: choice.question_id,
            choice_id: choice.id,
            game_id: None,
            is_correct: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn is_self_answer(&self) -> bool {
        self.by_user_id == self.about_user_id
    }

    /// Compare against the about user's own answer to the same question
    pub fn grade_against(&mut self, self_answer: Option<&GuessGameAnswer>) {
        self.is_correct = self_answer.map(|own| own.choice_id == self.choice_id);
    }
}

/// Guess left through the public share link by someone without an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonGuessGameAnswer {
    pub id: Snowflake,
    pub uuid: String,
    pub source: Option<String>,
    pub name: Option<String>,
    pub about_user_id: Snowflake,
    pub question_id: Snowflake,
    pub choice_id: Snowflake,
    pub is_correct: Option<bool>,
    pub created_at: DateTime<Utc>,
}
