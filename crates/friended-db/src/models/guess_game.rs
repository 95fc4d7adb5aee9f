//! Guess game database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct GuessGameQuestionModel {
    pub id: i64,
    pub text: String,
    pub my_text: String,
    pub hidden: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct GuessGameChoiceModel {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub my_text: Option<String>,
    pub hidden: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct GuessGameModel {
    pub id: i64,
    pub by_user_id: i64,
    pub about_user_id: i64,
    pub user_message_id: Option<i64>,
    pub have_all_answers: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct GuessGameAnswerModel {
    pub id: i64,
    pub by_user_id: i64,
    pub about_user_id: i64,
    pub question_id: i64,
    pub choice_id: i64,
    pub game_id: Option<i64>,
    pub is_correct: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct AnonGuessGameAnswerModel {
    pub id: i64,
    pub uuid: String,
    pub source: Option<String>,
    pub name: Option<String>,
    pub about_user_id: i64,
    pub question_id: i64,
    pub choice_id: i64,
    pub is_correct: Option<bool>,
    pub created_at: DateTime<Utc>,
}
