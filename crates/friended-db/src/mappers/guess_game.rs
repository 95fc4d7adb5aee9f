//! Guess game <-> model mappers

use friended_core::entities::{
    AnonGuessGameAnswer, GuessGame, GuessGameAnswer, GuessGameChoice, GuessGameQuestion,
};
use friended_core::value_objects::Snowflake;

use crate::models::{
    AnonGuessGameAnswerModel, GuessGameAnswerModel, GuessGameChoiceModel, GuessGameModel,
    GuessGameQuestionModel,
};

impl From<GuessGameQuestionModel> for GuessGameQuestion {
    fn from(model: GuessGameQuestionModel) -> Self {
        GuessGameQuestion {
            id: Snowflake::new(model.id),
            text: model.text,
            my_text: model.my_text,
            hidden: model.hidden,
        }
    }
}

impl From<GuessGameChoiceModel> for GuessGameChoice {
    fn from(model: GuessGameChoiceModel) -> Self {
        GuessGameChoice {
            id: Snowflake::new(model.id),
            question_id: Snowflake::new(model.question_id),
            text: model.text,
            my_text: model.my_text,
            hidden: model.hidden,
        }
    }
}

impl From<GuessGameModel> for GuessGame {
    fn from(model: GuessGameModel) -> Self {
        GuessGame {
            id: Snowflake::new(model.id),
            by_user_id: Snowflake::new(model.by_user_id),
            about_user_id: Snowflake::new(model.about_user_id),
            user_message_id: model.user_message_id.map(Snowflake::new),
            have_all_answers: model.have_all_answers,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<GuessGameAnswerModel> for GuessGameAnswer {
    fn from(model: GuessGameAnswerModel) -> Self {
        GuessGameAnswer {
            id: Snowflake::new(model.id),
            by_user_id: Snowflake::new(model.by_user_id),
            about_user_id: Snowflake::new(model.about_user_id),
            question_id: Snowflake::new(model.question_id),
            choice_id: Snowflake::new(model.choice_id),
            game_id: model.game_id.map(Snowflake::new),
            is_correct: model.is_correct,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<AnonGuessGameAnswerModel> for AnonGuessGameAnswer {
    fn from(model: AnonGuessGameAnswerModel) -> Self {
        AnonGuessGameAnswer {
            id: Snowflake::new(model.id),
            uuid: model.uuid,
            source: model.source,
            name: model.name,
            about_user_id: Snowflake::new(model.about_user_id),
            question_id: Snowflake::new(model.question_id),
            choice_id: Snowflake::new(model.choice_id),
            is_correct: model.is_correct,
            created_at: model.created_at,
        }
    }
}
