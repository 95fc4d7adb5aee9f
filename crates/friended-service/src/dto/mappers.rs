//! Entity to DTO mappers
//!
//! Implements `From` conversions from domain entities to response DTOs, plus
//! constructors for responses that need more than one entity.

use friended_core::entities::{
    Conversation, GuessGame, GuessGameAnswer, GuessGameChoice, GuessGameQuestion, Location,
    PollQuestion, Post, User, UserMessage, UserPhoto, UserSettings,
};
use friended_core::guess::{is_scored, score};
use friended_core::Snowflake;

use super::responses::{
    AnswerResponse, ChoiceResponse, ConversationResponse, GameResponse, LocationResponse,
    MessageResponse, PhotoResponse, PollQuestionResponse, PostResponse, QuestionResponse,
    UserSettingsResponse, UserSummaryResponse,
};

// ============================================================================
// User Mappers
// ============================================================================

impl From<&UserPhoto> for PhotoResponse {
    fn from(photo: &UserPhoto) -> Self {
        Self {
            id: photo.id,
            user_id: photo.user_id,
            url: photo.url.clone(),
            order_index: photo.order_index,
            needs_moderation: photo.needs_moderation,
            moderated: photo.moderated,
            created_at: photo.created_at,
        }
    }
}

impl From<&Location> for LocationResponse {
    fn from(location: &Location) -> Self {
        Self {
            id: location.id,
            latitude: location.latitude,
            longitude: location.longitude,
        }
    }
}

impl From<&UserSettings> for UserSettingsResponse {
    fn from(settings: &UserSettings) -> Self {
        Self {
            purchased_posts_remaining: settings.purchased_posts_remaining(),
            next_post_allowed: settings.next_post_allowed,
            pro_subscription_expiration: settings.pro_subscription_expiration,
            subscription_state: settings.subscription_state.clone(),
            feed_filter_min: settings.feed_filter_min,
            feed_filter_max: settings.feed_filter_max,
            location_type: settings.location_type.clone(),
            client_version: settings.client_version.clone(),
        }
    }
}

impl UserSummaryResponse {
    /// `photo_url` is the user's visible primary photo, if any
    pub fn new(user: &User, photo_url: Option<&str>) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            gender: user.gender,
            dob: user.dob,
            external_image_url: photo_url
                .map(str::to_string)
                .or_else(|| user.external_image_url.clone()),
            last_active_at: user.last_active_at,
        }
    }
}

// ============================================================================
// Post Mappers
// ============================================================================

impl From<&PollQuestion> for PollQuestionResponse {
    fn from(question: &PollQuestion) -> Self {
        Self {
            id: question.id,
            text: question.text.clone(),
            post_display_format: question.post_display_format.clone(),
            intro_only: question.intro_only,
        }
    }
}

impl From<&Post> for PostResponse {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            user_id: post.user_id,
            poll_question_id: post.poll_question_id,
            response_text: post.response_text.clone(),
            image_url: post.external_image_url.clone(),
            mood: post.mood.clone(),
            background_color: post.background_color.clone(),
            flag_count: post.flag_count,
            deleted: post.deleted,
            needs_moderation: post.needs_moderation,
            moderated: post.moderated,
            rating_count: post.rating_count,
            user_last_active_at: post.user_last_active_at,
            created_at: post.created_at,
            updated_at: post.updated_at,
            poll_question: None,
            user: None,
            liked_by_current_user: None,
            page_view_count: None,
        }
    }
}

// ============================================================================
// Conversation Mappers
// ============================================================================

impl From<&UserMessage> for MessageResponse {
    fn from(message: &UserMessage) -> Self {
        Self {
            id: message.id,
            user_id: message.user_id,
            recipient_user_id: message.recipient_user_id,
            conversation_id: message.conversation_id,
            initiating_post_id: message.initiating_post_id,
            guess_game_id: message.guess_game_id,
            text: message.text.clone(),
            read_by_recipient: message.read_by_recipient,
            created_at: message.created_at,
            updated_at: message.updated_at,
        }
    }
}

impl ConversationResponse {
    /// Conversation with the viewer's unread count
    pub fn for_viewer(conversation: &Conversation, viewer: Snowflake) -> Self {
        Self {
            id: conversation.id,
            initiating_user_id: conversation.initiating_user_id,
            target_user_id: conversation.target_user_id,
            initiating_message_id: conversation.initiating_message_id,
            most_recent_message_id: conversation.most_recent_message_id,
            is_active: conversation.is_active,
            expires_at: conversation.expires_at,
            unread_count: conversation.unread_count_for(viewer),
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
            other_user: None,
            initiating_user: None,
            target_user: None,
            post_reply: None,
        }
    }
}

// ============================================================================
// Guess Game Mappers
// ============================================================================

impl ChoiceResponse {
    pub fn render(choice: &GuessGameChoice, about_self: bool) -> Self {
        Self {
            id: choice.id,
            question_id: choice.question_id,
            text: choice.text_for(about_self).to_string(),
        }
    }
}

impl QuestionResponse {
    /// Render for guessing about `name`, or with `my_text` when `name` is `None`.
    /// `choices` may hold choices of other questions; only this question's are kept.
    pub fn render(question: &GuessGameQuestion, name: Option<&str>, choices: &[GuessGameChoice]) -> Self {
        let about_self = name.is_none();
        Self {
            id: question.id,
            text: question.text_for(name),
            choices: choices
                .iter()
                .filter(|c| c.question_id == question.id)
                .map(|c| ChoiceResponse::render(c, about_self))
                .collect(),
        }
    }
}

impl AnswerResponse {
    pub fn new(answer: &GuessGameAnswer, choice_text: String, question: Option<QuestionResponse>) -> Self {
        Self {
            id: answer.id,
            by_user_id: answer.by_user_id,
            about_user_id: answer.about_user_id,
            question_id: answer.question_id,
            choice_id: answer.choice_id,
            game_id: answer.game_id,
            is_correct: answer.is_correct,
            created_at: answer.created_at,
            updated_at: answer.updated_at,
            text: choice_text,
            question,
        }
    }
}

impl GameResponse {
    pub fn new(game: &GuessGame, answers: &[GuessGameAnswer], total_guesses_needed: usize) -> Self {
        Self {
            id: game.id,
            by_user_id: game.by_user_id,
            about_user_id: game.about_user_id,
            created_at: game.created_at,
            updated_at: game.updated_at,
            is_guessing_done: game.have_all_answers,
            current_guesses: answers.len(),
            total_guesses_needed,
            score: is_scored(answers).then(|| score(answers)),
            by_user_photo_url: None,
            answers: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn choice(id: i64, question: i64) -> GuessGameChoice {
        GuessGameChoice {
            id: Snowflake::new(id),
            question_id: Snowflake::new(question),
            text: format!("choice {id}"),
            my_text: Some(format!("my choice {id}")),
            hidden: false,
        }
    }

    #[test]
    fn test_post_response_hides_author_fields() {
        let mut post = Post::new(Snowflake::new(1), Snowflake::new(2), Snowflake::new(3), "Rome");
        post.external_image_url = Some("https://img/1.jpg".to_string());
        let json = serde_json::to_value(PostResponse::from(&post)).unwrap();
        assert_eq!(json["image_url"], "https://img/1.jpg");
        assert!(json.get("dob").is_none());
        assert!(json.get("gender").is_none());
        assert!(json.get("location_id").is_none());
        assert!(json.get("external_image_url").is_none());
    }

    #[test]
    fn test_question_render_filters_choices() {
        let question = GuessGameQuestion {
            id: Snowflake::new(10),
            text: "Would %@ rather?".to_string(),
            my_text: "Would you rather?".to_string(),
            hidden: false,
        };
        let choices = vec![choice(1, 10), choice(2, 11)];

        let for_other = QuestionResponse::render(&question, Some("Sam"), &choices);
        assert_eq!(for_other.text, "Would Sam rather?");
        assert_eq!(for_other.choices.len(), 1);
        assert_eq!(for_other.choices[0].text, "choice 1");

        let for_me = QuestionResponse::render(&question, None, &choices);
        assert_eq!(for_me.text, "Would you rather?");
        assert_eq!(for_me.choices[0].text, "my choice 1");
    }

    #[test]
    fn test_game_response_score_only_when_scored() {
        let game = GuessGame::new(Snowflake::new(1), Snowflake::new(2), Snowflake::new(3));
        let c = choice(1, 10);
        let mut answer = GuessGameAnswer::new(Snowflake::new(4), Snowflake::new(2), Snowflake::new(3), &c);
        let json = serde_json::to_value(GameResponse::new(&game, &[answer.clone()], 5)).unwrap();
        assert!(json.get("score").is_none());
        assert!(json.get("user_message_id").is_none());
        assert_eq!(json["current_guesses"], 1);

        answer.is_correct = Some(true);
        let response = GameResponse::new(&game, &[answer], 5);
        assert_eq!(response.score, Some(1.0));
    }

    #[test]
    fn test_conversation_unread_for_viewer() {
        let mut conv = Conversation::new(Snowflake::new(1), Snowflake::new(2), Snowflake::new(3));
        conv.unread_count_target_user = 4;
        conv.updated_at = Utc::now();
        assert_eq!(ConversationResponse::for_viewer(&conv, Snowflake::new(3)).unread_count, 4);
        assert_eq!(ConversationResponse::for_viewer(&conv, Snowflake::new(2)).unread_count, 0);
    }
}
