//! Conversation and message <-> model mappers

use friended_core::entities::{Conversation, UserMessage};
use friended_core::value_objects::Snowflake;

use crate::models::{ConversationModel, UserMessageModel};

impl From<ConversationModel> for Conversation {
    fn from(model: ConversationModel) -> Self {
        Conversation {
            id: Snowflake::new(model.id),
            initiating_user_id: Snowflake::new(model.initiating_user_id),
            target_user_id: Snowflake::new(model.target_user_id),
            initiating_message_id: model.initiating_message_id.map(Snowflake::new),
            most_recent_message_id: model.most_recent_message_id.map(Snowflake::new),
            is_active: model.is_active,
            expires_at: model.expires_at,
            hidden_by_initiating_user: model.hidden_by_initiating_user,
            hidden_by_target_user: model.hidden_by_target_user,
            unread_count_initiating_user: model.unread_count_initiating_user,
            unread_count_target_user: model.unread_count_target_user,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<UserMessageModel> for UserMessage {
    fn from(model: UserMessageModel) -> Self {
        UserMessage {
            id: Snowflake::new(model.id),
            user_id: Snowflake::new(model.user_id),
            recipient_user_id: Snowflake::new(model.recipient_user_id),
            conversation_id: model.conversation_id.map(Snowflake::new),
            initiating_post_id: model.initiating_post_id.map(Snowflake::new),
            guess_game_id: model.guess_game_id.map(Snowflake::new),
            text: model.text,
            read_by_recipient: model.read_by_recipient,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
