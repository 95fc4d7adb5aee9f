//! Conversation service
//!
//! Conversations are created lazily by the first message between two users and
//! expire unless the users are friends.

use std::collections::HashSet;

use chrono::Utc;
use friended_core::traits::OutgoingMessage;
use friended_core::{Conversation, DomainError, FriendState, Notification, Snowflake, UserMessage};
use tracing::{info, instrument, warn};

use crate::dto::{
    ConversationMessagesResponse, ConversationResponse, MessageResponse, ResultResponse,
    ResultsResponse, SendMessageRequest,
};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::user::UserService;

/// Push text for a new message
pub fn message_push_text(sender_first_name: &str, text: &str) -> String {
    format!("{sender_first_name}: {text}")
}

/// Conversation service
pub struct ConversationService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ConversationService<'a> {
    /// Create a new ConversationService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Send a direct message, opening the conversation when needed
    #[instrument(skip(self, request), fields(recipient_id = %request.recipient_user_id))]
    pub async fn send(&self, viewer_id: Snowflake, request: SendMessageRequest) -> ServiceResult<MessageResponse> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(ServiceError::validation("text can't be blank"));
        }
        if request.recipient_user_id == viewer_id {
            return Err(ServiceError::validation("You cannot message yourself"));
        }

        let users = UserService::new(self.ctx);
        let sender = users.find(viewer_id).await?;
        let recipient = users.find(request.recipient_user_id).await?;

        if self
            .ctx
            .block_repo()
            .is_blocked_between(sender.id, recipient.id)
            .await?
        {
            warn!(user_id = %sender.id, recipient_id = %recipient.id, "Message to blocked user refused");
            return Err(DomainError::UserBlocked.into());
        }

        if let Some(post_id) = request.initiating_post_id {
            if self.ctx.post_repo().find_by_id(post_id).await?.is_none() {
                return Err(DomainError::PostNotFound(post_id).into());
            }
        }

        let rows = self.ctx.friendship_repo().find_between(sender.id, recipient.id).await?;
        let activate = FriendState::from_rows(&rows).is_friend();

        let mut message = UserMessage::new(self.ctx.generate_id(), sender.id, recipient.id, text.to_string());
        message.initiating_post_id = request.initiating_post_id;

        let delivered = self
            .ctx
            .conversation_repo()
            .send_message(&OutgoingMessage {
                message,
                new_conversation_id: self.ctx.generate_id(),
                activate,
            })
            .await?;

        self.ctx
            .post_repo()
            .touch_user_activity(sender.id, Utc::now())
            .await?;

        self.ctx
            .notifier()
            .notify(Notification::new_message(
                recipient.id,
                message_push_text(&sender.first_name, text),
                delivered.conversation.id,
            ))
            .await;

        info!(
            message_id = %delivered.message.id,
            conversation_id = %delivered.conversation.id,
            new_conversation = delivered.created,
            "Message sent"
        );

        Ok(MessageResponse::from(&delivered.message))
    }

    /// Visible conversations of the viewer, newest activity first
    #[instrument(skip(self))]
    pub async fn list(&self, viewer_id: Snowflake) -> ServiceResult<ResultsResponse<ConversationResponse>> {
        let conversations = self
            .ctx
            .conversation_repo()
            .list_for_user(viewer_id, Utc::now())
            .await?;

        let others: Vec<Snowflake> = conversations
            .iter()
            .map(|c| c.other_user(viewer_id))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let summaries = UserService::new(self.ctx).summaries(&others).await?;

        let results = conversations
            .iter()
            .map(|c| {
                let mut response = ConversationResponse::for_viewer(c, viewer_id);
                response.other_user = summaries.get(&c.other_user(viewer_id)).cloned();
                response
            })
            .collect();

        Ok(ResultsResponse::new(results))
    }

    async fn find_for_participant(&self, viewer_id: Snowflake, conversation_id: Snowflake) -> ServiceResult<Conversation> {
        let conversation = self
            .ctx
            .conversation_repo()
            .find_by_id(conversation_id)
            .await?
            .ok_or(DomainError::ConversationNotFound(conversation_id))?;
        if !conversation.is_participant(viewer_id) {
            return Err(DomainError::NotConversationParticipant.into());
        }
        Ok(conversation)
    }

    /// Messages of a conversation; marks the viewer's incoming messages as read
    #[instrument(skip(self))]
    pub async fn messages(
        &self,
        viewer_id: Snowflake,
        conversation_id: Snowflake,
    ) -> ServiceResult<ConversationMessagesResponse> {
        let conversation = self.find_for_participant(viewer_id, conversation_id).await?;
        let messages = self.ctx.conversation_repo().messages(conversation.id).await?;

        let mut response = ConversationResponse::for_viewer(&conversation, viewer_id);
        if conversation.unread_count_for(viewer_id) > 0 {
            self.ctx
                .conversation_repo()
                .mark_read(conversation.id, viewer_id)
                .await?;
            response.unread_count = 0;
        }

        let other = conversation.other_user(viewer_id);
        let summaries = UserService::new(self.ctx).summaries(&[other]).await?;
        response.other_user = summaries.get(&other).cloned();

        Ok(ConversationMessagesResponse {
            conversation: response,
            messages: messages
                .iter()
                .map(|m| {
                    let mut message = MessageResponse::from(m);
                    if m.recipient_user_id == viewer_id {
                        message.read_by_recipient = true;
                    }
                    message
                })
                .collect(),
        })
    }

    /// Hide the conversation from the viewer's list
    #[instrument(skip(self))]
    pub async fn hide(
        &self,
        viewer_id: Snowflake,
        conversation_id: Snowflake,
    ) -> ServiceResult<ResultResponse<&'static str>> {
        let mut conversation = self.find_for_participant(viewer_id, conversation_id).await?;
        if !conversation.is_hidden_for(viewer_id) {
            conversation.hide_for(viewer_id);
            conversation.updated_at = Utc::now();
            self.ctx.conversation_repo().update_visibility(&conversation).await?;
            info!(conversation_id = %conversation.id, user_id = %viewer_id, "Conversation hidden");
        }
        Ok(ResultResponse::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_push_text() {
        assert_eq!(message_push_text("Ana", "hey there"), "Ana: hey there");
    }
}
