//! Conversations between two users and the messages inside them

use chrono::{DateTime, Duration, Utc};

use crate::value_objects::Snowflake;

/// How long a conversation stays open without activity unless the pair are friends
pub const CONVERSATION_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: Snowflake,
    pub initiating_user_id: Snowflake,
    pub target_user_id: Snowflake,
    pub initiating_message_id: Option<Snowflake>,
    pub most_recent_message_id: Option<Snowflake>,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub hidden_by_initiating_user: bool,
    pub hidden_by_target_user: bool,
    pub unread_count_initiating_user: i32,
    pub unread_count_target_user: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: Snowflake, initiating_user_id: Snowflake, target_user_id: Snowflake) -> Self {
        let now = Utc::now();
        Self {
            id,
            initiating_user_id,
            target_user_id,
            initiating_message_id: None,
            most_recent_message_id: None,
            is_active: false,
            expires_at: Some(expiry_from(now)),
            hidden_by_initiating_user: false,
            hidden_by_target_user: false,
            unread_count_initiating_user: 0,
            unread_count_target_user: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn is_participant(&self, user_id: Snowflake) -> bool {
        self.initiating_user_id == user_id || self.target_user_id == user_id
    }

    /// The participant that is not `user_id`
    pub fn other_user(&self, user_id: Snowflake) -> Snowflake {
        if self.initiating_user_id == user_id {
            self.target_user_id
        } else {
            self.initiating_user_id
        }
    }

    pub fn unread_count_for(&self, user_id: Snowflake) -> i32 {
        if self.initiating_user_id == user_id {
            self.unread_count_initiating_user
        } else {
            self.unread_count_target_user
        }
    }

    pub fn is_hidden_for(&self, user_id: Snowflake) -> bool {
        if self.initiating_user_id == user_id {
            self.hidden_by_initiating_user
        } else {
            self.hidden_by_target_user
        }
    }

    pub fn hide_for(&mut self, user_id: Snowflake) {
        if self.initiating_user_id == user_id {
            self.hidden_by_initiating_user = true;
        } else if self.target_user_id == user_id {
            self.hidden_by_target_user = true;
        }
    }

    /// Active conversations never expire; others are open until `expires_at`
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.is_active || self.expires_at.is_some_and(|at| at > now)
    }
}

pub fn expiry_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::hours(CONVERSATION_TTL_HOURS)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage {
    pub id: Snowflake,
    pub user_id: Snowflake,
    pub recipient_user_id: Snowflake,
    pub conversation_id: Option<Snowflake>,
    /// Post this message replies to, when sent from the feed
    pub initiating_post_id: Option<Snowflake>,
    pub guess_game_id: Option<Snowflake>,
    pub text: String,
    pub read_by_recipient: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserMessage {
    pub fn new(id: Snowflake, user_id: Snowflake, recipient_user_id: Snowflake, text: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            recipient_user_id,
            conversation_id: None,
            initiating_post_id: None,
            guess_game_id: None,
            text,
            read_by_recipient: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A conversation together with the message that replied to a post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostReply {
    pub conversation: Conversation,
    pub reply: UserMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participants_and_other_user() {
        let a = Snowflake::new(1);
        let b = Snowflake::new(2);
        let conv = Conversation::new(Snowflake::new(9), a, b);
        assert!(conv.is_participant(a));
        assert!(!conv.is_participant(Snowflake::new(3)));
        assert_eq!(conv.other_user(a), b);
        assert_eq!(conv.other_user(b), a);
    }

    #[test]
    fn test_hide_for_each_side() {
        let a = Snowflake::new(1);
        let b = Snowflake::new(2);
        let mut conv = Conversation::new(Snowflake::new(9), a, b);
        conv.hide_for(b);
        assert!(conv.is_hidden_for(b));
        assert!(!conv.is_hidden_for(a));
        conv.hide_for(Snowflake::new(3));
        assert!(!conv.hidden_by_initiating_user);
    }

    #[test]
    fn test_is_open() {
        let now = Utc::now();
        let mut conv = Conversation::new(Snowflake::new(9), Snowflake::new(1), Snowflake::new(2));
        assert!(conv.is_open(now));
        conv.expires_at = Some(now - Duration::minutes(1));
        assert!(!conv.is_open(now));
        conv.is_active = true;
        assert!(conv.is_open(now));
    }
}
