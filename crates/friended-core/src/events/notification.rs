//! Push notifications produced by domain operations
//!
//! Delivery to devices happens outside this system; services hand notifications to a
//! publisher which forwards them to the push worker.

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    UserPost,
    FriendRequest,
    FriendRequestAccepted,
    NewMessage,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserPost => "user_post",
            Self::FriendRequest => "friend_request",
            Self::FriendRequestAccepted => "friend_request_accepted",
            Self::NewMessage => "new_message",
        }
    }
}

/// Screen the app opens when the notification is tapped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRoute {
    pub link: String,
    #[serde(rename = "objectId")]
    pub object_id: Snowflake,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient_id: Snowflake,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<NotificationRoute>,
}

impl Notification {
    /// A user the recipient follows or befriended just posted
    pub fn friend_posted(
        recipient_id: Snowflake,
        request_pending: bool,
        poster_first_name: &str,
        full_text: &str,
        post_id: Snowflake,
    ) -> Self {
        let title = if request_pending {
            "Someone you're interested in just posted"
        } else {
            "A friend of yours just posted"
        };
        Self {
            recipient_id,
            kind: NotificationKind::UserPost,
            title: Some(title.to_string()),
            body: format!("{poster_first_name}: {full_text}"),
            route: Some(NotificationRoute {
                link: "post".to_string(),
                object_id: post_id,
            }),
        }
    }

    pub fn friend_request(recipient_id: Snowflake, from_first_name: &str, from_id: Snowflake) -> Self {
        Self {
            recipient_id,
            kind: NotificationKind::FriendRequest,
            title: None,
            body: format!("{from_first_name} sent you a friend request!"),
            route: Some(NotificationRoute {
                link: "user".to_string(),
                object_id: from_id,
            }),
        }
    }

    pub fn friend_request_accepted(
        recipient_id: Snowflake,
        accepter_first_name: &str,
        accepter_id: Snowflake,
    ) -> Self {
        Self {
            recipient_id,
            kind: NotificationKind::FriendRequestAccepted,
            title: None,
            body: format!("{accepter_first_name} accepted your friend request!"),
            route: Some(NotificationRoute {
                link: "user".to_string(),
                object_id: accepter_id,
            }),
        }
    }

    pub fn new_message(recipient_id: Snowflake, body: String, conversation_id: Snowflake) -> Self {
        Self {
            recipient_id,
            kind: NotificationKind::NewMessage,
            title: None,
            body,
            route: Some(NotificationRoute {
                link: "conversation".to_string(),
                object_id: conversation_id,
            }),
        }
    }
}
