//! Redis Pub/Sub publisher.
//!
//! Publishes push notifications for the external delivery worker.

use friended_core::events::Notification;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

use crate::pool::{RedisPool, RedisResult};
use crate::pubsub::PubSubChannel;

/// Event wrapper for Pub/Sub messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubSubEvent {
    /// Event type name (e.g., "friend_request", "new_message")
    pub event_type: String,
    pub data: serde_json::Value,
}

impl PubSubEvent {
    #[must_use]
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
        }
    }

    /// Wrap a notification, typed by its kind
    pub fn from_notification(notification: &Notification) -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            notification.kind.as_str(),
            serde_json::to_value(notification)?,
        ))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Redis Pub/Sub publisher
#[derive(Clone)]
pub struct Publisher {
    pool: RedisPool,
}

impl Publisher {
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Publish an event to a channel, returning the number of receivers
    pub async fn publish(&self, channel: &PubSubChannel, event: &PubSubEvent) -> RedisResult<u32> {
        let mut conn = self.pool.get().await?;
        let channel_name = channel.name();
        let payload = event.to_json()?;

        let receivers: u32 = conn.publish(&channel_name, &payload).await?;

        tracing::debug!(
            channel = %channel_name,
            event_type = %event.event_type,
            receivers = receivers,
            "Published event"
        );

        Ok(receivers)
    }

    /// Publish a push notification to its recipient's channel
    pub async fn publish_notification(&self, notification: &Notification) -> RedisResult<u32> {
        let event = PubSubEvent::from_notification(notification)?;
        let channel = PubSubChannel::user(notification.recipient_id);
        self.publish(&channel, &event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use friended_core::value_objects::Snowflake;

    #[test]
    fn test_event_from_notification() {
        let notification = Notification::friend_request(Snowflake::new(2), "Bo", Snowflake::new(3));
        let event = PubSubEvent::from_notification(&notification).unwrap();
        assert_eq!(event.event_type, "friend_request");
        assert_eq!(event.data["body"], "Bo sent you a friend request!");
        assert_eq!(event.data["route"]["objectId"], "3");
    }

    #[test]
    fn test_event_serialization() {
        let event = PubSubEvent::new("new_message", serde_json::json!({"body": "Ann: hi"}));
        let json = event.to_json().unwrap();
        assert!(json.contains("\"event_type\":\"new_message\""));
        assert!(json.contains("Ann: hi"));
    }
}
