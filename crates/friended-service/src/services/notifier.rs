//! Push notification hand-off
//!
//! Notifications are published for the delivery worker. A failed publish is logged and
//! never fails the request that produced it.

use std::sync::Arc;

use async_trait::async_trait;
use friended_cache::Publisher;
use friended_core::Notification;
use tracing::{debug, warn};

/// Where notifications go once a service emits them
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    async fn publish(&self, notification: &Notification) -> Result<(), String>;
}

#[async_trait]
impl NotificationPublisher for Publisher {
    async fn publish(&self, notification: &Notification) -> Result<(), String> {
        self.publish_notification(notification)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationPublisher>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationPublisher>) -> Self {
        Self { sink }
    }

    pub async fn notify(&self, notification: Notification) {
        match self.sink.publish(&notification).await {
            Ok(()) => debug!(
                recipient_id = %notification.recipient_id,
                kind = notification.kind.as_str(),
                "Notification published"
            ),
            Err(e) => warn!(
                recipient_id = %notification.recipient_id,
                kind = notification.kind.as_str(),
                error = %e,
                "Failed to publish notification"
            ),
        }
    }

    pub async fn notify_all(&self, notifications: Vec<Notification>) {
        for notification in notifications {
            self.notify(notification).await;
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}
