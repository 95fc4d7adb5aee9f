//! Redis Pub/Sub module.
//!
//! Push notifications leave the API through per-user channels.

mod channels;
mod publisher;

pub use channels::{PubSubChannel, PUSH_CHANNEL_PREFIX};
pub use publisher::{PubSubEvent, Publisher};
