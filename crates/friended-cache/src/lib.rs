//! # friended-cache
//!
//! Redis connection pool and the pub/sub publisher that hands push notifications to the
//! delivery worker.
//!
//! ## Example
//!
//! ```ignore
//! use friended_cache::{Publisher, RedisPool, RedisPoolConfig};
//!
//! let pool = RedisPool::new(RedisPoolConfig::default())?;
//! let publisher = Publisher::new(pool.clone());
//!
//! let notification = Notification::friend_request(recipient_id, "Ann", sender_id);
//! publisher.publish_notification(&notification).await?;
//! ```

pub mod pool;
pub mod pubsub;

// Re-export pool types
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult, SharedRedisPool};

// Re-export pubsub types
pub use pubsub::{PubSubChannel, PubSubEvent, Publisher, PUSH_CHANNEL_PREFIX};
