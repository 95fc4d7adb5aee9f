//! Pub/Sub channel naming.

use friended_core::value_objects::Snowflake;

/// Prefix of the per-user push channels the delivery worker subscribes to
pub const PUSH_CHANNEL_PREFIX: &str = "push:user:";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PubSubChannel {
    /// Push notifications for one user's devices
    User(Snowflake),
    Custom(String),
}

impl PubSubChannel {
    #[must_use]
    pub fn user(user_id: Snowflake) -> Self {
        Self::User(user_id)
    }

    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// Get the Redis channel name
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::User(id) => format!("{PUSH_CHANNEL_PREFIX}{id}"),
            Self::Custom(name) => name.clone(),
        }
    }

    /// Parse a channel name back to a `PubSubChannel`
    #[must_use]
    pub fn parse(name: &str) -> Self {
        name.strip_prefix(PUSH_CHANNEL_PREFIX)
            .and_then(|id| id.parse::<i64>().ok())
            .map_or_else(|| Self::Custom(name.to_string()), |id| Self::User(Snowflake::new(id)))
    }
}

impl std::fmt::Display for PubSubChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names() {
        assert_eq!(PubSubChannel::user(Snowflake::new(11111)).name(), "push:user:11111");
        assert_eq!(PubSubChannel::custom("test").name(), "test");
    }

    #[test]
    fn test_channel_parse() {
        assert_eq!(
            PubSubChannel::parse("push:user:11111"),
            PubSubChannel::User(Snowflake::new(11111))
        );
        assert_eq!(
            PubSubChannel::parse("push:user:abc"),
            PubSubChannel::Custom("push:user:abc".to_string())
        );
    }
}
