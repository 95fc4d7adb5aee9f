//! Photo and friendship <-> model mappers

use friended_core::entities::{Friendship, FriendshipStatus, UserPhoto};
use friended_core::value_objects::Snowflake;

use crate::models::{FriendshipModel, UserPhotoModel};

impl From<UserPhotoModel> for UserPhoto {
    fn from(model: UserPhotoModel) -> Self {
        UserPhoto {
            id: Snowflake::new(model.id),
            user_id: Snowflake::new(model.user_id),
            url: model.url,
            order_index: model.order_index,
            needs_moderation: model.needs_moderation,
            moderated: model.moderated,
            deleted: model.deleted,
            created_at: model.created_at,
        }
    }
}

impl From<FriendshipModel> for Friendship {
    fn from(model: FriendshipModel) -> Self {
        Friendship {
            user_id: Snowflake::new(model.user_id),
            friend_id: Snowflake::new(model.friend_id),
            status: FriendshipStatus::parse(&model.status),
            created_at: model.created_at,
        }
    }
}
