//! User, settings, location and device <-> model mappers

use friended_core::entities::{Device, Location, User, UserSettings};
use friended_core::value_objects::{Gender, Snowflake};

use crate::models::{DeviceModel, LocationModel, UserModel, UserSettingsModel};

impl From<UserModel> for User {
    fn from(model: UserModel) -> Self {
        User {
            id: Snowflake::new(model.id),
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            dob: model.dob,
            estimated_dob: model.estimated_dob,
            gender: Gender::coerce(Some(&model.gender)),
            admin: model.admin,
            provider: model.provider,
            provider_id: model.provider_id,
            uuid: model.uuid,
            hidden_reason: model.hidden_reason,
            ban_reason: model.ban_reason,
            external_image_url: model.external_image_url,
            location_id: model.location_id.map(Snowflake::new),
            posts_count: model.posts_count,
            messages_received_count: model.messages_received_count,
            active_conversations_count: model.active_conversations_count,
            last_active_at: model.last_active_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<UserSettingsModel> for UserSettings {
    fn from(model: UserSettingsModel) -> Self {
        UserSettings {
            user_id: Snowflake::new(model.user_id),
            purchased_posts: model.purchased_posts,
            purchased_posts_used: model.purchased_posts_used,
            next_post_allowed: model.next_post_allowed,
            pro_subscription_expiration: model.pro_subscription_expiration,
            subscription_state: model.subscription_state,
            feed_filter_min: model.feed_filter_min,
            feed_filter_max: model.feed_filter_max,
            location_type: model.location_type,
            client_version: model.client_version,
        }
    }
}

impl From<LocationModel> for Location {
    fn from(model: LocationModel) -> Self {
        Location {
            id: Snowflake::new(model.id),
            latitude: model.latitude,
            longitude: model.longitude,
        }
    }
}

impl From<DeviceModel> for Device {
    fn from(model: DeviceModel) -> Self {
        Device {
            id: Snowflake::new(model.id),
            uuid: model.uuid,
            user_id: model.user_id.map(Snowflake::new),
            is_blacklisted: model.is_blacklisted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_user_model_maps_gender_and_location() {
        let now = Utc::now();
        let model = UserModel {
            id: 42,
            first_name: "Ann".to_string(),
            last_name: String::new(),
            email: Some("ann@example.com".to_string()),
            dob: None,
            estimated_dob: true,
            gender: "female".to_string(),
            admin: false,
            provider: Some("snapchat".to_string()),
            provider_id: Some("snap-1".to_string()),
            uuid: None,
            hidden_reason: None,
            ban_reason: None,
            external_image_url: None,
            location_id: Some(7),
            posts_count: 2,
            messages_received_count: 0,
            active_conversations_count: 0,
            last_active_at: None,
            created_at: now,
            updated_at: now,
        };

        let user = User::from(model);
        assert_eq!(user.id, Snowflake::new(42));
        assert_eq!(user.gender, Gender::Female);
        assert_eq!(user.location_id, Some(Snowflake::new(7)));
        assert!(user.estimated_dob);
    }

    #[test]
    fn test_unknown_gender_string_coerces() {
        let now = Utc::now();
        let mut model = UserModel {
            id: 1,
            first_name: "X".to_string(),
            last_name: String::new(),
            email: None,
            dob: None,
            estimated_dob: false,
            gender: "other".to_string(),
            admin: false,
            provider: None,
            provider_id: None,
            uuid: None,
            hidden_reason: None,
            ban_reason: None,
            external_image_url: None,
            location_id: None,
            posts_count: 0,
            messages_received_count: 0,
            active_conversations_count: 0,
            last_active_at: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(User::from(model.clone()).gender, Gender::Unknown);
        model.gender = "male".to_string();
        assert_eq!(User::from(model).gender, Gender::Male);
    }
}
