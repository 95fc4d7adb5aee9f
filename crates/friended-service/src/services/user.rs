//! User service
//!
//! Loads users, renders them relative to a viewer and applies profile updates.

use std::collections::HashMap;

use chrono::Utc;
use friended_core::entities::{my_primary_photo, primary_photo, Location, User, UserPhoto};
use friended_core::validation::{check_gender, check_name};
use friended_core::{FriendState, Snowflake};
use tracing::{info, instrument, warn};

use crate::dto::{
    LocationResponse, PhotoResponse, UpdateUserRequest, UserResponse, UserSummaryResponse,
};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::post::PostService;

/// User service
pub struct UserService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> UserService<'a> {
    /// Create a new UserService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Load a user or fail with 404
    pub async fn find(&self, user_id: Snowflake) -> ServiceResult<User> {
        self.ctx
            .user_repo()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id.to_string()))
    }

    /// Get the authenticated user
    #[instrument(skip(self))]
    pub async fn current_user(&self, viewer_id: Snowflake) -> ServiceResult<UserResponse> {
        let user = self.find(viewer_id).await?;
        self.render(&user, &user).await
    }

    /// Get another user as seen by the viewer
    #[instrument(skip(self))]
    pub async fn show(&self, viewer_id: Snowflake, user_id: Snowflake) -> ServiceResult<UserResponse> {
        let viewer = self.find(viewer_id).await?;
        let user = self.find(user_id).await?;
        self.render(&viewer, &user).await
    }

    /// Render `user` for `viewer`
    pub async fn render(&self, viewer: &User, user: &User) -> ServiceResult<UserResponse> {
        let now = Utc::now();
        let is_self = viewer.id == user.id;

        let photos = self.ctx.photo_repo().find_by_user(user.id).await?;
        let settings = self.ctx.settings_repo().find_or_default(user.id).await?;
        let location = match user.location_id {
            Some(id) => self.ctx.location_repo().find_by_id(id).await?,
            None => None,
        };

        let photo_fallback = if is_self {
            my_primary_photo(&photos)
        } else {
            primary_photo(&photos)
        };

        let mut response = UserResponse {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            dob: user.dob,
            estimated_dob: user.estimated_dob,
            gender: user.gender,
            admin: user.admin,
            provider: user.provider.clone(),
            external_image_url: user
                .external_image_url
                .clone()
                .or_else(|| photo_fallback.map(|p| p.url.clone())),
            posts_count: user.posts_count,
            last_active_at: user.last_active_at,
            created_at: user.created_at,
            is_subscribed: settings.is_pro(now),
            user_photos: photos
                .iter()
                .filter(|p| p.is_visible())
                .map(PhotoResponse::from)
                .collect(),
            location: location.as_ref().map(LocationResponse::from),
            email: None,
            device_id: None,
            seconds_until_post_allowed: None,
            is_friend: None,
            is_a_friend: None,
        };

        if is_self {
            response.email = user.email.clone();
            response.device_id = user.uuid.clone();
            response.seconds_until_post_allowed = Some(
                PostService::new(self.ctx)
                    .seconds_until_post_allowed(user)
                    .await?,
            );
        } else {
            let rows = self.ctx.friendship_repo().find_between(viewer.id, user.id).await?;
            let state = FriendState::from_rows(&rows);
            response.is_friend = Some(state.is_friend());
            response.is_a_friend = Some(state.as_str());
        }

        Ok(response)
    }

    /// Render several users for the same viewer, keeping order
    pub async fn render_all(&self, viewer: &User, users: &[User]) -> ServiceResult<Vec<UserResponse>> {
        let mut rendered = Vec::with_capacity(users.len());
        for user in users {
            rendered.push(self.render(viewer, user).await?);
        }
        Ok(rendered)
    }

    /// Compact users keyed by id, for embedding in posts and conversations
    pub async fn summaries(
        &self,
        user_ids: &[Snowflake],
    ) -> ServiceResult<HashMap<Snowflake, UserSummaryResponse>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let users = self.ctx.user_repo().find_by_ids(user_ids).await?;
        let photos = self.ctx.photo_repo().find_by_users(user_ids).await?;
        let by_user = group_photos(photos);

        Ok(users
            .iter()
            .map(|user| {
                let url = by_user
                    .get(&user.id)
                    .and_then(|p| primary_photo(p))
                    .map(|p| p.url.as_str());
                (user.id, UserSummaryResponse::new(user, url))
            })
            .collect())
    }

    /// Visible primary photo url per user
    pub async fn photo_urls(&self, user_ids: &[Snowflake]) -> ServiceResult<HashMap<Snowflake, String>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let photos = self.ctx.photo_repo().find_by_users(user_ids).await?;
        Ok(group_photos(photos)
            .into_iter()
            .filter_map(|(id, photos)| primary_photo(&photos).map(|p| (id, p.url.clone())))
            .collect())
    }

    /// Apply a profile update to the current user
    #[instrument(skip(self, request))]
    pub async fn update_current(
        &self,
        viewer_id: Snowflake,
        request: UpdateUserRequest,
    ) -> ServiceResult<UserResponse> {
        let mut user = self.find(viewer_id).await?;
        let now = Utc::now();
        let mut author_fields_changed = false;

        if let Some(first_name) = request.first_name {
            check_name("first_name", first_name.trim())?;
            user.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = request.last_name {
            check_name("last_name", last_name.trim())?;
            user.last_name = last_name.trim().to_string();
        }
        if let Some(dob) = request.dob {
            if user.dob != Some(dob) {
                user.dob = Some(dob);
                user.estimated_dob = false;
                author_fields_changed = true;
            }
        }
        if let Some(gender) = request.gender.as_deref() {
            let gender = check_gender(gender)?;
            if gender != user.gender {
                user.gender = gender;
                author_fields_changed = true;
            }
        }
        if let (Some(latitude), Some(longitude)) = (request.latitude, request.longitude) {
            let location = Location {
                id: self.ctx.generate_id(),
                latitude,
                longitude,
            };
            self.ctx.location_repo().create(&location).await?;
            user.location_id = Some(location.id);
            author_fields_changed = true;
        }

        let banned = user.apply_age_restriction(now.date_naive(), self.ctx.rules().posting.minimum_age);
        user.updated_at = now;
        self.ctx.user_repo().update(&user).await?;

        if banned {
            warn!(user_id = %user.id, "Underage date of birth, account banned");
            self.blacklist_device(&user).await?;
        }

        if author_fields_changed {
            self.sync_posts(&user).await?;
        }

        if let Some(version) = request.client_version {
            let mut settings = self.ctx.settings_repo().find_or_default(user.id).await?;
            settings.client_version = Some(version);
            self.ctx.settings_repo().save(&settings).await?;
        }

        info!(user_id = %user.id, "User updated");

        self.render(&user, &user).await
    }

    /// Copy gender, dob and location onto the user's posts
    pub async fn sync_posts(&self, user: &User) -> ServiceResult<()> {
        let dob = if self.carries_dob(user).await? { user.dob } else { None };
        let updated = self
            .ctx
            .post_repo()
            .sync_author_fields(user.id, user.gender, dob, user.location_id)
            .await?;
        info!(user_id = %user.id, posts = updated, "Author fields synced to posts");
        Ok(())
    }

    /// Admins and unbanded users keep their dob off posts
    pub async fn carries_dob(&self, user: &User) -> ServiceResult<bool> {
        if user.admin {
            return Ok(false);
        }
        Ok(!self.ctx.user_repo().is_unbanded(user.id).await?)
    }

    /// Mark the device the user last signed in from as blacklisted
    pub async fn blacklist_device(&self, user: &User) -> ServiceResult<()> {
        let Some(uuid) = user.uuid.as_deref() else {
            return Ok(());
        };
        if let Some(mut device) = self.ctx.device_repo().find_by_uuid(uuid).await? {
            if !device.is_blacklisted {
                device.is_blacklisted = true;
                self.ctx.device_repo().update(&device).await?;
                info!(user_id = %user.id, device_id = %device.id, "Device blacklisted");
            }
        }
        Ok(())
    }
}

fn group_photos(photos: Vec<UserPhoto>) -> HashMap<Snowflake, Vec<UserPhoto>> {
    let mut by_user: HashMap<Snowflake, Vec<UserPhoto>> = HashMap::new();
    for photo in photos {
        by_user.entry(photo.user_id).or_default().push(photo);
    }
    by_user
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(id: i64, user: i64, order: i32) -> UserPhoto {
        UserPhoto {
            id: Snowflake::new(id),
            user_id: Snowflake::new(user),
            url: format!("https://img/{id}.jpg"),
            order_index: order,
            needs_moderation: false,
            moderated: false,
            deleted: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_group_photos_by_owner() {
        let grouped = group_photos(vec![photo(1, 10, 1), photo(2, 11, 0), photo(3, 10, 0)]);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[&Snowflake::new(10)].len(), 2);
        let primary = primary_photo(&grouped[&Snowflake::new(10)]).unwrap();
        assert_eq!(primary.id, Snowflake::new(3));
    }
}
