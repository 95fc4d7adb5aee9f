//! Photo service
//!
//! Photos from regular users wait for moderation. Approving a photo also releases the
//! owner's posts that were held back for lack of a visible photo.

use std::collections::BTreeSet;

use chrono::Utc;
use friended_core::entities::{primary_photo, UserPhoto};
use friended_core::{DomainError, Snowflake};
use tracing::{info, instrument};

use crate::dto::{AddPhotoRequest, ModeratePhotosRequest, PhotoResponse, ResultResponse};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::user::UserService;

/// Photo service
pub struct PhotoService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> PhotoService<'a> {
    /// Create a new PhotoService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Add a photo to the viewer's profile
    #[instrument(skip(self, request))]
    pub async fn add(&self, viewer_id: Snowflake, request: AddPhotoRequest) -> ServiceResult<PhotoResponse> {
        let viewer = UserService::new(self.ctx).find(viewer_id).await?;
        let url = request.image_url.trim();
        if url.is_empty() {
            return Err(ServiceError::validation("image_url can't be blank"));
        }

        let existing = self.ctx.photo_repo().find_by_user(viewer.id).await?;
        let order_index = existing
            .iter()
            .filter(|p| !p.deleted)
            .map(|p| p.order_index + 1)
            .max()
            .unwrap_or(0);

        let photo = UserPhoto {
            id: self.ctx.generate_id(),
            user_id: viewer.id,
            url: url.to_string(),
            order_index,
            needs_moderation: !viewer.admin,
            moderated: false,
            deleted: false,
            created_at: Utc::now(),
        };
        self.ctx.photo_repo().create(&photo).await?;

        info!(photo_id = %photo.id, user_id = %viewer.id, needs_moderation = photo.needs_moderation, "Photo added");
        Ok(PhotoResponse::from(&photo))
    }

    /// Approve and reject photos (admin only)
    #[instrument(skip(self, request))]
    pub async fn moderate(
        &self,
        viewer_id: Snowflake,
        request: ModeratePhotosRequest,
    ) -> ServiceResult<ResultResponse<&'static str>> {
        let viewer = UserService::new(self.ctx).find(viewer_id).await?;
        if !viewer.admin {
            return Err(DomainError::AdminRequired.into());
        }

        let approved = self.ctx.photo_repo().set_moderated(&request.moderated).await?;
        let rejected = if request.rejected.is_empty() {
            0
        } else {
            self.ctx.photo_repo().set_deleted(&request.rejected).await?
        };

        let photos = self.ctx.photo_repo().find_by_ids(&request.moderated).await?;
        let owners: BTreeSet<Snowflake> = photos.iter().map(|p| p.user_id).collect();
        for owner in owners {
            let owner_photos = self.ctx.photo_repo().find_by_user(owner).await?;
            let primary_url = primary_photo(&owner_photos).map(|p| p.url.as_str());
            let released = self
                .ctx
                .post_repo()
                .moderate_pending(owner, primary_url)
                .await?;
            info!(user_id = %owner, posts = released, "Pending posts released");
        }

        info!(approved, rejected, "Photos moderated");
        Ok(ResultResponse::success())
    }
}
