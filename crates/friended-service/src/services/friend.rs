//! Friend service
//!
//! A friendship is a pair of rows. A request writes one pending row; answering it
//! with a request in the other direction accepts both.

use friended_core::{DomainError, Friendship, FriendshipStatus, Notification, Snowflake};
use tracing::{info, instrument};

use crate::dto::{ResultResponse, ResultsResponse, UserResponse};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::user::UserService;

/// Friend service
pub struct FriendService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> FriendService<'a> {
    /// Create a new FriendService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Send a friend request, or accept the one the other user already sent
    #[instrument(skip(self))]
    pub async fn request(&self, viewer_id: Snowflake, other_id: Snowflake) -> ServiceResult<UserResponse> {
        if viewer_id == other_id {
            return Err(ServiceError::validation("You cannot befriend yourself"));
        }
        let users = UserService::new(self.ctx);
        let viewer = users.find(viewer_id).await?;
        let other = users.find(other_id).await?;

        let incoming = self.ctx.friendship_repo().find(other.id, viewer.id).await?;
        let notification = match incoming {
            Some(row) if row.status == FriendshipStatus::Pending => {
                self.ctx.friendship_repo().accept_pair(viewer.id, other.id).await?;
                self.ctx
                    .conversation_repo()
                    .activate_between(viewer.id, other.id)
                    .await?;
                info!(user_id = %viewer.id, friend_id = %other.id, "Friend request accepted");
                Some(Notification::friend_request_accepted(other.id, &viewer.first_name, viewer.id))
            }
            _ => {
                let created = self
                    .ctx
                    .friendship_repo()
                    .create(&Friendship::pending(viewer.id, other.id))
                    .await?;
                if created {
                    info!(user_id = %viewer.id, friend_id = %other.id, "Friend request sent");
                }
                created.then(|| Notification::friend_request(other.id, &viewer.first_name, viewer.id))
            }
        };

        if let Some(notification) = notification {
            self.ctx.notifier().notify(notification).await;
        }

        users.render(&viewer, &other).await
    }

    /// Remove the friendship or cancel a request, in both directions
    #[instrument(skip(self))]
    pub async fn remove(
        &self,
        viewer_id: Snowflake,
        other_id: Snowflake,
    ) -> ServiceResult<ResultResponse<&'static str>> {
        let removed = self
            .ctx
            .friendship_repo()
            .delete_between(viewer_id, other_id)
            .await?;
        if removed == 0 {
            return Err(DomainError::NoFriendship.into());
        }
        info!(user_id = %viewer_id, friend_id = %other_id, "Friendship removed");
        Ok(ResultResponse::success())
    }

    /// Accepted friends of the viewer
    #[instrument(skip(self))]
    pub async fn list(&self, viewer_id: Snowflake) -> ServiceResult<ResultsResponse<UserResponse>> {
        let users = UserService::new(self.ctx);
        let viewer = users.find(viewer_id).await?;
        let friend_ids = self.ctx.friendship_repo().friend_ids(viewer.id).await?;
        let friends = self.ctx.user_repo().find_by_ids(&friend_ids).await?;
        Ok(ResultsResponse::new(users.render_all(&viewer, &friends).await?))
    }
}
