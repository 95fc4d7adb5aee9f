//! Block service

use friended_core::Snowflake;
use tracing::{info, instrument};

use crate::dto::ResultResponse;

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::user::UserService;

/// Block service
pub struct BlockService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> BlockService<'a> {
    /// Create a new BlockService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Block a user; any friendship between the two ends
    #[instrument(skip(self))]
    pub async fn block(
        &self,
        viewer_id: Snowflake,
        blocked_id: Snowflake,
    ) -> ServiceResult<ResultResponse<&'static str>> {
        if viewer_id == blocked_id {
            return Err(ServiceError::validation("You cannot block yourself"));
        }
        UserService::new(self.ctx).find(blocked_id).await?;

        self.ctx.block_repo().create(viewer_id, blocked_id).await?;
        let removed = self
            .ctx
            .friendship_repo()
            .delete_between(viewer_id, blocked_id)
            .await?;

        info!(user_id = %viewer_id, blocked_user_id = %blocked_id, friendships_removed = removed, "User blocked");
        Ok(ResultResponse::success())
    }
}
