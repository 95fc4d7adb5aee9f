//! Post service
//!
//! Icebreaker posts: the posting cooldown, creation with its account side effects,
//! moderation by flagging, ratings and the replies a post received.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, Utc};
use friended_core::entities::{
    find_filtered_term, primary_photo, suspension_reason, PollQuestion, Post, User,
};
use friended_core::traits::{PostListQuery, PostSideEffects};
use friended_core::{DomainError, FriendshipStatus, Notification, Snowflake};
use tracing::{info, instrument, warn};

use crate::dto::{
    ConversationResponse, CreatePostRequest, PollQuestionResponse, PostIndexParams, PostResponse,
    ResultResponse, ResultsResponse, UpdatePostRequest,
};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::jobs::spawn_job;
use super::user::UserService;

/// Page size used when `offset` is given without `max`
const DEFAULT_PAGE_SIZE: i64 = 10;

/// What to attach to rendered posts besides the poll question
#[derive(Debug, Clone, Copy, Default)]
pub struct PostExtras {
    pub user: bool,
    pub liked: bool,
    pub page_views: bool,
}

/// Post service
pub struct PostService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> PostService<'a> {
    /// Create a new PostService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Seconds the user still has to wait before posting again; zero or negative means now.
    ///
    /// Nobody waits before their first post, nor after an intro-only first post.
    pub async fn seconds_until_post_allowed(&self, user: &User) -> ServiceResult<i64> {
        let count = self.ctx.post_repo().count_by_user(user.id).await?;
        if count == 0 {
            return Ok(0);
        }
        if count == 1 {
            if let Some(latest) = self.ctx.post_repo().latest_by_user(user.id).await? {
                let question = self
                    .ctx
                    .poll_question_repo()
                    .find_by_id(latest.poll_question_id)
                    .await?;
                if question.is_some_and(|q| q.intro_only) {
                    return Ok(0);
                }
            }
        }
        let settings = self.ctx.settings_repo().find_or_default(user.id).await?;
        Ok(settings.seconds_until_next_post(Utc::now()))
    }

    /// Answer a poll question
    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        viewer_id: Snowflake,
        poll_question_id: Option<Snowflake>,
        request: CreatePostRequest,
    ) -> ServiceResult<PostResponse> {
        let user = UserService::new(self.ctx).find(viewer_id).await?;
        let question_id = poll_question_id
            .or(request.poll_question_id)
            .ok_or_else(|| ServiceError::validation("poll_question_id is required"))?;
        let question = self
            .ctx
            .poll_question_repo()
            .find_by_id(question_id)
            .await?
            .ok_or(DomainError::PollQuestionNotFound(question_id))?;

        let now = Utc::now();
        let settings = self.ctx.settings_repo().find_or_default(user.id).await?;
        let is_pro = settings.is_pro(now);

        let mut consume_purchased_post = false;
        if !request.ignore_limit {
            let seconds = self.seconds_until_post_allowed(&user).await?;
            if seconds > 0 {
                if settings.purchased_posts_remaining() <= 0 {
                    warn!(user_id = %user.id, seconds, "Post limit exceeded");
                    return Err(DomainError::PostLimitExceeded { seconds }.into());
                }
                consume_purchased_post = !is_pro;
            }
        }

        if self
            .ctx
            .post_repo()
            .exists_for_question(user.id, question.id)
            .await?
        {
            return Err(DomainError::AlreadyPosted.into());
        }

        let fields = request.post;
        let mut post = Post::new(self.ctx.generate_id(), user.id, question.id, &fields.response_text);
        post.external_image_url = fields.image_url.filter(|url| !url.trim().is_empty());
        post.background_color = fields.background_color;
        post.set_mood(fields.mood.as_deref());
        post.gender = user.gender;
        post.location_id = user.location_id;
        if UserService::new(self.ctx).carries_dob(&user).await? {
            post.dob = user.dob;
        }

        let photos = self.ctx.photo_repo().find_by_user(user.id).await?;
        post.needs_moderation = primary_photo(&photos).is_none();
        post.moderated = false;

        let hidden_reason = self.solicitation_reason(&post).await?;
        let interval = if is_pro {
            self.ctx.rules().posting.premium_post_interval_secs
        } else {
            self.ctx.rules().posting.allowed_post_interval_secs
        };
        let effects = PostSideEffects {
            hidden_reason: hidden_reason.clone(),
            next_post_allowed: now + Duration::seconds(interval),
            consume_purchased_post,
        };
        self.ctx.post_repo().create(&post, &effects).await?;

        info!(
            post_id = %post.id,
            user_id = %user.id,
            needs_moderation = post.needs_moderation,
            "Post created"
        );

        if !user.is_hidden() && hidden_reason.is_none() {
            spawn_job(
                "notify_friends_of_post",
                None,
                notify_friends_of_post(
                    self.ctx.clone(),
                    post.id,
                    user.first_name.clone(),
                    post.full_text(&question),
                ),
            );
        }

        Ok(PostResponse::from(&post))
    }

    /// Hidden reason for the author when the text matches a filter term
    async fn solicitation_reason(&self, post: &Post) -> ServiceResult<Option<String>> {
        let terms = self.ctx.post_repo().filter_terms().await?;
        Ok(find_filtered_term(&post.response_text, &terms).map(|term| {
            warn!(post_id = %post.id, user_id = %post.user_id, term, "Solicitation attempt");
            suspension_reason(Utc::now().date_naive(), post.id)
        }))
    }

    async fn find(&self, post_id: Snowflake) -> ServiceResult<Post> {
        self.ctx
            .post_repo()
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::PostNotFound(post_id).into())
    }

    /// Load a post the viewer may modify: its author or an admin
    async fn find_owned(&self, viewer: &User, post_id: Snowflake) -> ServiceResult<Post> {
        let post = self.find(post_id).await?;
        if post.user_id != viewer.id && !viewer.admin {
            return Err(DomainError::NotPostOwner.into());
        }
        Ok(post)
    }

    /// Single post with its question, author and counters; records a page view
    #[instrument(skip(self))]
    pub async fn show(
        &self,
        viewer_id: Snowflake,
        post_id: Snowflake,
    ) -> ServiceResult<ResultResponse<PostResponse>> {
        let post = self.find(post_id).await?;
        self.ctx.post_repo().add_page_view(viewer_id, post.id).await?;

        let mut rendered = self
            .decorate(viewer_id, &[post.clone()], PostExtras { user: true, ..PostExtras::default() })
            .await?;
        let mut response = rendered.pop().unwrap_or_else(|| PostResponse::from(&post));

        let blocked = self.ctx.block_repo().blocked_ids(post.user_id).await?;
        response.page_view_count = Some(self.ctx.post_repo().page_view_count(post.id, &blocked).await?);

        Ok(ResultResponse::new(response))
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        viewer_id: Snowflake,
        post_id: Snowflake,
        request: UpdatePostRequest,
    ) -> ServiceResult<PostResponse> {
        let viewer = UserService::new(self.ctx).find(viewer_id).await?;
        let mut post = self.find_owned(&viewer, post_id).await?;
        let changes = request.post;

        if let Some(text) = changes.response_text {
            let text = text.trim();
            if text.is_empty() {
                return Err(ServiceError::validation("response_text can't be blank"));
            }
            post.response_text = text.to_string();
        }
        if changes.mood.is_some() {
            post.set_mood(changes.mood.as_deref());
        }
        if let Some(url) = changes.image_url {
            post.external_image_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(color) = changes.background_color {
            post.background_color = Some(color);
        }
        post.updated_at = Utc::now();

        self.ctx.post_repo().update(&post).await?;

        if let Some(reason) = self.solicitation_reason(&post).await? {
            let mut author = UserService::new(self.ctx).find(post.user_id).await?;
            author.hidden_reason = Some(reason);
            author.updated_at = Utc::now();
            self.ctx.user_repo().update(&author).await?;
            UserService::new(self.ctx).blacklist_device(&author).await?;
        }

        info!(post_id = %post.id, "Post updated");
        Ok(PostResponse::from(&post))
    }

    /// Posts of one user (admins may list everyone's)
    #[instrument(skip(self, params))]
    pub async fn index(
        &self,
        viewer_id: Snowflake,
        params: PostIndexParams,
    ) -> ServiceResult<ResultsResponse<PostResponse>> {
        let viewer = UserService::new(self.ctx).find(viewer_id).await?;
        if params.user_id.is_none() && !viewer.admin {
            return Err(ServiceError::forbidden("Access denied"));
        }
        if let Some(user_id) = params.user_id {
            UserService::new(self.ctx).find(user_id).await?;
        }

        let extras = PostExtras {
            user: false,
            liked: true,
            page_views: params.user_id == Some(viewer.id),
        };
        let search = params.search.filter(|s| !s.is_empty());

        if let Some(offset) = params.offset {
            let max = params.max.unwrap_or(DEFAULT_PAGE_SIZE);
            let query = PostListQuery {
                user_id: params.user_id,
                search,
                limit: Some(max),
                offset: Some(offset),
            };
            let total = self.ctx.post_repo().count(&query).await?;
            let posts = self.ctx.post_repo().list(&query).await?;
            let results = self.decorate(viewer.id, &posts, extras).await?;
            return Ok(ResultsResponse::paged(results, max, offset, total));
        }

        let query = PostListQuery {
            user_id: params.user_id,
            search,
            limit: params.max,
            offset: None,
        };
        let posts = self.ctx.post_repo().list(&query).await?;
        Ok(ResultsResponse::new(self.decorate(viewer.id, &posts, extras).await?))
    }

    /// Soft delete
    #[instrument(skip(self))]
    pub async fn destroy(
        &self,
        viewer_id: Snowflake,
        post_id: Snowflake,
    ) -> ServiceResult<ResultResponse<&'static str>> {
        let viewer = UserService::new(self.ctx).find(viewer_id).await?;
        let mut post = self.find_owned(&viewer, post_id).await?;
        post.deleted = true;
        post.updated_at = Utc::now();
        self.ctx.post_repo().update(&post).await?;
        info!(post_id = %post.id, "Post deleted");
        Ok(ResultResponse::success())
    }

    /// Flag a post; each user counts once and enough flags remove it
    #[instrument(skip(self))]
    pub async fn flag(&self, viewer_id: Snowflake, post_id: Snowflake) -> ServiceResult<PostResponse> {
        let mut post = self.find(post_id).await?;
        if !self.ctx.post_repo().add_skip(viewer_id, post.id).await? {
            return Ok(PostResponse::from(&post));
        }

        if post.flag(self.ctx.rules().feed.flag_threshold) {
            warn!(post_id = %post.id, flags = post.flag_count, "Post removed by flags");
        }
        self.ctx.post_repo().update(&post).await?;
        Ok(PostResponse::from(&post))
    }

    /// Move a post back to the top of the feed
    #[instrument(skip(self))]
    pub async fn repost(&self, viewer_id: Snowflake, post_id: Snowflake) -> ServiceResult<PostResponse> {
        let viewer = UserService::new(self.ctx).find(viewer_id).await?;
        let mut post = self.find_owned(&viewer, post_id).await?;
        post.created_at = Utc::now();
        self.ctx.post_repo().update(&post).await?;
        Ok(PostResponse::from(&post))
    }

    /// Date a post into the near future so it stays on top for a while
    #[instrument(skip(self))]
    pub async fn boost(&self, viewer_id: Snowflake, post_id: Snowflake) -> ServiceResult<PostResponse> {
        let viewer = UserService::new(self.ctx).find(viewer_id).await?;
        let mut post = self.find_owned(&viewer, post_id).await?;
        let boosted = Utc::now() + Duration::minutes(self.ctx.rules().posting.boost_interval_minutes);
        post.created_at = boosted;
        post.updated_at = boosted;
        self.ctx.post_repo().update(&post).await?;
        info!(post_id = %post.id, until = %boosted, "Post boosted");
        Ok(PostResponse::from(&post))
    }

    #[instrument(skip(self))]
    pub async fn rate(
        &self,
        viewer_id: Snowflake,
        post_id: Snowflake,
        value: i32,
    ) -> ServiceResult<PostResponse> {
        let mut post = self.find(post_id).await?;
        post.rating_count = self.ctx.post_repo().rate(viewer_id, post.id, value).await?;

        let mut response = PostResponse::from(&post);
        response.liked_by_current_user = Some(value > 0);
        Ok(response)
    }

    /// Conversations started by replying to the viewer's post
    #[instrument(skip(self))]
    pub async fn conversations(
        &self,
        viewer_id: Snowflake,
        post_id: Snowflake,
    ) -> ServiceResult<ResultsResponse<ConversationResponse>> {
        let post = self.find(post_id).await?;
        if post.user_id != viewer_id {
            return Err(ServiceError::forbidden("Access denied"));
        }

        let blocked = self.ctx.block_repo().blocked_ids(viewer_id).await?;
        let mut replies = self.ctx.conversation_repo().replies_to_post(post.id, &blocked).await?;
        replies.sort_by(|a, b| {
            b.conversation
                .most_recent_message_id
                .cmp(&a.conversation.most_recent_message_id)
        });

        let mut seen = HashSet::new();
        replies.retain(|r| seen.insert(r.conversation.id));

        let user_ids: Vec<Snowflake> = replies
            .iter()
            .flat_map(|r| [r.conversation.initiating_user_id, r.conversation.target_user_id])
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let users = UserService::new(self.ctx).summaries(&user_ids).await?;

        let results = replies
            .iter()
            .map(|r| {
                let mut conversation = ConversationResponse::for_viewer(&r.conversation, viewer_id);
                conversation.initiating_user = users.get(&r.conversation.initiating_user_id).cloned();
                conversation.target_user = users.get(&r.conversation.target_user_id).cloned();
                conversation.post_reply = Some(r.reply.text.clone());
                conversation
            })
            .collect();

        Ok(ResultsResponse::new(results))
    }

    /// Render posts with their poll question and the requested extras, keeping order
    pub async fn decorate(
        &self,
        viewer_id: Snowflake,
        posts: &[Post],
        extras: PostExtras,
    ) -> ServiceResult<Vec<PostResponse>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }
        let post_ids: Vec<Snowflake> = posts.iter().map(|p| p.id).collect();

        let question_ids: Vec<Snowflake> = unique(posts.iter().map(|p| p.poll_question_id));
        let questions: HashMap<Snowflake, PollQuestion> = self
            .ctx
            .poll_question_repo()
            .find_by_ids(&question_ids)
            .await?
            .into_iter()
            .map(|q| (q.id, q))
            .collect();

        let users = if extras.user {
            let author_ids = unique(posts.iter().map(|p| p.user_id));
            UserService::new(self.ctx).summaries(&author_ids).await?
        } else {
            HashMap::new()
        };

        let liked: HashSet<Snowflake> = if extras.liked {
            self.ctx
                .post_repo()
                .liked_post_ids(viewer_id, &post_ids)
                .await?
                .into_iter()
                .collect()
        } else {
            HashSet::new()
        };

        let blocked = if extras.page_views {
            self.ctx.block_repo().blocked_ids(viewer_id).await?
        } else {
            Vec::new()
        };

        let mut rendered = Vec::with_capacity(posts.len());
        for post in posts {
            let mut response = PostResponse::from(post);
            response.poll_question = questions.get(&post.poll_question_id).map(PollQuestionResponse::from);
            if extras.user {
                response.user = users.get(&post.user_id).cloned();
            }
            if extras.liked {
                response.liked_by_current_user = Some(liked.contains(&post.id));
            }
            if extras.page_views {
                response.page_view_count =
                    Some(self.ctx.post_repo().page_view_count(post.id, &blocked).await?);
            }
            rendered.push(response);
        }
        Ok(rendered)
    }
}

/// Tell everyone who befriended or asked to befriend the author about the new post
async fn notify_friends_of_post(
    ctx: ServiceContext,
    post_id: Snowflake,
    first_name: String,
    full_text: String,
) -> ServiceResult<()> {
    let Some(post) = ctx.post_repo().find_by_id(post_id).await? else {
        return Ok(());
    };
    let requesters = ctx.friendship_repo().requesters_of(post.user_id).await?;
    let notifications: Vec<Notification> = requesters
        .iter()
        .map(|f| {
            Notification::friend_posted(
                f.user_id,
                f.status == FriendshipStatus::Pending,
                &first_name,
                &full_text,
                post.id,
            )
        })
        .collect();

    info!(post_id = %post.id, recipients = notifications.len(), "Notifying friends of new post");
    ctx.notifier().notify_all(notifications).await;
    Ok(())
}

fn unique(ids: impl Iterator<Item = Snowflake>) -> Vec<Snowflake> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}
