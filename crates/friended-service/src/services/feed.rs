//! Feed service
//!
//! Runs the feed stages in order against the post repository and merges their
//! results. Viewer specific filters (blocks, gender, mood, age band, location) are
//! resolved once and shared by every stage.

use chrono::{DateTime, Utc};
use friended_core::feed::{bounding_box, haversine_miles, AgeBand, FeedAccumulator};
use friended_core::{FeedQuery, FeedRules, FeedStage, Gender, PostsFeedResult, Snowflake, User, UserSettings};
use tracing::{debug, info, instrument};

use crate::dto::{FeedParams, PostResponse, ResultsResponse};

use super::context::ServiceContext;
use super::error::ServiceResult;
use super::post::{PostExtras, PostService};
use super::user::UserService;

/// Only this location type narrows the feed
pub const NEARBY: &str = "nearby";

/// Filters shared by every stage of one feed request
#[derive(Debug, Clone, Default)]
struct ViewerFilters {
    blocked_ids: Vec<Snowflake>,
    skip_ids: Vec<Snowflake>,
    gender: Option<Gender>,
    mood: Option<String>,
    age_band: Option<AgeBand>,
    location_ids: Option<Vec<Snowflake>>,
    limit: Option<i64>,
}

impl ViewerFilters {
    fn query(
        &self,
        stage: FeedStage,
        viewer_id: Snowflake,
        now: DateTime<Utc>,
        seen: Vec<Snowflake>,
        rules: &FeedRules,
    ) -> FeedQuery {
        let mut query = FeedQuery::new(stage, viewer_id, now, rules);
        query.blocked_ids = self.blocked_ids.clone();
        query.skip_ids = self.skip_ids.iter().copied().chain(seen).collect();
        query.gender = self.gender;
        query.mood = self.mood.clone();
        query.age_band = self.age_band;
        query.location_ids = self.location_ids.clone();
        query.limit = self.limit;
        query
    }
}

/// Feed service
pub struct FeedService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> FeedService<'a> {
    /// Create a new FeedService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Build the viewer's feed
    #[instrument(skip(self, params))]
    pub async fn feed(
        &self,
        viewer_id: Snowflake,
        params: FeedParams,
    ) -> ServiceResult<ResultsResponse<PostResponse>> {
        let viewer = UserService::new(self.ctx).find(viewer_id).await?;
        let now = Utc::now();
        let mut settings = self.ctx.settings_repo().find_or_default(viewer.id).await?;
        let mut settings_changed = false;

        let location_type = params.location_type.filter(|t| !t.is_empty());
        if location_type.is_some() && settings.location_type != location_type {
            settings.location_type = location_type.clone();
            settings_changed = true;
        }

        let age_band = self.age_band(&viewer, &mut settings, &mut settings_changed).await?;

        let location_ids = if location_type.as_deref() == Some(NEARBY) {
            self.nearby_location_ids(&viewer).await?
        } else {
            None
        };

        let filters = ViewerFilters {
            blocked_ids: self.ctx.block_repo().blocked_ids(viewer.id).await?,
            skip_ids: params.skip.as_deref().map(Snowflake::parse_list).unwrap_or_default(),
            gender: Gender::feed_filter(params.gender.as_deref()),
            mood: params.mood.clone().filter(|m| !m.is_empty()),
            age_band,
            location_ids,
            limit: params.max.and_then(|m| i64::try_from(m).ok()),
        };

        let mut feed = FeedAccumulator::new(params.max);
        for stage in FeedStage::PIPELINE {
            if !feed.needs_more() {
                break;
            }

            let query = filters.query(stage, viewer.id, now, feed.seen_ids(), &self.ctx.rules().feed);
            let mut posts = self.ctx.post_repo().feed(&query).await?;
            if posts.is_empty() && query.location_ids.is_some() && stage.falls_back_without_location() {
                debug!(stage = stage.as_str(), "No nearby posts, dropping location filter");
                let mut fallback = query.clone();
                fallback.location_ids = None;
                posts = self.ctx.post_repo().feed(&fallback).await?;
            }

            let found = posts.len();
            let added = feed.extend(stage, posts);
            debug!(stage = stage.as_str(), found, added, "Feed stage finished");

            if let Some(time_filter) = stage.time_filter(&self.ctx.rules().feed) {
                let result = PostsFeedResult {
                    id: self.ctx.generate_id(),
                    user_id: viewer.id,
                    num_results: i32::try_from(found).unwrap_or(i32::MAX),
                    gender_filter: params.gender.clone(),
                    mood_filter: filters.mood.clone(),
                    location_filter: location_type.clone(),
                    time_filter,
                    created_at: now,
                };
                self.ctx.post_repo().record_feed_result(&result).await?;
            }
        }

        if settings_changed {
            self.ctx.settings_repo().save(&settings).await?;
        }

        let posts = feed.finish();
        info!(user_id = %viewer.id, results = posts.len(), "Feed built");

        let rendered = PostService::new(self.ctx)
            .decorate(viewer.id, &posts, PostExtras { user: true, ..PostExtras::default() })
            .await?;
        Ok(ResultsResponse::new(rendered))
    }

    /// Date of birth band for the viewer. A computed band is stored in settings.
    async fn age_band(
        &self,
        viewer: &User,
        settings: &mut UserSettings,
        settings_changed: &mut bool,
    ) -> ServiceResult<Option<AgeBand>> {
        let rules = &self.ctx.rules().feed;
        if !rules.age_banding || viewer.admin {
            return Ok(None);
        }
        if self.ctx.user_repo().is_unbanded(viewer.id).await? {
            return Ok(None);
        }
        if settings.has_stored_feed_band() {
            return Ok(AgeBand::stored(settings.feed_filter_min, settings.feed_filter_max));
        }

        let today = Utc::now().date_naive();
        let Some(band) = viewer
            .age_on(today)
            .and_then(|age| AgeBand::for_age(age, today, &rules.age_ranges))
        else {
            return Ok(None);
        };

        settings.feed_filter_min = band.youngest_dob;
        settings.feed_filter_max = band.oldest_dob;
        *settings_changed = true;
        Ok(Some(band))
    }

    /// Locations within the configured distance of the viewer, `None` without a viewer location
    async fn nearby_location_ids(&self, viewer: &User) -> ServiceResult<Option<Vec<Snowflake>>> {
        let Some(location_id) = viewer.location_id else {
            return Ok(None);
        };
        let Some(origin) = self.ctx.location_repo().find_by_id(location_id).await? else {
            return Ok(None);
        };

        let miles = self.ctx.rules().feed.location_distance_miles;
        let bounds = bounding_box(origin.latitude, origin.longitude, miles);
        let candidates = self.ctx.location_repo().find_within(&bounds).await?;
        Ok(Some(
            candidates
                .into_iter()
                .filter(|l| haversine_miles(origin.latitude, origin.longitude, l.latitude, l.longitude) <= miles)
                .map(|l| l.id)
                .collect(),
        ))
    }
}
