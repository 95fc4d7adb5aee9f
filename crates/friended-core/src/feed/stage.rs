//! Feed stages and the accumulator that merges them
//!
//! The feed is built from up to four stages run in order. Each later stage only runs
//! while the feed is still empty or shorter than the requested size, and never
//! repeats a post an earlier stage returned.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use super::FeedRules;
use crate::entities::Post;
use crate::value_objects::Snowflake;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedStage {
    /// Posts created within the recent window
    Now,
    /// Posts whose authors were active within the last-active window
    Active,
    /// Posts created within the timebox
    Recent,
    /// Everything answerable
    All,
}

impl FeedStage {
    pub const PIPELINE: [Self; 4] = [Self::Now, Self::Active, Self::Recent, Self::All];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Now => "now",
            Self::Active => "active",
            Self::Recent => "recent",
            Self::All => "all",
        }
    }

    /// Label stored on `PostsFeedResult`; the `all` stage is not recorded
    pub fn time_filter(&self, rules: &FeedRules) -> Option<String> {
        match self {
            Self::Now => Some(format!("now-{}-mins", rules.recent_window_minutes)),
            Self::Active => Some(format!("active-{}-mins", rules.last_active_window_minutes)),
            Self::Recent => Some(format!("recent-{}-hours", rules.timebox_hours)),
            Self::All => None,
        }
    }

    /// Lower bound on `created_at`
    pub fn created_after(&self, now: DateTime<Utc>, rules: &FeedRules) -> Option<DateTime<Utc>> {
        match self {
            Self::Now => Some(now - Duration::minutes(rules.recent_window_minutes)),
            Self::Recent => Some(now - Duration::hours(rules.timebox_hours)),
            Self::Active | Self::All => None,
        }
    }

    /// Lower bound on the author's `user_last_active_at`
    pub fn active_after(&self, now: DateTime<Utc>, rules: &FeedRules) -> Option<DateTime<Utc>> {
        match self {
            Self::Active => Some(now - Duration::minutes(rules.last_active_window_minutes)),
            _ => None,
        }
    }

    /// Skips, ratings and replies older than this no longer hide a post.
    /// `None` means every past interaction counts.
    pub fn interactions_since(
        &self,
        now: DateTime<Utc>,
        rules: &FeedRules,
    ) -> Option<DateTime<Utc>> {
        match self {
            Self::Now | Self::Recent => Some(now - Duration::hours(rules.timebox_hours)),
            Self::Active | Self::All => None,
        }
    }

    pub fn orders_by_activity(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Row cap applied before the caller's `max`
    pub fn row_cap(&self, rules: &FeedRules) -> Option<i64> {
        match self {
            Self::Active => Some(rules.active_users_limit),
            _ => None,
        }
    }

    /// Whether the stage may drop the location filter when it finds nothing nearby
    pub fn falls_back_without_location(&self) -> bool {
        matches!(self, Self::Recent)
    }
}

/// Collects stage results in order without duplicates
#[derive(Debug)]
pub struct FeedAccumulator {
    max: Option<usize>,
    posts: Vec<Post>,
    seen: HashSet<Snowflake>,
}

impl FeedAccumulator {
    pub fn new(max: Option<usize>) -> Self {
        Self {
            max,
            posts: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// True while another stage should run
    pub fn needs_more(&self) -> bool {
        self.posts.is_empty() || self.max.is_some_and(|max| self.posts.len() < max)
    }

    /// Ids already in the feed, excluded from later stages
    pub fn seen_ids(&self) -> Vec<Snowflake> {
        self.posts.iter().map(|p| p.id).collect()
    }

    /// Append a stage's posts and return how many were new
    pub fn extend(&mut self, stage: FeedStage, posts: Vec<Post>) -> usize {
        let before = self.posts.len();
        for mut post in posts {
            if !self.seen.insert(post.id) {
                continue;
            }
            if stage.orders_by_activity() {
                if let Some(active_at) = post.user_last_active_at {
                    post.created_at = active_at;
                }
            }
            self.posts.push(post);
        }
        self.posts.len() - before
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn finish(mut self) -> Vec<Post> {
        if let Some(max) = self.max {
            self.posts.truncate(max);
        }
        self.posts
    }
}
