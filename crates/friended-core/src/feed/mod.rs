//! Feed rules shared by the feed service and the feed query

mod age_band;
mod geo;
mod stage;

use chrono::{DateTime, Utc};

pub use age_band::{band_for_age, AgeBand, AgeRange, DEFAULT_AGE_RANGES};
pub use geo::{bounding_box, haversine_miles, BoundingBox};
pub use stage::{FeedAccumulator, FeedStage};

use crate::value_objects::{Gender, Snowflake};

/// Tunables for feed construction
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRules {
    /// Posts with this many flags leave the feed
    pub flag_threshold: i32,
    pub timebox_hours: i64,
    pub recent_window_minutes: i64,
    pub last_active_window_minutes: i64,
    pub active_users_limit: i64,
    pub age_banding: bool,
    pub age_ranges: Vec<AgeRange>,
    pub location_distance_miles: f64,
}

impl Default for FeedRules {
    fn default() -> Self {
        Self {
            flag_threshold: 3,
            timebox_hours: 48,
            recent_window_minutes: 60,
            last_active_window_minutes: 30,
            active_users_limit: 300,
            age_banding: true,
            age_ranges: DEFAULT_AGE_RANGES.to_vec(),
            location_distance_miles: 50.0,
        }
    }
}

/// Fully resolved input for one feed stage query
#[derive(Debug, Clone)]
pub struct FeedQuery {
    pub stage: FeedStage,
    pub viewer_id: Snowflake,
    /// Users blocked by or blocking the viewer
    pub blocked_ids: Vec<Snowflake>,
    /// Client supplied skips plus posts already in the feed
    pub skip_ids: Vec<Snowflake>,
    pub gender: Option<Gender>,
    pub mood: Option<String>,
    pub age_band: Option<AgeBand>,
    /// Restrict to posts at these locations
    pub location_ids: Option<Vec<Snowflake>>,
    pub limit: Option<i64>,
    pub now: DateTime<Utc>,
    pub flag_threshold: i32,
    pub created_after: Option<DateTime<Utc>>,
    pub active_after: Option<DateTime<Utc>>,
    pub interactions_since: Option<DateTime<Utc>>,
    pub row_cap: Option<i64>,
}

impl FeedQuery {
    pub fn new(stage: FeedStage, viewer_id: Snowflake, now: DateTime<Utc>, rules: &FeedRules) -> Self {
        Self {
            stage,
            viewer_id,
            blocked_ids: Vec::new(),
            skip_ids: Vec::new(),
            gender: None,
            mood: None,
            age_band: None,
            location_ids: None,
            limit: None,
            now,
            flag_threshold: rules.flag_threshold,
            created_after: stage.created_after(now, rules),
            active_after: stage.active_after(now, rules),
            interactions_since: stage.interactions_since(now, rules),
            row_cap: stage.row_cap(rules),
        }
    }

    /// Effective row limit: the stage cap and the caller's `max`, whichever is smaller
    pub fn effective_limit(&self) -> Option<i64> {
        match (self.row_cap, self.limit) {
            (Some(cap), Some(limit)) => Some(cap.min(limit)),
            (cap, limit) => cap.or(limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_takes_stage_windows() {
        let rules = FeedRules::default();
        let now = Utc::now();
        let q = FeedQuery::new(FeedStage::Active, Snowflake::new(1), now, &rules);
        assert!(q.created_after.is_none());
        assert!(q.active_after.is_some());
        assert_eq!(q.row_cap, Some(300));
        assert_eq!(q.flag_threshold, 3);
    }

    #[test]
    fn test_effective_limit() {
        let rules = FeedRules::default();
        let mut q = FeedQuery::new(FeedStage::Active, Snowflake::new(1), Utc::now(), &rules);
        assert_eq!(q.effective_limit(), Some(300));
        q.limit = Some(20);
        assert_eq!(q.effective_limit(), Some(20));

        let mut all = FeedQuery::new(FeedStage::All, Snowflake::new(1), Utc::now(), &rules);
        assert_eq!(all.effective_limit(), None);
        all.limit = Some(5);
        assert_eq!(all.effective_limit(), Some(5));
    }
}
