//! SQL for one feed stage
//!
//! The statement is assembled with `QueryBuilder` because every filter is optional.

use sqlx::{Postgres, QueryBuilder};

use friended_core::feed::FeedQuery;

use crate::mappers::raw_ids;

pub(super) const POST_COLUMNS: &str = "p.id, p.user_id, p.poll_question_id, p.response_text, \
     p.external_image_url, p.mood, p.background_color, p.gender, p.dob, p.location_id, \
     p.flag_count, p.deleted, p.needs_moderation, p.moderated, p.rating_count, \
     p.user_last_active_at, p.created_at, p.updated_at";

pub(super) fn build_feed_query(query: &FeedQuery) -> QueryBuilder<'static, Postgres> {
    let viewer = query.viewer_id.into_inner();

    let mut qb = QueryBuilder::new("SELECT ");
    qb.push(POST_COLUMNS);
    qb.push(" FROM posts p JOIN users u ON u.id = p.user_id");

    // Answerable posts
    qb.push(" WHERE (u.hidden_reason IS NULL OR u.hidden_reason = '')");
    qb.push(" AND p.deleted = FALSE AND p.flag_count < ");
    qb.push_bind(query.flag_threshold);
    qb.push(" AND (p.needs_moderation = FALSE OR p.moderated = TRUE)");

    if let Some(after) = query.created_after {
        qb.push(" AND p.created_at > ");
        qb.push_bind(after);
    }
    if let Some(after) = query.active_after {
        qb.push(" AND p.user_last_active_at > ");
        qb.push_bind(after);
    }

    qb.push(" AND p.user_id <> ");
    qb.push_bind(viewer);

    if !query.blocked_ids.is_empty() {
        qb.push(" AND p.user_id <> ALL(");
        qb.push_bind(raw_ids(&query.blocked_ids));
        qb.push(")");
    }
    if !query.skip_ids.is_empty() {
        qb.push(" AND p.id <> ALL(");
        qb.push_bind(raw_ids(&query.skip_ids));
        qb.push(")");
    }

    // Posts the viewer already skipped, rated or answered
    qb.push(" AND NOT EXISTS (SELECT 1 FROM post_skips s WHERE s.post_id = p.id AND s.user_id = ");
    qb.push_bind(viewer);
    if let Some(since) = query.interactions_since {
        qb.push(" AND s.created_at > ");
        qb.push_bind(since);
    }
    qb.push(")");

    qb.push(" AND NOT EXISTS (SELECT 1 FROM ratings r WHERE r.post_id = p.id AND r.value <> 0 AND r.user_id = ");
    qb.push_bind(viewer);
    if let Some(since) = query.interactions_since {
        qb.push(" AND r.created_at > ");
        qb.push_bind(since);
    }
    qb.push(")");

    qb.push(" AND NOT EXISTS (SELECT 1 FROM user_messages m WHERE m.initiating_post_id = p.id AND m.user_id = ");
    qb.push_bind(viewer);
    if let Some(since) = query.interactions_since {
        qb.push(" AND m.created_at > ");
        qb.push_bind(since);
    }
    qb.push(")");

    if let Some(gender) = query.gender {
        qb.push(" AND p.gender = ");
        qb.push_bind(gender.as_str());
    }

    if let Some(band) = query.age_band {
        match (band.youngest_dob, band.oldest_dob) {
            (Some(youngest), Some(oldest)) => {
                qb.push(" AND (p.dob IS NULL OR (p.dob <= ");
                qb.push_bind(youngest);
                qb.push(" AND p.dob >= ");
                qb.push_bind(oldest);
                qb.push("))");
            }
            (Some(youngest), None) => {
                qb.push(" AND (p.dob IS NULL OR p.dob <= ");
                qb.push_bind(youngest);
                qb.push(")");
            }
            (None, Some(oldest)) => {
                qb.push(" AND (p.dob IS NULL OR p.dob >= ");
                qb.push_bind(oldest);
                qb.push(")");
            }
            (None, None) => {}
        }
    }

    if let Some(mood) = &query.mood {
        qb.push(" AND p.mood = ");
        qb.push_bind(mood.clone());
    }

    if let Some(locations) = &query.location_ids {
        qb.push(" AND p.location_id = ANY(");
        qb.push_bind(raw_ids(locations));
        qb.push(")");
    }

    if query.stage.orders_by_activity() {
        qb.push(" ORDER BY p.user_last_active_at DESC NULLS LAST, p.id DESC");
    } else {
        qb.push(" ORDER BY p.created_at DESC, p.id DESC");
    }

    if let Some(limit) = query.effective_limit() {
        qb.push(" LIMIT ");
        qb.push_bind(limit);
    }

    qb
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use friended_core::feed::{AgeBand, FeedRules, FeedStage};
    use friended_core::value_objects::{Gender, Snowflake};

    fn query(stage: FeedStage) -> FeedQuery {
        FeedQuery::new(stage, Snowflake::new(1), Utc::now(), &FeedRules::default())
    }

    #[test]
    fn test_all_stage_has_no_time_scope() {
        let qb = build_feed_query(&query(FeedStage::All));
        let sql = qb.sql();
        assert!(!sql.contains("p.created_at >"));
        assert!(!sql.contains("p.user_last_active_at >"));
        assert!(!sql.contains("LIMIT"));
        assert!(sql.contains("ORDER BY p.created_at DESC"));
    }

    #[test]
    fn test_active_stage_orders_by_activity_and_caps() {
        let qb = build_feed_query(&query(FeedStage::Active));
        let sql = qb.sql();
        assert!(sql.contains("p.user_last_active_at >"));
        assert!(sql.contains("ORDER BY p.user_last_active_at DESC"));
        assert!(sql.contains("LIMIT"));
    }

    #[test]
    fn test_recent_interactions_are_windowed() {
        let qb = build_feed_query(&query(FeedStage::Now));
        let sql = qb.sql();
        assert!(sql.contains("s.created_at >"));
        assert!(sql.contains("r.created_at >"));
        assert!(sql.contains("m.created_at >"));

        let qb = build_feed_query(&query(FeedStage::All));
        assert!(!qb.sql().contains("s.created_at >"));
    }

    #[test]
    fn test_optional_filters() {
        let mut q = query(FeedStage::Recent);
        q.gender = Some(Gender::Female);
        q.mood = Some("flirty".to_string());
        q.blocked_ids = vec![Snowflake::new(5)];
        q.skip_ids = vec![Snowflake::new(6)];
        q.location_ids = Some(vec![Snowflake::new(7)]);
        q.age_band = Some(AgeBand {
            youngest_dob: NaiveDate::from_ymd_opt(2000, 1, 1),
            oldest_dob: None,
        });

        let qb = build_feed_query(&q);
        let sql = qb.sql();
        assert!(sql.contains("p.gender ="));
        assert!(sql.contains("p.mood ="));
        assert!(sql.contains("p.user_id <> ALL("));
        assert!(sql.contains("p.id <> ALL("));
        assert!(sql.contains("p.location_id = ANY("));
        assert!(sql.contains("p.dob IS NULL OR p.dob <="));
    }

    #[test]
    fn test_empty_lists_add_no_clause() {
        let qb = build_feed_query(&query(FeedStage::Recent));
        let sql = qb.sql();
        assert!(!sql.contains("ALL("));
        assert!(!sql.contains("ANY("));
    }
}
