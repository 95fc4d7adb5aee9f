//! Poll questions and the icebreaker posts that answer them

use chrono::{DateTime, NaiveDate, Utc};

use crate::value_objects::{Gender, Snowflake};

/// Mood assigned when a post is created without one
pub const DEFAULT_MOOD: &str = "friendly";

/// Placeholder replaced by the response text or a first name
pub const PLACEHOLDER: &str = "%@";

/// Prompt users respond to. `post_display_format` embeds the response at `%@`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollQuestion {
    pub id: Snowflake,
    pub text: String,
    pub post_display_format: String,
    /// Intro questions do not start the posting cooldown
    pub intro_only: bool,
    pub hidden: bool,
    pub created_at: DateTime<Utc>,
}

/// A user's response to a poll question
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: Snowflake,
    pub user_id: Snowflake,
    pub poll_question_id: Snowflake,
    pub response_text: String,
    pub external_image_url: Option<String>,
    pub mood: String,
    pub background_color: Option<String>,
    // Copied from the author so the feed can filter without joins
    pub gender: Gender,
    pub dob: Option<NaiveDate>,
    pub location_id: Option<Snowflake>,
    pub flag_count: i32,
    pub deleted: bool,
    pub needs_moderation: bool,
    pub moderated: bool,
    pub rating_count: i32,
    pub user_last_active_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(
        id: Snowflake,
        user_id: Snowflake,
        poll_question_id: Snowflake,
        response_text: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            poll_question_id,
            response_text: response_text.trim().to_string(),
            external_image_url: None,
            mood: DEFAULT_MOOD.to_string(),
            background_color: None,
            gender: Gender::Unknown,
            dob: None,
            location_id: None,
            flag_count: 0,
            deleted: false,
            needs_moderation: false,
            moderated: false,
            rating_count: 0,
            user_last_active_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    /// Empty or missing moods fall back to [`DEFAULT_MOOD`]
    pub fn set_mood(&mut self, mood: Option<&str>) {
        self.mood = match mood.map(str::trim) {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => DEFAULT_MOOD.to_string(),
        };
    }

    /// Record a flag and return true when the post crossed `threshold` and was removed
    pub fn flag(&mut self, threshold: i32) -> bool {
        self.flag_count += 1;
        if self.flag_count >= threshold && !self.deleted {
            self.deleted = true;
            return true;
        }
        false
    }

    /// Rendered text, e.g. `"I'd love to visit %@"` with `"Rome"`
    pub fn full_text(&self, question: &PollQuestion) -> String {
        full_text(&question.post_display_format, &self.response_text)
    }
}

pub fn full_text(display_format: &str, response_text: &str) -> String {
    if display_format.contains(PLACEHOLDER) {
        display_format.replace(PLACEHOLDER, response_text)
    } else {
        response_text.to_string()
    }
}

/// Rating left on a post; positive values count as likes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rating {
    pub user_id: Snowflake,
    pub post_id: Snowflake,
    pub value: i32,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of one feed stage, kept for feed tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostsFeedResult {
    pub id: Snowflake,
    pub user_id: Snowflake,
    pub num_results: i32,
    pub gender_filter: Option<String>,
    pub mood_filter: Option<String>,
    pub location_filter: Option<String>,
    pub time_filter: String,
    pub created_at: DateTime<Utc>,
}

/// Returns the first filter term found in `text`, compared case-insensitively
pub fn find_filtered_term<'a>(text: &str, terms: &'a [String]) -> Option<&'a str> {
    let haystack = text.to_lowercase();
    terms
        .iter()
        .map(String::as_str)
        .filter(|t| !t.trim().is_empty())
        .find(|t| haystack.contains(&t.to_lowercase()))
}

/// Hidden reason recorded when a post trips the solicitation filter
pub fn suspension_reason(on: NaiveDate, post_id: Snowflake) -> String {
    format!(
        "Suspended account: violation of terms {} for Post {post_id}",
        on.format("%Y%m%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(format: &str) -> PollQuestion {
        PollQuestion {
            id: Snowflake::new(10),
            text: "Where to?".to_string(),
            post_display_format: format.to_string(),
            intro_only: false,
            hidden: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_new_post_trims_text_and_defaults_mood() {
        let post = Post::new(Snowflake::new(1), Snowflake::new(2), Snowflake::new(3), "  hi  ");
        assert_eq!(post.response_text, "hi");
        assert_eq!(post.mood, DEFAULT_MOOD);
    }

    #[test]
    fn test_set_mood_blank_falls_back() {
        let mut post = Post::new(Snowflake::new(1), Snowflake::new(2), Snowflake::new(3), "x");
        post.set_mood(Some("flirty"));
        assert_eq!(post.mood, "flirty");
        post.set_mood(Some("  "));
        assert_eq!(post.mood, DEFAULT_MOOD);
        post.set_mood(None);
        assert_eq!(post.mood, DEFAULT_MOOD);
    }

    #[test]
    fn test_full_text_replaces_every_placeholder() {
        let post = Post::new(Snowflake::new(1), Snowflake::new(2), Snowflake::new(3), "Rome");
        assert_eq!(post.full_text(&question("I'd love to visit %@")), "I'd love to visit Rome");
        assert_eq!(full_text("%@ and %@", "tea"), "tea and tea");
        assert_eq!(full_text("no placeholder", "tea"), "tea");
    }

    #[test]
    fn test_flag_deletes_at_threshold() {
        let mut post = Post::new(Snowflake::new(1), Snowflake::new(2), Snowflake::new(3), "x");
        assert!(!post.flag(3));
        assert!(!post.flag(3));
        assert!(post.flag(3));
        assert!(post.deleted);
        assert!(!post.flag(3));
        assert_eq!(post.flag_count, 4);
    }

    #[test]
    fn test_find_filtered_term() {
        let terms = vec!["venmo".to_string(), String::new(), "cash app".to_string()];
        assert_eq!(find_filtered_term("Send me $ on VENMO", &terms), Some("venmo"));
        assert_eq!(find_filtered_term("cash APP me", &terms), Some("cash app"));
        assert_eq!(find_filtered_term("coffee?", &terms), None);
    }

    #[test]
    fn test_suspension_reason_format() {
        let on = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            suspension_reason(on, Snowflake::new(99)),
            "Suspended account: violation of terms 20240307 for Post 99"
        );
    }
}
