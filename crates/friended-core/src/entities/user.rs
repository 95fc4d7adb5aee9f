//! User entity and the per-user settings row

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};

use crate::value_objects::{Gender, Snowflake};

/// Reason recorded on accounts that fail the minimum age check
pub const UNDERAGE_REASON: &str = "You must be at least 18 years old to use Friended.";

/// Reason recorded when a user signs in from a blacklisted device
pub const BLACKLISTED_DEVICE_REASON: &str = "device is blacklisted";

/// A Friended account
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Snowflake,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub dob: Option<NaiveDate>,
    pub estimated_dob: bool,
    pub gender: Gender,
    pub admin: bool,
    pub provider: Option<String>,
    pub provider_id: Option<String>,
    /// Device uuid the account last signed in from
    pub uuid: Option<String>,
    pub hidden_reason: Option<String>,
    pub ban_reason: Option<String>,
    pub external_image_url: Option<String>,
    pub location_id: Option<Snowflake>,
    pub posts_count: i32,
    pub messages_received_count: i32,
    pub active_conversations_count: i32,
    pub last_active_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: Snowflake, first_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            first_name: first_name.into(),
            last_name: String::new(),
            email: None,
            dob: None,
            estimated_dob: false,
            gender: Gender::Unknown,
            admin: false,
            provider: None,
            provider_id: None,
            uuid: None,
            hidden_reason: None,
            ban_reason: None,
            external_image_url: None,
            location_id: None,
            posts_count: 0,
            messages_received_count: 0,
            active_conversations_count: 0,
            last_active_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Hidden users keep their account but disappear from feeds and notifications
    #[inline]
    pub fn is_hidden(&self) -> bool {
        self.hidden_reason.as_deref().is_some_and(|r| !r.is_empty())
    }

    #[inline]
    pub fn is_banned(&self) -> bool {
        self.ban_reason.as_deref().is_some_and(|r| !r.is_empty())
    }

    /// Whole years between `dob` and `today`
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        let dob = self.dob?;
        let mut age = today.year() - dob.year();
        if (today.month(), today.day()) < (dob.month(), dob.day()) {
            age -= 1;
        }
        u32::try_from(age).ok()
    }

    pub fn is_underage(&self, today: NaiveDate, minimum_age: u32) -> bool {
        self.dob.is_some() && self.age_on(today).map_or(true, |age| age < minimum_age)
    }

    /// Ban and hide the account when the date of birth is below `minimum_age`.
    /// Returns true when the ban was applied.
    pub fn apply_age_restriction(&mut self, today: NaiveDate, minimum_age: u32) -> bool {
        if !self.is_underage(today, minimum_age) {
            return false;
        }
        self.ban_reason = Some(UNDERAGE_REASON.to_string());
        self.hidden_reason = Some(UNDERAGE_REASON.to_string());
        true
    }
}

/// Friendship row direction state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendshipStatus {
    Pending,
    Accepted,
}

impl FriendshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
        }
    }

    pub fn parse(s: &str) -> Self {
        if s == "accepted" {
            Self::Accepted
        } else {
            Self::Pending
        }
    }
}

/// `user_id` asked to be friends with `friend_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Friendship {
    pub user_id: Snowflake,
    pub friend_id: Snowflake,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
}

impl Friendship {
    pub fn pending(user_id: Snowflake, friend_id: Snowflake) -> Self {
        Self {
            user_id,
            friend_id,
            status: FriendshipStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// Friend state of another user as seen by the viewer, rendered as `is_a_friend`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendState {
    No,
    Pending,
    Yes,
}

impl FriendState {
    pub fn from_rows(rows: &[Friendship]) -> Self {
        if rows.iter().any(|f| f.status == FriendshipStatus::Accepted) {
            Self::Yes
        } else if rows.is_empty() {
            Self::No
        } else {
            Self::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::No => "no",
            Self::Pending => "pending",
            Self::Yes => "yes",
        }
    }

    pub fn is_friend(&self) -> bool {
        matches!(self, Self::Yes)
    }
}

/// Per-user counters and preferences
#[derive(Debug, Clone, PartialEq)]
pub struct UserSettings {
    pub user_id: Snowflake,
    pub purchased_posts: i32,
    pub purchased_posts_used: i32,
    pub next_post_allowed: Option<DateTime<Utc>>,
    pub pro_subscription_expiration: Option<DateTime<Utc>>,
    pub subscription_state: Option<String>,
    /// Youngest date of birth shown in the feed
    pub feed_filter_min: Option<NaiveDate>,
    /// Oldest date of birth shown in the feed
    pub feed_filter_max: Option<NaiveDate>,
    pub location_type: Option<String>,
    pub client_version: Option<String>,
}

impl UserSettings {
    pub fn new(user_id: Snowflake) -> Self {
        Self {
            user_id,
            purchased_posts: 0,
            purchased_posts_used: 0,
            next_post_allowed: None,
            pro_subscription_expiration: None,
            subscription_state: None,
            feed_filter_min: None,
            feed_filter_max: None,
            location_type: None,
            client_version: None,
        }
    }

    pub fn purchased_posts_remaining(&self) -> i32 {
        self.purchased_posts - self.purchased_posts_used
    }

    pub fn is_pro(&self, now: DateTime<Utc>) -> bool {
        self.pro_subscription_expiration.is_some_and(|exp| exp >= now)
    }

    /// Seconds until `next_post_allowed`, negative once the wait is over
    pub fn seconds_until_next_post(&self, now: DateTime<Utc>) -> i64 {
        self.next_post_allowed
            .map_or(0, |next| (next - now).num_seconds())
    }

    pub fn has_stored_feed_band(&self) -> bool {
        self.feed_filter_min.is_some() || self.feed_filter_max.is_some()
    }

    /// Grant `days` of pro access, used for referrals
    pub fn grant_free_pro(&mut self, now: DateTime<Utc>, days: i64) {
        self.pro_subscription_expiration = Some(now + Duration::days(days));
        self.subscription_state = Some("free".to_string());
    }
}

/// Geographic point attached to users and posts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub id: Snowflake,
    pub latitude: f64,
    pub longitude: f64,
}

/// A phone installation identified by its uuid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: Snowflake,
    pub uuid: String,
    pub user_id: Option<Snowflake>,
    pub is_blacklisted: bool,
}

/// Date `years` before `today`, clamped to the end of month for Feb 29
pub fn years_before(today: NaiveDate, years: u32) -> NaiveDate {
    today
        .checked_sub_months(Months::new(years * 12))
        .unwrap_or(today)
}
