//! Gender as stored on users and denormalised onto posts

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Unknown => "unknown",
        }
    }

    /// Strict parse used for profile updates
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Lenient parse for identity provider profiles, anything unrecognised is `Unknown`
    pub fn coerce(s: Option<&str>) -> Self {
        s.map(str::to_ascii_lowercase)
            .and_then(|g| Self::parse(&g))
            .unwrap_or_default()
    }

    /// Feed filter value; only `male` and `female` narrow the feed
    pub fn feed_filter(s: Option<&str>) -> Option<Self> {
        match s.and_then(Self::parse) {
            Some(Self::Unknown) | None => None,
            some => some,
        }
    }

    /// Third person pronoun used in guess game notifications
    pub fn pronoun(&self) -> &'static str {
        match self {
            Self::Male => "he",
            _ => "she",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
