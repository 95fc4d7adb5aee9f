//! Mobile client version reported through user settings

use std::cmp::Ordering;

/// Dotted numeric version such as `2.5.0`. Missing components compare as zero.
#[derive(Debug, Clone)]
pub struct ClientVersion(Vec<u32>);

impl ClientVersion {
    pub fn parse(s: &str) -> Option<Self> {
        let parts = s
            .trim()
            .split('.')
            .map(|p| p.parse::<u32>().ok())
            .collect::<Option<Vec<_>>>()?;
        if parts.is_empty() {
            return None;
        }
        Some(Self(parts))
    }

    /// True when `reported` is a parseable version older than `minimum`.
    /// Unknown or unparseable versions are never considered outdated.
    pub fn is_outdated(reported: Option<&str>, minimum: &str) -> bool {
        match (reported.and_then(Self::parse), Self::parse(minimum)) {
            (Some(reported), Some(minimum)) => reported < minimum,
            _ => false,
        }
    }
}

impl PartialEq for ClientVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ClientVersion {}

impl PartialOrd for ClientVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClientVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        for i in 0..len {
            let a = self.0.get(i).copied().unwrap_or(0);
            let b = other.0.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}
