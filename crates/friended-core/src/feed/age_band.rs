//! Age banding: which dates of birth a viewer sees in the feed

use chrono::NaiveDate;
use serde::Deserialize;

use crate::entities::years_before;

/// Half-open age range: `min` is included, `max` is not
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

impl AgeRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains(&self, age: u32) -> bool {
        self.min <= age && age < self.max
    }
}

pub const DEFAULT_AGE_RANGES: [AgeRange; 6] = [
    AgeRange::new(18, 25),
    AgeRange::new(21, 30),
    AgeRange::new(25, 35),
    AgeRange::new(30, 45),
    AgeRange::new(40, 60),
    AgeRange::new(50, 100),
];

/// Union of every configured range containing `age`
pub fn band_for_age(age: u32, ranges: &[AgeRange]) -> Option<AgeRange> {
    ranges
        .iter()
        .filter(|r| r.contains(age))
        .fold(None, |acc: Option<AgeRange>, r| {
            Some(match acc {
                None => *r,
                Some(a) => AgeRange::new(a.min.min(r.min), a.max.max(r.max)),
            })
        })
}

/// Date of birth bounds. Posts without a date of birth always pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeBand {
    /// Latest admissible date of birth (youngest author)
    pub youngest_dob: Option<NaiveDate>,
    /// Earliest admissible date of birth (oldest author)
    pub oldest_dob: Option<NaiveDate>,
}

impl AgeBand {
    /// Band stored in user settings; `None` when neither bound is set
    pub fn stored(min: Option<NaiveDate>, max: Option<NaiveDate>) -> Option<Self> {
        if min.is_none() && max.is_none() {
            return None;
        }
        Some(Self {
            youngest_dob: min,
            oldest_dob: max,
        })
    }

    /// Band derived from the viewer's age. `None` when the age is outside every range
    /// or the bounds collapse to a single date.
    pub fn for_age(age: u32, today: NaiveDate, ranges: &[AgeRange]) -> Option<Self> {
        let range = band_for_age(age, ranges)?;
        let youngest = years_before(today, range.min);
        let oldest = years_before(today, range.max);
        if youngest == oldest {
            return None;
        }
        Some(Self {
            youngest_dob: Some(youngest),
            oldest_dob: Some(oldest),
        })
    }

    pub fn admits(&self, dob: Option<NaiveDate>) -> bool {
        let Some(dob) = dob else {
            return true;
        };
        self.youngest_dob.map_or(true, |min| dob <= min)
            && self.oldest_dob.map_or(true, |max| dob >= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_band_for_age_unions_overlapping_ranges() {
        assert_eq!(band_for_age(19, &DEFAULT_AGE_RANGES), Some(AgeRange::new(18, 25)));
        assert_eq!(band_for_age(23, &DEFAULT_AGE_RANGES), Some(AgeRange::new(18, 30)));
        assert_eq!(band_for_age(42, &DEFAULT_AGE_RANGES), Some(AgeRange::new(30, 60)));
        assert_eq!(band_for_age(17, &DEFAULT_AGE_RANGES), None);
        assert_eq!(band_for_age(120, &DEFAULT_AGE_RANGES), None);
    }

    #[test]
    fn test_band_for_age_excludes_upper_bound() {
        assert_eq!(band_for_age(18, &DEFAULT_AGE_RANGES), Some(AgeRange::new(18, 25)));
        assert_eq!(band_for_age(25, &DEFAULT_AGE_RANGES), Some(AgeRange::new(21, 35)));
        assert_eq!(band_for_age(30, &DEFAULT_AGE_RANGES), Some(AgeRange::new(25, 45)));
        assert_eq!(band_for_age(60, &DEFAULT_AGE_RANGES), Some(AgeRange::new(50, 100)));
        assert_eq!(band_for_age(99, &DEFAULT_AGE_RANGES), Some(AgeRange::new(50, 100)));
        assert_eq!(band_for_age(100, &DEFAULT_AGE_RANGES), None);
    }

    #[test]
    fn test_for_age_at_range_boundary() {
        let today = date(2024, 6, 1);
        let band = AgeBand::for_age(25, today, &DEFAULT_AGE_RANGES).unwrap();
        assert_eq!(band.youngest_dob, Some(date(2003, 6, 1)));
        assert_eq!(band.oldest_dob, Some(date(1989, 6, 1)));
        assert!(!band.admits(Some(date(2005, 1, 1))));
        assert_eq!(AgeBand::for_age(100, today, &DEFAULT_AGE_RANGES), None);
    }

    #[test]
    fn test_for_age_bounds() {
        let today = date(2024, 6, 1);
        let band = AgeBand::for_age(23, today, &DEFAULT_AGE_RANGES).unwrap();
        assert_eq!(band.youngest_dob, Some(date(2006, 6, 1)));
        assert_eq!(band.oldest_dob, Some(date(1994, 6, 1)));
        assert!(band.admits(Some(date(2000, 1, 1))));
        assert!(!band.admits(Some(date(2007, 1, 1))));
        assert!(!band.admits(Some(date(1990, 1, 1))));
        assert!(band.admits(None));
    }

    #[test]
    fn test_for_age_collapsed_range_is_ignored() {
        let today = date(2024, 6, 1);
        let ranges = [AgeRange::new(30, 30)];
        assert_eq!(AgeBand::for_age(30, today, &ranges), None);
    }

    #[test]
    fn test_stored_band_single_bound() {
        assert_eq!(AgeBand::stored(None, None), None);
        let band = AgeBand::stored(Some(date(2000, 1, 1)), None).unwrap();
        assert!(band.admits(Some(date(1960, 1, 1))));
        assert!(!band.admits(Some(date(2001, 1, 1))));
    }
}
