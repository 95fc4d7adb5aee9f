//! Profile photos

use chrono::{DateTime, Utc};

use crate::value_objects::Snowflake;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPhoto {
    pub id: Snowflake,
    pub user_id: Snowflake,
    pub url: String,
    pub order_index: i32,
    pub needs_moderation: bool,
    pub moderated: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl UserPhoto {
    /// Visible to other users: not deleted and either exempt from or cleared by moderation
    #[inline]
    pub fn is_visible(&self) -> bool {
        !self.deleted && (!self.needs_moderation || self.moderated)
    }
}

fn ordered<'a>(photos: impl Iterator<Item = &'a UserPhoto>) -> Option<&'a UserPhoto> {
    photos.min_by_key(|p| (p.order_index, p.created_at))
}

/// First visible photo, shown to other users
pub fn primary_photo(photos: &[UserPhoto]) -> Option<&UserPhoto> {
    ordered(photos.iter().filter(|p| p.is_visible()))
}

/// First non-deleted photo regardless of moderation, shown to the owner
pub fn my_primary_photo(photos: &[UserPhoto]) -> Option<&UserPhoto> {
    ordered(photos.iter().filter(|p| !p.deleted))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(id: i64, order: i32, needs_moderation: bool, moderated: bool) -> UserPhoto {
        UserPhoto {
            id: Snowflake::new(id),
            user_id: Snowflake::new(1),
            url: format!("https://img/{id}.jpg"),
            order_index: order,
            needs_moderation,
            moderated,
            deleted: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_primary_skips_unmoderated() {
        let photos = vec![photo(1, 0, true, false), photo(2, 1, false, false)];
        assert_eq!(primary_photo(&photos).map(|p| p.id), Some(Snowflake::new(2)));
        assert_eq!(my_primary_photo(&photos).map(|p| p.id), Some(Snowflake::new(1)));
    }

    #[test]
    fn test_moderated_photo_is_visible() {
        let photos = vec![photo(1, 0, true, true)];
        assert!(primary_photo(&photos).is_some());
    }

    #[test]
    fn test_deleted_photo_never_primary() {
        let mut p = photo(1, 0, false, false);
        p.deleted = true;
        assert!(primary_photo(&[p.clone()]).is_none());
        assert!(my_primary_photo(&[p]).is_none());
    }
}
