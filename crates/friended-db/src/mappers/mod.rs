//! Model to entity mappers
//!
//! `From<Model> for Entity` impls convert database rows to domain objects. Writes bind
//! entity fields directly.

mod conversation;
mod guess_game;
mod post;
mod social;
mod user;

use friended_core::value_objects::Snowflake;

/// Raw ids for `= ANY($n)` binds
pub fn raw_ids(ids: &[Snowflake]) -> Vec<i64> {
    ids.iter().map(|id| id.into_inner()).collect()
}

pub fn raw_id(id: Option<Snowflake>) -> Option<i64> {
    id.map(Snowflake::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_ids() {
        assert_eq!(raw_ids(&[Snowflake::new(3), Snowflake::new(9)]), vec![3, 9]);
        assert!(raw_ids(&[]).is_empty());
        assert_eq!(raw_id(Some(Snowflake::new(4))), Some(4));
        assert_eq!(raw_id(None), None);
    }
}
