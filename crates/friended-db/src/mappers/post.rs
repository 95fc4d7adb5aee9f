//! Poll question and post <-> model mappers

use friended_core::entities::{PollQuestion, Post};
use friended_core::value_objects::{Gender, Snowflake};

use crate::models::{PollQuestionModel, PostModel};

impl From<PollQuestionModel> for PollQuestion {
    fn from(model: PollQuestionModel) -> Self {
        PollQuestion {
            id: Snowflake::new(model.id),
            text: model.text,
            post_display_format: model.post_display_format,
            intro_only: model.intro_only,
            hidden: model.hidden,
            created_at: model.created_at,
        }
    }
}

impl From<PostModel> for Post {
    fn from(model: PostModel) -> Self {
        Post {
            id: Snowflake::new(model.id),
            user_id: Snowflake::new(model.user_id),
            poll_question_id: Snowflake::new(model.poll_question_id),
            response_text: model.response_text,
            external_image_url: model.external_image_url,
            mood: model.mood,
            background_color: model.background_color,
            gender: Gender::coerce(Some(&model.gender)),
            dob: model.dob,
            location_id: model.location_id.map(Snowflake::new),
            flag_count: model.flag_count,
            deleted: model.deleted,
            needs_moderation: model.needs_moderation,
            moderated: model.moderated,
            rating_count: model.rating_count,
            user_last_active_at: model.user_last_active_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
