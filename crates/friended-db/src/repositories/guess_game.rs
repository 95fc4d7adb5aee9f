//! PostgreSQL implementations of the guess game repositories

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use friended_core::entities::{
    AnonGuessGameAnswer, GuessGame, GuessGameAnswer, GuessGameChoice, GuessGameQuestion,
};
use friended_core::error::DomainError;
use friended_core::traits::{GuessGameRepository, GuessQuestionRepository, RepoResult};
use friended_core::value_objects::Snowflake;

use crate::mappers::{raw_id, raw_ids};
use crate::models::{
    AnonGuessGameAnswerModel, GuessGameAnswerModel, GuessGameChoiceModel, GuessGameModel,
    GuessGameQuestionModel,
};

use super::error::{game_not_found, map_db_error, map_unique_violation};

// ============================================================================
// Games and answers
// ============================================================================

/// PostgreSQL implementation of GuessGameRepository
#[derive(Clone)]
pub struct PgGuessGameRepository {
    pool: PgPool,
}

impl PgGuessGameRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GuessGameRepository for PgGuessGameRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<GuessGame>> {
        let result = sqlx::query_as::<_, GuessGameModel>(
            r"
            SELECT id, by_user_id, about_user_id, user_message_id, have_all_answers,
                   created_at, updated_at
            FROM guess_games
            WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(GuessGame::from))
    }

    #[instrument(skip(self))]
    async fn find_open_game(&self, by: Snowflake, about: Snowflake) -> RepoResult<Option<GuessGame>> {
        let result = sqlx::query_as::<_, GuessGameModel>(
            r"
            SELECT id, by_user_id, about_user_id, user_message_id, have_all_answers,
                   created_at, updated_at
            FROM guess_games
            WHERE by_user_id = $1 AND about_user_id = $2 AND have_all_answers = FALSE
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            ",
        )
        .bind(by.into_inner())
        .bind(about.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(GuessGame::from))
    }

    #[instrument(skip(self, game), fields(game_id = %game.id))]
    async fn create(&self, game: &GuessGame) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO guess_games (id, by_user_id, about_user_id, user_message_id,
                                     have_all_answers, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(game.id.into_inner())
        .bind(game.by_user_id.into_inner())
        .bind(game.about_user_id.into_inner())
        .bind(raw_id(game.user_message_id))
        .bind(game.have_all_answers)
        .bind(game.created_at)
        .bind(game.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_have_all_answers(&self, id: Snowflake, value: bool) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE guess_games SET have_all_answers = $2, updated_at = NOW() WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(game_not_found(id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn games_about(&self, user_id: Snowflake) -> RepoResult<Vec<GuessGame>> {
        let rows = sqlx::query_as::<_, GuessGameModel>(
            r"
            SELECT id, by_user_id, about_user_id, user_message_id, have_all_answers,
                   created_at, updated_at
            FROM guess_games
            WHERE about_user_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(GuessGame::from).collect())
    }

    #[instrument(skip(self))]
    async fn answers_for_game(&self, game_id: Snowflake) -> RepoResult<Vec<GuessGameAnswer>> {
        let rows = sqlx::query_as::<_, GuessGameAnswerModel>(
            r"
            SELECT id, by_user_id, about_user_id, question_id, choice_id, game_id, is_correct,
                   created_at, updated_at
            FROM guess_game_answers
            WHERE game_id = $1
            ORDER BY created_at, id
            ",
        )
        .bind(game_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(GuessGameAnswer::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_answer(
        &self,
        question_id: Snowflake,
        by: Snowflake,
        about: Snowflake,
    ) -> RepoResult<Option<GuessGameAnswer>> {
        let result = sqlx::query_as::<_, GuessGameAnswerModel>(
            r"
            SELECT id, by_user_id, about_user_id, question_id, choice_id, game_id, is_correct,
                   created_at, updated_at
            FROM guess_game_answers
            WHERE question_id = $1 AND by_user_id = $2 AND about_user_id = $3
            ",
        )
        .bind(question_id.into_inner())
        .bind(by.into_inner())
        .bind(about.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(GuessGameAnswer::from))
    }

    #[instrument(skip(self, answer), fields(answer_id = %answer.id))]
    async fn create_answer(&self, answer: &GuessGameAnswer) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO guess_game_answers (id, by_user_id, about_user_id, question_id, choice_id,
                                            game_id, is_correct, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(answer.id.into_inner())
        .bind(answer.by_user_id.into_inner())
        .bind(answer.about_user_id.into_inner())
        .bind(answer.question_id.into_inner())
        .bind(answer.choice_id.into_inner())
        .bind(raw_id(answer.game_id))
        .bind(answer.is_correct)
        .bind(answer.created_at)
        .bind(answer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, || DomainError::AlreadyAnswered))?;

        Ok(())
    }

    #[instrument(skip(self, answer), fields(answer_id = %answer.id))]
    async fn update_answer(&self, answer: &GuessGameAnswer) -> RepoResult<()> {
        sqlx::query(
            r"
            UPDATE guess_game_answers
            SET choice_id = $2, game_id = $3, is_correct = $4, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(answer.id.into_inner())
        .bind(answer.choice_id.into_inner())
        .bind(raw_id(answer.game_id))
        .bind(answer.is_correct)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn self_answers(&self, user_id: Snowflake) -> RepoResult<Vec<GuessGameAnswer>> {
        let rows = sqlx::query_as::<_, GuessGameAnswerModel>(
            r"
            SELECT id, by_user_id, about_user_id, question_id, choice_id, game_id, is_correct,
                   created_at, updated_at
            FROM guess_game_answers
            WHERE by_user_id = $1 AND about_user_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(GuessGameAnswer::from).collect())
    }

    #[instrument(skip(self))]
    async fn guesses_for_question(&self, about: Snowflake, question_id: Snowflake) -> RepoResult<Vec<GuessGameAnswer>> {
        let rows = sqlx::query_as::<_, GuessGameAnswerModel>(
            r"
            SELECT id, by_user_id, about_user_id, question_id, choice_id, game_id, is_correct,
                   created_at, updated_at
            FROM guess_game_answers
            WHERE about_user_id = $1 AND by_user_id <> $1 AND question_id = $2
            ",
        )
        .bind(about.into_inner())
        .bind(question_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(GuessGameAnswer::from).collect())
    }

    #[instrument(skip(self))]
    async fn guesses_about(&self, about: Snowflake) -> RepoResult<Vec<GuessGameAnswer>> {
        let rows = sqlx::query_as::<_, GuessGameAnswerModel>(
            r"
            SELECT id, by_user_id, about_user_id, question_id, choice_id, game_id, is_correct,
                   created_at, updated_at
            FROM guess_game_answers
            WHERE about_user_id = $1 AND by_user_id <> $1
            ",
        )
        .bind(about.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(GuessGameAnswer::from).collect())
    }

    #[instrument(skip(self))]
    async fn guessed_question_ids(&self, by: Snowflake, about: Snowflake) -> RepoResult<Vec<Snowflake>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r"
            SELECT question_id FROM guess_game_answers WHERE by_user_id = $1 AND about_user_id = $2
            ",
        )
        .bind(by.into_inner())
        .bind(about.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(ids.into_iter().map(Snowflake::new).collect())
    }

    #[instrument(skip(self, answers), fields(count = answers.len()))]
    async fn create_anon_answers(&self, answers: &[AnonGuessGameAnswer]) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        for answer in answers {
            sqlx::query(
                r"
                INSERT INTO anon_guess_game_answers (id, uuid, source, name, about_user_id,
                                                     question_id, choice_id, is_correct, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ",
            )
            .bind(answer.id.into_inner())
            .bind(&answer.uuid)
            .bind(&answer.source)
            .bind(&answer.name)
            .bind(answer.about_user_id.into_inner())
            .bind(answer.question_id.into_inner())
            .bind(answer.choice_id.into_inner())
            .bind(answer.is_correct)
            .bind(answer.created_at)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn anon_answers_about(&self, user_id: Snowflake) -> RepoResult<Vec<AnonGuessGameAnswer>> {
        let rows = sqlx::query_as::<_, AnonGuessGameAnswerModel>(
            r"
            SELECT id, uuid, source, name, about_user_id, question_id, choice_id, is_correct,
                   created_at
            FROM anon_guess_game_answers
            WHERE about_user_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(AnonGuessGameAnswer::from).collect())
    }

    #[instrument(skip(self))]
    async fn rename_anon(&self, uuid: &str, name: &str) -> RepoResult<u64> {
        let result = sqlx::query(
            r"
            UPDATE anon_guess_game_answers SET name = $2 WHERE uuid = $1
            ",
        )
        .bind(uuid)
        .bind(name)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }
}

// ============================================================================
// Questions and choices
// ============================================================================

#[derive(Clone)]
pub struct PgGuessQuestionRepository {
    pool: PgPool,
}

impl PgGuessQuestionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GuessQuestionRepository for PgGuessQuestionRepository {
    #[instrument(skip(self))]
    async fn list_visible(&self) -> RepoResult<Vec<GuessGameQuestion>> {
        let rows = sqlx::query_as::<_, GuessGameQuestionModel>(
            r"
            SELECT id, text, my_text, hidden
            FROM guess_game_questions
            WHERE hidden = FALSE
            ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(GuessGameQuestion::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<GuessGameQuestion>> {
        let result = sqlx::query_as::<_, GuessGameQuestionModel>(
            r"
            SELECT id, text, my_text, hidden FROM guess_game_questions WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(GuessGameQuestion::from))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_by_ids(&self, ids: &[Snowflake]) -> RepoResult<Vec<GuessGameQuestion>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, GuessGameQuestionModel>(
            r"
            SELECT id, text, my_text, hidden FROM guess_game_questions WHERE id = ANY($1)
            ",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(GuessGameQuestion::from).collect())
    }

    #[instrument(skip(self, question_ids), fields(count = question_ids.len()))]
    async fn choices_for(&self, question_ids: &[Snowflake]) -> RepoResult<Vec<GuessGameChoice>> {
        if question_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, GuessGameChoiceModel>(
            r"
            SELECT id, question_id, text, my_text, hidden
            FROM guess_game_choices
            WHERE question_id = ANY($1) AND hidden = FALSE
            ORDER BY question_id, id
            ",
        )
        .bind(raw_ids(question_ids))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(GuessGameChoice::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_choice(&self, id: Snowflake) -> RepoResult<Option<GuessGameChoice>> {
        let result = sqlx::query_as::<_, GuessGameChoiceModel>(
            r"
            SELECT id, question_id, text, my_text, hidden FROM guess_game_choices WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(GuessGameChoice::from))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_choices(&self, ids: &[Snowflake]) -> RepoResult<Vec<GuessGameChoice>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, GuessGameChoiceModel>(
            r"
            SELECT id, question_id, text, my_text, hidden FROM guess_game_choices WHERE id = ANY($1)
            ",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(GuessGameChoice::from).collect())
    }
}
