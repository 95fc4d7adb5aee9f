//! Guess game service
//!
//! Users answer personality questions about themselves and guess other users'
//! answers. Guesses collect into games; a completed game produces a message in the
//! conversation between the two users, rewritten once the guesses can be graded.
//! Grading after a self answer runs as a delayed background job.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::Utc;
use friended_common::AppError;
use friended_core::guess::{
    guessing_done_message, has_all_answers, is_scored, popular_guesses, rank_anonymous,
    score_percent, scored_message, GameMessage,
};
use friended_core::traits::GameMessageWrite;
use friended_core::{
    AnonGuessGameAnswer, ClientVersion, DomainError, GuessGame, GuessGameAnswer, GuessGameChoice,
    GuessGameQuestion, Notification, Snowflake, User,
};
use rand::seq::SliceRandom;
use tracing::{debug, info, instrument, warn};

use crate::dto::{
    AboutUserParams, AnonymousNameResponse, AnswerAnonymouslyRequest, AnswerParams, AnswerRequest,
    AnswerResponse, AnswerResultResponse, AnswersResponse, ChoiceResponse, GameEnvelope,
    GameIndexParams, GameResponse, GamesResponse, GuessPageResponse, GuessParams, GuesserResponse,
    PopularGuessResponse, PopularGuessesResponse, QuestionParams, QuestionResponse, QuestionsPage,
    QuestionsResponse, RankingsResponse, ShareLinkResponse, SingleQuestionResponse,
    UpdateAnonymousNameRequest,
};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::jobs::spawn_job;
use super::user::UserService;

const UNFINISHED: &str = "unfinished";

fn rejected(status: u16, message: &str) -> ServiceError {
    ServiceError::App(AppError::rejected(status, message))
}

/// Keep the first game per guesser; `games` is newest first
fn one_per_guesser(games: Vec<(GuessGame, Vec<GuessGameAnswer>)>) -> Vec<(GuessGame, Vec<GuessGameAnswer>)> {
    let mut seen = HashSet::new();
    games
        .into_iter()
        .filter(|(game, _)| seen.insert(game.by_user_id))
        .collect()
}

/// Games with every guess in that cannot be graded yet
fn is_unfinished(game: &GuessGame, answers: &[GuessGameAnswer]) -> bool {
    game.have_all_answers && !is_scored(answers)
}

/// Visible questions without those in `answered`, at most `max`
/// Whoever did not trigger the game message gets the push
fn game_message_recipient(game: &GuessGame, last_answerer: Snowflake) -> Snowflake {
    if last_answerer == game.by_user_id {
        game.about_user_id
    } else {
        game.by_user_id
    }
}

fn unanswered(questions: &[GuessGameQuestion], answered: &HashSet<Snowflake>, max: usize) -> Vec<GuessGameQuestion> {
    questions
        .iter()
        .filter(|q| !q.hidden && !answered.contains(&q.id))
        .take(max)
        .cloned()
        .collect()
}

/// Guess game service
pub struct GuessGameService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> GuessGameService<'a> {
    /// Create a new GuessGameService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    fn max_game_questions(&self) -> usize {
        self.ctx.rules().guess.max_game_questions
    }

    // ========================================================================
    // Games
    // ========================================================================

    /// Games about the viewer
    #[instrument(skip(self, params))]
    pub async fn index(&self, viewer_id: Snowflake, params: GameIndexParams) -> ServiceResult<GamesResponse> {
        let games = self.ctx.guess_game_repo().games_about(viewer_id).await?;

        let mut with_answers = Vec::with_capacity(games.len());
        for game in games {
            let answers = self.ctx.guess_game_repo().answers_for_game(game.id).await?;
            with_answers.push((game, answers));
        }

        if params.filter.as_deref() == Some(UNFINISHED) {
            with_answers.retain(|(game, answers)| is_unfinished(game, answers));
        }
        if params.unique_people {
            with_answers = one_per_guesser(with_answers);
        }

        let guesser_ids: Vec<Snowflake> = with_answers
            .iter()
            .map(|(g, _)| g.by_user_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let photos = UserService::new(self.ctx).photo_urls(&guesser_ids).await?;

        let games = with_answers
            .iter()
            .map(|(game, answers)| {
                let mut response = GameResponse::new(game, answers, self.max_game_questions());
                response.by_user_photo_url = photos.get(&game.by_user_id).cloned();
                response
            })
            .collect();

        Ok(GamesResponse { games })
    }

    async fn find_game_for_participant(&self, viewer_id: Snowflake, game_id: Snowflake) -> ServiceResult<GuessGame> {
        let game = self
            .ctx
            .guess_game_repo()
            .find_by_id(game_id)
            .await?
            .ok_or(DomainError::GameNotFound(game_id))?;
        if !game.is_participant(viewer_id) {
            return Err(DomainError::NotGameParticipant.into());
        }
        Ok(game)
    }

    /// One game with its answers
    #[instrument(skip(self))]
    pub async fn show(&self, viewer_id: Snowflake, game_id: Snowflake) -> ServiceResult<GameEnvelope> {
        let game = self.find_game_for_participant(viewer_id, game_id).await?;
        let answers = self.ctx.guess_game_repo().answers_for_game(game.id).await?;

        let mut response = GameResponse::new(&game, &answers, self.max_game_questions());
        let photos = UserService::new(self.ctx).photo_urls(&[game.by_user_id]).await?;
        response.by_user_photo_url = photos.get(&game.by_user_id).cloned();
        response.answers = Some(self.render_answers(&answers).await?);

        Ok(GameEnvelope { game: response })
    }

    // ========================================================================
    // Questions
    // ========================================================================

    #[instrument(skip(self, params))]
    pub async fn questions(&self, viewer_id: Snowflake, params: QuestionParams) -> ServiceResult<QuestionsPage> {
        let users = UserService::new(self.ctx);
        let viewer = users.find(viewer_id).await?;
        let max = params.max.unwrap_or_else(|| self.max_game_questions());

        if let Some(question_id) = params.question_id {
            let question = self
                .ctx
                .guess_question_repo()
                .find_by_id(question_id)
                .await?
                .filter(|q| !q.hidden)
                .ok_or(DomainError::GuessQuestionNotFound(question_id))?;
            let choices = self.ctx.guess_question_repo().choices_for(&[question.id]).await?;
            return Ok(QuestionsPage::Single(SingleQuestionResponse {
                about_user: users.render(&viewer, &viewer).await?,
                guess_game_question: QuestionResponse::render(&question, None, &choices),
            }));
        }

        let all = self.ctx.guess_question_repo().list_visible().await?;
        let answered_by_me: HashSet<Snowflake> = self
            .ctx
            .guess_game_repo()
            .self_answers(viewer.id)
            .await?
            .into_iter()
            .map(|a| a.question_id)
            .collect();

        if let Some(game_id) = params.game_id {
            let game = self
                .ctx
                .guess_game_repo()
                .find_by_id(game_id)
                .await?
                .ok_or_else(|| ServiceError::forbidden("Invalid game id."))?;
            if game.about_user_id != viewer.id {
                return Err(ServiceError::forbidden("This game is not about you."));
            }
            let in_game: HashSet<Snowflake> = self
                .ctx
                .guess_game_repo()
                .answers_for_game(game.id)
                .await?
                .into_iter()
                .map(|a| a.question_id)
                .collect();
            let questions: Vec<GuessGameQuestion> = all
                .into_iter()
                .filter(|q| in_game.contains(&q.id) && !answered_by_me.contains(&q.id))
                .collect();
            return Ok(QuestionsPage::Many(QuestionsResponse {
                about_user: Some(users.render(&viewer, &viewer).await?),
                guess_game_questions: self.render_questions(&questions, None).await?,
                questions_for_me: None,
            }));
        }

        match params.about_user_id.filter(|id| *id != viewer.id) {
            Some(about_id) => {
                let about = users.find(about_id).await?;
                let guessed: HashSet<Snowflake> = self
                    .ctx
                    .guess_game_repo()
                    .guessed_question_ids(viewer.id, about.id)
                    .await?
                    .into_iter()
                    .collect();
                let to_guess = unanswered(&all, &guessed, max);
                let for_me = unanswered(&all, &answered_by_me, max);
                Ok(QuestionsPage::Many(QuestionsResponse {
                    about_user: Some(users.render(&viewer, &about).await?),
                    guess_game_questions: self.render_questions(&to_guess, Some(&about.first_name)).await?,
                    questions_for_me: Some(self.render_questions(&for_me, None).await?),
                }))
            }
            None => {
                let for_me = unanswered(&all, &answered_by_me, max);
                Ok(QuestionsPage::Many(QuestionsResponse {
                    about_user: None,
                    guess_game_questions: self.render_questions(&for_me, None).await?,
                    questions_for_me: None,
                }))
            }
        }
    }

    async fn render_questions(
        &self,
        questions: &[GuessGameQuestion],
        name: Option<&str>,
    ) -> ServiceResult<Vec<QuestionResponse>> {
        if questions.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Snowflake> = questions.iter().map(|q| q.id).collect();
        let choices = self.ctx.guess_question_repo().choices_for(&ids).await?;
        Ok(questions
            .iter()
            .map(|q| QuestionResponse::render(q, name, &choices))
            .collect())
    }

    // ========================================================================
    // Answers
    // ========================================================================

    /// Answer about yourself or guess about someone else
    #[instrument(skip(self, request))]
    pub async fn answer(&self, viewer_id: Snowflake, request: AnswerRequest) -> ServiceResult<AnswerResultResponse> {
        let users = UserService::new(self.ctx);
        let viewer = users.find(viewer_id).await?;
        self.ctx
            .post_repo()
            .touch_user_activity(viewer.id, Utc::now())
            .await?;

        let about_id = request.about_user_id.unwrap_or(viewer.id);
        let about = self
            .ctx
            .user_repo()
            .find_by_id(about_id)
            .await?
            .ok_or_else(|| ServiceError::forbidden("The user you want to guess does not exist."))?;

        let (choice_ids, multiple) = match (request.guess_game_choice_ids, request.guess_game_choice_id) {
            (Some(ids), _) if !ids.is_empty() => (ids, true),
            (_, Some(id)) => (vec![id], false),
            _ => return Err(ServiceError::forbidden("Invalid choice id.")),
        };

        let mut saved = Vec::with_capacity(choice_ids.len());
        let mut latest_game = None;
        for choice_id in choice_ids {
            let choice = self
                .ctx
                .guess_question_repo()
                .find_choice(choice_id)
                .await?
                .ok_or(DomainError::GuessChoiceNotFound(choice_id))?;

            if about.id == viewer.id {
                saved.push(self.save_self_answer(&viewer, &choice).await?);
            } else {
                let (answer, game) = self.save_guess(&viewer, &about, &choice).await?;
                saved.push(answer);
                latest_game = Some(game);
            }
        }

        let game = match latest_game {
            Some(game) => {
                let game = self
                    .ctx
                    .guess_game_repo()
                    .find_by_id(game.id)
                    .await?
                    .unwrap_or(game);
                let answers = self.ctx.guess_game_repo().answers_for_game(game.id).await?;
                Some(GameResponse::new(&game, &answers, self.max_game_questions()))
            }
            None => None,
        };

        let mut rendered = self.render_answers(&saved).await?;
        let about_user = users.render(&viewer, &about).await?;

        if multiple {
            Ok(AnswerResultResponse {
                answer: None,
                answers: Some(rendered),
                about_user,
                game,
            })
        } else {
            Ok(AnswerResultResponse {
                answer: rendered.pop(),
                answers: None,
                about_user,
                game,
            })
        }
    }

    /// Create or change a self answer, then grade guesses about the viewer later
    async fn save_self_answer(&self, viewer: &User, choice: &GuessGameChoice) -> ServiceResult<GuessGameAnswer> {
        let repo = self.ctx.guess_game_repo();
        let answer = match repo.find_answer(choice.question_id, viewer.id, viewer.id).await? {
            Some(mut existing) => {
                existing.choice_id = choice.id;
                existing.updated_at = Utc::now();
                repo.update_answer(&existing).await?;
                existing
            }
            None => {
                let answer = GuessGameAnswer::new(self.ctx.generate_id(), viewer.id, viewer.id, choice);
                repo.create_answer(&answer).await?;
                answer
            }
        };

        info!(user_id = %viewer.id, question_id = %choice.question_id, "Self answer saved");

        let delay = Duration::from_millis(self.ctx.rules().guess.score_job_delay_ms);
        spawn_job(
            "score_guesses",
            Some(delay),
            score_guesses(self.ctx.clone(), viewer.id, choice.question_id),
        );

        Ok(answer)
    }

    /// Record a guess in the open game for the pair, then check the game
    async fn save_guess(
        &self,
        by: &User,
        about: &User,
        choice: &GuessGameChoice,
    ) -> ServiceResult<(GuessGameAnswer, GuessGame)> {
        let repo = self.ctx.guess_game_repo();
        if repo.find_answer(choice.question_id, by.id, about.id).await?.is_some() {
            return Err(DomainError::AlreadyAnswered.into());
        }

        let mut game = self.latest_game(by.id, about.id).await?;

        let own = repo.find_answer(choice.question_id, about.id, about.id).await?;
        let mut answer = GuessGameAnswer::new(self.ctx.generate_id(), by.id, about.id, choice);
        answer.game_id = Some(game.id);
        answer.grade_against(own.as_ref());
        repo.create_answer(&answer).await?;

        let count = repo.answers_for_game(game.id).await?.len();
        let complete = has_all_answers(count, self.max_game_questions());
        if complete != game.have_all_answers {
            repo.set_have_all_answers(game.id, complete).await?;
            game.have_all_answers = complete;
        }

        debug!(game_id = %game.id, count, complete, "Guess saved");

        self.check(game.id, by.id).await?;
        Ok((answer, game))
    }

    /// The newest open game for the pair, or a new one
    async fn latest_game(&self, by: Snowflake, about: Snowflake) -> ServiceResult<GuessGame> {
        if let Some(game) = self.ctx.guess_game_repo().find_open_game(by, about).await? {
            return Ok(game);
        }
        let game = GuessGame::new(self.ctx.generate_id(), by, about);
        self.ctx.guess_game_repo().create(&game).await?;
        info!(game_id = %game.id, by_user_id = %by, about_user_id = %about, "Guess game started");
        Ok(game)
    }

    /// Write the game message once every guess is in
    pub async fn check(&self, game_id: Snowflake, last_answerer: Snowflake) -> ServiceResult<()> {
        let Some(game) = self.ctx.guess_game_repo().find_by_id(game_id).await? else {
            return Ok(());
        };
        if !game.have_all_answers {
            return Ok(());
        }

        let answers = self.ctx.guess_game_repo().answers_for_game(game.id).await?;
        let users = UserService::new(self.ctx);
        let by = users.find(game.by_user_id).await?;
        let about = users.find(game.about_user_id).await?;

        let message = if is_scored(&answers) {
            scored_message(
                &by.first_name,
                &about.first_name,
                score_percent(&answers),
                last_answerer == by.id,
            )
        } else if game.user_message_id.is_none() {
            let settings = self.ctx.settings_repo().find_or_default(about.id).await?;
            let outdated = ClientVersion::is_outdated(
                settings.client_version.as_deref(),
                &self.ctx.rules().guess.min_client_version,
            );
            guessing_done_message(&by.first_name, by.gender, outdated)
        } else {
            return Ok(());
        };

        self.create_or_update_game_message(&game, message, last_answerer).await
    }

    /// Deliver the game message from the guesser to the about user and push it
    pub async fn create_or_update_game_message(
        &self,
        game: &GuessGame,
        message: GameMessage,
        last_answerer: Snowflake,
    ) -> ServiceResult<()> {
        if self
            .ctx
            .block_repo()
            .is_blocked_between(game.by_user_id, game.about_user_id)
            .await?
        {
            debug!(game_id = %game.id, "Game message skipped, users blocked");
            return Ok(());
        }

        let delivered = self
            .ctx
            .conversation_repo()
            .write_game_message(&GameMessageWrite {
                game_id: game.id,
                by_user_id: game.by_user_id,
                about_user_id: game.about_user_id,
                text: message.text,
                new_message_id: self.ctx.generate_id(),
                new_conversation_id: self.ctx.generate_id(),
            })
            .await?;

        let recipient = game_message_recipient(game, last_answerer);
        self.ctx
            .notifier()
            .notify(Notification::new_message(recipient, message.push, delivered.conversation.id))
            .await;

        info!(
            game_id = %game.id,
            message_id = %delivered.message.id,
            created = delivered.created,
            "Game message written"
        );
        Ok(())
    }

    /// Answers of one game, or the viewer's self answers
    #[instrument(skip(self, params))]
    pub async fn answers(&self, viewer_id: Snowflake, params: AnswerParams) -> ServiceResult<AnswersResponse> {
        let answers = match params.game_id {
            Some(game_id) => {
                let game = self.find_game_for_participant(viewer_id, game_id).await?;
                self.ctx.guess_game_repo().answers_for_game(game.id).await?
            }
            None => self.ctx.guess_game_repo().self_answers(viewer_id).await?,
        };
        Ok(AnswersResponse {
            answers: self.render_answers(&answers).await?,
        })
    }

    /// Render answers with their choice text and question, worded for whom they are about
    async fn render_answers(&self, answers: &[GuessGameAnswer]) -> ServiceResult<Vec<AnswerResponse>> {
        if answers.is_empty() {
            return Ok(Vec::new());
        }

        let question_ids: Vec<Snowflake> = answers
            .iter()
            .map(|a| a.question_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let choice_ids: Vec<Snowflake> = answers.iter().map(|a| a.choice_id).collect();
        let about_ids: Vec<Snowflake> = answers
            .iter()
            .filter(|a| !a.is_self_answer())
            .map(|a| a.about_user_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let questions: HashMap<Snowflake, GuessGameQuestion> = self
            .ctx
            .guess_question_repo()
            .find_by_ids(&question_ids)
            .await?
            .into_iter()
            .map(|q| (q.id, q))
            .collect();
        let question_choices = self.ctx.guess_question_repo().choices_for(&question_ids).await?;
        let chosen: HashMap<Snowflake, GuessGameChoice> = self
            .ctx
            .guess_question_repo()
            .find_choices(&choice_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        let names: HashMap<Snowflake, String> = self
            .ctx
            .user_repo()
            .find_by_ids(&about_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.first_name))
            .collect();

        Ok(answers
            .iter()
            .map(|answer| {
                let about_self = answer.is_self_answer();
                let name = if about_self {
                    None
                } else {
                    Some(names.get(&answer.about_user_id).map_or("", String::as_str))
                };
                let text = chosen
                    .get(&answer.choice_id)
                    .map(|c| c.text_for(about_self).to_string())
                    .unwrap_or_default();
                let question = questions
                    .get(&answer.question_id)
                    .map(|q| QuestionResponse::render(q, name, &question_choices));
                AnswerResponse::new(answer, text, question)
            })
            .collect())
    }

    /// How other users guessed about someone, grouped by choice
    #[instrument(skip(self, params))]
    pub async fn popular_guesses(
        &self,
        viewer_id: Snowflake,
        params: AboutUserParams,
    ) -> ServiceResult<PopularGuessesResponse> {
        let about_id = params.about_user_id.unwrap_or(viewer_id);
        let about = self
            .ctx
            .user_repo()
            .find_by_id(about_id)
            .await?
            .ok_or_else(|| ServiceError::forbidden("User cannot be found."))?;

        let blocked: HashSet<Snowflake> = self
            .ctx
            .block_repo()
            .blocked_ids(about.id)
            .await?
            .into_iter()
            .collect();
        let guesses: Vec<GuessGameAnswer> = self
            .ctx
            .guess_game_repo()
            .guesses_about(about.id)
            .await?
            .into_iter()
            .filter(|g| !blocked.contains(&g.by_user_id))
            .collect();

        let grouped = popular_guesses(&guesses);
        let choice_ids: Vec<Snowflake> = grouped.iter().map(|g| g.choice_id).collect();
        let choices: HashMap<Snowflake, GuessGameChoice> = self
            .ctx
            .guess_question_repo()
            .find_choices(&choice_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        let guesser_ids: Vec<Snowflake> = grouped
            .iter()
            .flat_map(|g| g.by_user_ids.iter().copied())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let photos = UserService::new(self.ctx).photo_urls(&guesser_ids).await?;

        let popular_guesses = grouped
            .iter()
            .filter_map(|g| {
                let choice = choices.get(&g.choice_id)?;
                Some(PopularGuessResponse {
                    num_answers: g.num_answers(),
                    choice: ChoiceResponse::render(choice, false),
                    users: g
                        .by_user_ids
                        .iter()
                        .map(|id| GuesserResponse {
                            id: *id,
                            photo_url: photos.get(id).cloned(),
                        })
                        .collect(),
                })
            })
            .collect();

        Ok(PopularGuessesResponse { popular_guesses })
    }

    // ========================================================================
    // Share link and anonymous guesses
    // ========================================================================

    /// Link other people can use to guess about the viewer without an account
    #[instrument(skip(self))]
    pub async fn link(&self, viewer_id: Snowflake) -> ServiceResult<ShareLinkResponse> {
        let rules = &self.ctx.rules().guess;
        let self_answers = self.ctx.guess_game_repo().self_answers(viewer_id).await?;

        if self_answers.len() < rules.min_self_answers_to_share {
            return Ok(ShareLinkResponse {
                error: true,
                url: None,
                error_message: Some(
                    "you have not answered sufficient questions about yourself to invite others"
                        .to_string(),
                ),
                max_guesses: rules.anon_max_guesses,
                anonymous_guesser_count: None,
                anonymous_friend_count: None,
            });
        }

        let rankings = rank_anonymous(&self.ctx.guess_game_repo().anon_answers_about(viewer_id).await?);
        let friends = rankings
            .iter()
            .filter(|r| r.score >= rules.anonymous_friend_threshold)
            .count();

        Ok(ShareLinkResponse {
            error: false,
            url: Some(format!(
                "{}/guess_game/guess?user_id={viewer_id}",
                self.ctx.rules().public_url
            )),
            error_message: None,
            max_guesses: rules.anon_max_guesses,
            anonymous_guesser_count: Some(rankings.len()),
            anonymous_friend_count: Some(friends),
        })
    }

    /// Random questions the user answered about themselves, for anonymous guessers
    #[instrument(skip(self, params))]
    pub async fn guess(&self, params: GuessParams) -> ServiceResult<GuessPageResponse> {
        let user_id = params
            .user_id
            .ok_or_else(|| rejected(403, "Unable to find user"))?;
        let user = self
            .ctx
            .user_repo()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| rejected(403, "Unable to find user"))?;

        let answered: Vec<Snowflake> = self
            .ctx
            .guess_game_repo()
            .self_answers(user.id)
            .await?
            .into_iter()
            .map(|a| a.question_id)
            .collect();
        let sampled: Vec<Snowflake> = answered
            .choose_multiple(&mut rand::thread_rng(), self.ctx.rules().guess.anon_max_guesses)
            .copied()
            .collect();

        let questions: Vec<GuessGameQuestion> = self
            .ctx
            .guess_question_repo()
            .find_by_ids(&sampled)
            .await?
            .into_iter()
            .filter(|q| !q.hidden)
            .collect();

        let photo = UserService::new(self.ctx).summaries(&[user.id]).await?;
        let about_user = photo
            .get(&user.id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("User", user.id.to_string()))?;

        Ok(GuessPageResponse {
            about_user,
            guess_game_questions: self.render_questions(&questions, Some(&user.first_name)).await?,
        })
    }

    /// Store guesses from the share link and rank everyone who guessed
    #[instrument(skip(self, request), fields(uuid = %request.uuid))]
    pub async fn answer_anonymously(&self, request: AnswerAnonymouslyRequest) -> ServiceResult<RankingsResponse> {
        let about_id = request
            .about_user_id
            .ok_or_else(|| rejected(403, "Unable to find user"))?;
        let about = self
            .ctx
            .user_repo()
            .find_by_id(about_id)
            .await?
            .ok_or_else(|| rejected(403, "Unable to find user"))?;
        if request.uuid.trim().is_empty() {
            return Err(rejected(400, "Missing uuid"));
        }

        let own: HashMap<Snowflake, Snowflake> = self
            .ctx
            .guess_game_repo()
            .self_answers(about.id)
            .await?
            .into_iter()
            .map(|a| (a.question_id, a.choice_id))
            .collect();
        let choices = self.ctx.guess_question_repo().find_choices(&request.choice_ids).await?;

        let now = Utc::now();
        let answers: Vec<AnonGuessGameAnswer> = choices
            .iter()
            .map(|choice| AnonGuessGameAnswer {
                id: self.ctx.generate_id(),
                uuid: request.uuid.clone(),
                source: request.source.clone(),
                name: None,
                about_user_id: about.id,
                question_id: choice.question_id,
                choice_id: choice.id,
                is_correct: own.get(&choice.question_id).map(|c| *c == choice.id),
                created_at: now,
            })
            .collect();

        if !answers.is_empty() {
            self.ctx.guess_game_repo().create_anon_answers(&answers).await?;
        }
        info!(about_user_id = %about.id, answers = answers.len(), "Anonymous guesses saved");

        let all = self.ctx.guess_game_repo().anon_answers_about(about.id).await?;
        Ok(RankingsResponse {
            rankings: rank_anonymous(&all),
        })
    }

    /// Name every anonymous guess made from one installation
    #[instrument(skip(self, request))]
    pub async fn update_anonymous_name(
        &self,
        request: UpdateAnonymousNameRequest,
    ) -> ServiceResult<AnonymousNameResponse> {
        let (Some(uuid), Some(name)) = (
            request.uuid.filter(|u| !u.trim().is_empty()),
            request.name.filter(|n| !n.trim().is_empty()),
        ) else {
            return Err(rejected(400, "Missing uuid"));
        };

        let name = name.trim().to_string();
        let renamed = self.ctx.guess_game_repo().rename_anon(&uuid, &name).await?;
        info!(renamed, "Anonymous guesser renamed");

        Ok(AnonymousNameResponse {
            message: "success!",
            name,
        })
    }
}

/// Grade every guess about `about_user_id` for a question the user just answered,
/// then check each affected game
async fn score_guesses(ctx: ServiceContext, about_user_id: Snowflake, question_id: Snowflake) -> ServiceResult<()> {
    let repo = ctx.guess_game_repo();
    let Some(own) = repo.find_answer(question_id, about_user_id, about_user_id).await? else {
        warn!(user_id = %about_user_id, question_id = %question_id, "Self answer vanished before scoring");
        return Ok(());
    };

    let mut game_ids = Vec::new();
    for mut guess in repo.guesses_for_question(about_user_id, question_id).await? {
        guess.grade_against(Some(&own));
        guess.updated_at = Utc::now();
        repo.update_answer(&guess).await?;
        if let Some(game_id) = guess.game_id {
            if !game_ids.contains(&game_id) {
                game_ids.push(game_id);
            }
        }
    }

    info!(user_id = %about_user_id, question_id = %question_id, games = game_ids.len(), "Guesses graded");

    let service = GuessGameService::new(&ctx);
    for game_id in game_ids {
        service.check(game_id, about_user_id).await?;
    }
    Ok(())
}
