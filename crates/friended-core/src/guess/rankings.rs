use std::collections::HashMap;

use crate::entities::{AnonGuessGameAnswer, GuessGameAnswer};
use crate::value_objects::Snowflake;

/// How well one anonymous guesser knows the user
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AnonRanking {
    pub uuid: String,
    pub name: Option<String>,
    pub source: Option<String>,
    pub num_answers: usize,
    pub score: f64,
}

/// Group anonymous answers by guesser, best score first
pub fn rank_anonymous(answers: &[AnonGuessGameAnswer]) -> Vec<AnonRanking> {
    let mut by_uuid: HashMap<&str, Vec<&AnonGuessGameAnswer>> = HashMap::new();
    for answer in answers {
        by_uuid.entry(answer.uuid.as_str()).or_default().push(answer);
    }

    let mut rankings: Vec<AnonRanking> = by_uuid
        .into_iter()
        .map(|(uuid, group)| {
            let correct = group.iter().filter(|a| a.is_correct == Some(true)).count();
            let latest_named = group.iter().rev().find_map(|a| a.name.clone());
            AnonRanking {
                uuid: uuid.to_string(),
                name: latest_named,
                source: group.iter().find_map(|a| a.source.clone()),
                num_answers: group.len(),
                score: correct as f64 / group.len() as f64,
            }
        })
        .collect();

    rankings.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.num_answers.cmp(&a.num_answers))
            .then_with(|| a.uuid.cmp(&b.uuid))
    });
    rankings
}

/// One choice other users picked when guessing about someone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopularGuess {
    pub choice_id: Snowflake,
    pub by_user_ids: Vec<Snowflake>,
}

impl PopularGuess {
    pub fn num_answers(&self) -> usize {
        self.by_user_ids.len()
    }
}

/// Guesses grouped by choice, most picked first
pub fn popular_guesses(answers: &[GuessGameAnswer]) -> Vec<PopularGuess> {
    let mut by_choice: HashMap<Snowflake, Vec<Snowflake>> = HashMap::new();
    for answer in answers.iter().filter(|a| !a.is_self_answer()) {
        let users = by_choice.entry(answer.choice_id).or_default();
        if !users.contains(&answer.by_user_id) {
            users.push(answer.by_user_id);
        }
    }

    let mut guesses: Vec<PopularGuess> = by_choice
        .into_iter()
        .map(|(choice_id, by_user_ids)| PopularGuess {
            choice_id,
            by_user_ids,
        })
        .collect();
    guesses.sort_by(|a, b| {
        b.num_answers()
            .cmp(&a.num_answers())
            .then_with(|| a.choice_id.cmp(&b.choice_id))
    });
    guesses
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn anon(uuid: &str, name: Option<&str>, correct: Option<bool>) -> AnonGuessGameAnswer {
        AnonGuessGameAnswer {
            id: Snowflake::new(1),
            uuid: uuid.to_string(),
            source: Some("instagram".to_string()),
            name: name.map(String::from),
            about_user_id: Snowflake::new(9),
            question_id: Snowflake::new(2),
            choice_id: Snowflake::new(3),
            is_correct: correct,
            created_at: Utc::now(),
        }
    }

    fn guess(by: i64, about: i64, choice: i64) -> GuessGameAnswer {
        GuessGameAnswer {
            id: Snowflake::new(by * 100 + choice),
            by_user_id: Snowflake::new(by),
            about_user_id: Snowflake::new(about),
            question_id: Snowflake::new(1),
            choice_id: Snowflake::new(choice),
            game_id: None,
            is_correct: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_rank_anonymous_orders_by_score() {
        let answers = vec![
            anon("a", None, Some(false)),
            anon("a", Some("Alex"), Some(true)),
            anon("b", Some("Bea"), Some(true)),
            anon("b", None, Some(true)),
        ];
        let rankings = rank_anonymous(&answers);
        assert_eq!(rankings.len(), 2);
        assert_eq!(rankings[0].uuid, "b");
        assert!((rankings[0].score - 1.0).abs() < f64::EPSILON);
        assert_eq!(rankings[1].name.as_deref(), Some("Alex"));
        assert_eq!(rankings[1].num_answers, 2);
    }

    #[test]
    fn test_popular_guesses_groups_and_sorts() {
        let answers = vec![guess(1, 9, 20), guess(2, 9, 21), guess(3, 9, 21), guess(9, 9, 20)];
        let popular = popular_guesses(&answers);
        assert_eq!(popular.len(), 2);
        assert_eq!(popular[0].choice_id, Snowflake::new(21));
        assert_eq!(popular[0].num_answers(), 2);
        // self answers are not guesses
        assert_eq!(popular[1].by_user_ids, vec![Snowflake::new(1)]);
    }
}
