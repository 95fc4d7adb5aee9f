use crate::entities::GuessGameAnswer;
use crate::value_objects::Gender;

pub const UNSUPPORTED_CLIENT_MESSAGE: &str =
    "Update to the latest version of Friended to see your guesses.";

/// Score at which the message adds a compliment
const GETS_YOU_PERCENT: u32 = 70;

#[inline]
pub fn has_all_answers(answer_count: usize, max_game_questions: usize) -> bool {
    answer_count >= max_game_questions
}

/// A game is scored once every guess has been graded
pub fn is_scored(answers: &[GuessGameAnswer]) -> bool {
    !answers.is_empty() && answers.iter().all(|a| a.is_correct.is_some())
}

/// Fraction of correct guesses, 0 when there are none
pub fn score(answers: &[GuessGameAnswer]) -> f64 {
    if answers.is_empty() {
        return 0.0;
    }
    let correct = answers.iter().filter(|a| a.is_correct == Some(true)).count();
    correct as f64 / answers.len() as f64
}

/// Whole percent, rounded down
pub fn score_percent(answers: &[GuessGameAnswer]) -> u32 {
    if answers.is_empty() {
        return 0;
    }
    let correct = answers.iter().filter(|a| a.is_correct == Some(true)).count();
    (correct * 100 / answers.len()) as u32
}

/// Text stored on the game message and the push sent alongside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameMessage {
    pub text: String,
    pub push: String,
}

/// Message for a completed, scored game.
///
/// `guesser_answered_last` is false when the about user's own answer triggered the
/// scoring, in which case the guesser is the one notified.
pub fn scored_message(
    by_first_name: &str,
    about_first_name: &str,
    percent: u32,
    guesser_answered_last: bool,
) -> GameMessage {
    let mut text = format!("{by_first_name} made some guesses and was {percent}% right about you.");
    if percent >= GETS_YOU_PERCENT {
        text.push_str(&format!("{by_first_name} seems to get you."));
    }
    let push = if guesser_answered_last {
        text.clone()
    } else {
        format!("You were {percent}% right about {about_first_name}. See your results")
    };
    GameMessage { text, push }
}

/// Message for a game with every guess in but not yet gradeable
pub fn guessing_done_message(
    by_first_name: &str,
    by_gender: Gender,
    recipient_outdated: bool,
) -> GameMessage {
    let mut text = format!(
        "{by_first_name} made some guesses about you.  See if {} was right.",
        by_gender.pronoun()
    );
    if recipient_outdated {
        text.push_str("\r\n\r\n ");
        text.push_str(UNSUPPORTED_CLIENT_MESSAGE);
    }
    GameMessage {
        push: text.clone(),
        text,
    }
}
