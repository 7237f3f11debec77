use serde::{Deserialize, Serialize};

use crate::attempt::Attempt;

/// How a single question went
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub was_answered: bool,
    pub is_correct: bool,
    pub selected_index: Option<usize>,
    pub correct_index: usize,
}

/// Outcome of a completed attempt. Never mutated after it is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub correct_count: usize,
    pub total_questions: usize,
    pub percentage: u32,
    pub seconds_used: u32,
    pub outcomes: Vec<QuestionOutcome>,
}

impl ScoredResult {
    pub fn incorrect_count(&self) -> usize {
        self.total_questions - self.correct_count
    }

    pub fn answered_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.was_answered).count()
    }

    pub fn is_perfect(&self) -> bool {
        self.correct_count == self.total_questions
    }
}

/// Score a completed attempt. Unanswered questions count as incorrect.
///
/// # Panics
///
/// Panics if the attempt has not completed; scoring a live attempt is a caller bug.
pub fn score(attempt: &Attempt) -> ScoredResult {
    assert!(
        attempt.is_completed(),
        "score() called on an attempt that is still {:?}",
        attempt.status()
    );

    let outcomes: Vec<QuestionOutcome> = attempt
        .questions()
        .iter()
        .zip(attempt.recorded_answers())
        .map(|(question, &selected)| QuestionOutcome {
            was_answered: selected.is_some(),
            is_correct: selected == Some(question.correct_choice),
            selected_index: selected,
            correct_index: question.correct_choice,
        })
        .collect();

    let correct_count = outcomes.iter().filter(|o| o.is_correct).count();
    let total_questions = outcomes.len();

    ScoredResult {
        correct_count,
        total_questions,
        percentage: percentage(correct_count, total_questions),
        seconds_used: attempt.seconds_used(),
        outcomes,
    }
}

/// `round(100 * correct / total)` with halves rounded up, in integer arithmetic
pub fn percentage(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((200 * correct + total) / (2 * total)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{sample, Question};

    fn attempt_with(correct: &[usize], answers: &[Option<usize>]) -> Attempt {
        let qs: Vec<Question> = correct.iter().map(|&c| sample(c, 4)).collect();
        let mut attempt = Attempt::start(qs, 300).unwrap();
        for (pos, answer) in answers.iter().enumerate() {
            if let Some(choice) = answer {
                attempt.select_answer(*choice).unwrap();
            }
            if pos + 1 < correct.len() {
                attempt.advance();
            }
        }
        attempt.advance();
        attempt
    }

    #[test]
    fn two_of_three_rounds_to_67() {
        let attempt = attempt_with(&[0, 1, 0], &[Some(0), Some(1), Some(1)]);
        let result = score(&attempt);

        assert_eq!(result.correct_count, 2);
        assert_eq!(result.total_questions, 3);
        assert_eq!(result.percentage, 67);
        assert_eq!(result.incorrect_count(), 1);
    }

    #[test]
    fn single_correct_answer_is_100() {
        let attempt = attempt_with(&[2], &[Some(2)]);
        let result = score(&attempt);
        assert_eq!(result.percentage, 100);
        assert!(result.is_perfect());
    }

    #[test]
    fn unanswered_counts_as_incorrect() {
        let attempt = attempt_with(&[0, 0, 0, 0], &[Some(0), None, Some(0), None]);
        let result = score(&attempt);

        assert_eq!(result.correct_count, 2);
        assert_eq!(result.total_questions, 4);
        assert_eq!(result.answered_count(), 2);
        assert!(!result.outcomes[1].was_answered);
        assert!(!result.outcomes[1].is_correct);
        assert_eq!(result.outcomes[1].selected_index, None);
        assert_eq!(result.outcomes[1].correct_index, 0);
    }

    #[test]
    fn timeout_scores_remaining_questions_incorrect() {
        let qs: Vec<Question> = [0, 1, 2, 3].iter().map(|&c| sample(c, 4)).collect();
        let mut attempt = Attempt::start(qs, 3).unwrap();
        attempt.select_answer(0).unwrap();
        attempt.advance();
        attempt.select_answer(1).unwrap();
        attempt.advance();
        attempt.tick();
        attempt.tick();
        // student is mid-way through question 3 when time runs out
        attempt.tick();
        let _ = attempt.select_answer(2);

        let result = score(&attempt);
        assert_eq!(attempt.current_position(), 2);
        assert_eq!(result.correct_count, 2);
        assert!(!result.outcomes[2].is_correct);
        assert!(!result.outcomes[3].is_correct);
        assert_eq!(result.seconds_used, 3);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 8), 13); // 12.5
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(5, 8), 63); // 62.5
        assert_eq!(percentage(0, 5), 0);
        assert_eq!(percentage(5, 5), 100);
    }

    #[test]
    fn percentage_stays_in_bounds() {
        for total in 1..=40 {
            for correct in 0..=total {
                let p = percentage(correct, total);
                assert!(p <= 100);
                let exact = 100.0 * correct as f64 / total as f64;
                assert!((p as f64 - exact).abs() <= 0.5);
            }
        }
    }

    #[test]
    #[should_panic(expected = "still InProgress")]
    fn scoring_live_attempt_panics() {
        let attempt = Attempt::start(vec![sample(0, 2)], 30).unwrap();
        score(&attempt);
    }
}
