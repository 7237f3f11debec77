use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::question::Question;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    NotStarted,
    InProgress,
    Completed,
}

/// Whether a user-driven event changed the attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Applied,
    /// The attempt was not in progress, so the event was dropped
    Ignored,
}

/// One run through a fixed, ordered set of questions against a countdown.
///
/// Every mutation is a no-op once the attempt has left `InProgress`, so late
/// input events queued behind a timeout can never change the outcome.
#[derive(Debug, Clone)]
pub struct Attempt {
    questions: Vec<Question>,
    recorded_answers: Vec<Option<usize>>,
    current_position: usize,
    remaining_seconds: u32,
    time_limit_seconds: u32,
    status: Status,
    feedback_shown: bool,
    timed_out: bool,
}

impl Attempt {
    /// Build an attempt that has not started yet
    pub fn new(questions: Vec<Question>, time_limit_seconds: u32) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::EmptyQuestionSet);
        }
        if let Some(position) = questions.iter().position(|q| !q.is_well_formed()) {
            return Err(SessionError::InvalidQuestion { position });
        }

        let len = questions.len();
        Ok(Self {
            questions,
            recorded_answers: vec![None; len],
            current_position: 0,
            remaining_seconds: time_limit_seconds,
            time_limit_seconds,
            status: Status::NotStarted,
            feedback_shown: false,
            timed_out: false,
        })
    }

    /// Build an attempt and put it straight into `InProgress`
    pub fn start(questions: Vec<Question>, time_limit_seconds: u32) -> Result<Self, SessionError> {
        let mut attempt = Self::new(questions, time_limit_seconds)?;
        attempt.begin();
        Ok(attempt)
    }

    pub fn begin(&mut self) {
        if self.status == Status::NotStarted {
            self.status = Status::InProgress;
            if self.remaining_seconds == 0 {
                self.complete(true);
            }
        }
    }

    /// Record a choice for the current question. Last write wins.
    pub fn select_answer(&mut self, choice: usize) -> Result<Mutation, SessionError> {
        if self.status != Status::InProgress {
            return Ok(Mutation::Ignored);
        }

        let available = self.current_question().choices.len();
        if choice >= available {
            return Err(SessionError::InvalidSelection { choice, available });
        }

        self.recorded_answers[self.current_position] = Some(choice);
        Ok(Mutation::Applied)
    }

    /// Show the explanation for the current question once it has an answer
    pub fn reveal_feedback(&mut self) -> Mutation {
        if self.status != Status::InProgress || self.current_answer().is_none() {
            return Mutation::Ignored;
        }
        self.feedback_shown = true;
        Mutation::Applied
    }

    /// Move to the next question, or complete the attempt from the last one
    pub fn advance(&mut self) -> Mutation {
        if self.status != Status::InProgress {
            return Mutation::Ignored;
        }

        if self.current_position + 1 < self.questions.len() {
            self.current_position += 1;
            self.feedback_shown = false;
        } else {
            self.complete(false);
        }
        Mutation::Applied
    }

    /// One elapsed second. Reaching zero completes the attempt as it stands.
    pub fn tick(&mut self) -> Mutation {
        if self.status != Status::InProgress || self.remaining_seconds == 0 {
            return Mutation::Ignored;
        }

        self.remaining_seconds -= 1;
        if self.remaining_seconds == 0 {
            self.complete(true);
        }
        Mutation::Applied
    }

    fn complete(&mut self, timed_out: bool) {
        self.status = Status::Completed;
        self.feedback_shown = false;
        self.timed_out = timed_out;
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == Status::InProgress
    }

    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }

    /// True when the countdown, not the student, ended the attempt
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn recorded_answers(&self) -> &[Option<usize>] {
        &self.recorded_answers
    }

    pub fn current_position(&self) -> usize {
        self.current_position
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.current_position]
    }

    pub fn current_answer(&self) -> Option<usize> {
        self.recorded_answers[self.current_position]
    }

    pub fn is_last_question(&self) -> bool {
        self.current_position + 1 == self.questions.len()
    }

    pub fn feedback_shown(&self) -> bool {
        self.feedback_shown
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn time_limit_seconds(&self) -> u32 {
        self.time_limit_seconds
    }

    pub fn seconds_used(&self) -> u32 {
        self.time_limit_seconds - self.remaining_seconds
    }

    /// Fraction of questions reached, 0.0 ..= 1.0
    pub fn progress(&self) -> f64 {
        (self.current_position + 1) as f64 / self.questions.len() as f64
    }
}
