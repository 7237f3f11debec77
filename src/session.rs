//! Session controller: drives one attempt between its collaborators.
//!
//! The controller owns the attempt and the countdown. Every applied mutation
//! is pushed to the presenter; completion scores, reports and persists the
//! attempt before the final snapshot goes out.

use std::rc::Rc;
use std::sync::mpsc::Sender;

use crate::attempt::{Attempt, Mutation, Status};
use crate::bank::{generic_questions, QuestionBank};
use crate::diagnostic::DiagnosticSummary;
use crate::error::SessionError;
use crate::history::{self, DEFAULT_HISTORY_LIMIT};
use crate::ports::{Destination, Navigator, Notice, Notifier, Presenter, SessionSnapshot, Storage};
use crate::question::{Difficulty, Question};
use crate::report::{self, ReportMeta, ReportRecord, SessionKind, Severity};
use crate::runtime::{Countdown, SessionEvent};
use crate::schedule::ScheduledQuiz;
use crate::scorer::score;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub meta: ReportMeta,
    pub time_limit_seconds: u32,
    /// Where the navigator is sent once the student leaves the session
    pub destination: Destination,
    pub history_limit: usize,
}

/// Questions plus configuration, ready to start
#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub questions: Vec<Question>,
    pub config: SessionConfig,
}

impl SessionPlan {
    /// Topic practice. With `allow_generic`, a topic the bank has nothing for
    /// falls back to placeholder questions instead of an empty set.
    pub fn practice(
        bank: &QuestionBank,
        subject: &str,
        topic: &str,
        difficulty: Difficulty,
        count: usize,
        time_limit_seconds: u32,
        allow_generic: bool,
    ) -> Self {
        let mut questions = bank.select_questions(subject, topic, count);
        if questions.is_empty() && allow_generic {
            tracing::info!(subject, topic, "no bank questions, using generic set");
            questions = generic_questions(subject, topic, difficulty);
            questions.truncate(count);
        }

        Self {
            questions,
            config: SessionConfig {
                meta: ReportMeta {
                    kind: SessionKind::Practice,
                    title: format!("{topic} Practice Quiz"),
                    subject: subject.to_string(),
                    topic: topic.to_string(),
                    difficulty,
                    assignment_id: None,
                },
                time_limit_seconds,
                destination: Destination::StudentDashboard,
                history_limit: DEFAULT_HISTORY_LIMIT,
            },
        }
    }

    pub fn diagnostic(bank: &QuestionBank, time_limit_seconds: u32) -> Self {
        Self {
            questions: bank.diagnostic(),
            config: SessionConfig {
                meta: ReportMeta {
                    kind: SessionKind::Diagnostic,
                    title: "Diagnostic Assessment".to_string(),
                    subject: "Mixed".to_string(),
                    topic: "Diagnostic".to_string(),
                    difficulty: Difficulty::Intermediate,
                    assignment_id: None,
                },
                time_limit_seconds,
                destination: Destination::Diagnostic,
                history_limit: DEFAULT_HISTORY_LIMIT,
            },
        }
    }

    /// A scheduled quiz, timed by the assignment's own limit
    pub fn assignment(bank: &QuestionBank, quiz: &ScheduledQuiz, allow_generic: bool) -> Self {
        let mut plan = Self::practice(
            bank,
            &quiz.subject,
            &quiz.topic,
            quiz.difficulty,
            quiz.question_count,
            quiz.time_limit_seconds(),
            allow_generic,
        );
        plan.config.meta.kind = SessionKind::Scheduled;
        plan.config.meta.title = quiz.title.clone();
        plan.config.meta.assignment_id = Some(quiz.id.clone());
        plan.config.destination = Destination::Assignments;
        plan
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.config.history_limit = limit;
        self
    }
}

/// The outside world as seen by one session
pub struct Collaborators {
    pub storage: Rc<dyn Storage>,
    pub presenter: Box<dyn Presenter>,
    pub navigator: Box<dyn Navigator>,
    pub notifier: Box<dyn Notifier>,
}

pub struct QuizSession {
    attempt: Attempt,
    config: SessionConfig,
    collab: Collaborators,
    countdown: Option<Countdown>,
    report: Option<ReportRecord>,
    diagnostic: Option<DiagnosticSummary>,
    closed: bool,
}

impl QuizSession {
    /// Start the attempt and, when `ticks` is given, a one-second countdown
    /// feeding that channel.
    pub fn start(
        plan: SessionPlan,
        collab: Collaborators,
        ticks: Option<Sender<SessionEvent>>,
    ) -> Result<Self, SessionError> {
        let SessionPlan { questions, config } = plan;

        let attempt = match Attempt::start(questions, config.time_limit_seconds) {
            Ok(attempt) => attempt,
            Err(e) => {
                tracing::warn!(title = %config.meta.title, error = %e, "session not started");
                collab
                    .notifier
                    .notify(Notice::new(Severity::Error, format!("Unable to start quiz: {e}")));
                return Err(e);
            }
        };

        tracing::info!(
            kind = %config.meta.kind,
            title = %config.meta.title,
            questions = attempt.len(),
            limit = config.time_limit_seconds,
            "session started"
        );
        collab.notifier.notify(Notice::new(
            Severity::Success,
            "Quiz generated successfully! Good luck!",
        ));

        let countdown = match ticks {
            Some(tx) if attempt.is_in_progress() => Some(Countdown::per_second(tx)),
            _ => None,
        };

        let mut session = Self {
            attempt,
            config,
            collab,
            countdown,
            report: None,
            diagnostic: None,
            closed: false,
        };

        if session.attempt.is_completed() {
            // a zero time limit is already over
            session.collab.notifier.notify(time_up_notice());
            session.finish();
        } else {
            session.present();
        }
        Ok(session)
    }

    pub fn select_answer(&mut self, choice: usize) -> Result<Mutation, SessionError> {
        if self.closed {
            return Ok(Mutation::Ignored);
        }
        let mutation = self.attempt.select_answer(choice)?;
        if mutation == Mutation::Applied {
            self.present();
        }
        Ok(mutation)
    }

    pub fn reveal_feedback(&mut self) -> Mutation {
        if self.closed {
            return Mutation::Ignored;
        }
        let mutation = self.attempt.reveal_feedback();
        if mutation == Mutation::Applied {
            self.present();
        }
        mutation
    }

    pub fn advance(&mut self) -> Mutation {
        if self.closed {
            return Mutation::Ignored;
        }
        let mutation = self.attempt.advance();
        if mutation == Mutation::Applied {
            if self.attempt.is_completed() {
                self.finish();
            } else {
                self.present();
            }
        }
        mutation
    }

    /// One countdown second
    pub fn tick(&mut self) -> Mutation {
        if self.closed {
            return Mutation::Ignored;
        }
        let mutation = self.attempt.tick();
        if mutation == Mutation::Applied {
            if self.attempt.is_completed() {
                tracing::info!(position = self.attempt.current_position(), "time expired");
                self.collab.notifier.notify(time_up_notice());
                self.finish();
            } else {
                self.present();
            }
        }
        mutation
    }

    /// Leave the session: stop the countdown and signal the navigator once.
    /// Later events are ignored. An unfinished attempt is abandoned unscored.
    pub fn exit(&mut self) {
        self.release_countdown();
        if self.closed {
            return;
        }
        self.closed = true;
        if !self.attempt.is_completed() {
            tracing::info!(
                position = self.attempt.current_position(),
                "session abandoned before completion"
            );
        }
        self.collab
            .navigator
            .session_finished(self.config.destination.clone());
    }

    fn finish(&mut self) {
        self.release_countdown();

        let result = score(&self.attempt);
        let record = report::report(&result, &self.attempt, &self.config.meta);
        let storage = Rc::clone(&self.collab.storage);

        if let Err(e) = report::persist(&*storage, &record, self.config.history_limit) {
            tracing::warn!(record = %record.id, error = %e, "failed to persist quiz result");
        }

        if self.config.meta.kind == SessionKind::Diagnostic {
            let summary = DiagnosticSummary::from_result(&result, &self.attempt);
            if let Err(e) = history::save_diagnostic(&*storage, &summary) {
                tracing::warn!(error = %e, "failed to persist diagnostic summary");
            }
            self.diagnostic = Some(summary);
        }

        tracing::info!(
            kind = %record.kind,
            percentage = record.percentage,
            correct = record.correct_count,
            total = record.total_questions,
            timed_out = record.timed_out,
            "session completed"
        );
        self.collab.notifier.notify(Notice::new(
            record.severity(),
            format!("Quiz completed! You scored {}%", record.percentage),
        ));

        self.report = Some(record);
        self.present();
    }

    fn release_countdown(&mut self) {
        if let Some(mut countdown) = self.countdown.take() {
            countdown.stop();
        }
    }

    fn present(&self) {
        self.collab.presenter.present(&self.snapshot());
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.attempt.status(),
            position: self.attempt.current_position(),
            total: self.attempt.len(),
            question: self.attempt.current_question().clone(),
            selected: self.attempt.current_answer(),
            feedback_shown: self.attempt.feedback_shown(),
            remaining_seconds: self.attempt.remaining_seconds(),
            time_limit_seconds: self.attempt.time_limit_seconds(),
            timed_out: self.attempt.timed_out(),
            report: self.report.clone(),
        }
    }

    pub fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn status(&self) -> Status {
        self.attempt.status()
    }

    pub fn report(&self) -> Option<&ReportRecord> {
        self.report.as_ref()
    }

    pub fn diagnostic(&self) -> Option<&DiagnosticSummary> {
        self.diagnostic.as_ref()
    }

    pub fn countdown_running(&self) -> bool {
        self.countdown.as_ref().is_some_and(Countdown::is_running)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

fn time_up_notice() -> Notice {
    Notice::new(
        Severity::Warning,
        "Time's up! Your quiz has been submitted automatically.",
    )
}
