use chrono::{DateTime, Local};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

use crate::attempt::Attempt;
use crate::error::StoreError;
use crate::ports::Storage;
use crate::question::Difficulty;
use crate::scorer::ScoredResult;
use crate::{history, schedule};

/// Which flow produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionKind {
    Practice,
    Scheduled,
    Diagnostic,
}

/// Descriptive data about a session that the attempt itself does not carry
#[derive(Debug, Clone, PartialEq)]
pub struct ReportMeta {
    pub kind: SessionKind,
    pub title: String,
    pub subject: String,
    pub topic: String,
    pub difficulty: Difficulty,
    /// Set when the session was a scheduled assignment
    pub assignment_id: Option<String>,
}

/// Tone of a user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    /// 80 and above is a success, 60 and above informational, anything lower a warning
    pub fn for_percentage(percentage: u32) -> Self {
        if percentage >= 80 {
            Severity::Success
        } else if percentage >= 60 {
            Severity::Info
        } else {
            Severity::Warning
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionReport {
    pub position: usize,
    pub prompt: String,
    pub selected: Option<String>,
    pub correct: String,
    pub explanation: String,
    pub was_answered: bool,
    pub is_correct: bool,
}

/// Display-ready result of one session, also the unit of persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub id: String,
    pub kind: SessionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_id: Option<String>,
    pub title: String,
    pub subject: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub percentage: u32,
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub total_questions: usize,
    pub seconds_used: u32,
    pub time_limit_seconds: u32,
    pub elapsed: String,
    pub timed_out: bool,
    pub completed_at: DateTime<Local>,
    pub breakdown: Vec<QuestionReport>,
}

impl ReportRecord {
    pub fn severity(&self) -> Severity {
        Severity::for_percentage(self.percentage)
    }

    pub fn summary_line(&self) -> String {
        format!(
            "{}% ({}/{}) in {}",
            self.percentage, self.correct_count, self.total_questions, self.elapsed
        )
    }
}

/// Package a scored attempt for display and storage
pub fn report(result: &ScoredResult, attempt: &Attempt, meta: &ReportMeta) -> ReportRecord {
    let breakdown = attempt
        .questions()
        .iter()
        .zip(&result.outcomes)
        .enumerate()
        .map(|(position, (question, outcome))| QuestionReport {
            position: position + 1,
            prompt: question.prompt.clone(),
            selected: outcome
                .selected_index
                .and_then(|idx| question.choice_text(idx))
                .map(str::to_string),
            correct: question.correct_text().to_string(),
            explanation: question.explanation.clone(),
            was_answered: outcome.was_answered,
            is_correct: outcome.is_correct,
        })
        .collect();

    ReportRecord {
        id: record_id(),
        kind: meta.kind,
        assignment_id: meta.assignment_id.clone(),
        title: meta.title.clone(),
        subject: meta.subject.clone(),
        topic: meta.topic.clone(),
        difficulty: meta.difficulty,
        percentage: result.percentage,
        correct_count: result.correct_count,
        incorrect_count: result.incorrect_count(),
        total_questions: result.total_questions,
        seconds_used: result.seconds_used,
        time_limit_seconds: attempt.time_limit_seconds(),
        elapsed: format_clock(result.seconds_used),
        timed_out: attempt.timed_out(),
        completed_at: Local::now(),
        breakdown,
    }
}

/// Hand a record to storage. For assignments the completion is counted first,
/// then the record is prepended to the history.
///
/// Each key is written independently: a failed write does not skip the other
/// one, and the first error is returned.
pub fn persist(
    storage: &dyn Storage,
    record: &ReportRecord,
    history_limit: usize,
) -> Result<(), StoreError> {
    let completion = match &record.assignment_id {
        Some(id) => schedule::record_completion(storage, id).map(|found| {
            if !found {
                tracing::warn!(assignment = %id, "completed an assignment that is no longer listed");
            }
        }),
        None => Ok(()),
    };
    let appended = history::append_history(storage, record, history_limit);
    completion.and(appended)
}

/// Seconds as `mm:ss`; minutes grow past two digits when needed
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Short random identifier for records and assignments
pub fn record_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}
