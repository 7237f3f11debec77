use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::diagnostic::DiagnosticSummary;
use crate::error::StoreError;
use crate::ports::Storage;
use crate::report::ReportRecord;

pub const HISTORY_KEY: &str = "quiz_history";
pub const DIAGNOSTIC_KEY: &str = "diagnostic_result";
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Read a typed document, treating absent or mismatched data as missing
pub fn load_typed<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Option<T> {
    let value = storage.load(key)?;
    match serde_json::from_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(key, error = %e, "stored record has an unexpected shape");
            None
        }
    }
}

pub fn save_typed<T: Serialize>(storage: &dyn Storage, key: &str, value: &T) -> Result<(), StoreError> {
    storage.save(key, &serde_json::to_value(value)?)
}

/// Completed session results, newest first
pub fn load_history(storage: &dyn Storage) -> Vec<ReportRecord> {
    load_typed(storage, HISTORY_KEY).unwrap_or_default()
}

/// Prepend a record and keep at most `limit` entries
pub fn append_history(
    storage: &dyn Storage,
    record: &ReportRecord,
    limit: usize,
) -> Result<(), StoreError> {
    let mut history = load_history(storage);
    history.insert(0, record.clone());
    history.truncate(limit);
    save_typed(storage, HISTORY_KEY, &history)
}

pub fn load_diagnostic(storage: &dyn Storage) -> Option<DiagnosticSummary> {
    load_typed(storage, DIAGNOSTIC_KEY)
}

pub fn save_diagnostic(storage: &dyn Storage, summary: &DiagnosticSummary) -> Result<(), StoreError> {
    save_typed(storage, DIAGNOSTIC_KEY, summary)
}

/// Overall standing across past results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ProgressBand {
    Excellent,
    OnTrack,
    NeedsAttention,
}

impl ProgressBand {
    /// 85 and above is excellent, 70 and above on track
    pub fn for_average(average: u32) -> Self {
        if average >= 85 {
            ProgressBand::Excellent
        } else if average >= 70 {
            ProgressBand::OnTrack
        } else {
            ProgressBand::NeedsAttention
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub total_quizzes: usize,
    /// Mean percentage, rounded half up
    pub average_score: u32,
    pub total_seconds: u64,
    pub band: ProgressBand,
}

/// Aggregate a set of results; `None` when there is nothing to aggregate
pub fn summarize(records: &[ReportRecord]) -> Option<HistorySummary> {
    let average_score = average_percentage(records.iter())?;
    Some(HistorySummary {
        total_quizzes: records.len(),
        average_score,
        total_seconds: records.iter().map(|r| u64::from(r.seconds_used)).sum(),
        band: ProgressBand::for_average(average_score),
    })
}

/// Mean score over every attempt of one scheduled quiz
pub fn assignment_average(records: &[ReportRecord], assignment_id: &str) -> Option<u32> {
    average_percentage(
        records
            .iter()
            .filter(|r| r.assignment_id.as_deref() == Some(assignment_id)),
    )
}

fn average_percentage<'a>(records: impl Iterator<Item = &'a ReportRecord>) -> Option<u32> {
    let (sum, n) = records.fold((0u64, 0u64), |(sum, n), r| (sum + u64::from(r.percentage), n + 1));
    if n == 0 {
        return None;
    }
    // integer round half up: floor(sum / n + 1/2)
    Some(((2 * sum + n) / (2 * n)) as u32)
}

/// Write the history as CSV, one row per session
pub fn export_csv<P: AsRef<Path>>(records: &[ReportRecord], path: P) -> Result<(), StoreError> {
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    writer
        .write_record([
            "completed_at",
            "kind",
            "title",
            "subject",
            "topic",
            "difficulty",
            "percentage",
            "correct",
            "total",
            "elapsed",
            "timed_out",
        ])
        .map_err(csv_error)?;

    for r in records {
        writer
            .write_record([
                r.completed_at.to_rfc3339(),
                r.kind.to_string(),
                r.title.clone(),
                r.subject.clone(),
                r.topic.clone(),
                r.difficulty.to_string(),
                r.percentage.to_string(),
                r.correct_count.to_string(),
                r.total_questions.to_string(),
                r.elapsed.clone(),
                r.timed_out.to_string(),
            ])
            .map_err(csv_error)?;
    }

    writer.flush()?;
    Ok(())
}

fn csv_error(e: csv::Error) -> StoreError {
    StoreError::Unavailable(format!("csv export failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attempt::Attempt;
    use crate::question::{sample, Difficulty};
    use crate::report::{report, ReportMeta, SessionKind};
    use crate::scorer::score;
    use crate::store::MemoryStore;
    use serde_json::json;
    use tempfile::tempdir;

    fn record(title: &str) -> ReportRecord {
        let mut attempt = Attempt::start(vec![sample(0, 2)], 60).unwrap();
        attempt.select_answer(0).unwrap();
        attempt.advance();
        let meta = ReportMeta {
            kind: SessionKind::Practice,
            title: title.to_string(),
            subject: "Mathematics".to_string(),
            topic: "Algebra".to_string(),
            difficulty: Difficulty::Beginner,
            assignment_id: None,
        };
        report(&score(&attempt), &attempt, &meta)
    }

    fn scored(percentage: u32, seconds_used: u32, assignment_id: Option<&str>) -> ReportRecord {
        ReportRecord {
            percentage,
            seconds_used,
            assignment_id: assignment_id.map(str::to_string),
            ..record("scored")
        }
    }

    #[test]
    fn summary_of_nothing_is_none() {
        assert_eq!(summarize(&[]), None);
    }

    #[test]
    fn summary_counts_time_and_rounds_half_up() {
        let records = [scored(70, 95, None), scored(71, 120, None)];
        let summary = summarize(&records).unwrap();

        assert_eq!(summary.total_quizzes, 2);
        // 70.5 rounds up
        assert_eq!(summary.average_score, 71);
        assert_eq!(summary.total_seconds, 215);
        assert_eq!(summary.band, ProgressBand::OnTrack);
    }

    #[test]
    fn summary_rounds_down_below_half() {
        let records = [scored(90, 0, None), scored(80, 0, None), scored(80, 0, None)];
        // 83.33
        assert_eq!(summarize(&records).unwrap().average_score, 83);
    }

    #[test]
    fn band_thresholds() {
        assert_eq!(ProgressBand::for_average(100), ProgressBand::Excellent);
        assert_eq!(ProgressBand::for_average(85), ProgressBand::Excellent);
        assert_eq!(ProgressBand::for_average(84), ProgressBand::OnTrack);
        assert_eq!(ProgressBand::for_average(70), ProgressBand::OnTrack);
        assert_eq!(ProgressBand::for_average(69), ProgressBand::NeedsAttention);
        assert_eq!(ProgressBand::for_average(0), ProgressBand::NeedsAttention);
        assert_eq!(ProgressBand::NeedsAttention.to_string(), "needs-attention");
    }

    #[test]
    fn assignment_average_only_counts_that_assignment() {
        let records = [
            scored(60, 0, Some("wk1")),
            scored(75, 0, Some("wk1")),
            scored(100, 0, Some("wk2")),
            scored(0, 0, None),
        ];
        // 67.5 rounds up
        assert_eq!(assignment_average(&records, "wk1"), Some(68));
        assert_eq!(assignment_average(&records, "wk2"), Some(100));
        assert_eq!(assignment_average(&records, "wk3"), None);
    }

    #[test]
    fn history_is_newest_first() {
        let store = MemoryStore::new();
        append_history(&store, &record("first"), 50).unwrap();
        append_history(&store, &record("second"), 50).unwrap();

        let history = load_history(&store);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].title, "second");
        assert_eq!(history[1].title, "first");
    }

    #[test]
    fn history_is_capped() {
        let store = MemoryStore::new();
        for i in 0..5 {
            append_history(&store, &record(&format!("run {i}")), 3).unwrap();
        }

        let history = load_history(&store);
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].title, "run 4");
        assert_eq!(history[2].title, "run 2");
    }

    #[test]
    fn malformed_history_reads_as_empty() {
        let store = MemoryStore::new();
        store.save(HISTORY_KEY, &json!({"not": "a list"})).unwrap();
        assert!(load_history(&store).is_empty());

        // and the next append starts over cleanly
        append_history(&store, &record("fresh"), 50).unwrap();
        assert_eq!(load_history(&store).len(), 1);
    }

    #[test]
    fn export_writes_header_and_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.csv");
        export_csv(&[record("a"), record("b")], &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("completed_at,kind,title"));
        assert!(lines[1].contains(",practice,a,Mathematics,Algebra,beginner,100,1,1,00:00,false"));
    }
}
