use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::history::{load_typed, save_typed};
use crate::ports::Storage;
use crate::question::Difficulty;
use crate::report::record_id;

pub const ASSIGNMENTS_KEY: &str = "scheduled_quizzes";

/// A quiz an educator has assigned ahead of time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledQuiz {
    pub id: String,
    pub title: String,
    pub subject: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub time_limit_minutes: u32,
    pub question_count: usize,
    #[serde(default)]
    pub completions: u32,
    pub created_at: DateTime<Local>,
}

impl ScheduledQuiz {
    pub fn new(
        title: impl Into<String>,
        subject: impl Into<String>,
        topic: impl Into<String>,
        difficulty: Difficulty,
        time_limit_minutes: u32,
        question_count: usize,
    ) -> Self {
        Self {
            id: record_id(),
            title: title.into(),
            subject: subject.into(),
            topic: topic.into(),
            difficulty,
            time_limit_minutes,
            question_count: question_count.max(1),
            completions: 0,
            created_at: Local::now(),
        }
    }

    pub fn time_limit_seconds(&self) -> u32 {
        self.time_limit_minutes.saturating_mul(60)
    }

    pub fn is_pending(&self) -> bool {
        self.completions == 0
    }
}

/// The assignment list as persisted under one storage key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignments {
    quizzes: Vec<ScheduledQuiz>,
}

impl Assignments {
    /// Read assignments once at startup; unreadable data means none
    pub fn load(storage: &dyn Storage) -> Self {
        let quizzes: Vec<ScheduledQuiz> = load_typed(storage, ASSIGNMENTS_KEY).unwrap_or_default();
        tracing::debug!(count = quizzes.len(), "loaded assignments");
        Self { quizzes }
    }

    pub fn save(&self, storage: &dyn Storage) -> Result<(), StoreError> {
        save_typed(storage, ASSIGNMENTS_KEY, &self.quizzes)
    }

    pub fn all(&self) -> &[ScheduledQuiz] {
        &self.quizzes
    }

    /// Assignments nobody has attempted yet, oldest first
    pub fn pending(&self) -> Vec<&ScheduledQuiz> {
        self.quizzes.iter().filter(|q| q.is_pending()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&ScheduledQuiz> {
        self.quizzes.iter().find(|q| q.id == id)
    }

    pub fn add(&mut self, quiz: ScheduledQuiz) {
        self.quizzes.push(quiz);
    }

    /// Bump the completion count; returns false for an unknown id
    pub fn record_completion(&mut self, id: &str) -> bool {
        match self.quizzes.iter_mut().find(|q| q.id == id) {
            Some(quiz) => {
                quiz.completions += 1;
                true
            }
            None => false,
        }
    }
}

/// Load, bump and save in one step; used after a scheduled attempt is persisted
pub fn record_completion(storage: &dyn Storage, id: &str) -> Result<bool, StoreError> {
    let mut assignments = Assignments::load(storage);
    let found = assignments.record_completion(id);
    if found {
        assignments.save(storage)?;
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn quiz(title: &str) -> ScheduledQuiz {
        ScheduledQuiz::new(title, "Physics", "Mechanics", Difficulty::Intermediate, 30, 5)
    }

    #[test]
    fn new_quiz_is_pending_with_limit_in_seconds() {
        let q = quiz("Week 1");
        assert!(q.is_pending());
        assert_eq!(q.time_limit_seconds(), 1800);
        assert_eq!(q.id.len(), 9);
    }

    #[test]
    fn new_quiz_asks_at_least_one_question() {
        let q = ScheduledQuiz::new("Empty", "Physics", "Mechanics", Difficulty::Beginner, 10, 0);
        assert_eq!(q.question_count, 1);
    }

    #[test]
    fn assignments_survive_save_and_load() {
        let store = MemoryStore::new();
        let mut assignments = Assignments::default();
        assignments.add(quiz("Week 1"));
        assignments.add(quiz("Week 2"));
        assignments.save(&store).unwrap();

        let loaded = Assignments::load(&store);
        assert_eq!(loaded, assignments);
        assert_eq!(loaded.pending().len(), 2);
    }

    #[test]
    fn completion_removes_from_pending() {
        let store = MemoryStore::new();
        let mut assignments = Assignments::default();
        let first = quiz("Week 1");
        let id = first.id.clone();
        assignments.add(first);
        assignments.add(quiz("Week 2"));
        assignments.save(&store).unwrap();

        assert!(record_completion(&store, &id).unwrap());
        let loaded = Assignments::load(&store);
        assert_eq!(loaded.get(&id).unwrap().completions, 1);
        assert_eq!(loaded.pending().len(), 1);
        assert_eq!(loaded.pending()[0].title, "Week 2");
    }

    #[test]
    fn unknown_completion_is_reported() {
        let store = MemoryStore::new();
        assert!(!record_completion(&store, "nope").unwrap());
    }

    #[test]
    fn malformed_assignments_read_as_none() {
        let store = MemoryStore::new();
        store.save(ASSIGNMENTS_KEY, &json!("garbage")).unwrap();
        assert!(Assignments::load(&store).all().is_empty());
    }

    #[test]
    fn missing_completions_field_defaults_to_zero() {
        let store = MemoryStore::new();
        let mut value = serde_json::to_value(vec![quiz("Old")]).unwrap();
        value[0].as_object_mut().unwrap().remove("completions");
        store.save(ASSIGNMENTS_KEY, &value).unwrap();

        let loaded = Assignments::load(&store);
        assert_eq!(loaded.all()[0].completions, 0);
    }
}
