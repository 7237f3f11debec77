use include_dir::{include_dir, Dir};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::BankError;
use crate::question::{Difficulty, Question};

static BANK_DIR: Dir = include_dir!("src/bank/data");

const DIAGNOSTIC_FILE: &str = "diagnostic.json";

#[derive(Deserialize, Clone, Debug)]
struct RawQuestion {
    prompt: String,
    choices: Vec<String>,
    correct: usize,
    explanation: String,
    difficulty: Difficulty,
}

#[derive(Deserialize, Clone, Debug)]
struct RawDiagnosticQuestion {
    subject: String,
    topic: String,
    #[serde(flatten)]
    question: RawQuestion,
}

/// One subject file: the catalog of topics offered plus the questions that exist for some of them
#[derive(Deserialize, Clone, Debug)]
struct SubjectFile {
    subject: String,
    catalog: Vec<String>,
    topics: BTreeMap<String, Vec<RawQuestion>>,
}

/// Static, read-only collection of questions grouped by subject and topic
#[derive(Clone, Debug)]
pub struct QuestionBank {
    subjects: Vec<SubjectFile>,
    diagnostic: Vec<Question>,
}

impl QuestionBank {
    /// Load the question bank compiled into the binary
    pub fn bundled() -> Result<Self, BankError> {
        let mut subjects = Vec::new();
        let mut diagnostic = Vec::new();

        for file in BANK_DIR.files() {
            let name = file.path().display().to_string();
            let contents = file
                .contents_utf8()
                .ok_or_else(|| BankError::Encoding(name.clone()))?;

            if name == DIAGNOSTIC_FILE {
                let raw: Vec<RawDiagnosticQuestion> = serde_json::from_str(contents)
                    .map_err(|source| BankError::Parse {
                        file: name.clone(),
                        source,
                    })?;
                diagnostic = raw
                    .into_iter()
                    .enumerate()
                    .map(|(idx, r)| to_question(idx, r.question, &r.subject, &r.topic))
                    .collect();
            } else {
                let parsed: SubjectFile =
                    serde_json::from_str(contents).map_err(|source| BankError::Parse {
                        file: name.clone(),
                        source,
                    })?;
                subjects.push(parsed);
            }
        }

        // include_dir does not promise an order
        subjects.sort_by(|a, b| a.subject.cmp(&b.subject));

        let bank = Self {
            subjects,
            diagnostic,
        };
        bank.validate()?;
        tracing::debug!(
            subjects = bank.subjects.len(),
            diagnostic = bank.diagnostic.len(),
            "question bank loaded"
        );
        Ok(bank)
    }

    fn validate(&self) -> Result<(), BankError> {
        for file in &self.subjects {
            for (topic, questions) in &file.topics {
                if let Some(pos) = questions.iter().position(|q| q.correct >= q.choices.len()) {
                    return Err(BankError::Malformed {
                        subject: file.subject.clone(),
                        topic: topic.clone(),
                        position: pos,
                    });
                }
            }
        }
        if let Some(q) = self.diagnostic.iter().find(|q| !q.is_well_formed()) {
            return Err(BankError::Malformed {
                subject: q.subject.clone(),
                topic: q.topic.clone(),
                position: q.id - 1,
            });
        }
        Ok(())
    }

    /// Subject names in display order
    pub fn subjects(&self) -> Vec<&str> {
        self.subjects.iter().map(|s| s.subject.as_str()).collect()
    }

    /// Topics offered for a subject. Some catalog topics have no questions yet.
    pub fn topics(&self, subject: &str) -> Vec<&str> {
        self.subject_file(subject)
            .map(|s| s.catalog.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Number of questions available for a subject and topic
    pub fn available(&self, subject: &str, topic: &str) -> usize {
        self.topic_questions(subject, topic)
            .map(|(_, _, qs)| qs.len())
            .unwrap_or(0)
    }

    /// The first `count` questions of a subject/topic in bank order.
    ///
    /// Fewer than `count` come back when the topic does not have enough, and an
    /// unknown subject or topic yields an empty list. Ids are renumbered from 1.
    pub fn select_questions(&self, subject: &str, topic: &str, count: usize) -> Vec<Question> {
        let Some((subject, topic, questions)) = self.topic_questions(subject, topic) else {
            return Vec::new();
        };

        questions
            .iter()
            .take(count)
            .enumerate()
            .map(|(idx, raw)| to_question(idx, raw.clone(), subject, topic))
            .collect()
    }

    /// The fixed cross-subject set used for the diagnostic assessment
    pub fn diagnostic(&self) -> Vec<Question> {
        self.diagnostic.clone()
    }

    fn subject_file(&self, subject: &str) -> Option<&SubjectFile> {
        self.subjects
            .iter()
            .find(|s| s.subject.eq_ignore_ascii_case(subject))
    }

    fn topic_questions(
        &self,
        subject: &str,
        topic: &str,
    ) -> Option<(&str, &str, &[RawQuestion])> {
        let file = self.subject_file(subject)?;
        file.topics
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(topic))
            .map(|(name, qs)| (file.subject.as_str(), name.as_str(), qs.as_slice()))
    }
}

/// Placeholder questions for catalog topics that have no bank entries.
///
/// Never used by `select_questions`; callers opt in explicitly.
pub fn generic_questions(subject: &str, topic: &str, difficulty: Difficulty) -> Vec<Question> {
    let templates: [(String, [&str; 4], usize, String); 5] = [
        (
            format!("What is a fundamental concept in {topic}?"),
            ["Option A", "Option B", "Option C", "Option D"],
            0,
            format!("This is a basic concept in {topic} that forms the foundation for more advanced topics."),
        ),
        (
            format!("Which principle is most important in {topic}?"),
            ["Principle 1", "Principle 2", "Principle 3", "Principle 4"],
            1,
            format!("This principle is crucial for understanding {topic} applications."),
        ),
        (
            format!("How is {topic} applied in real-world scenarios?"),
            ["Application A", "Application B", "Application C", "Application D"],
            2,
            format!("{topic} has many practical applications in various fields."),
        ),
        (
            format!("What is the relationship between {topic} and other areas of {subject}?"),
            ["Relationship 1", "Relationship 2", "Relationship 3", "Relationship 4"],
            0,
            format!("{topic} connects to many other areas within {subject}."),
        ),
        (
            format!("What are the key challenges in mastering {topic}?"),
            ["Challenge A", "Challenge B", "Challenge C", "Challenge D"],
            3,
            format!("Understanding these challenges helps in better learning {topic}."),
        ),
    ];

    templates
        .into_iter()
        .enumerate()
        .map(|(idx, (prompt, choices, correct, explanation))| Question {
            id: idx + 1,
            prompt,
            choices: choices.iter().map(|c| c.to_string()).collect(),
            correct_choice: correct,
            explanation,
            difficulty,
            subject: subject.to_string(),
            topic: topic.to_string(),
        })
        .collect()
}

fn to_question(idx: usize, raw: RawQuestion, subject: &str, topic: &str) -> Question {
    Question {
        id: idx + 1,
        prompt: raw.prompt,
        choices: raw.choices,
        correct_choice: raw.correct,
        explanation: raw.explanation,
        difficulty: raw.difficulty,
        subject: subject.to_string(),
        topic: topic.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> QuestionBank {
        QuestionBank::bundled().unwrap()
    }

    #[test]
    fn bundled_bank_has_three_subjects() {
        let bank = bank();
        assert_eq!(
            bank.subjects(),
            vec!["Computer Science", "Mathematics", "Physics"]
        );
    }

    #[test]
    fn catalog_lists_topics_in_file_order() {
        let bank = bank();
        let topics = bank.topics("Physics");
        assert_eq!(topics.first(), Some(&"Mechanics"));
        assert_eq!(topics.len(), 6);
        assert!(bank.topics("Chemistry").is_empty());
    }

    #[test]
    fn select_returns_first_n_in_order() {
        let bank = bank();
        let qs = bank.select_questions("Mathematics", "Calculus", 3);

        assert_eq!(qs.len(), 3);
        assert_eq!(qs[0].prompt, "What is the derivative of x² + 3x + 2?");
        assert_eq!(qs.iter().map(|q| q.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(qs.iter().all(|q| q.subject == "Mathematics" && q.topic == "Calculus"));
    }

    #[test]
    fn select_returns_all_when_fewer_available() {
        let bank = bank();
        let qs = bank.select_questions("Physics", "Mechanics", 50);
        assert_eq!(qs.len(), bank.available("Physics", "Mechanics"));
        assert_eq!(qs.len(), 5);
    }

    #[test]
    fn select_matches_case_insensitively() {
        let bank = bank();
        let qs = bank.select_questions("computer science", "data structures", 1);
        assert_eq!(qs.len(), 1);
        assert_eq!(qs[0].subject, "Computer Science");
        assert_eq!(qs[0].topic, "Data Structures");
    }

    #[test]
    fn unknown_subject_or_topic_is_empty() {
        let bank = bank();
        assert!(bank.select_questions("Chemistry", "Organic", 5).is_empty());
        assert!(bank.select_questions("Mathematics", "Statistics", 5).is_empty());
    }

    #[test]
    fn every_bundled_question_is_well_formed() {
        let bank = bank();
        for subject in bank.subjects() {
            for topic in bank.topics(subject) {
                for q in bank.select_questions(subject, topic, usize::MAX) {
                    assert!(q.is_well_formed(), "{subject}/{topic}: {}", q.prompt);
                }
            }
        }
        assert!(bank.diagnostic().iter().all(Question::is_well_formed));
    }

    #[test]
    fn diagnostic_spans_subjects() {
        let bank = bank();
        let qs = bank.diagnostic();
        assert_eq!(qs.len(), 8);
        assert_eq!(qs[3].difficulty, Difficulty::Beginner);
        assert_eq!(qs[7].id, 8);
    }

    #[test]
    fn generic_questions_mention_topic() {
        let qs = generic_questions("Mathematics", "Statistics", Difficulty::Advanced);
        assert_eq!(qs.len(), 5);
        assert!(qs[0].prompt.contains("Statistics"));
        assert!(qs[3].prompt.contains("Mathematics"));
        assert_eq!(qs[4].correct_choice, 3);
        assert!(qs.iter().all(Question::is_well_formed));
    }
}
