use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How hard a question is meant to be. Shown to the student, never used for scoring.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    #[serde(alias = "basic")]
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

/// One multiple-choice assessment item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: usize,
    pub prompt: String,
    pub choices: Vec<String>,
    pub correct_choice: usize,
    pub explanation: String,
    pub difficulty: Difficulty,
    pub subject: String,
    pub topic: String,
}

impl Question {
    /// `correct_choice` must index into `choices`
    pub fn is_well_formed(&self) -> bool {
        self.correct_choice < self.choices.len()
    }

    pub fn choice_text(&self, idx: usize) -> Option<&str> {
        self.choices.get(idx).map(String::as_str)
    }

    pub fn correct_text(&self) -> &str {
        self.choice_text(self.correct_choice).unwrap_or_default()
    }
}

#[cfg(test)]
pub(crate) fn sample(correct_choice: usize, choices: usize) -> Question {
    Question {
        id: 1,
        prompt: "pick one".to_string(),
        choices: (0..choices).map(|i| format!("choice {i}")).collect(),
        correct_choice,
        explanation: "because".to_string(),
        difficulty: Difficulty::Beginner,
        subject: "Mathematics".to_string(),
        topic: "Algebra".to_string(),
    }
}
