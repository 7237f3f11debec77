use chrono::{DateTime, Local};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::attempt::Attempt;
use crate::question::Difficulty;
use crate::scorer::ScoredResult;

const STRENGTH_RATIO: f64 = 0.7;
const WEAKNESS_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubjectScore {
    pub correct: usize,
    pub total: usize,
}

impl SubjectScore {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

/// Placement derived from a diagnostic assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticSummary {
    pub overall_score: u32,
    pub learning_level: Difficulty,
    pub subject_scores: BTreeMap<String, SubjectScore>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub seconds_used: u32,
    pub completed_at: DateTime<Local>,
}

impl DiagnosticSummary {
    pub fn from_result(result: &ScoredResult, attempt: &Attempt) -> Self {
        let subject_scores: BTreeMap<String, SubjectScore> = attempt
            .questions()
            .iter()
            .zip(&result.outcomes)
            .into_group_map_by(|(q, _)| q.subject.clone())
            .into_iter()
            .map(|(subject, entries)| {
                let score = SubjectScore {
                    correct: entries.iter().filter(|(_, o)| o.is_correct).count(),
                    total: entries.len(),
                };
                (subject, score)
            })
            .collect();

        let strengths = subject_scores
            .iter()
            .filter(|(_, s)| s.ratio() >= STRENGTH_RATIO)
            .map(|(name, _)| name.clone())
            .collect();
        let weaknesses = subject_scores
            .iter()
            .filter(|(_, s)| s.ratio() < WEAKNESS_RATIO)
            .map(|(name, _)| name.clone())
            .collect();

        Self {
            overall_score: result.percentage,
            learning_level: learning_level(result.percentage),
            subject_scores,
            strengths,
            weaknesses,
            seconds_used: result.seconds_used,
            completed_at: Local::now(),
        }
    }
}

pub fn learning_level(overall_score: u32) -> Difficulty {
    if overall_score >= 80 {
        Difficulty::Advanced
    } else if overall_score >= 60 {
        Difficulty::Intermediate
    } else {
        Difficulty::Beginner
    }
}
