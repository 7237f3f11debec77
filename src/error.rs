//! Error types for the session core and its storage.

use thiserror::Error;

/// Caller-contract violations raised by the session state machine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// `select_answer` was given an index outside the current question's choices
    #[error("choice {choice} is out of range, question has {available} choices")]
    InvalidSelection { choice: usize, available: usize },

    /// A session cannot start without questions
    #[error("cannot start a session with no questions")]
    EmptyQuestionSet,

    /// A question's correct index does not point into its choices
    #[error("question at position {position} has no valid correct choice")]
    InvalidQuestion { position: usize },
}

/// Failures of the persistence collaborator
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Problems reading the bundled question bank
#[derive(Error, Debug)]
pub enum BankError {
    #[error("question file {0} is not valid UTF-8")]
    Encoding(String),

    #[error("failed to parse question file {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{subject}/{topic} question {position} has an out-of-range correct choice")]
    Malformed {
        subject: String,
        topic: String,
        position: usize,
    },
}
