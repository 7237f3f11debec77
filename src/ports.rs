//! Boundaries between the session core and the outside world.
//!
//! The core never reaches for globals: storage, rendering, navigation and
//! notifications are handed in as trait objects.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::rc::Rc;

use crate::attempt::Status;
use crate::error::StoreError;
use crate::question::Question;
use crate::report::{ReportRecord, Severity};

/// Key/value persistence for JSON documents
pub trait Storage {
    fn save(&self, key: &str, record: &Value) -> Result<(), StoreError>;
    /// Absent or unreadable data is reported as `None`
    fn load(&self, key: &str) -> Option<Value>;
}

/// Where the front end should go after a session ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
    StudentDashboard,
    Assignments,
    Diagnostic,
}

pub trait Navigator {
    fn session_finished(&self, destination: Destination);
}

/// User-facing toast-style message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

pub trait Notifier {
    fn notify(&self, notice: Notice);
}

/// Everything a view needs to draw the current state of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub status: Status,
    pub position: usize,
    pub total: usize,
    pub question: Question,
    pub selected: Option<usize>,
    pub feedback_shown: bool,
    pub remaining_seconds: u32,
    pub time_limit_seconds: u32,
    pub timed_out: bool,
    /// Present once the session has been scored
    pub report: Option<ReportRecord>,
}

pub trait Presenter {
    fn present(&self, snapshot: &SessionSnapshot);
}

impl<T: Presenter + ?Sized> Presenter for Rc<T> {
    fn present(&self, snapshot: &SessionSnapshot) {
        (**self).present(snapshot)
    }
}

impl<T: Navigator + ?Sized> Navigator for Rc<T> {
    fn session_finished(&self, destination: Destination) {
        (**self).session_finished(destination)
    }
}

impl<T: Notifier + ?Sized> Notifier for Rc<T> {
    fn notify(&self, notice: Notice) {
        (**self).notify(notice)
    }
}

/// Collaborator that discards everything, for flows with no view attached
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl Presenter for Discard {
    fn present(&self, _snapshot: &SessionSnapshot) {}
}

impl Navigator for Discard {
    fn session_finished(&self, _destination: Destination) {}
}

impl Notifier for Discard {
    fn notify(&self, notice: Notice) {
        tracing::debug!(severity = %notice.severity, "{}", notice.message);
    }
}
