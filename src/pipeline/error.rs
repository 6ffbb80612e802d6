//! Stage-level failures and where they get reported.

use std::fmt;
use std::sync::Mutex;
use tracing::{error, warn};

/// A failure inside one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// The stage skips the failing unit and keeps going.
    Recoverable(String),
    /// The turn cannot continue.
    Fatal(String),
}

impl StageError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StageError::Recoverable(_))
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::Recoverable(msg) => write!(f, "Recoverable error: {}", msg),
            StageError::Fatal(msg) => write!(f, "Fatal error: {}", msg),
        }
    }
}

impl std::error::Error for StageError {}

/// Trait for reporting stage errors.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, stage: &str, error: &StageError);
}

/// Reports through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, stage: &str, err: &StageError) {
        match err {
            StageError::Recoverable(msg) => warn!(stage, "{}", msg),
            StageError::Fatal(msg) => error!(stage, "{}", msg),
        }
    }
}

/// Keeps every report in memory. Useful in tests.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    reports: Mutex<Vec<(String, StageError)>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(String, StageError)> {
        self.reports.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, stage: &str, error: &StageError) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push((stage.to_string(), error.clone()));
        }
    }
}
