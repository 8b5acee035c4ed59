//! Error reporter that records what it receives.

use std::sync::Mutex;

use crate::provider::ErrorReporter;

/// Collects reported errors as their display strings.
#[derive(Debug, Default)]
pub struct RecordingErrorReporter {
    messages: Mutex<Vec<String>>,
}

impl RecordingErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of errors reported so far.
    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl ErrorReporter for RecordingErrorReporter {
    fn report_error(&self, error: &(dyn std::error::Error + 'static)) {
        self.messages.lock().unwrap().push(error.to_string());
    }
}
