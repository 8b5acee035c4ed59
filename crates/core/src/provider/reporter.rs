//! Default error reporter.

use std::error::Error;
use tracing::error;

use super::ErrorReporter;
use crate::metrics;

/// Logs reported errors through `tracing` and counts them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report_error(&self, err: &(dyn Error + 'static)) {
        metrics::REPORTED_ERRORS.inc();
        match err.source() {
            Some(source) => error!(error = %err, source = %source, "Subtitle operation failed"),
            None => error!(error = %err, "Subtitle operation failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;

    #[test]
    fn test_reporting_counts_errors() {
        let before = metrics::REPORTED_ERRORS.get();
        TracingErrorReporter.report_error(&ProviderError::Timeout);
        assert!(metrics::REPORTED_ERRORS.get() > before);
    }
}
