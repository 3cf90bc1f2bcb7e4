//! Report sink adapter for the `tracing` subscriber
//!
//! Validation reports can be routed straight into the application's
//! logging pipeline instead of (or alongside) an in-memory buffer.

use jsonshape_core::report::{ReportMessage, ReportSink, Severity};

/// Forwards every report as a `tracing` event at the matching level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReports;

impl ReportSink for TracingReports {
    fn add_report(&mut self, message: ReportMessage) {
        let rendered = message.render();
        match message.severity {
            Severity::Debug => tracing::debug!(target: "jsonshape", "{rendered}"),
            Severity::Info => tracing::info!(target: "jsonshape", "{rendered}"),
            Severity::Warn => tracing::warn!(target: "jsonshape", "{rendered}"),
            Severity::Error | Severity::Fatal => {
                tracing::error!(target: "jsonshape", "{rendered}");
            }
        }
    }
}

/// Duplicates every report into two sinks
///
/// Lets a caller keep the in-memory buffer for the verdict while also
/// streaming diagnostics to a logger.
pub struct TeeReports<'a> {
    first: &'a mut dyn ReportSink,
    second: &'a mut dyn ReportSink,
}

impl<'a> TeeReports<'a> {
    /// Combine two sinks
    pub fn new(first: &'a mut dyn ReportSink, second: &'a mut dyn ReportSink) -> Self {
        Self { first, second }
    }
}

impl ReportSink for TeeReports<'_> {
    fn add_report(&mut self, message: ReportMessage) {
        self.first.add_report(message.clone());
        self.second.add_report(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonshape_core::report::ReportBuffer;

    #[test]
    fn test_tracing_sink_accepts_all_severities() {
        let mut sink = TracingReports;
        for severity in [
            Severity::Debug,
            Severity::Info,
            Severity::Warn,
            Severity::Error,
            Severity::Fatal,
        ] {
            sink.add_report(ReportMessage::new(severity, "event %s").with_arg("x"));
        }
    }

    #[test]
    fn test_tee_duplicates() {
        let mut left = ReportBuffer::new();
        let mut right = ReportBuffer::new();
        {
            let mut tee = TeeReports::new(&mut left, &mut right);
            tee.add_report(ReportMessage::warn("shared"));
        }
        assert_eq!(left.len(), 1);
        assert_eq!(right.len(), 1);
        assert_eq!(left.messages()[0].render(), right.messages()[0].render());
    }
}
