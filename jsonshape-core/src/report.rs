//! Report and statistics protocol
//!
//! The engine communicates through two abstract sinks. Reports carry
//! severity-tagged messages with a `%s` format convention and an
//! optional context node; statistics are hierarchical counters keyed by
//! path segments. In-memory implementations of both are provided for
//! direct use and for tests.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value::NodeId;

/// Severity level for report messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Traversal details such as successful branch activation
    Debug,
    /// Notable but harmless observations
    Info,
    /// Structure deviates but traversal can make sense of it
    Warn,
    /// Structure violates the expectation
    Error,
    /// Reserved for sink implementations that escalate
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Debug => write!(f, "DEBUG"),
            Severity::Info => write!(f, "INFO"),
            Severity::Warn => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// A single report message
///
/// The format string uses `%s` placeholders substituted left to right
/// from `args` when rendered. The raw parts are kept so sinks can apply
/// their own formatting or filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMessage {
    /// Severity of the message
    pub severity: Severity,
    /// The input node the message is about, when one exists
    pub context: Option<NodeId>,
    /// Format string with `%s` placeholders
    pub format: String,
    /// Arguments substituted into the format string
    pub args: Vec<String>,
}

impl ReportMessage {
    /// Create a new message
    pub fn new(severity: Severity, format: impl Into<String>) -> Self {
        Self {
            severity,
            context: None,
            format: format.into(),
            args: Vec::new(),
        }
    }

    /// Create a debug message
    pub fn debug(format: impl Into<String>) -> Self {
        Self::new(Severity::Debug, format)
    }

    /// Create an info message
    pub fn info(format: impl Into<String>) -> Self {
        Self::new(Severity::Info, format)
    }

    /// Create a warn message
    pub fn warn(format: impl Into<String>) -> Self {
        Self::new(Severity::Warn, format)
    }

    /// Create an error message
    pub fn error(format: impl Into<String>) -> Self {
        Self::new(Severity::Error, format)
    }

    /// Attach the input node this message is about
    #[must_use]
    pub fn with_context(mut self, context: NodeId) -> Self {
        self.context = Some(context);
        self
    }

    /// Append one argument
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Substitute `%s` placeholders left to right
    ///
    /// Rendering never fails: placeholders without an argument render
    /// empty, surplus arguments are appended at the end.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.format.len());
        let mut args = self.args.iter();
        let mut parts = self.format.split("%s");
        if let Some(first) = parts.next() {
            out.push_str(first);
        }
        for part in parts {
            if let Some(arg) = args.next() {
                out.push_str(arg);
            }
            out.push_str(part);
        }
        for leftover in args {
            out.push(' ');
            out.push_str(leftover);
        }
        out
    }
}

impl fmt::Display for ReportMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.render())
    }
}

/// Receiver for report messages
///
/// Append-only: the sink decides filtering, formatting, and persistence
/// and carries no back-channel to cancel traversal.
pub trait ReportSink {
    /// Accept one message
    fn add_report(&mut self, message: ReportMessage);
}

/// Receiver for statistics increments at hierarchical keys
pub trait StatsSink {
    /// Add `delta` to the counter at `path`
    fn add_stat(&mut self, delta: i64, path: &[&str]);
}

/// In-memory report sink retaining every message in arrival order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportBuffer {
    /// Messages in the order they were emitted
    messages: Vec<ReportMessage>,
    error_count: usize,
    warn_count: usize,
}

impl ReportBuffer {
    /// Create an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages in emission order
    #[must_use]
    pub fn messages(&self) -> &[ReportMessage] {
        &self.messages
    }

    /// Messages at error severity or above
    pub fn errors(&self) -> impl Iterator<Item = &ReportMessage> {
        self.messages
            .iter()
            .filter(|m| m.severity >= Severity::Error)
    }

    /// Messages at warn severity
    pub fn warnings(&self) -> impl Iterator<Item = &ReportMessage> {
        self.messages
            .iter()
            .filter(|m| m.severity == Severity::Warn)
    }

    /// Messages at exactly the given severity
    pub fn at_severity(&self, severity: Severity) -> impl Iterator<Item = &ReportMessage> {
        self.messages.iter().filter(move |m| m.severity == severity)
    }

    /// Whether any error-or-above message was recorded
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Number of retained messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the buffer is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// One-line summary of the buffer contents
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} messages ({} errors, {} warnings)",
            self.messages.len(),
            self.error_count,
            self.warn_count
        )
    }
}

impl ReportSink for ReportBuffer {
    fn add_report(&mut self, message: ReportMessage) {
        match message.severity {
            Severity::Error | Severity::Fatal => self.error_count += 1,
            Severity::Warn => self.warn_count += 1,
            Severity::Debug | Severity::Info => {}
        }
        self.messages.push(message);
    }
}

impl fmt::Display for ReportBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for message in &self.messages {
            writeln!(f, "  {message}")?;
        }
        Ok(())
    }
}

/// In-memory statistics sink
///
/// Counters are stored flat under their dot-joined hierarchical key,
/// in first-touch order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsTable {
    counters: IndexMap<String, i64>,
}

impl StatsTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter value at a hierarchical key, zero when untouched
    #[must_use]
    pub fn get(&self, path: &[&str]) -> i64 {
        self.counters.get(&path.join(".")).copied().unwrap_or(0)
    }

    /// Iterate counters as (dot-joined key, value)
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.counters.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of distinct counters
    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Whether no counter was touched
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

impl StatsSink for StatsTable {
    fn add_stat(&mut self, delta: i64, path: &[&str]) {
        *self.counters.entry(path.join(".")).or_insert(0) += delta;
    }
}
