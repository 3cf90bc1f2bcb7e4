//! Predicates and audits
//!
//! A predicate is a silent boolean test over an input node: it reports
//! nothing on its own, but explains failures into an issue buffer the
//! caller may inspect or discard. An audit is the loud twin, wired to
//! the report sink. The two are one underlying test; [`Checked`]
//! derives the audit form from any predicate by draining its issues
//! into the sink on failure.

use std::sync::Arc;

use jsonshape_core::error::Result;
use jsonshape_core::report::{ReportMessage, ReportSink};
use jsonshape_core::value::{NodeId, ValueTree};

use crate::path::PathExpr;

/// A silent boolean test over an input node
pub trait Predicate: Send + Sync {
    /// Run the test against the node `at`
    ///
    /// On failure, explanatory messages are pushed into `issues`; the
    /// caller decides whether they surface anywhere.
    fn test(&self, tree: &ValueTree, at: NodeId, issues: &mut Vec<ReportMessage>) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&ValueTree, NodeId, &mut Vec<ReportMessage>) -> bool + Send + Sync,
{
    fn test(&self, tree: &ValueTree, at: NodeId, issues: &mut Vec<ReportMessage>) -> bool {
        self(tree, at, issues)
    }
}

/// A loud test: failures route their issues into the report sink
pub trait Audit: Send + Sync {
    /// Run the test, reporting on failure; the return value feeds the
    /// overall verdict
    fn run(&self, tree: &ValueTree, at: NodeId, reports: &mut dyn ReportSink) -> bool;
}

/// Audit adapter around any predicate
///
/// Succeeds silently; on failure the predicate's issues are drained
/// into the report sink.
pub struct Checked<P> {
    inner: P,
}

impl<P: Predicate> Checked<P> {
    /// Wrap a predicate into its audit form
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

impl<P: Predicate> Audit for Checked<P> {
    fn run(&self, tree: &ValueTree, at: NodeId, reports: &mut dyn ReportSink) -> bool {
        let mut issues = Vec::new();
        let passed = self.inner.test(tree, at, &mut issues);
        if !passed {
            for issue in issues {
                reports.add_report(issue);
            }
        }
        passed
    }
}

/// Succeeds iff the path evaluates without error from the current node
pub struct TargetExists {
    path: Arc<PathExpr>,
}

impl TargetExists {
    /// Build the test for a path expression
    ///
    /// # Errors
    ///
    /// Returns a parse error when the path text is invalid.
    pub fn new(path: &str) -> Result<Self> {
        Ok(Self {
            path: PathExpr::shared(path)?,
        })
    }

    /// The audit form of the same test
    ///
    /// # Errors
    ///
    /// Returns a parse error when the path text is invalid.
    pub fn audit(path: &str) -> Result<Checked<Self>> {
        Ok(Checked::new(Self::new(path)?))
    }
}

impl Predicate for TargetExists {
    fn test(&self, tree: &ValueTree, at: NodeId, issues: &mut Vec<ReportMessage>) -> bool {
        match self.path.find_in(tree, at) {
            Ok(_) => true,
            Err(err) => {
                issues.push(
                    ReportMessage::error("Path %s failed: %s")
                        .with_context(at)
                        .with_arg(self.path.raw())
                        .with_arg(err.to_string()),
                );
                false
            }
        }
    }
}

/// Succeeds iff the path target exists, is a scalar, and its value is
/// one of the accepted strings
pub struct TargetHasValue {
    path: Arc<PathExpr>,
    accepted: Vec<String>,
}

impl TargetHasValue {
    /// Build the test for a path and a set of accepted values
    ///
    /// Accepted values compare against the stringified scalar at the
    /// target, so numeric and boolean targets are written literally
    /// (`"7"`, `"true"`).
    ///
    /// # Errors
    ///
    /// Returns a parse error when the path text is invalid.
    pub fn new<I, S>(path: &str, accepted: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            path: PathExpr::shared(path)?,
            accepted: accepted.into_iter().map(Into::into).collect(),
        })
    }

    /// The audit form of the same test
    ///
    /// # Errors
    ///
    /// Returns a parse error when the path text is invalid.
    pub fn audit<I, S>(path: &str, accepted: I) -> Result<Checked<Self>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Checked::new(Self::new(path, accepted)?))
    }
}

impl Predicate for TargetHasValue {
    fn test(&self, tree: &ValueTree, at: NodeId, issues: &mut Vec<ReportMessage>) -> bool {
        let target = match self.path.find_in(tree, at) {
            Ok(target) => target,
            Err(err) => {
                issues.push(
                    ReportMessage::error("Path %s failed: %s")
                        .with_context(at)
                        .with_arg(self.path.raw())
                        .with_arg(err.to_string()),
                );
                return false;
            }
        };

        let Some(value) = tree.scalar_repr(target) else {
            issues.push(
                ReportMessage::error("Invalid type %s at %s, should be a scalar value")
                    .with_context(target)
                    .with_arg(tree.type_name(target))
                    .with_arg(self.path.raw()),
            );
            return false;
        };

        if self.accepted.iter().any(|accepted| accepted == &value) {
            true
        } else {
            issues.push(
                ReportMessage::warn("Invalid value %s, should be one of: %s")
                    .with_context(target)
                    .with_arg(value)
                    .with_arg(self.accepted.join(", ")),
            );
            false
        }
    }
}
