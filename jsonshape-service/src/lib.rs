//! Structural JSON validation engine
//!
//! This crate validates a parsed JSON document against a
//! programmatically-constructed expected structure, producing a stream
//! of severity-tagged reports, hierarchical statistics, and a boolean
//! verdict. It supports:
//!
//! - Scalar, array, object, union, and late-bound redirect expectations
//! - Conditional object branches activated by predicates over the input
//! - A small path language (`$`, `@`, `^`, `.key`) for cross-node tests
//! - Silent predicates and loud audits sharing one underlying test
//! - Abstract report and statistics sinks with in-memory defaults
//!
//! Validation is synchronous and purely functional with respect to both
//! trees; distinct documents may be validated concurrently against one
//! shared [`Validator`] as long as each run has its own sinks.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod engine;
pub mod logging;
pub mod path;
pub mod predicate;
pub mod prettify;
pub mod schema;

pub use engine::{Outcome, Validator};
pub use logging::{TeeReports, TracingReports};
pub use path::{PathError, PathExpr, PathStep};
pub use predicate::{Audit, Checked, Predicate, TargetExists, TargetHasValue};
pub use prettify::{CanonicalPrettifier, Prettifier, render_with_context};
pub use schema::{Branch, ExpectedKind, ExpectedNode, Field, Registry};

use std::sync::Arc;

use jsonshape_core::error::Result;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::engine::{Outcome, Validator};
    pub use crate::path::{PathError, PathExpr, PathStep};
    pub use crate::predicate::{Audit, Checked, Predicate, TargetExists, TargetHasValue};
    pub use crate::schema::{Branch, ExpectedKind, ExpectedNode, Field, Registry};
    pub use jsonshape_core::prelude::*;
}

/// Parse JSON text and validate it against an expected structure
///
/// Convenience for one-shot use; build a [`Validator`] directly to
/// reuse the expected structure across documents or to adjust the
/// configuration.
///
/// # Errors
///
/// Propagates the JSON parse error unwrapped, plus the engine faults
/// (unknown redirect identifier, depth bound exceeded).
pub fn validate_str(text: &str, expected: impl Into<Arc<ExpectedNode>>) -> Result<Outcome> {
    Validator::new(expected).validate_str(text)
}
