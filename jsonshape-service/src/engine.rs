//! The validation engine
//!
//! A [`Validator`] holds one expected structure, the registry its
//! redirects resolve against, and the configuration. Validation is a
//! synchronous recursive comparison of an input tree against the
//! expected tree: reports are accumulated through the sink in
//! depth-first traversal order, statistics commute, and the boolean
//! verdict is the conjunction of every structural rule and audit.

use std::sync::Arc;

use jsonshape_core::config::ValidatorConfig;
use jsonshape_core::error::{Result, ShapeError};
use jsonshape_core::report::{ReportBuffer, ReportMessage, ReportSink, StatsSink, StatsTable};
use jsonshape_core::value::{NodeId, TypeMask, ValueKind, ValueTree};

use crate::schema::{Branch, ExpectedKind, ExpectedNode, Field, Registry};

/// Result of a top-level validation run
#[derive(Debug)]
pub struct Outcome {
    /// Whether the document satisfied the expected structure
    pub valid: bool,
    /// Every report emitted during the run, in traversal order
    pub reports: ReportBuffer,
    /// Statistics accumulated during the run
    pub stats: StatsTable,
    /// The input tree the run was performed on; report contexts point
    /// into it
    pub tree: ValueTree,
}

/// Validation engine for one expected structure
pub struct Validator {
    expected: Arc<ExpectedNode>,
    registry: Registry,
    config: ValidatorConfig,
}

impl Validator {
    /// Create an engine for an expected structure
    ///
    /// The structure is wrapped in a root expectation when the caller
    /// has not done so, and its identifier-carrying nodes are collected
    /// into the engine's registry.
    #[must_use]
    pub fn new(expected: impl Into<Arc<ExpectedNode>>) -> Self {
        let supplied = expected.into();
        let expected = match supplied.kind() {
            ExpectedKind::Root(_) => supplied,
            _ => Arc::new(ExpectedNode::root(supplied)),
        };
        let registry = Registry::collect(&expected);
        Self {
            expected,
            registry,
            config: ValidatorConfig::default(),
        }
    }

    /// Replace the configuration
    #[must_use]
    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Register an out-of-tree redirect target
    pub fn register(&mut self, id: impl Into<String>, node: impl Into<Arc<ExpectedNode>>) {
        self.registry.register(id, node);
    }

    /// The engine's redirect registry
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Validate a loaded input tree
    ///
    /// Diagnostics go to `reports`, counters to `stats`; the return
    /// value is the verdict. Neither the input tree nor the expected
    /// tree is mutated.
    ///
    /// # Errors
    ///
    /// Returns a fault for an unknown redirect identifier or when the
    /// comparison exceeds the configured depth bound. Faults emit no
    /// report.
    pub fn validate(
        &self,
        tree: &ValueTree,
        reports: &mut dyn ReportSink,
        stats: &mut dyn StatsSink,
    ) -> Result<bool> {
        let mut walk = Walk {
            registry: &self.registry,
            config: &self.config,
            tree,
            reports,
            stats,
        };
        walk.compare(tree.root(), &self.expected, 0)
    }

    /// Validate an already-parsed JSON value
    ///
    /// # Errors
    ///
    /// Same faults as [`Validator::validate`].
    pub fn validate_value(&self, raw: &serde_json::Value) -> Result<Outcome> {
        let tree = ValueTree::from_json(raw);
        let mut reports = ReportBuffer::new();
        let mut stats = StatsTable::new();
        let valid = self.validate(&tree, &mut reports, &mut stats)?;
        Ok(Outcome {
            valid,
            reports,
            stats,
            tree,
        })
    }

    /// Parse JSON text and validate it
    ///
    /// # Errors
    ///
    /// Propagates the parse error unwrapped when the text is not valid
    /// JSON, plus the faults of [`Validator::validate`].
    pub fn validate_str(&self, text: &str) -> Result<Outcome> {
        let raw: serde_json::Value = serde_json::from_str(text)?;
        self.validate_value(&raw)
    }
}

/// One validation pass over one input tree
struct Walk<'a> {
    registry: &'a Registry,
    config: &'a ValidatorConfig,
    tree: &'a ValueTree,
    reports: &'a mut dyn ReportSink,
    stats: &'a mut dyn StatsSink,
}

impl Walk<'_> {
    fn compare(&mut self, at: NodeId, expected: &ExpectedNode, depth: usize) -> Result<bool> {
        if depth >= self.config.max_depth {
            return Err(ShapeError::depth_exceeded(self.config.max_depth));
        }

        // A node's own nullable flag admits null before any other
        // check, a redirect's included: delegation covers type, name,
        // and structure, not nullability.
        if matches!(self.tree.kind(at), ValueKind::Null) && expected.is_nullable() {
            self.stats.add_stat(1, &["types", self.tree.type_name(at)]);
            return Ok(true);
        }

        // A redirect delegates wholesale to its target; its own audits
        // still run afterwards.
        if let ExpectedKind::Redirect(id) = expected.kind() {
            let target = Arc::clone(self.registry.resolve(id)?);
            tracing::trace!(id = %id, target = %target.type_name(), "resolved redirect");
            let structural = self.compare(at, &target, depth + 1)?;
            let checks = self.run_audits(at, expected);
            return Ok(structural && checks);
        }

        let tree = self.tree;
        self.stats.add_stat(1, &["types", tree.type_name(at)]);

        let mask = self.mask_of(expected, depth)?;
        if !mask.accepts(tree.type_mask(at)) {
            self.report_type_mismatch(at, expected, depth)?;
            return Ok(false);
        }

        let structural = match expected.kind() {
            ExpectedKind::Null
            | ExpectedKind::Boolean(_)
            | ExpectedKind::Integer(_)
            | ExpectedKind::Double(_)
            | ExpectedKind::String(_)
            | ExpectedKind::Scalar => self.compare_scalar(at, expected),
            ExpectedKind::Array(templates) => self.compare_array(at, templates, depth)?,
            ExpectedKind::Object { fields, branches } => {
                self.compare_object(at, fields, branches, depth)?
            }
            ExpectedKind::Mixed(alternatives) => self.compare_mixed(at, alternatives, depth)?,
            ExpectedKind::Root(child) => self.compare_root(at, child, depth)?,
            // delegated above
            ExpectedKind::Redirect(_) => false,
        };
        let checks = self.run_audits(at, expected);
        Ok(structural && checks)
    }

    /// Effective type mask, resolving redirects and mixed unions
    fn mask_of(&self, expected: &ExpectedNode, depth: usize) -> Result<TypeMask> {
        if depth >= self.config.max_depth {
            return Err(ShapeError::depth_exceeded(self.config.max_depth));
        }
        match expected.kind() {
            ExpectedKind::Redirect(id) => self.mask_of(self.registry.resolve(id)?, depth + 1),
            ExpectedKind::Mixed(alternatives) => {
                let mut mask = TypeMask::empty();
                for alternative in alternatives {
                    mask |= self.mask_of(alternative, depth + 1)?;
                }
                Ok(mask)
            }
            _ => Ok(expected.static_mask().unwrap_or(TypeMask::ANY)),
        }
    }

    /// Expectation name for diagnostics, seen through redirects
    fn resolved_name(&self, expected: &ExpectedNode, depth: usize) -> Result<&'static str> {
        if depth >= self.config.max_depth {
            return Err(ShapeError::depth_exceeded(self.config.max_depth));
        }
        match expected.kind() {
            ExpectedKind::Redirect(id) => self.resolved_name(self.registry.resolve(id)?, depth + 1),
            _ => Ok(expected.type_name()),
        }
    }

    fn report_type_mismatch(
        &mut self,
        at: NodeId,
        expected: &ExpectedNode,
        depth: usize,
    ) -> Result<()> {
        let tree = self.tree;
        let message = if let ExpectedKind::Mixed(alternatives) = expected.kind() {
            let mut names = Vec::with_capacity(alternatives.len());
            for alternative in alternatives {
                names.push(self.resolved_name(alternative, depth)?);
            }
            ReportMessage::error("Invalid type %s, must have been one of: %s")
                .with_context(at)
                .with_arg(tree.type_name(at))
                .with_arg(names.join(", "))
        } else if let Some(container) = tree.containing_field(at) {
            ReportMessage::error("Invalid type %s for field %s, should be %s")
                .with_context(at)
                .with_arg(tree.type_name(at))
                .with_arg(container)
                .with_arg(self.resolved_name(expected, depth)?)
        } else {
            ReportMessage::error("Invalid type %s, should be %s")
                .with_context(at)
                .with_arg(tree.type_name(at))
                .with_arg(self.resolved_name(expected, depth)?)
        };
        self.reports.add_report(message);
        Ok(())
    }

    fn compare_scalar(&mut self, at: NodeId, expected: &ExpectedNode) -> bool {
        let tree = self.tree;
        if let Some(value) = tree.scalar_repr(at) {
            self.stats
                .add_stat(1, &["values", tree.type_name(at), value.as_str()]);
        }

        let matches_literal = match (expected.kind(), tree.kind(at)) {
            (ExpectedKind::Boolean(Some(want)), ValueKind::Boolean(got)) => want == got,
            (ExpectedKind::Integer(Some(want)), ValueKind::Integer(got)) => want == got,
            (ExpectedKind::Double(Some(want)), ValueKind::Double(got)) => {
                want.to_bits() == got.to_bits()
            }
            (ExpectedKind::String(Some(want)), ValueKind::String(got)) => want == got,
            _ => true,
        };
        if matches_literal {
            return true;
        }

        let want = expected.literal_repr().unwrap_or_default();
        let got = tree.describe(at);
        let message = if let Some(container) = tree.containing_field(at) {
            ReportMessage::warn("Value %s for field %s does not match the expected value %s")
                .with_context(at)
                .with_arg(got)
                .with_arg(container)
                .with_arg(want)
        } else {
            ReportMessage::warn("Value %s does not match the expected value %s")
                .with_context(at)
                .with_arg(got)
                .with_arg(want)
        };
        self.reports.add_report(message);
        false
    }

    fn compare_array(
        &mut self,
        at: NodeId,
        templates: &[Arc<ExpectedNode>],
        depth: usize,
    ) -> Result<bool> {
        let tree = self.tree;
        let elements = match tree.kind(at) {
            ValueKind::Array(elements) => elements.clone(),
            _ => return Ok(false),
        };

        let mut ok = true;
        let mut template_used = vec![false; templates.len()];
        for (position, element) in elements.iter().enumerate() {
            let element_bit = tree.type_mask(*element);
            let mut overlapping = Vec::new();
            for (index, template) in templates.iter().enumerate() {
                if self.mask_of(template, depth + 1)?.accepts(element_bit) {
                    overlapping.push(index);
                }
            }

            if overlapping.is_empty() {
                let message = if let Some(container) = tree.containing_field(at) {
                    ReportMessage::warn("Unexpected array element at position %s in field %s")
                        .with_context(*element)
                        .with_arg(position.to_string())
                        .with_arg(container)
                } else {
                    ReportMessage::warn("Unexpected array element at position %s")
                        .with_context(*element)
                        .with_arg(position.to_string())
                };
                self.reports.add_report(message);
                ok = false;
                continue;
            }

            self.stats
                .add_stat(1, &["elements", tree.type_name(*element)]);
            for index in overlapping {
                template_used[index] = true;
                let passed = self.compare(*element, &templates[index], depth + 1)?;
                ok = ok && passed;
            }
        }

        if self.config.strict_arrays {
            for (index, used) in template_used.iter().enumerate() {
                if !used {
                    self.reports.add_report(
                        ReportMessage::warn("No array element matched the %s template")
                            .with_context(at)
                            .with_arg(templates[index].type_name()),
                    );
                }
            }
        }

        Ok(ok)
    }

    fn compare_object(
        &mut self,
        at: NodeId,
        fields: &[Field],
        branches: &[Branch],
        depth: usize,
    ) -> Result<bool> {
        let tree = self.tree;
        let mut ok = true;

        // Active field set: base fields joined by the outcomes of every
        // branch whose predicate holds. Outcomes override base fields
        // sharing a key.
        let mut active: indexmap::IndexMap<&str, &Field> = indexmap::IndexMap::new();
        for field in fields {
            active.insert(field.key.as_str(), field);
        }
        for branch in branches {
            let mut issues = Vec::new();
            if branch.predicate.test(tree, at, &mut issues) {
                tracing::debug!(branch = %branch.label, "branch activated");
                self.reports.add_report(
                    ReportMessage::debug("Successfully branched to: %s")
                        .with_context(at)
                        .with_arg(branch.label.as_str()),
                );
                for outcome in &branch.outcomes {
                    active.insert(outcome.key.as_str(), outcome);
                }
            }
        }

        let mut unmatched: Vec<&str> = tree.object_keys(at);

        for field in active.values().filter(|field| !field.placeholder) {
            match tree.get_field(at, &field.key) {
                Some(child) => {
                    let passed = self.compare(child, &field.template, depth + 1)?;
                    ok = ok && passed;
                    self.stats.add_stat(1, &["fields", tree.type_name(child)]);
                    self.stats.add_stat(1, &["keys", field.key.as_str()]);
                    unmatched.retain(|key| *key != field.key.as_str());
                }
                None if field.required => {
                    let message = if let Some(container) = tree.containing_field(at) {
                        ReportMessage::error("Missing required nested field %s for object %s")
                            .with_context(at)
                            .with_arg(field.key.as_str())
                            .with_arg(container)
                    } else {
                        ReportMessage::error("Missing required field %s")
                            .with_context(at)
                            .with_arg(field.key.as_str())
                    };
                    self.reports.add_report(message);
                    ok = false;
                }
                None => {}
            }
        }

        // Remaining keys are offered to placeholders in declaration
        // order; the first placeholder whose mask fits claims the key.
        for field in active.values().filter(|field| field.placeholder) {
            let mask = self.mask_of(&field.template, depth + 1)?;
            let mut claimed = Vec::new();
            for key in &unmatched {
                let Some(child) = tree.get_field(at, key) else {
                    continue;
                };
                if mask.accepts(tree.type_mask(child)) {
                    let passed = self.compare(child, &field.template, depth + 1)?;
                    ok = ok && passed;
                    claimed.push(*key);
                }
            }
            unmatched.retain(|key| !claimed.contains(key));
        }

        let ignored: Vec<&str> = unmatched
            .iter()
            .copied()
            .filter(|key| self.config.is_ignored_key(key))
            .collect();
        if !ignored.is_empty() {
            unmatched.retain(|key| !ignored.contains(key));
            self.reports.add_report(
                ReportMessage::info("Ignoring globally accepted keys: %s")
                    .with_context(at)
                    .with_arg(ignored.join(", ")),
            );
        }

        if !unmatched.is_empty() {
            let accepted: Vec<String> = active
                .values()
                .map(|field| {
                    if field.placeholder {
                        format!("<{}>", field.template.type_name())
                    } else {
                        field.key.clone()
                    }
                })
                .collect();
            self.reports.add_report(
                ReportMessage::warn("Unexpected keys: %s, accepted keys are: %s")
                    .with_context(at)
                    .with_arg(unmatched.join(", "))
                    .with_arg(accepted.join(", ")),
            );
            ok = false;
        }

        Ok(ok)
    }

    fn compare_mixed(
        &mut self,
        at: NodeId,
        alternatives: &[Arc<ExpectedNode>],
        depth: usize,
    ) -> Result<bool> {
        let input_bit = self.tree.type_mask(at);
        for alternative in alternatives {
            if self.mask_of(alternative, depth + 1)?.accepts(input_bit) {
                return self.compare(at, alternative, depth + 1);
            }
        }
        // unreachable: the type gate rejects inputs overlapping no alternative
        Ok(false)
    }

    fn compare_root(&mut self, at: NodeId, child: &ExpectedNode, depth: usize) -> Result<bool> {
        let tree = self.tree;
        let document = match tree.kind(at) {
            ValueKind::Root(document) => *document,
            _ => return Ok(false),
        };
        self.stats
            .add_stat(1, &["root", "type", tree.type_name(document)]);
        self.compare(document, child, depth + 1)
    }

    fn run_audits(&mut self, at: NodeId, expected: &ExpectedNode) -> bool {
        let mut ok = true;
        for audit in expected.audits() {
            let passed = audit.run(self.tree, at, &mut *self.reports);
            ok = ok && passed;
        }
        ok
    }
}
