//! Expected structure model
//!
//! The caller builds an in-memory tree of [`ExpectedNode`]s describing
//! the structure a document must have: scalar expectations with
//! optional literal values, arrays of element templates, objects with
//! fields and predicate-gated branches, unions, late-bound redirects,
//! and the top-level root wrapper. Nodes are shared via `Arc` so a
//! registry entry and a tree position refer to the same node.

use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use jsonshape_core::error::{Result, ShapeError};
use jsonshape_core::value::TypeMask;

use crate::predicate::{Audit, Predicate};

/// One field of an object expectation
///
/// A placeholder field matches any input field whose value fits the
/// template; its key is only a label shown in diagnostics.
#[derive(Clone)]
pub struct Field {
    /// Field key, or a label for placeholders
    pub key: String,
    /// Expectation for the field value
    pub template: Arc<ExpectedNode>,
    /// Whether a named field must be present
    pub required: bool,
    /// Whether this field matches by template type instead of by key
    pub placeholder: bool,
}

impl Field {
    /// Create a named field
    pub fn new(key: impl Into<String>, template: impl Into<Arc<ExpectedNode>>, required: bool) -> Self {
        Self {
            key: key.into(),
            template: template.into(),
            required,
            placeholder: false,
        }
    }

    /// Create a placeholder field matching any key with a fitting value
    pub fn placeholder(
        label: impl Into<String>,
        template: impl Into<Arc<ExpectedNode>>,
        required: bool,
    ) -> Self {
        Self {
            key: label.into(),
            template: template.into(),
            required,
            placeholder: true,
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("key", &self.key)
            .field("template", &self.template.type_name())
            .field("required", &self.required)
            .field("placeholder", &self.placeholder)
            .finish()
    }
}

/// A predicate-gated extension of an object's field set
///
/// When the predicate succeeds against the object under validation,
/// the outcomes join the active field set for that pass.
pub struct Branch {
    /// Label named in the branch-success debug report
    pub label: String,
    /// Activation condition, evaluated silently
    pub predicate: Arc<dyn Predicate>,
    /// Fields added when the branch activates
    pub outcomes: Vec<Field>,
}

impl Branch {
    /// Create a branch
    pub fn new(
        label: impl Into<String>,
        predicate: impl Predicate + 'static,
        outcomes: Vec<Field>,
    ) -> Self {
        Self {
            label: label.into(),
            predicate: Arc::new(predicate),
            outcomes,
        }
    }
}

impl fmt::Debug for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Branch")
            .field("label", &self.label)
            .field("outcomes", &self.outcomes)
            .finish()
    }
}

/// The typed payload of an expectation
pub enum ExpectedKind {
    /// Expect null
    Null,
    /// Expect a boolean, optionally a specific one
    Boolean(Option<bool>),
    /// Expect an integer, optionally a specific one
    Integer(Option<i64>),
    /// Expect a double, optionally a specific one
    Double(Option<f64>),
    /// Expect a string, optionally a specific one
    String(Option<String>),
    /// Expect any scalar
    Scalar,
    /// Expect an array whose elements fit the overlapping templates
    Array(Vec<Arc<ExpectedNode>>),
    /// Expect an object with fields and conditional branches
    Object {
        /// Base field set in declaration order
        fields: Vec<Field>,
        /// Conditional extensions of the field set
        branches: Vec<Branch>,
    },
    /// Expect any one of the alternatives (first match by type)
    Mixed(Vec<Arc<ExpectedNode>>),
    /// Defer to the node registered under an identifier
    Redirect(String),
    /// The top-level wrapper
    Root(Arc<ExpectedNode>),
}

/// One node of the expected structure tree
pub struct ExpectedNode {
    kind: ExpectedKind,
    nullable: bool,
    id: Option<String>,
    audits: Vec<Arc<dyn Audit>>,
}

impl ExpectedNode {
    fn from_kind(kind: ExpectedKind) -> Self {
        Self {
            kind,
            nullable: false,
            id: None,
            audits: Vec::new(),
        }
    }

    /// Expect null
    #[must_use]
    pub fn null() -> Self {
        Self::from_kind(ExpectedKind::Null)
    }

    /// Expect any boolean
    #[must_use]
    pub fn boolean() -> Self {
        Self::from_kind(ExpectedKind::Boolean(None))
    }

    /// Expect exactly this boolean
    #[must_use]
    pub fn boolean_literal(value: bool) -> Self {
        Self::from_kind(ExpectedKind::Boolean(Some(value)))
    }

    /// Expect any integer
    #[must_use]
    pub fn integer() -> Self {
        Self::from_kind(ExpectedKind::Integer(None))
    }

    /// Expect exactly this integer
    #[must_use]
    pub fn integer_literal(value: i64) -> Self {
        Self::from_kind(ExpectedKind::Integer(Some(value)))
    }

    /// Expect any double
    #[must_use]
    pub fn double() -> Self {
        Self::from_kind(ExpectedKind::Double(None))
    }

    /// Expect exactly this double
    #[must_use]
    pub fn double_literal(value: f64) -> Self {
        Self::from_kind(ExpectedKind::Double(Some(value)))
    }

    /// Expect any string
    #[must_use]
    pub fn string() -> Self {
        Self::from_kind(ExpectedKind::String(None))
    }

    /// Expect exactly this string
    #[must_use]
    pub fn string_literal(value: impl Into<String>) -> Self {
        Self::from_kind(ExpectedKind::String(Some(value.into())))
    }

    /// Expect any scalar (number, boolean, or string)
    #[must_use]
    pub fn scalar() -> Self {
        Self::from_kind(ExpectedKind::Scalar)
    }

    /// Expect an array; each element must satisfy every template whose
    /// type overlaps it
    #[must_use]
    pub fn array<I, T>(templates: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Arc<ExpectedNode>>,
    {
        Self::from_kind(ExpectedKind::Array(
            templates.into_iter().map(Into::into).collect(),
        ))
    }

    /// Expect an object with the given base fields
    #[must_use]
    pub fn object<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = Field>,
    {
        Self::from_kind(ExpectedKind::Object {
            fields: fields.into_iter().collect(),
            branches: Vec::new(),
        })
    }

    /// Expect any one of the alternatives
    #[must_use]
    pub fn mixed<I, T>(alternatives: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Arc<ExpectedNode>>,
    {
        Self::from_kind(ExpectedKind::Mixed(
            alternatives.into_iter().map(Into::into).collect(),
        ))
    }

    /// Defer to the node registered under `id`
    #[must_use]
    pub fn redirect(id: impl Into<String>) -> Self {
        Self::from_kind(ExpectedKind::Redirect(id.into()))
    }

    /// Wrap a child as the top-level expectation
    #[must_use]
    pub fn root(child: impl Into<Arc<ExpectedNode>>) -> Self {
        Self::from_kind(ExpectedKind::Root(child.into()))
    }

    /// Add a field to an object expectation
    ///
    /// Has no effect on other kinds.
    #[must_use]
    pub fn with_field(
        mut self,
        key: impl Into<String>,
        template: impl Into<Arc<ExpectedNode>>,
        required: bool,
    ) -> Self {
        if let ExpectedKind::Object { fields, .. } = &mut self.kind {
            fields.push(Field::new(key, template, required));
        }
        self
    }

    /// Add a branch to an object expectation
    ///
    /// Has no effect on other kinds.
    #[must_use]
    pub fn with_branch(
        mut self,
        label: impl Into<String>,
        predicate: impl Predicate + 'static,
        outcomes: Vec<Field>,
    ) -> Self {
        if let ExpectedKind::Object { branches, .. } = &mut self.kind {
            branches.push(Branch::new(label, predicate, outcomes));
        }
        self
    }

    /// Accept null in place of the expected type
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Register this node under an identifier for redirects
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach an audit, run after the structural comparison
    #[must_use]
    pub fn with_audit(mut self, audit: impl Audit + 'static) -> Self {
        self.audits.push(Arc::new(audit));
        self
    }

    /// The typed payload
    #[must_use]
    pub fn kind(&self) -> &ExpectedKind {
        &self.kind
    }

    /// Whether null is accepted in place of the expected type
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Registration identifier, when set
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Attached audits in declaration order
    #[must_use]
    pub fn audits(&self) -> &[Arc<dyn Audit>] {
        &self.audits
    }

    /// The static type mask; `None` for kinds whose mask depends on the
    /// registry (mixed unions and redirects)
    #[must_use]
    pub fn static_mask(&self) -> Option<TypeMask> {
        match &self.kind {
            ExpectedKind::Null => Some(TypeMask::NULL),
            ExpectedKind::Boolean(_) => Some(TypeMask::BOOLEAN),
            ExpectedKind::Integer(_) => Some(TypeMask::INTEGER),
            ExpectedKind::Double(_) => Some(TypeMask::DOUBLE),
            ExpectedKind::String(_) => Some(TypeMask::STRING),
            ExpectedKind::Scalar => Some(TypeMask::SCALAR),
            ExpectedKind::Array(_) => Some(TypeMask::ARRAY),
            ExpectedKind::Object { .. } => Some(TypeMask::OBJECT),
            ExpectedKind::Root(_) => Some(TypeMask::ROOT),
            ExpectedKind::Mixed(_) | ExpectedKind::Redirect(_) => None,
        }
    }

    /// Stringified literal value, when one is set
    #[must_use]
    pub fn literal_repr(&self) -> Option<String> {
        match &self.kind {
            ExpectedKind::Boolean(Some(want)) => Some(want.to_string()),
            ExpectedKind::Integer(Some(want)) => Some(want.to_string()),
            ExpectedKind::Double(Some(want)) => Some(want.to_string()),
            ExpectedKind::String(Some(want)) => Some(want.clone()),
            _ => None,
        }
    }

    /// Human-readable name of the expectation, used in diagnostics
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            ExpectedKind::Null => "null",
            ExpectedKind::Boolean(_) => "boolean",
            ExpectedKind::Integer(_) => "integer",
            ExpectedKind::Double(_) => "double",
            ExpectedKind::String(_) => "string",
            ExpectedKind::Scalar => "scalar",
            ExpectedKind::Array(_) => "array",
            ExpectedKind::Object { .. } => "object",
            ExpectedKind::Mixed(_) => "mixed",
            ExpectedKind::Redirect(_) => "redirect",
            ExpectedKind::Root(_) => "root",
        }
    }
}

impl fmt::Debug for ExpectedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpectedNode")
            .field("kind", &self.type_name())
            .field("nullable", &self.nullable)
            .field("id", &self.id)
            .field("audits", &self.audits.len())
            .finish()
    }
}

/// Identifier-keyed registry of expectation nodes
///
/// Engine-scoped: populated from a finished tree (plus manual
/// registrations) before validation begins, read-only afterwards.
#[derive(Debug, Default)]
pub struct Registry {
    entries: IndexMap<String, Arc<ExpectedNode>>,
}

impl Registry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk a finished tree and register every node carrying an id
    ///
    /// Later registrations win when an id is used twice.
    #[must_use]
    pub fn collect(root: &Arc<ExpectedNode>) -> Self {
        let mut registry = Self::new();
        registry.absorb(root);
        registry
    }

    /// Walk a tree into this registry
    pub fn absorb(&mut self, root: &Arc<ExpectedNode>) {
        let mut seen = HashSet::new();
        self.walk(root, &mut seen);
    }

    fn walk(&mut self, node: &Arc<ExpectedNode>, seen: &mut HashSet<*const ExpectedNode>) {
        if !seen.insert(Arc::as_ptr(node)) {
            return;
        }
        if let Some(id) = node.id() {
            self.entries.insert(id.to_string(), Arc::clone(node));
        }
        match node.kind() {
            ExpectedKind::Array(templates) | ExpectedKind::Mixed(templates) => {
                for template in templates {
                    self.walk(template, seen);
                }
            }
            ExpectedKind::Object { fields, branches } => {
                for field in fields {
                    self.walk(&field.template, seen);
                }
                for branch in branches {
                    for outcome in &branch.outcomes {
                        self.walk(&outcome.template, seen);
                    }
                }
            }
            ExpectedKind::Root(child) => self.walk(child, seen),
            _ => {}
        }
    }

    /// Register a node under an explicit identifier
    pub fn register(&mut self, id: impl Into<String>, node: impl Into<Arc<ExpectedNode>>) {
        self.entries.insert(id.into(), node.into());
    }

    /// Resolve an identifier to its node
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::UnknownReference`] for an unregistered id.
    pub fn resolve(&self, id: &str) -> Result<&Arc<ExpectedNode>> {
        self.entries
            .get(id)
            .ok_or_else(|| ShapeError::unknown_reference(id))
    }

    /// Number of registered identifiers
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_constructors() {
        assert!(matches!(
            ExpectedNode::string_literal("hello").kind(),
            ExpectedKind::String(Some(s)) if s == "hello"
        ));
        assert!(matches!(
            ExpectedNode::integer().kind(),
            ExpectedKind::Integer(None)
        ));
        assert_eq!(ExpectedNode::scalar().static_mask(), Some(TypeMask::SCALAR));
    }

    #[test]
    fn test_nullable_and_id() {
        let node = ExpectedNode::integer().nullable().with_id("count");
        assert!(node.is_nullable());
        assert_eq!(node.id(), Some("count"));
        assert!(!ExpectedNode::integer().is_nullable());
    }

    #[test]
    fn test_object_builder() {
        let node = ExpectedNode::object([Field::new("a", ExpectedNode::integer(), true)])
            .with_field("b", ExpectedNode::string(), false);
        let ExpectedKind::Object { fields, branches } = node.kind() else {
            panic!("expected an object kind");
        };
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].key, "a");
        assert!(fields[0].required);
        assert!(!fields[1].required);
        assert!(branches.is_empty());
    }

    #[test]
    fn test_registry_collects_ids_deeply() {
        let leaf = Arc::new(ExpectedNode::string().with_id("leaf"));
        let tree: Arc<ExpectedNode> = Arc::new(ExpectedNode::root(
            ExpectedNode::object([
                Field::new("direct", Arc::clone(&leaf), true),
                Field::new(
                    "nested",
                    ExpectedNode::array([ExpectedNode::mixed([
                        ExpectedNode::integer().with_id("alt"),
                    ])]),
                    false,
                ),
            ])
            .with_id("top"),
        ));

        let registry = Registry::collect(&tree);
        assert_eq!(registry.len(), 3);
        assert!(Arc::ptr_eq(registry.resolve("leaf").expect("leaf"), &leaf));
        assert!(registry.resolve("top").is_ok());
        assert!(registry.resolve("alt").is_ok());
    }

    #[test]
    fn test_registry_unknown_reference() {
        let registry = Registry::new();
        let err = registry.resolve("ghost").unwrap_err();
        assert!(matches!(
            err,
            jsonshape_core::error::ShapeError::UnknownReference { .. }
        ));
    }

    #[test]
    fn test_manual_registration_wins() {
        let tree: Arc<ExpectedNode> = Arc::new(ExpectedNode::integer().with_id("n"));
        let mut registry = Registry::collect(&tree);
        let replacement = Arc::new(ExpectedNode::string().with_id("n"));
        registry.register("n", Arc::clone(&replacement));
        assert!(Arc::ptr_eq(registry.resolve("n").expect("n"), &replacement));
    }
}
