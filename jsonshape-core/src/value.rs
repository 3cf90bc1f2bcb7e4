//! Input value model
//!
//! A parsed JSON document is loaded into a [`ValueTree`]: an arena of
//! typed nodes with parent, array-index, and containing-field
//! back-references. Handles are plain indices ([`NodeId`]), so the tree
//! is cycle-free in ownership terms and torn down in bulk.
//!
//! The tree always carries a distinguished Root wrapper above the
//! actual top-level value, which keeps parent-walking uniform for path
//! evaluation. Every node also keeps the raw parser output
//! (`serde_json::Value`) for diagnostic rendering.

use bitflags::bitflags;
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::Result;

bitflags! {
    /// The set of JSON types a node occupies or an expectation accepts
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
    pub struct TypeMask: u32 {
        /// Integer numbers
        const INTEGER = 1;
        /// Floating-point numbers
        const DOUBLE = 2;
        /// Booleans
        const BOOLEAN = 4;
        /// Strings
        const STRING = 8;
        /// Arrays
        const ARRAY = 16;
        /// Objects
        const OBJECT = 32;
        /// Null
        const NULL = 64;
        /// The distinguished top-level wrapper
        const ROOT = 128;

        /// Any numeric type
        const NUMBER = Self::INTEGER.bits() | Self::DOUBLE.bits();
        /// Any scalar type
        const SCALAR = Self::NUMBER.bits() | Self::BOOLEAN.bits() | Self::STRING.bits();
        /// Every type
        const ANY = Self::SCALAR.bits()
                  | Self::ARRAY.bits()
                  | Self::OBJECT.bits()
                  | Self::NULL.bits()
                  | Self::ROOT.bits();
    }
}

impl TypeMask {
    /// Whether a concrete input type is accepted by this mask
    #[must_use]
    pub const fn accepts(self, input: TypeMask) -> bool {
        self.bits() & input.bits() != 0
    }
}

/// Handle to a node inside a [`ValueTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct NodeId(usize);

/// The typed payload of an input node
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    /// JSON null
    Null,
    /// JSON boolean
    Boolean(bool),
    /// JSON number representable as `i64`
    Integer(i64),
    /// Any other JSON number
    Double(f64),
    /// JSON string
    String(String),
    /// Ordered sequence of child handles
    Array(Vec<NodeId>),
    /// Insertion-ordered mapping from key to child handle
    Object(IndexMap<String, NodeId>),
    /// The top-level wrapper around the actual document
    Root(NodeId),
}

/// One node of the input tree
#[derive(Debug, Clone)]
struct ValueNode {
    kind: ValueKind,
    parent: Option<NodeId>,
    /// Position within an array parent
    index: Option<usize>,
    /// Key within an object parent; mutually exclusive with `index`
    field: Option<String>,
    /// Raw parser output, kept for diagnostic rendering
    raw: Value,
}

/// Arena holding one parsed document, Root-wrapped
#[derive(Debug, Clone)]
pub struct ValueTree {
    nodes: Vec<ValueNode>,
    root: NodeId,
}

impl ValueTree {
    /// Load a parsed JSON value, wrapping it in the Root node
    #[must_use]
    pub fn from_json(raw: &Value) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        let root = tree.alloc(ValueKind::Null, None, None, None, raw.clone());
        let child = tree.build(raw, Some(root), None, None);
        tree.nodes[root.0].kind = ValueKind::Root(child);
        tree.root = root;
        tree
    }

    /// Parse JSON text and load it
    ///
    /// # Errors
    ///
    /// Returns the underlying parse error unwrapped when the text is not
    /// valid JSON.
    pub fn parse(text: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(text)?;
        Ok(Self::from_json(&raw))
    }

    fn alloc(
        &mut self,
        kind: ValueKind,
        parent: Option<NodeId>,
        index: Option<usize>,
        field: Option<String>,
        raw: Value,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ValueNode {
            kind,
            parent,
            index,
            field,
            raw,
        });
        id
    }

    fn build(
        &mut self,
        value: &Value,
        parent: Option<NodeId>,
        index: Option<usize>,
        field: Option<String>,
    ) -> NodeId {
        let id = self.alloc(ValueKind::Null, parent, index, field, value.clone());
        let kind = match value {
            Value::Null => ValueKind::Null,
            Value::Bool(b) => ValueKind::Boolean(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ValueKind::Integer(i)
                } else {
                    ValueKind::Double(n.as_f64().unwrap_or_default())
                }
            }
            Value::String(s) => ValueKind::String(s.clone()),
            Value::Array(items) => {
                let children = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.build(item, Some(id), Some(i), None))
                    .collect();
                ValueKind::Array(children)
            }
            Value::Object(map) => {
                let children = map
                    .iter()
                    .map(|(key, item)| {
                        let child = self.build(item, Some(id), None, Some(key.clone()));
                        (key.clone(), child)
                    })
                    .collect();
                ValueKind::Object(children)
            }
        };
        self.nodes[id.0].kind = kind;
        id
    }

    /// The Root wrapper node
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The actual top-level value beneath the Root wrapper
    #[must_use]
    pub fn document(&self) -> NodeId {
        match &self.nodes[self.root.0].kind {
            ValueKind::Root(child) => *child,
            // from_json always installs the wrapper
            _ => self.root,
        }
    }

    /// Typed payload of a node
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &ValueKind {
        &self.nodes[id.0].kind
    }

    /// Parent handle, `None` only for the Root wrapper
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Position within an array parent
    #[must_use]
    pub fn array_index(&self, id: NodeId) -> Option<usize> {
        self.nodes[id.0].index
    }

    /// Key under which this node sits in an object parent
    #[must_use]
    pub fn containing_field(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.0].field.as_deref()
    }

    /// Raw parser output for the node
    #[must_use]
    pub fn raw(&self, id: NodeId) -> &Value {
        &self.nodes[id.0].raw
    }

    /// Whether the node is the Root wrapper
    #[must_use]
    pub fn is_root(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, ValueKind::Root(_))
    }

    /// The node's concrete type bit
    #[must_use]
    pub fn type_mask(&self, id: NodeId) -> TypeMask {
        match &self.nodes[id.0].kind {
            ValueKind::Null => TypeMask::NULL,
            ValueKind::Boolean(_) => TypeMask::BOOLEAN,
            ValueKind::Integer(_) => TypeMask::INTEGER,
            ValueKind::Double(_) => TypeMask::DOUBLE,
            ValueKind::String(_) => TypeMask::STRING,
            ValueKind::Array(_) => TypeMask::ARRAY,
            ValueKind::Object(_) => TypeMask::OBJECT,
            ValueKind::Root(_) => TypeMask::ROOT,
        }
    }

    /// Human-readable type name used in reports and statistics keys
    #[must_use]
    pub fn type_name(&self, id: NodeId) -> &'static str {
        match &self.nodes[id.0].kind {
            ValueKind::Null => "null",
            ValueKind::Boolean(_) => "boolean",
            ValueKind::Integer(_) => "integer",
            ValueKind::Double(_) => "double",
            ValueKind::String(_) => "string",
            ValueKind::Array(_) => "array",
            ValueKind::Object(_) => "object",
            ValueKind::Root(_) => "root",
        }
    }

    /// Look up a field of an object node
    #[must_use]
    pub fn get_field(&self, id: NodeId, key: &str) -> Option<NodeId> {
        match &self.nodes[id.0].kind {
            ValueKind::Object(fields) => fields.get(key).copied(),
            _ => None,
        }
    }

    /// Keys of an object node in insertion order; empty for other kinds
    #[must_use]
    pub fn object_keys(&self, id: NodeId) -> Vec<&str> {
        match &self.nodes[id.0].kind {
            ValueKind::Object(fields) => fields.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Stringified scalar value, `None` for containers, null, and the Root
    #[must_use]
    pub fn scalar_repr(&self, id: NodeId) -> Option<String> {
        match &self.nodes[id.0].kind {
            ValueKind::Boolean(b) => Some(b.to_string()),
            ValueKind::Integer(i) => Some(i.to_string()),
            ValueKind::Double(d) => Some(d.to_string()),
            ValueKind::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Short rendering for diagnostic messages: scalar values verbatim,
    /// everything else by type name
    #[must_use]
    pub fn describe(&self, id: NodeId) -> String {
        match &self.nodes[id.0].kind {
            ValueKind::Null => "null".to_string(),
            _ => self
                .scalar_repr(id)
                .unwrap_or_else(|| self.type_name(id).to_string()),
        }
    }

    /// Number of nodes in the arena, Root wrapper included
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty (never true for a constructed tree)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct children of a node in document order
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match &self.nodes[id.0].kind {
            ValueKind::Array(items) => items.clone(),
            ValueKind::Object(fields) => fields.values().copied().collect(),
            ValueKind::Root(child) => vec![*child],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_root_wrapping() {
        let tree = ValueTree::from_json(&json!({"a": 1}));
        assert!(tree.is_root(tree.root()));
        assert_eq!(tree.type_mask(tree.root()), TypeMask::ROOT);
        let doc = tree.document();
        assert_eq!(tree.type_name(doc), "object");
        assert_eq!(tree.parent(doc), Some(tree.root()));
        assert_eq!(tree.parent(tree.root()), None);
    }

    #[test]
    fn test_parent_links_consistent() {
        let tree = ValueTree::from_json(&json!({"a": [1, {"b": null}], "c": true}));
        for idx in 0..tree.len() {
            let id = NodeId(idx);
            for child in tree.children(id) {
                assert_eq!(tree.parent(child), Some(id));
            }
        }
    }

    #[test]
    fn test_index_and_field_exclusive() {
        let tree = ValueTree::from_json(&json!({"items": ["x", "y"]}));
        for idx in 0..tree.len() {
            let id = NodeId(idx);
            assert!(
                tree.array_index(id).is_none() || tree.containing_field(id).is_none(),
                "array index and containing field must not both be set"
            );
        }
        let items = tree.get_field(tree.document(), "items").expect("items");
        assert_eq!(tree.containing_field(items), Some("items"));
        let first = tree.children(items)[0];
        assert_eq!(tree.array_index(first), Some(0));
        assert_eq!(tree.containing_field(first), None);
    }

    #[test]
    fn test_number_split() {
        let tree = ValueTree::from_json(&json!([1, 2.5, -7, 1e300]));
        let doc = tree.document();
        let elems = tree.children(doc);
        assert_eq!(tree.type_mask(elems[0]), TypeMask::INTEGER);
        assert_eq!(tree.type_mask(elems[1]), TypeMask::DOUBLE);
        assert_eq!(tree.kind(elems[2]), &ValueKind::Integer(-7));
        assert_eq!(tree.type_name(elems[3]), "double");
    }

    #[test]
    fn test_object_order_preserved() {
        let tree = ValueTree::from_json(&json!({"z": 1, "a": 2, "m": 3}));
        assert_eq!(tree.object_keys(tree.document()), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_scalar_repr_and_describe() {
        let tree = ValueTree::from_json(&json!({"s": "hello", "n": 3, "o": {}}));
        let doc = tree.document();
        let s = tree.get_field(doc, "s").expect("s");
        let n = tree.get_field(doc, "n").expect("n");
        let o = tree.get_field(doc, "o").expect("o");
        assert_eq!(tree.scalar_repr(s).as_deref(), Some("hello"));
        assert_eq!(tree.describe(n), "3");
        assert_eq!(tree.scalar_repr(o), None);
        assert_eq!(tree.describe(o), "object");
    }

    #[test]
    fn test_mask_algebra() {
        assert!(TypeMask::NUMBER.accepts(TypeMask::INTEGER));
        assert!(TypeMask::NUMBER.accepts(TypeMask::DOUBLE));
        assert!(!TypeMask::NUMBER.accepts(TypeMask::STRING));
        assert!(TypeMask::SCALAR.accepts(TypeMask::BOOLEAN));
        assert!(!TypeMask::SCALAR.accepts(TypeMask::OBJECT));
        assert!(TypeMask::ANY.accepts(TypeMask::ROOT));
        assert_eq!(
            TypeMask::SCALAR,
            TypeMask::INTEGER | TypeMask::DOUBLE | TypeMask::BOOLEAN | TypeMask::STRING
        );
    }

    #[test]
    fn test_parse_propagates_parse_error() {
        let err = ValueTree::parse("{oops").unwrap_err();
        assert!(matches!(err, crate::error::ShapeError::Json(_)));
    }

    #[test]
    fn test_raw_form_kept() {
        let raw = json!({"k": [true, null]});
        let tree = ValueTree::from_json(&raw);
        assert_eq!(tree.raw(tree.document()), &raw);
        let k = tree.get_field(tree.document(), "k").expect("k");
        assert_eq!(tree.raw(k), &json!([true, null]));
    }
}
