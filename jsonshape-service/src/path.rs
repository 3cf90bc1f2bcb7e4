//! Path expressions over the input tree
//!
//! A tiny traversal language used by predicates and audits: `$` restarts
//! at the tree root, `@` starts at the current node, `^` ascends to the
//! parent, `.key` descends into an object field. Parsed paths are value
//! objects; a process-wide cache memoises parsing by the raw text.

use dashmap::DashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

use jsonshape_core::error::{Result, ShapeError};
use jsonshape_core::value::{NodeId, ValueKind, ValueTree};

/// One step of a parsed path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// `$` — restart at the tree root, unwrapping the Root node
    Root,
    /// `@` — start at the current node
    Current,
    /// `^` — go to the parent
    Ascend,
    /// `.key` — descend into an object field
    Child(String),
}

/// Failure while evaluating a path against an input tree
///
/// These are diagnostics, not faults: predicates and audits surface them
/// through the report sink and validation continues.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    /// An ascend step ran out of parents
    #[error("could not ascend far enough")]
    AscendTooFar,
    /// A field step reached a non-object node
    #[error("target is not an object")]
    NotAnObject,
    /// A field step named a key the object does not have
    #[error("could not find field {0}")]
    MissingField(String),
    /// The topmost node is not the Root wrapper
    #[error("starting node is not inside a rooted tree")]
    Unrooted,
}

/// A parsed path expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathExpr {
    raw: String,
    steps: Vec<PathStep>,
}

static PATH_CACHE: LazyLock<DashMap<String, Arc<PathExpr>>> = LazyLock::new(DashMap::new);

impl PathExpr {
    /// Parse a path expression
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::PathParse`] when the path is empty, does not
    /// start with `$` or `@`, ascends after the root or a field step,
    /// ends in a dangling escape, or contains a character that cannot
    /// start a step.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut chars = raw.chars();
        let first = match chars.next() {
            Some('$') => PathStep::Root,
            Some('@') => PathStep::Current,
            Some(other) => {
                return Err(ShapeError::path_parse(
                    raw,
                    format!("must start with '$' or '@', found '{other}'"),
                ));
            }
            None => return Err(ShapeError::path_parse(raw, "empty path")),
        };

        let mut steps = vec![first];
        let mut pending = chars.peekable();
        while let Some(ch) = pending.next() {
            match ch {
                '^' => match steps.last() {
                    Some(PathStep::Root) => {
                        return Err(ShapeError::path_parse(
                            raw,
                            "ascend may not follow the root step",
                        ));
                    }
                    Some(PathStep::Child(_)) => {
                        return Err(ShapeError::path_parse(
                            raw,
                            "ascend may not follow a field step",
                        ));
                    }
                    _ => steps.push(PathStep::Ascend),
                },
                '.' => {
                    let mut key = String::new();
                    while let Some(&next) = pending.peek() {
                        match next {
                            '.' | '^' => break,
                            '\\' => {
                                pending.next();
                                match pending.next() {
                                    Some(escaped) => key.push(escaped),
                                    None => {
                                        return Err(ShapeError::path_parse(
                                            raw,
                                            "dangling escape at end of path",
                                        ));
                                    }
                                }
                            }
                            '$' => {
                                return Err(ShapeError::path_parse(
                                    raw,
                                    "unescaped '$' inside a field key",
                                ));
                            }
                            _ => {
                                key.push(next);
                                pending.next();
                            }
                        }
                    }
                    steps.push(PathStep::Child(key));
                }
                other => {
                    return Err(ShapeError::path_parse(
                        raw,
                        format!("unexpected character '{other}'"),
                    ));
                }
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            steps,
        })
    }

    /// Parse through the process-wide cache
    ///
    /// Repeated calls with identical text return the same shared parse
    /// result. The cache is pure memoisation; behaviour is identical to
    /// [`PathExpr::parse`].
    ///
    /// # Errors
    ///
    /// Same conditions as [`PathExpr::parse`]. Failures are not cached.
    pub fn shared(raw: &str) -> Result<Arc<Self>> {
        if let Some(cached) = PATH_CACHE.get(raw) {
            return Ok(Arc::clone(&cached));
        }
        let parsed = Arc::new(Self::parse(raw)?);
        let entry = PATH_CACHE
            .entry(raw.to_string())
            .or_insert_with(|| Arc::clone(&parsed));
        Ok(Arc::clone(&entry))
    }

    /// The original text this path was parsed from
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The parsed steps
    #[must_use]
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Walk the tree from `start` and locate the addressed node
    ///
    /// The walk never mutates the tree. When `start` is the Root wrapper
    /// it is first unwrapped to the document beneath it.
    ///
    /// # Errors
    ///
    /// Returns a [`PathError`] when a step cannot be taken.
    pub fn find_in(&self, tree: &ValueTree, start: NodeId) -> std::result::Result<NodeId, PathError> {
        let mut cur = if tree.is_root(start) {
            tree.document()
        } else {
            start
        };

        for step in &self.steps {
            match step {
                PathStep::Root => {
                    let mut top = start;
                    while let Some(parent) = tree.parent(top) {
                        top = parent;
                    }
                    if !tree.is_root(top) {
                        return Err(PathError::Unrooted);
                    }
                    cur = tree.document();
                }
                PathStep::Current => {}
                PathStep::Ascend => match tree.parent(cur) {
                    None => return Err(PathError::AscendTooFar),
                    Some(parent) if tree.is_root(parent) => return Err(PathError::AscendTooFar),
                    Some(parent) => cur = parent,
                },
                PathStep::Child(key) => match tree.kind(cur) {
                    ValueKind::Object(_) => {
                        cur = tree
                            .get_field(cur, key)
                            .ok_or_else(|| PathError::MissingField(key.clone()))?;
                    }
                    _ => return Err(PathError::NotAnObject),
                },
            }
        }

        Ok(cur)
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_parsing() {
        assert!(PathExpr::parse("$").is_ok());
        assert!(PathExpr::parse("@").is_ok());
        assert!(PathExpr::parse("$.name").is_ok());
        assert!(PathExpr::parse("$.outer.inner").is_ok());
        assert!(PathExpr::parse("@^^.sibling").is_ok());

        assert!(PathExpr::parse("").is_err());
        assert!(PathExpr::parse("name").is_err());
        assert!(PathExpr::parse("$^").is_err());
        assert!(PathExpr::parse("@.key^").is_err());
        assert!(PathExpr::parse("$.a\\").is_err());
        assert!(PathExpr::parse("$.pri$ce").is_err());
    }

    #[test]
    fn test_parse_round_trip() {
        for raw in ["$", "@", "$.outer.inner.leaf", "@^.inner", "$.we\\.ird"] {
            let parsed = PathExpr::parse(raw).expect("grammar-valid path");
            assert_eq!(parsed.raw(), raw);
        }
    }

    #[test]
    fn test_escaped_keys() {
        let parsed = PathExpr::parse("$.dotted\\.key.plain").expect("escapes should parse");
        assert_eq!(
            parsed.steps(),
            &[
                PathStep::Root,
                PathStep::Child("dotted.key".to_string()),
                PathStep::Child("plain".to_string()),
            ]
        );
    }

    #[test]
    fn test_find_from_root() {
        let tree = ValueTree::from_json(&json!({"outer": {"inner": {"leaf": 1}}}));
        let path = PathExpr::parse("$.outer.inner.leaf").expect("valid path");
        let leaf = path.find_in(&tree, tree.root()).expect("leaf exists");
        assert_eq!(tree.describe(leaf), "1");
    }

    #[test]
    fn test_find_relative_with_ascend() {
        let tree = ValueTree::from_json(&json!({"outer": {"inner": {"leaf": 1}}}));
        let outer = tree.get_field(tree.document(), "outer").expect("outer");
        let inner = tree.get_field(outer, "inner").expect("inner");

        let path = PathExpr::parse("@^.inner.leaf").expect("valid path");
        let leaf = path.find_in(&tree, inner).expect("leaf via parent");
        assert_eq!(tree.describe(leaf), "1");

        // restarting at the root from a nested node reaches the same place
        let path = PathExpr::parse("$.outer.inner.leaf").expect("valid path");
        let same = path.find_in(&tree, inner).expect("leaf via root");
        assert_eq!(same, leaf);
    }

    #[test]
    fn test_find_failures() {
        let tree = ValueTree::from_json(&json!({"a": {"b": 1}}));
        let a = tree.get_field(tree.document(), "a").expect("a");
        let b = tree.get_field(a, "b").expect("b");

        let missing = PathExpr::parse("$.missing").expect("valid path");
        assert_eq!(
            missing.find_in(&tree, tree.root()),
            Err(PathError::MissingField("missing".to_string()))
        );

        let through_scalar = PathExpr::parse("$.a.b.c").expect("valid path");
        assert_eq!(
            through_scalar.find_in(&tree, tree.root()),
            Err(PathError::NotAnObject)
        );

        let too_far = PathExpr::parse("@^^^").expect("valid path");
        assert_eq!(too_far.find_in(&tree, b), Err(PathError::AscendTooFar));
    }

    #[test]
    fn test_cache_idempotence() {
        let first = PathExpr::shared("$.cached.entry").expect("valid path");
        let second = PathExpr::shared("$.cached.entry").expect("valid path");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.raw(), "$.cached.entry");
    }
}
