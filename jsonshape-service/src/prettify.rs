//! Diagnostic context rendering
//!
//! A prettifier turns the raw form behind a report's context node into
//! a display excerpt. It never participates in validation logic; when
//! none is supplied, rendering falls back to canonical JSON encoding.

use serde_json::Value;

use jsonshape_core::report::ReportMessage;
use jsonshape_core::value::{ValueKind, ValueTree};

use crate::schema::ExpectedNode;

/// Renders raw fragments for diagnostic display
pub trait Prettifier: Send + Sync {
    /// Render arbitrary text
    fn prettify(&self, text: &str) -> String {
        text.to_string()
    }

    /// Render a field key
    fn prettify_key(&self, key: &str) -> String {
        self.prettify(key)
    }

    /// Render a scalar value
    fn prettify_value(&self, value: &str) -> String {
        self.prettify(value)
    }

    /// Render an object fragment, optionally informed by the
    /// expectation it was compared against
    fn prettify_object(&self, raw: &Value, expected: Option<&ExpectedNode>) -> String;

    /// Render an array fragment, optionally informed by the
    /// expectation it was compared against
    fn prettify_array(&self, raw: &Value, expected: Option<&ExpectedNode>) -> String;
}

/// The fallback prettifier: canonical JSON encoding
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalPrettifier;

impl Prettifier for CanonicalPrettifier {
    fn prettify_object(&self, raw: &Value, _expected: Option<&ExpectedNode>) -> String {
        raw.to_string()
    }

    fn prettify_array(&self, raw: &Value, _expected: Option<&ExpectedNode>) -> String {
        raw.to_string()
    }
}

/// Render a report message together with an excerpt of its context
#[must_use]
pub fn render_with_context(
    message: &ReportMessage,
    tree: &ValueTree,
    prettifier: &dyn Prettifier,
) -> String {
    let rendered = message.render();
    let Some(context) = message.context else {
        return rendered;
    };
    let excerpt = match tree.kind(context) {
        ValueKind::Object(_) => prettifier.prettify_object(tree.raw(context), None),
        ValueKind::Array(_) => prettifier.prettify_array(tree.raw(context), None),
        ValueKind::Root(_) => prettifier.prettify_object(tree.raw(context), None),
        _ => prettifier.prettify_value(&tree.describe(context)),
    };
    format!("{rendered} — at {excerpt}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_fallback() {
        let prettifier = CanonicalPrettifier;
        assert_eq!(
            prettifier.prettify_object(&json!({"a": 1}), None),
            r#"{"a":1}"#
        );
        assert_eq!(prettifier.prettify_array(&json!([1, 2]), None), "[1,2]");
        assert_eq!(prettifier.prettify_key("name"), "name");
    }

    #[test]
    fn test_render_with_context() {
        let tree = ValueTree::from_json(&json!({"kind": "foo"}));
        let message = ReportMessage::warn("Unexpected keys: %s")
            .with_context(tree.document())
            .with_arg("extra");
        let rendered = render_with_context(&message, &tree, &CanonicalPrettifier);
        assert_eq!(rendered, r#"Unexpected keys: extra — at {"kind":"foo"}"#);
    }

    #[test]
    fn test_render_without_context_is_plain() {
        let tree = ValueTree::from_json(&json!(1));
        let message = ReportMessage::info("nothing to see");
        assert_eq!(
            render_with_context(&message, &tree, &CanonicalPrettifier),
            "nothing to see"
        );
    }
}
