//! Properties of the engine observable through the public API

use std::sync::Arc;

use jsonshape_service::prelude::*;
use serde_json::json;

type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

#[test]
fn every_object_key_is_categorised_exactly_once() -> TestResult {
    let schema = ExpectedNode::object([
        Field::new("a", ExpectedNode::integer(), true),
        Field::placeholder("strings", ExpectedNode::string(), false),
    ]);
    let validator = Validator::new(schema);
    let outcome = validator.validate_value(&json!({
        "a": 1,
        "b": "claimed by the placeholder",
        "my_comment": true,
        "zz": 5
    }))?;

    assert!(!outcome.valid);

    // named match is counted, placeholder match is silent
    assert_eq!(outcome.stats.get(&["keys", "a"]), 1);

    let infos: Vec<String> = outcome
        .reports
        .at_severity(Severity::Info)
        .map(ReportMessage::render)
        .collect();
    assert_eq!(infos, vec!["Ignoring globally accepted keys: my_comment"]);

    let warns: Vec<String> = outcome.reports.warnings().map(|m| m.render()).collect();
    assert_eq!(warns.len(), 1);
    assert!(warns[0].contains("zz"));
    assert!(!warns[0].contains('b'), "placeholder-claimed keys are not unexpected");
    assert!(!warns[0].contains("my_comment"), "ignored keys are not unexpected");
    Ok(())
}

#[test]
fn reports_follow_traversal_order() -> TestResult {
    let schema = ExpectedNode::object([
        Field::new(
            "first",
            ExpectedNode::object([Field::new("deep", ExpectedNode::integer(), true)]),
            true,
        ),
        Field::new("second", ExpectedNode::boolean(), true),
    ]);
    let outcome = Validator::new(schema).validate_value(&json!({
        "first": {},
        "second": "not a boolean"
    }))?;

    let rendered: Vec<String> = outcome.reports.messages().iter().map(|m| m.render()).collect();
    assert_eq!(
        rendered,
        vec![
            "Missing required nested field deep for object first",
            "Invalid type string for field second, should be boolean",
        ]
    );
    Ok(())
}

#[test]
fn redirect_is_a_fixed_point_of_its_target() -> TestResult {
    let target: Arc<ExpectedNode> = Arc::new(
        ExpectedNode::object([Field::new("n", ExpectedNode::integer(), true)]).with_id("payload"),
    );

    let mut through_redirect = Validator::new(ExpectedNode::redirect("payload"));
    through_redirect.register("payload", Arc::clone(&target));
    let direct = Validator::new(Arc::clone(&target));

    for document in [json!({"n": 3}), json!({"n": "bad"}), json!({}), json!(7)] {
        let a = through_redirect.validate_value(&document)?;
        let b = direct.validate_value(&document)?;
        assert_eq!(a.valid, b.valid, "verdicts diverge on {document}");
        let a_rendered: Vec<String> = a.reports.messages().iter().map(|m| m.render()).collect();
        let b_rendered: Vec<String> = b.reports.messages().iter().map(|m| m.render()).collect();
        assert_eq!(a_rendered, b_rendered, "reports diverge on {document}");
    }
    Ok(())
}

#[test]
fn forward_reference_resolves_at_validation_time() -> TestResult {
    // the redirect is built before its target is registered anywhere
    let schema = ExpectedNode::object([Field::new(
        "child",
        ExpectedNode::mixed([ExpectedNode::redirect("node"), ExpectedNode::integer()]),
        false,
    )])
    .with_id("node");

    let validator = Validator::new(schema);
    assert!(validator.registry().resolve("node").is_ok());

    let outcome = validator.validate_value(&json!({"child": {"child": 5}}))?;
    assert!(outcome.valid);

    let outcome = validator.validate_value(&json!({"child": {"child": true}}))?;
    assert!(!outcome.valid);
    Ok(())
}

#[test]
fn validation_is_repeatable_on_shared_state() -> TestResult {
    let validator = Validator::new(ExpectedNode::object([Field::new(
        "v",
        ExpectedNode::string_literal("expected"),
        true,
    )]));
    let document = json!({"v": "other", "extra": 1});

    let first = validator.validate_value(&document)?;
    let second = validator.validate_value(&document)?;

    assert_eq!(first.valid, second.valid);
    assert_eq!(first.reports.len(), second.reports.len());
    let firsts: Vec<String> = first.reports.messages().iter().map(|m| m.render()).collect();
    let seconds: Vec<String> = second.reports.messages().iter().map(|m| m.render()).collect();
    assert_eq!(firsts, seconds);
    Ok(())
}

#[test]
fn statistics_cover_the_documented_paths() -> TestResult {
    let schema = ExpectedNode::object([
        Field::new("name", ExpectedNode::string(), true),
        Field::new("tags", ExpectedNode::array([ExpectedNode::string()]), false),
    ]);
    let outcome = Validator::new(schema).validate_value(&json!({
        "name": "thing",
        "tags": ["a", "b"]
    }))?;

    assert!(outcome.valid);
    assert_eq!(outcome.stats.get(&["root", "type", "object"]), 1);
    assert_eq!(outcome.stats.get(&["types", "object"]), 1);
    assert_eq!(outcome.stats.get(&["types", "root"]), 1);
    assert_eq!(outcome.stats.get(&["types", "string"]), 3);
    assert_eq!(outcome.stats.get(&["values", "string", "thing"]), 1);
    assert_eq!(outcome.stats.get(&["elements", "string"]), 2);
    assert_eq!(outcome.stats.get(&["fields", "string"]), 1);
    assert_eq!(outcome.stats.get(&["fields", "array"]), 1);
    assert_eq!(outcome.stats.get(&["keys", "name"]), 1);
    assert_eq!(outcome.stats.get(&["keys", "tags"]), 1);
    Ok(())
}

#[test]
fn verdict_implies_type_overlap_or_nullable() -> TestResult {
    // nullable lets null through without overlap
    let outcome = Validator::new(ExpectedNode::integer().nullable()).validate_value(&json!(null))?;
    assert!(outcome.valid);

    // without nullable the gate rejects
    let outcome = Validator::new(ExpectedNode::integer()).validate_value(&json!(null))?;
    assert!(!outcome.valid);
    assert!(
        outcome.reports.errors().next().is_some(),
        "gate failures are error severity"
    );

    // number mask accepts both numeric forms
    let schema = || ExpectedNode::mixed([ExpectedNode::integer(), ExpectedNode::double()]);
    assert!(Validator::new(schema()).validate_value(&json!(1))?.valid);
    assert!(Validator::new(schema()).validate_value(&json!(1.5))?.valid);
    Ok(())
}

#[test]
fn array_elements_satisfy_every_overlapping_template() -> TestResult {
    // two string templates overlap every string element; the literal one
    // fails on "b", and that failure must count
    let schema = ExpectedNode::array([
        ExpectedNode::string_literal("a"),
        ExpectedNode::string(),
    ]);
    let outcome = Validator::new(schema).validate_value(&json!(["a", "b"]))?;
    assert!(!outcome.valid);
    let warns: Vec<String> = outcome.reports.warnings().map(|m| m.render()).collect();
    assert_eq!(
        warns,
        vec!["Value b does not match the expected value a"]
    );

    // extra templates that match nothing are not an error
    let schema = ExpectedNode::array([ExpectedNode::integer(), ExpectedNode::boolean()]);
    let outcome = Validator::new(schema).validate_value(&json!([1, 2]))?;
    assert!(outcome.valid);
    Ok(())
}

#[test]
fn audits_run_even_when_structure_fails() -> TestResult {
    let schema = ExpectedNode::object([Field::new("a", ExpectedNode::integer(), true)])
        .with_audit(TargetExists::audit("@.meta")?);

    let outcome = Validator::new(schema).validate_value(&json!({}))?;
    assert!(!outcome.valid);
    let rendered: Vec<String> = outcome.reports.messages().iter().map(|m| m.render()).collect();
    assert_eq!(
        rendered,
        vec![
            "Missing required field a",
            "Path @.meta failed: could not find field meta",
        ],
        "structural reports come first, audit reports after"
    );
    Ok(())
}

#[test]
fn passing_audit_reports_nothing() -> TestResult {
    let schema = ExpectedNode::object([Field::new("a", ExpectedNode::integer(), true)])
        .with_audit(TargetExists::audit("@.a")?);
    let outcome = Validator::new(schema).validate_value(&json!({"a": 1}))?;
    assert!(outcome.valid);
    assert!(outcome.reports.is_empty());
    Ok(())
}

#[test]
fn lenient_array_rejects_unmatched_elements() -> TestResult {
    let schema = ExpectedNode::array([ExpectedNode::integer()]);
    let outcome = Validator::new(schema).validate_value(&json!([1, "stray", 3]))?;
    assert!(!outcome.valid);
    let warns: Vec<String> = outcome.reports.warnings().map(|m| m.render()).collect();
    assert_eq!(warns, vec!["Unexpected array element at position 1"]);
    assert_eq!(outcome.stats.get(&["elements", "integer"]), 2);
    Ok(())
}
