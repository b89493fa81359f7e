// tests/cli_tests.rs
#![cfg(feature = "cli")]

use pathfind::Value;
use pathfind::cli::{
    CliError, DocCategory, FindOptions, execute_check, execute_find, get_doc_category,
    get_docs_overview, parse_binding,
};
use serde_json::json;

const AUTOS: &str = r#"[
    {"maker": "Nissan", "year": 2011},
    {"maker": "Honda",  "year": 2010},
    {"maker": "Honda",  "year": 2007}
]"#;

fn find(path: &str) -> FindOptions {
    FindOptions {
        path: path.to_string(),
        input: Some(AUTOS.to_string()),
        ..FindOptions::default()
    }
}

// ============================================================================
// find
// ============================================================================

#[test]
fn test_find_returns_array() {
    let output = execute_find(&find(r#"*.(maker == "Honda").year"#)).unwrap();
    assert_eq!(output, json!([2010, 2007]));
}

#[test]
fn test_find_first() {
    let options = FindOptions {
        first: true,
        ..find("*.maker")
    };
    assert_eq!(execute_find(&options).unwrap(), json!("Nissan"));

    let options = FindOptions {
        first: true,
        ..find("*.color")
    };
    assert_eq!(execute_find(&options).unwrap(), serde_json::Value::Null);
}

#[test]
fn test_find_limit_and_start() {
    let options = FindOptions {
        limit: 1,
        start: 1,
        ..find("*.maker")
    };
    assert_eq!(execute_find(&options).unwrap(), json!(["Honda"]));
}

#[test]
fn test_find_with_variables() {
    let options = FindOptions {
        vars: vec!["year=2011".to_string()],
        ..find("*.(year == $year).maker")
    };
    assert_eq!(execute_find(&options).unwrap(), json!(["Nissan"]));
}

#[test]
fn test_find_without_input() {
    let options = FindOptions {
        path: "*".to_string(),
        ..FindOptions::default()
    };
    assert!(matches!(execute_find(&options), Err(CliError::NoInput)));
}

#[test]
fn test_find_invalid_json() {
    let options = FindOptions {
        input: Some("{not json".to_string()),
        ..find("*")
    };
    assert!(matches!(execute_find(&options), Err(CliError::Json(_))));
}

#[test]
fn test_find_evaluation_error() {
    assert!(matches!(
        execute_find(&find("*:nope()")),
        Err(CliError::Eval(_))
    ));
}

// ============================================================================
// Bindings
// ============================================================================

#[test]
fn test_binding_parses_json() {
    let (name, value) = parse_binding("limit=3").unwrap();
    assert_eq!(name, "limit");
    assert_eq!(value, Value::Integer(3));

    let (_, value) = parse_binding(r#"tags=["a","b"]"#).unwrap();
    assert_eq!(value, Value::array([Value::from("a"), Value::from("b")]));
}

#[test]
fn test_binding_falls_back_to_string() {
    let (name, value) = parse_binding("maker=Honda").unwrap();
    assert_eq!(name, "maker");
    assert_eq!(value, Value::from("Honda"));
}

#[test]
fn test_invalid_bindings() {
    assert!(matches!(parse_binding("maker"), Err(CliError::InvalidBinding(_))));
    assert!(matches!(parse_binding("=1"), Err(CliError::InvalidBinding(_))));
}

// ============================================================================
// check
// ============================================================================

#[test]
fn test_check_reports_functions() {
    let report = execute_check("*.name:trim().shout()").unwrap();
    assert_eq!(report.functions, vec!["shout", "trim"]);
    assert_eq!(report.unknown_functions, vec!["shout"]);
    assert!(report.is_complete());
    assert!(report.nodes > 0);
}

#[test]
fn test_check_reports_remainder() {
    let report = execute_check("name @x").unwrap();
    assert!(!report.is_complete());
    assert_eq!(report.remainder.as_deref(), Some("@x"));
}

#[test]
fn test_check_parse_error() {
    assert!(matches!(execute_check("a:f([)"), Err(CliError::Parse(_))));
}

// ============================================================================
// docs
// ============================================================================

#[test]
fn test_every_category_has_content() {
    assert!(get_docs_overview().contains("DOCUMENTATION CATEGORIES"));
    for category in DocCategory::ALL {
        assert_eq!(DocCategory::from_name(category.name()), Some(category));
        assert!(!get_doc_category(category.name()).unwrap().is_empty());
    }
}

#[test]
fn test_unknown_category() {
    assert!(matches!(
        get_doc_category("bogus"),
        Err(CliError::UnknownCategory(_))
    ));
}
