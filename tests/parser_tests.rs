// tests/parser_tests.rs

use pathfind::ast::{Ast, Combinator, CompareOp, FieldName, Literal, NodeId, NodeKind};
use pathfind::{ParseError, PathExpression, Value, parse};

fn conditions(ast: &Ast, group: NodeId) -> Vec<NodeId> {
    match &ast[group].kind {
        NodeKind::ConditionGroup { conditions } => conditions.clone(),
        other => panic!("expected a condition group, got {:?}", other),
    }
}

/// First node of the first top-level condition's path.
fn first_path(expr: &PathExpression) -> NodeId {
    let ast = expr.ast();
    let root = expr.root().expect("expression has a root group");
    let condition = conditions(ast, root)[0];
    ast[condition].child.expect("condition has a path")
}

/// Follow single-child links from `id` to the end of the chain.
fn chain(ast: &Ast, id: NodeId) -> Vec<NodeId> {
    let mut ids = vec![id];
    let mut current = id;
    while let Some(next) = ast[current].child {
        ids.push(next);
        current = next;
    }
    ids
}

fn field(name: &str) -> NodeKind {
    NodeKind::FieldAccess(FieldName::Literal(name.to_string()))
}

// ============================================================================
// Paths
// ============================================================================

#[test]
fn test_simple_path_is_a_chain() {
    let expr = parse("user.address.city").unwrap();
    let ast = expr.ast();
    let kinds: Vec<&NodeKind> = chain(ast, first_path(&expr))
        .into_iter()
        .map(|id| &ast[id].kind)
        .collect();
    assert_eq!(kinds, vec![&field("user"), &field("address"), &field("city")]);
    assert!(expr.remainder().is_none());
}

#[test]
fn test_every_child_points_back_to_its_parent() {
    let expr = parse(r#"items.*.(price > 10 & tags.#(name == "x")).id:upper()"#).unwrap();
    let ast = expr.ast();
    for (id, node) in ast.iter() {
        if let Some(child) = node.child {
            assert_eq!(ast[child].parent, Some(id));
        }
        if let NodeKind::Filter { group } = &node.kind {
            assert_eq!(ast[*group].parent, Some(id));
        }
    }
}

#[test]
fn test_repeat_and_slice_segments() {
    let expr = parse("^*.^#.1~2.-3").unwrap();
    let ast = expr.ast();
    let ids = chain(ast, first_path(&expr));
    assert_eq!(ids.len(), 4);
    assert_eq!(ast[ids[0]].kind, NodeKind::Wildcard { reverse: true });
    assert_eq!(ast[ids[1]].kind, NodeKind::RecursiveDescent { reverse: true });
    match &ast[ids[2]].kind {
        NodeKind::Slice { window } => {
            assert_eq!(window.start, 1);
            assert_eq!(window.limit, Some(2));
        }
        other => panic!("expected a slice, got {:?}", other),
    }
    match &ast[ids[3]].kind {
        NodeKind::Slice { window } => {
            assert_eq!(window.start, -3);
            assert_eq!(window.limit, None);
        }
        other => panic!("expected a slice, got {:?}", other),
    }
}

#[test]
fn test_variable_segment() {
    let expr = parse("0.$field").unwrap();
    let ast = expr.ast();
    let ids = chain(ast, first_path(&expr));
    assert_eq!(ast[ids[0]].kind, field("0"));
    assert_eq!(
        ast[ids[1]].kind,
        NodeKind::FieldAccess(FieldName::Variable("field".to_string()))
    );
}

#[test]
fn test_empty_input() {
    let expr = parse("").unwrap();
    let root = expr.root().unwrap();
    let ast = expr.ast();
    let conds = conditions(ast, root);
    assert_eq!(conds.len(), 1);
    assert!(ast[conds[0]].child.is_none());
}

// ============================================================================
// Conditions
// ============================================================================

#[test]
fn test_filter_holds_its_group() {
    let expr = parse(r#"*.(maker == "Honda")"#).unwrap();
    let ast = expr.ast();
    let ids = chain(ast, first_path(&expr));
    assert_eq!(ast[ids[0]].kind, NodeKind::Wildcard { reverse: false });

    let NodeKind::Filter { group } = ast[ids[1]].kind else {
        panic!("expected a filter, got {:?}", ast[ids[1]].kind);
    };
    let conds = conditions(ast, group);
    assert_eq!(conds.len(), 1);

    let NodeKind::Condition {
        op: Some(CompareOp::Equal),
        value: Some(value),
        combinator: None,
        reverse: 0,
    } = ast[conds[0]].kind
    else {
        panic!("expected an equality, got {:?}", ast[conds[0]].kind);
    };

    // The right-hand condition is a child of the left, not a group member.
    assert_eq!(ast[value].parent, Some(conds[0]));
    let literal = ast[value].child.unwrap();
    assert_eq!(
        ast[literal].kind,
        NodeKind::Literal(Literal::Value(Value::from("Honda")))
    );
}

#[test]
fn test_combinator_tags_the_preceding_condition() {
    let expr = parse("a & b | c").unwrap();
    let ast = expr.ast();
    let tags: Vec<Option<Combinator>> = conditions(ast, expr.root().unwrap())
        .into_iter()
        .map(|id| match ast[id].kind {
            NodeKind::Condition { combinator, .. } => combinator,
            _ => panic!("expected a condition"),
        })
        .collect();
    assert_eq!(
        tags,
        vec![Some(Combinator::And), Some(Combinator::Or), None]
    );
}

#[test]
fn test_negation_count() {
    let expr = parse("!!active").unwrap();
    let ast = expr.ast();
    let condition = conditions(ast, expr.root().unwrap())[0];
    match ast[condition].kind {
        NodeKind::Condition { reverse, op, .. } => {
            assert_eq!(reverse, 2);
            assert_eq!(op, None);
        }
        _ => panic!("expected a condition"),
    }
    assert_eq!(ast[ast[condition].child.unwrap()].kind, field("active"));
}

#[test]
fn test_nested_group_is_a_condition_child() {
    let expr = parse("(a | b) & c").unwrap();
    let ast = expr.ast();
    let top = conditions(ast, expr.root().unwrap());
    assert_eq!(top.len(), 2);
    let nested = ast[top[0]].child.unwrap();
    assert_eq!(conditions(ast, nested).len(), 2);
    assert_eq!(ast[nested].parent, Some(top[0]));
}

#[test]
fn test_regex_literal_compiles_with_flags() {
    let expr = parse("name == /^al/i").unwrap();
    let ast = expr.ast();
    let condition = conditions(ast, expr.root().unwrap())[0];
    let NodeKind::Condition { value: Some(value), .. } = ast[condition].kind else {
        panic!("expected a comparison");
    };
    match &ast[ast[value].child.unwrap()].kind {
        NodeKind::Literal(Literal::Pattern(pattern)) => {
            assert_eq!(pattern.source, "^al");
            assert!(pattern.regex.is_match("Alice"));
        }
        other => panic!("expected a pattern, got {:?}", other),
    }
}

#[test]
fn test_condition_variable() {
    let expr = parse("maker == $maker").unwrap();
    let ast = expr.ast();
    let condition = conditions(ast, expr.root().unwrap())[0];
    let NodeKind::Condition { value: Some(value), .. } = ast[condition].kind else {
        panic!("expected a comparison");
    };
    assert_eq!(
        ast[ast[value].child.unwrap()].kind,
        NodeKind::Literal(Literal::Variable("maker".to_string()))
    );
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_function_arguments_are_json() {
    let expr = parse(r#"name:split(",", 2)"#).unwrap();
    let ast = expr.ast();
    let ids = chain(ast, first_path(&expr));
    assert_eq!(
        ast[ids[1]].kind,
        NodeKind::FunctionCall {
            name: "split".to_string(),
            args: vec![Value::from(","), Value::Integer(2)],
        }
    );
}

#[test]
fn test_bare_colon_calls_to_string() {
    let expr = parse("year:").unwrap();
    let ast = expr.ast();
    let ids = chain(ast, first_path(&expr));
    assert_eq!(ids.len(), 2);
    assert_eq!(
        ast[ids[1]].kind,
        NodeKind::FunctionCall {
            name: "to_string".to_string(),
            args: Vec::new(),
        }
    );
}

#[test]
fn test_function_chain() {
    let expr = parse("tags:first.upper").unwrap();
    let ast = expr.ast();
    let names: Vec<String> = chain(ast, first_path(&expr))
        .into_iter()
        .filter_map(|id| match &ast[id].kind {
            NodeKind::FunctionCall { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["first", "upper"]);
}

// ============================================================================
// Specific filter lookup
// ============================================================================

#[test]
fn test_descent_inherits_conditional_filter() {
    let expr = parse("+(type).#name").unwrap();
    let ast = expr.ast();
    let ids = chain(ast, first_path(&expr));
    assert_eq!(ast[ids[0]].kind, NodeKind::ConditionalDescent);
    let NodeKind::Filter { group } = ast[ids[1]].kind else {
        panic!("expected a filter");
    };
    assert_eq!(ast[ids[2]].kind, NodeKind::RecursiveDescent { reverse: false });

    assert_eq!(ast.specific_filter(ids[0]), Some(group));
    assert_eq!(ast.specific_filter(ids[2]), Some(group));
}

#[test]
fn test_descent_without_conditional_has_no_filter() {
    let expr = parse("#name").unwrap();
    let ast = expr.ast();
    assert_eq!(ast.specific_filter(first_path(&expr)), None);
}

// ============================================================================
// Truncation and errors
// ============================================================================

#[test]
fn test_remainder() {
    let expr = parse("maker @rest").unwrap();
    assert_eq!(expr.remainder(), Some("@rest"));
    assert_eq!(expr.source(), "maker @rest");
}

#[test]
fn test_unclosed_call_is_truncated() {
    let expr = parse("name:split(\",\"").unwrap();
    assert_eq!(expr.remainder(), Some("(\",\""));
}

#[test]
fn test_invalid_function_arguments() {
    let err = parse("name:split([)").unwrap_err();
    match err {
        ParseError::InvalidArguments { name, .. } => assert_eq!(name, "split"),
        other => panic!("expected invalid arguments, got {:?}", other),
    }
}

#[test]
fn test_invalid_regex_literal() {
    let err = parse("*.(name == /[/)").unwrap_err();
    assert!(matches!(err, ParseError::InvalidPattern { ref pattern, .. } if pattern == "["));
    assert!(err.to_string().contains("/[/"));
}
