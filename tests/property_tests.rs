// tests/property_tests.rs

use std::{cell::RefCell, rc::Rc};

use pathfind::{Completion, Engine, Query, Value, Window};
use proptest::prelude::*;

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Boolean),
        (-1000i64..1000).prop_map(Value::Integer),
        "[a-z]{0,6}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::array),
            prop::collection::vec(("[a-c]{1,2}", inner), 0..4).prop_map(Value::object),
        ]
    })
}

fn count_nodes(value: &Value) -> usize {
    1 + value
        .children(Window::all())
        .iter()
        .map(|(_, child)| count_nodes(child))
        .sum::<usize>()
}

const QUERIES: &[&str] = &["*", "#", "^#", "*.*", "#(a)", "#(a | b).a", "*.(a == 1)", "1~2", "-1"];

proptest! {
    #[test]
    fn test_queries_are_deterministic(root in arb_value(), index in 0..QUERIES.len()) {
        let engine = Engine::new();
        let expr = engine.compile(QUERIES[index]).unwrap();

        let collect = || {
            let results = Rc::new(RefCell::new(Vec::new()));
            let sink = results.clone();
            engine
                .find_compiled(&expr, &root, Query::new("").on_success(move |v| sink.borrow_mut().push(v.clone())))
                .unwrap();
            results.take()
        };
        prop_assert_eq!(collect(), collect());
    }

    #[test]
    fn test_descent_visits_every_node(root in arb_value()) {
        let engine = Engine::new();
        let visited = engine.collect(&root, "#").unwrap();
        prop_assert_eq!(visited.len(), count_nodes(&root));
        prop_assert_eq!(&visited[0], &root);
    }

    #[test]
    fn test_completion_fires_once_and_balanced(root in arb_value(), index in 0..QUERIES.len()) {
        let engine = Engine::new();
        let results = Rc::new(RefCell::new(Vec::new()));
        let completions: Rc<RefCell<Vec<Completion>>> = Rc::default();
        let r = results.clone();
        let c = completions.clone();

        let query = Query::new(QUERIES[index])
            .on_success(move |v| r.borrow_mut().push(v.clone()))
            .on_complete(move |completion| c.borrow_mut().push(completion.clone()));
        engine.find(&root, query).unwrap();

        let completions = completions.borrow();
        prop_assert_eq!(completions.len(), 1);
        prop_assert!(completions[0].stats.is_balanced());
        let results = results.borrow();
        prop_assert_eq!(completions[0].results(), results.as_slice());
    }

    #[test]
    fn test_limit_bounds_results(root in arb_value(), limit in 1i64..5) {
        let engine = Engine::new();
        let all = engine.collect(&root, "#").unwrap();
        let limited = engine.collect(&root, Query::new("#").limit(limit)).unwrap();
        prop_assert_eq!(limited.len(), all.len().min(limit as usize));
        prop_assert_eq!(&all[..limited.len()], limited.as_slice());
    }
}
