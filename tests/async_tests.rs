// tests/async_tests.rs
//
// Deferred capabilities, asynchronous queries and completion timing.

use std::{cell::RefCell, rc::Rc};

use pathfind::{Capability, Completion, Engine, EvalError, Query, Value, parse_json};

fn autos() -> Value {
    parse_json(
        r#"[
            {"maker": "Nissan", "year": 2011},
            {"maker": "Honda",  "year": 2010},
            {"maker": "Honda",  "year": 2007},
            {"maker": "Toyota", "year": 2008},
            {"maker": "Honda",  "year": 2011}
        ]"#,
    )
    .unwrap()
}

/// Engine whose `later` capability echoes its input on the next scheduler
/// turn and whose `never` capability drops its continuation unused.
fn deferred_engine() -> Engine {
    let mut engine = Engine::new();
    let scheduler = engine.scheduler().clone();
    engine.register(
        "later",
        Capability::deferred(move |value, _, continuation| {
            let value = value.clone();
            scheduler.defer(move || {
                continuation.success(value);
                continuation.complete();
            });
        }),
    );
    engine.register("never", Capability::deferred(|_, _, _| {}));
    engine
}

#[derive(Default)]
struct Recorder {
    results: RefCell<Vec<Value>>,
    completions: RefCell<Vec<Completion>>,
    errors: RefCell<Vec<String>>,
}

impl Recorder {
    fn attach(self: &Rc<Self>, query: Query) -> Query {
        let results = self.clone();
        let completions = self.clone();
        let errors = self.clone();
        query
            .on_success(move |value| results.results.borrow_mut().push(value.clone()))
            .on_complete(move |completion| {
                completions.completions.borrow_mut().push(completion.clone())
            })
            .on_error(move |error: &EvalError| errors.errors.borrow_mut().push(error.to_string()))
    }

    fn results(&self) -> Vec<Value> {
        self.results.borrow().clone()
    }

    fn completions(&self) -> usize {
        self.completions.borrow().len()
    }
}

fn makers() -> Vec<Value> {
    ["Nissan", "Honda", "Honda", "Toyota", "Honda"]
        .into_iter()
        .map(Value::from)
        .collect()
}

// ============================================================================
// Deferred capabilities
// ============================================================================

#[test]
fn test_complete_waits_for_continuations() {
    let engine = deferred_engine();
    let recorder = Rc::new(Recorder::default());

    engine
        .find(&autos(), recorder.attach(Query::new("*.maker:later()")))
        .unwrap();
    assert!(recorder.results().is_empty());
    assert_eq!(recorder.completions(), 0);
    assert_eq!(engine.scheduler().pending(), 5);

    engine.run_until_idle();
    assert_eq!(recorder.results(), makers());
    assert_eq!(recorder.completions(), 1);

    let completion = recorder.completions.borrow()[0].clone();
    assert_eq!(completion.results(), makers().as_slice());
    assert!(completion.stats.is_balanced());
}

#[test]
fn test_deferred_result_continues_the_path() {
    let engine = deferred_engine();
    let recorder = Rc::new(Recorder::default());

    engine
        .find(&autos(), recorder.attach(Query::new("0.maker:later().upper()")))
        .unwrap();
    engine.run_until_idle();

    assert_eq!(recorder.results(), vec![Value::from("NISSAN")]);
    assert_eq!(recorder.completions(), 1);
}

#[test]
fn test_dropped_continuation_releases_the_barrier() {
    let engine = deferred_engine();
    let recorder = Rc::new(Recorder::default());

    engine
        .find(&autos(), recorder.attach(Query::new("*:never()")))
        .unwrap();

    assert!(recorder.results().is_empty());
    assert_eq!(recorder.completions(), 1);
    assert_eq!(engine.scheduler().pending(), 0);
}

#[test]
fn test_deferred_capability_in_filter_has_no_value() {
    let engine = deferred_engine();
    let recorder = Rc::new(Recorder::default());

    engine
        .find(&autos(), recorder.attach(Query::new("*.(maker:later())")))
        .unwrap();

    assert!(recorder.results().is_empty());
    assert_eq!(recorder.completions(), 1);
    assert_eq!(engine.scheduler().pending(), 0);
}

#[test]
fn test_limit_ignores_late_continuations() {
    let engine = deferred_engine();
    let recorder = Rc::new(Recorder::default());

    engine
        .find(
            &autos(),
            recorder.attach(Query::new("*.maker:later()").limit(2)),
        )
        .unwrap();
    engine.run_until_idle();

    assert_eq!(
        recorder.results(),
        vec![Value::from("Nissan"), Value::from("Honda")]
    );
    assert_eq!(recorder.completions(), 1);
    assert!(recorder.completions.borrow()[0].stats.is_balanced());
}

#[test]
fn test_every_query_shape_completes_exactly_once() {
    let engine = deferred_engine();
    let queries = [
        Query::new("*"),
        Query::new("#"),
        Query::new("*.(maker == \"Honda\").year"),
        Query::new("*.(maker == (/^Hon/))"),
        Query::new("*.maker:later()"),
        Query::new("*.maker:later()").limit(1),
        Query::new("*:never()"),
        Query::new("#.maker").asynchronous(true),
    ];

    for query in queries {
        let path = query.path.clone();
        let recorder = Rc::new(Recorder::default());
        engine.find(&autos(), recorder.attach(query)).unwrap();
        engine.run_until_idle();

        assert_eq!(recorder.completions(), 1, "{path}");
        assert!(recorder.completions.borrow()[0].stats.is_balanced(), "{path}");
    }
}

#[test]
fn test_error_after_deferred_resume() {
    let engine = deferred_engine();
    let recorder = Rc::new(Recorder::default());

    engine
        .find(&autos(), recorder.attach(Query::new("0.maker:later().nope()")))
        .unwrap();
    assert!(recorder.errors.borrow().is_empty());

    engine.run_until_idle();
    assert_eq!(recorder.errors.borrow().len(), 1);
    assert!(recorder.errors.borrow()[0].contains("nope"));
    assert!(recorder.results().is_empty());
    assert_eq!(recorder.completions(), 1);
}

// ============================================================================
// Asynchronous queries
// ============================================================================

#[test]
fn test_async_query_runs_on_the_scheduler() {
    let engine = Engine::new();
    let recorder = Rc::new(Recorder::default());

    engine
        .find(
            &autos(),
            recorder.attach(Query::new("*.maker").asynchronous(true)),
        )
        .unwrap();
    assert!(recorder.results().is_empty());
    assert_eq!(engine.scheduler().pending(), 1);

    assert_eq!(engine.run_until_idle(), 1);
    assert_eq!(recorder.results(), makers());
    assert_eq!(recorder.completions(), 1);
}

#[test]
fn test_async_error_is_reported_not_returned() {
    let engine = Engine::new();
    let recorder = Rc::new(Recorder::default());

    let returned = engine.find(
        &autos(),
        recorder.attach(Query::new("*:nope()").asynchronous(true)),
    );
    assert!(returned.is_ok());

    engine.run_until_idle();
    assert_eq!(
        *recorder.errors.borrow(),
        vec!["undefined capability `nope`".to_string()]
    );
    assert_eq!(recorder.completions(), 0);
}

#[test]
fn test_async_error_uses_preset() {
    let engine = Engine::new();
    let recorder = Rc::new(Recorder::default());

    engine
        .find(
            &autos(),
            recorder.attach(Query::new("*:nope()").asynchronous(true).preset(0)),
        )
        .unwrap();
    engine.run_until_idle();

    assert_eq!(recorder.results(), vec![Value::Integer(0)]);
    assert!(recorder.errors.borrow().is_empty());
    assert_eq!(recorder.completions(), 1);
}

#[test]
fn test_async_parse_error_is_returned() {
    let engine = Engine::new();
    let result = engine.find(&autos(), Query::new("*.(a == /[/)").asynchronous(true));
    assert!(matches!(result, Err(EvalError::Parse(_))));
    assert_eq!(engine.scheduler().pending(), 0);
}

#[test]
fn test_registration_after_start_does_not_affect_running_query() {
    let mut engine = Engine::new();
    let recorder = Rc::new(Recorder::default());

    engine
        .find(
            &autos(),
            recorder.attach(Query::new("0.maker:shout()").asynchronous(true)),
        )
        .unwrap();
    engine.register(
        "shout",
        Capability::sync(|value, _| Ok(Value::from(format!("{}!", value.to_text())))),
    );
    engine.run_until_idle();

    assert_eq!(recorder.errors.borrow().len(), 1);
    assert_eq!(
        engine.collect(&autos(), "0.maker:shout()").unwrap(),
        vec![Value::from("Nissan!")]
    );
}
