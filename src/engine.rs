//! Query entry points.
//!
//! ```
//! use pathfind::{Engine, Query, Value};
//!
//! let autos = pathfind::parse_json(r#"[
//!     {"maker": "Nissan", "year": 2011},
//!     {"maker": "Honda",  "year": 2010},
//!     {"maker": "Honda",  "year": 2007}
//! ]"#).unwrap();
//!
//! let engine = Engine::new();
//! let hondas = engine
//!     .collect(&autos, r#"*.(maker == "Honda" & year > 2009)"#)
//!     .unwrap();
//! assert_eq!(hondas.len(), 1);
//!
//! let first = engine.node(&autos, Query::new("*.maker")).unwrap();
//! assert_eq!(first, Some(Value::from("Nissan")));
//! ```

use std::{cell::RefCell, rc::Rc};

use crate::{
    capability::{Capabilities, Capability},
    evaluator::{EvalError, Run},
    events::{COMPLETE, ERROR, Event, Events, Listener, SUCCESS},
    parser::{self, ParseError, PathExpression},
    query::Query,
    scheduler::Scheduler,
    value::Value,
};

/// Compiles and runs queries. Owns the capability registry and the
/// scheduler deferred work runs on.
#[derive(Debug, Clone)]
pub struct Engine {
    capabilities: Rc<Capabilities>,
    scheduler: Scheduler,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Engine with the builtin capabilities.
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::builtin())
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Engine {
            capabilities: Rc::new(capabilities),
            scheduler: Scheduler::new(),
        }
    }

    /// Add or replace a capability. Queries already running keep the
    /// registry they started with.
    pub fn register(&mut self, name: impl Into<String>, capability: Capability) -> &mut Self {
        Rc::make_mut(&mut self.capabilities).register(name, capability);
        self
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Drive deferred work until none is left.
    pub fn run_until_idle(&self) -> usize {
        self.scheduler.run_until_idle()
    }

    pub fn compile(&self, path: &str) -> Result<PathExpression, ParseError> {
        parser::parse(path)
    }

    /// Run `query` against `root`, reporting through the query's callbacks.
    ///
    /// Synchronous runs return hard failures. Asynchronous runs return at
    /// once and report failures through `on_error`.
    pub fn find(&self, root: &Value, query: impl Into<Query>) -> Result<(), EvalError> {
        let query = query.into();
        let expr = self.compile(&query.path)?;
        self.find_compiled(&expr, root, query)
    }

    /// Like [`Engine::find`], reusing a compiled expression.
    pub fn find_compiled(
        &self,
        expr: &PathExpression,
        root: &Value,
        query: impl Into<Query>,
    ) -> Result<(), EvalError> {
        let query = query.into();
        let run = self.start_run(expr, &query);

        if query.is_async {
            let root = root.clone();
            let preset = query.preset.clone();
            self.scheduler.defer(move || {
                if let Err(error) = run.execute(&root) {
                    match preset {
                        Some(preset) => run.substitute(preset.resolve()),
                        None => run.fail(error),
                    }
                }
            });
            return Ok(());
        }

        match run.execute(root) {
            Ok(()) => Ok(()),
            Err(error) => match &query.preset {
                Some(preset) => {
                    tracing::debug!(%error, "query failed, using preset");
                    run.substitute(preset.resolve());
                    Ok(())
                }
                None => Err(error),
            },
        }
    }

    /// First match, else the preset, else `None`. Always synchronous.
    pub fn node(&self, root: &Value, query: impl Into<Query>) -> Result<Option<Value>, EvalError> {
        let mut query = query.into();
        query.limit = 1;
        query.is_async = false;
        let preset = query.preset.take();

        let found = Rc::new(RefCell::new(None));
        let slot = found.clone();
        let user_success = query.on_success.take();
        let query = query.on_success(move |value| {
            slot.borrow_mut().get_or_insert_with(|| value.clone());
            if let Some(f) = &user_success {
                f(value);
            }
        });

        match self.find(root, query) {
            Ok(()) => Ok(found
                .borrow_mut()
                .take()
                .or_else(|| preset.map(|p| p.resolve()))),
            Err(error) => match preset {
                Some(preset) => Ok(Some(preset.resolve())),
                None => Err(error),
            },
        }
    }

    /// Whether `path` matches anything in `root`.
    pub fn exists(&self, root: &Value, path: &str) -> Result<bool, EvalError> {
        Ok(self.node(root, path)?.is_some())
    }

    /// Every match, in order. Always synchronous.
    pub fn collect(&self, root: &Value, query: impl Into<Query>) -> Result<Vec<Value>, EvalError> {
        let mut query = query.into();
        query.is_async = false;

        let results = Rc::new(RefCell::new(Vec::new()));
        let sink = results.clone();
        let user_success = query.on_success.take();
        let query = query.on_success(move |value| {
            sink.borrow_mut().push(value.clone());
            if let Some(f) = &user_success {
                f(value);
            }
        });

        self.find(root, query)?;
        Ok(results.take())
    }

    fn start_run(&self, expr: &PathExpression, query: &Query) -> Rc<Run> {
        let events = Rc::new(Events::new(self.scheduler.clone()));

        if let Some(f) = query.on_success.clone() {
            events.listen(Listener::new(SUCCESS, move |event| {
                if let Event::Success(hit) = event {
                    f(&hit.value);
                }
            }));
        }
        if let Some(f) = query.on_complete.clone() {
            events.listen(Listener::new(COMPLETE, move |event| {
                if let Event::Complete(completion) = event {
                    f(completion);
                }
            }));
        }
        if let Some(f) = query.on_error.clone() {
            events.listen(Listener::new(ERROR, move |event| {
                if let Event::Error(error) = event {
                    f(error);
                }
            }));
        }

        Run::new(
            expr.clone(),
            self.capabilities.clone(),
            query.values.clone(),
            events,
            query.start,
            query.result_limit(),
        )
    }
}
