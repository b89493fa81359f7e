use std::{collections::HashMap, fmt, rc::Rc};

use crate::{evaluator::EvalError, picker::Completion, value::Value};

pub type SuccessFn = dyn Fn(&Value);
pub type CompleteFn = dyn Fn(&Completion);
pub type ErrorFn = dyn Fn(&EvalError);

/// Fallback result used when a query fails, or when `node` finds nothing.
#[derive(Clone)]
pub enum Preset {
    Value(Value),
    Thunk(Rc<dyn Fn() -> Value>),
}

impl Preset {
    pub fn resolve(&self) -> Value {
        match self {
            Preset::Value(value) => value.clone(),
            Preset::Thunk(f) => f(),
        }
    }
}

impl fmt::Debug for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preset::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Preset::Thunk(_) => f.write_str("Thunk"),
        }
    }
}

/// A query request: the path plus its options and callbacks.
///
/// # Examples
///
/// ```
/// use pathfind::{Query, Value};
///
/// let query = Query::new("*.(maker == $maker)")
///     .value("maker", Value::from("Honda"))
///     .limit(2)
///     .on_success(|hit| println!("{hit}"));
///
/// assert_eq!(query.limit, 2);
/// assert_eq!(query.start, 0);
/// assert!(!query.is_async);
/// ```
#[derive(Clone)]
pub struct Query {
    pub path: String,

    /// Bindings for `$name` references.
    pub values: HashMap<String, Value>,

    pub preset: Option<Preset>,

    /// Maximum number of results; anything below 1 means unbounded.
    pub limit: i64,

    /// Number of leading matches to skip.
    pub start: usize,

    /// Defer the start of the run to the engine's scheduler.
    pub is_async: bool,

    pub(crate) on_success: Option<Rc<SuccessFn>>,
    pub(crate) on_complete: Option<Rc<CompleteFn>>,
    pub(crate) on_error: Option<Rc<ErrorFn>>,
}

impl Query {
    pub fn new(path: impl Into<String>) -> Self {
        Query {
            path: path.into(),
            values: HashMap::new(),
            preset: None,
            limit: -1,
            start: 0,
            is_async: false,
            on_success: None,
            on_complete: None,
            on_error: None,
        }
    }

    pub fn value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn values<K: Into<String>>(mut self, values: impl IntoIterator<Item = (K, Value)>) -> Self {
        self.values
            .extend(values.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    pub fn preset(mut self, value: impl Into<Value>) -> Self {
        self.preset = Some(Preset::Value(value.into()));
        self
    }

    /// Fallback computed only when it is needed.
    pub fn preset_with(mut self, f: impl Fn() -> Value + 'static) -> Self {
        self.preset = Some(Preset::Thunk(Rc::new(f)));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn start(mut self, start: usize) -> Self {
        self.start = start;
        self
    }

    pub fn asynchronous(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }

    pub fn on_success(mut self, f: impl Fn(&Value) + 'static) -> Self {
        self.on_success = Some(Rc::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl Fn(&Completion) + 'static) -> Self {
        self.on_complete = Some(Rc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&EvalError) + 'static) -> Self {
        self.on_error = Some(Rc::new(f));
        self
    }

    pub(crate) fn result_limit(&self) -> Option<usize> {
        usize::try_from(self.limit).ok().filter(|&n| n > 0)
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("path", &self.path)
            .field("values", &self.values)
            .field("preset", &self.preset)
            .field("limit", &self.limit)
            .field("start", &self.start)
            .field("is_async", &self.is_async)
            .finish_non_exhaustive()
    }
}

impl From<&str> for Query {
    fn from(path: &str) -> Self {
        Query::new(path)
    }
}

impl From<String> for Query {
    fn from(path: String) -> Self {
        Query::new(path)
    }
}

impl From<&String> for Query {
    fn from(path: &String) -> Self {
        Query::new(path.as_str())
    }
}
