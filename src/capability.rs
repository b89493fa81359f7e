//! Named operations invoked by `:name(args)` path segments.
//!
//! A capability is either synchronous (returns its result) or deferred
//! (receives a [`Continuation`] and reports results whenever it likes,
//! typically from a task queued on the engine's scheduler).

use std::{cell::Cell, cmp::Ordering, collections::HashMap, fmt, rc::Rc};

use regex::Regex;
use thiserror::Error;

use crate::{picker::Picker, value::Value};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CapabilityError {
    #[error("{capability}() requires {expected}, got {found}")]
    TypeMismatch {
        capability: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{capability}() requires a {argument} argument")]
    MissingArgument {
        capability: String,
        argument: &'static str,
    },

    #[error("{0}")]
    Failed(String),
}

pub type SyncFn = dyn Fn(&Value, &[Value]) -> Result<Value, CapabilityError>;
pub type DeferredFn = dyn Fn(&Value, &[Value], Continuation);

#[derive(Clone)]
pub enum Capability {
    Sync(Rc<SyncFn>),
    Deferred(Rc<DeferredFn>),
}

impl Capability {
    pub fn sync(f: impl Fn(&Value, &[Value]) -> Result<Value, CapabilityError> + 'static) -> Self {
        Capability::Sync(Rc::new(f))
    }

    pub fn deferred(f: impl Fn(&Value, &[Value], Continuation) + 'static) -> Self {
        Capability::Deferred(Rc::new(f))
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Capability::Deferred(_))
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Sync(_) => f.write_str("Capability::Sync"),
            Capability::Deferred(_) => f.write_str("Capability::Deferred"),
        }
    }
}

/// Handle a deferred capability uses to report results.
///
/// Each `success` resumes the rest of the path with the given value. The
/// continuation holds one unit of the query's completion barrier and gives
/// it back when it is completed or dropped, so the query cannot complete
/// while a continuation is still alive.
pub struct Continuation {
    resume: Rc<dyn Fn(Value)>,
    barrier: Option<Picker>,
    halted: Rc<Cell<bool>>,
}

impl Continuation {
    pub(crate) fn new(resume: Rc<dyn Fn(Value)>, barrier: Picker, halted: Rc<Cell<bool>>) -> Self {
        barrier.wait();
        Continuation {
            resume,
            barrier: Some(barrier),
            halted,
        }
    }

    /// Resume the rest of the path with `value`. Ignored once the query has
    /// stopped.
    pub fn success(&self, value: Value) {
        if self.halted.get() {
            tracing::trace!("continuation resumed after the query stopped");
            return;
        }
        tracing::trace!("continuation resumed");
        (self.resume)(value);
    }

    /// Signal that no more results follow.
    pub fn complete(self) {}

    pub fn is_halted(&self) -> bool {
        self.halted.get()
    }
}

impl Drop for Continuation {
    fn drop(&mut self) {
        if let Some(barrier) = self.barrier.take() {
            barrier.talk();
        }
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("halted", &self.halted.get())
            .finish()
    }
}

/// Capability registry of an engine.
#[derive(Clone, Default)]
pub struct Capabilities {
    entries: HashMap<String, Capability>,
}

impl Capabilities {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the builtin set.
    pub fn builtin() -> Self {
        let mut caps = Self::new();
        caps.register("to_string", Capability::sync(|v, _| Ok(Value::String(v.to_text()))));
        caps.register("upper", Capability::sync(upper));
        caps.register("lower", Capability::sync(lower));
        caps.register("trim", Capability::sync(trim));
        caps.register("length", Capability::sync(length));
        caps.register("count", Capability::sync(count));
        caps.register("keys", Capability::sync(keys));
        caps.register("values", Capability::sync(values));
        caps.register(
            "type",
            Capability::sync(|v, _| Ok(Value::String(v.type_name().to_string()))),
        );
        caps.register("first", Capability::sync(first));
        caps.register("last", Capability::sync(last));
        caps.register("sum", Capability::sync(sum));
        caps.register("min", Capability::sync(|v, _| extreme("min", v, Ordering::Less)));
        caps.register("max", Capability::sync(|v, _| extreme("max", v, Ordering::Greater)));
        caps.register("avg", Capability::sync(avg));
        caps.register("unique", Capability::sync(unique));
        caps.register("sort", Capability::sync(|v, _| sorted("sort", v, false)));
        caps.register("sort_desc", Capability::sync(|v, _| sorted("sort_desc", v, true)));
        caps.register("reverse", Capability::sync(reverse));
        caps.register("flatten", Capability::sync(flatten));
        caps.register(
            "contains",
            Capability::sync(|v, args| {
                string_test("contains", v, args, "substring", |s, a| s.contains(a))
            }),
        );
        caps.register(
            "starts_with",
            Capability::sync(|v, args| {
                string_test("starts_with", v, args, "prefix", |s, a| s.starts_with(a))
            }),
        );
        caps.register(
            "ends_with",
            Capability::sync(|v, args| {
                string_test("ends_with", v, args, "suffix", |s, a| s.ends_with(a))
            }),
        );
        caps.register("split", Capability::sync(split));
        caps.register("matches", Capability::sync(matches));
        caps
    }

    /// Add or replace a capability.
    pub fn register(&mut self, name: impl Into<String>, capability: Capability) -> Option<Capability> {
        self.entries.insert(name.into(), capability)
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("names", &self.names())
            .finish()
    }
}

// ========================================
// Argument helpers
// ========================================

fn mismatch(capability: &str, expected: &'static str, found: &Value) -> CapabilityError {
    CapabilityError::TypeMismatch {
        capability: capability.to_string(),
        expected,
        found: found.type_name(),
    }
}

fn expect_array<'a>(capability: &str, value: &'a Value) -> Result<&'a [Value], CapabilityError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(mismatch(capability, "array", other)),
    }
}

fn expect_str<'a>(capability: &str, value: &'a Value) -> Result<&'a str, CapabilityError> {
    value
        .as_str()
        .ok_or_else(|| mismatch(capability, "string", value))
}

fn string_arg<'a>(
    capability: &str,
    args: &'a [Value],
    argument: &'static str,
) -> Result<&'a str, CapabilityError> {
    let arg = args.first().ok_or_else(|| CapabilityError::MissingArgument {
        capability: capability.to_string(),
        argument,
    })?;
    arg.as_str()
        .ok_or_else(|| mismatch(capability, "string argument", arg))
}

// ========================================
// String capabilities
// ========================================

fn upper(value: &Value, _: &[Value]) -> Result<Value, CapabilityError> {
    Ok(Value::String(expect_str("upper", value)?.to_uppercase()))
}

fn lower(value: &Value, _: &[Value]) -> Result<Value, CapabilityError> {
    Ok(Value::String(expect_str("lower", value)?.to_lowercase()))
}

fn trim(value: &Value, _: &[Value]) -> Result<Value, CapabilityError> {
    Ok(Value::String(expect_str("trim", value)?.trim().to_string()))
}

fn string_test(
    capability: &str,
    value: &Value,
    args: &[Value],
    argument: &'static str,
    test: impl Fn(&str, &str) -> bool,
) -> Result<Value, CapabilityError> {
    let s = expect_str(capability, value)?;
    let arg = string_arg(capability, args, argument)?;
    Ok(Value::Boolean(test(s, arg)))
}

fn split(value: &Value, args: &[Value]) -> Result<Value, CapabilityError> {
    let s = expect_str("split", value)?;
    let delimiter = string_arg("split", args, "delimiter")?;
    let parts: Vec<Value> = if delimiter.is_empty() {
        s.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        s.split(delimiter).map(Value::from).collect()
    };
    Ok(Value::from(parts))
}

/// Non-string values never match.
fn matches(value: &Value, args: &[Value]) -> Result<Value, CapabilityError> {
    let pattern = string_arg("matches", args, "pattern")?;
    let re = Regex::new(pattern)
        .map_err(|e| CapabilityError::Failed(format!("invalid regex: {e}")))?;
    Ok(Value::Boolean(value.as_str().is_some_and(|s| re.is_match(s))))
}

// ========================================
// Collection capabilities
// ========================================

fn length(value: &Value, _: &[Value]) -> Result<Value, CapabilityError> {
    let len = match value {
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        Value::String(s) => s.chars().count(),
        other => return Err(mismatch("length", "array, object or string", other)),
    };
    Ok(Value::Integer(len as i64))
}

fn count(value: &Value, _: &[Value]) -> Result<Value, CapabilityError> {
    Ok(Value::Integer(expect_array("count", value)?.len() as i64))
}

fn keys(value: &Value, _: &[Value]) -> Result<Value, CapabilityError> {
    match value {
        Value::Object(map) => Ok(Value::array(map.keys().map(Value::from))),
        other => Err(mismatch("keys", "object", other)),
    }
}

fn values(value: &Value, _: &[Value]) -> Result<Value, CapabilityError> {
    match value {
        Value::Object(map) => Ok(Value::array(map.values().cloned())),
        other => Err(mismatch("values", "object", other)),
    }
}

fn first(value: &Value, _: &[Value]) -> Result<Value, CapabilityError> {
    Ok(expect_array("first", value)?
        .first()
        .cloned()
        .unwrap_or(Value::Null))
}

fn last(value: &Value, _: &[Value]) -> Result<Value, CapabilityError> {
    Ok(expect_array("last", value)?
        .last()
        .cloned()
        .unwrap_or(Value::Null))
}

/// Integer sum while every item is an integer; switches to float on the
/// first float.
fn sum(value: &Value, _: &[Value]) -> Result<Value, CapabilityError> {
    let mut sum_int: i64 = 0;
    let mut sum_float: f64 = 0.0;
    let mut has_float = false;

    for item in expect_array("sum", value)? {
        match item {
            Value::Integer(n) if !has_float => match sum_int.checked_add(*n) {
                Some(total) => sum_int = total,
                None => {
                    sum_float = sum_int as f64 + *n as f64;
                    has_float = true;
                }
            },
            Value::Integer(n) => sum_float += *n as f64,
            Value::Float(n) => {
                if !has_float {
                    sum_float = sum_int as f64;
                    has_float = true;
                }
                sum_float += n;
            }
            other => return Err(mismatch("sum", "numeric items", other)),
        }
    }

    if has_float {
        Ok(Value::Float(sum_float))
    } else {
        Ok(Value::Integer(sum_int))
    }
}

/// Non-numeric items are skipped; an array without numbers gives null.
fn avg(value: &Value, _: &[Value]) -> Result<Value, CapabilityError> {
    let numbers: Vec<f64> = expect_array("avg", value)?
        .iter()
        .filter_map(Value::as_float)
        .collect();
    if numbers.is_empty() {
        return Ok(Value::Null);
    }
    Ok(Value::Float(numbers.iter().sum::<f64>() / numbers.len() as f64))
}

fn extreme(capability: &str, value: &Value, wanted: Ordering) -> Result<Value, CapabilityError> {
    let mut best: Option<&Value> = None;
    for item in expect_array(capability, value)? {
        best = match best {
            None => Some(item),
            Some(current) if item.compare(current) == Some(wanted) => Some(item),
            keep => keep,
        };
    }
    Ok(best.cloned().unwrap_or(Value::Null))
}

fn unique(value: &Value, _: &[Value]) -> Result<Value, CapabilityError> {
    let mut result: Vec<Value> = Vec::new();
    for item in expect_array("unique", value)? {
        if !result.iter().any(|seen| seen.strict_eq(item)) {
            result.push(item.clone());
        }
    }
    Ok(Value::from(result))
}

fn sorted(capability: &str, value: &Value, descending: bool) -> Result<Value, CapabilityError> {
    let mut items = expect_array(capability, value)?.to_vec();
    items.sort_by(|a, b| {
        let ordering = a.compare(b).unwrap_or(Ordering::Equal);
        if descending { ordering.reverse() } else { ordering }
    });
    Ok(Value::from(items))
}

fn reverse(value: &Value, _: &[Value]) -> Result<Value, CapabilityError> {
    let mut items = expect_array("reverse", value)?.to_vec();
    items.reverse();
    Ok(Value::from(items))
}

/// One level only.
fn flatten(value: &Value, _: &[Value]) -> Result<Value, CapabilityError> {
    let mut result = Vec::new();
    for item in expect_array("flatten", value)? {
        match item {
            Value::Array(inner) => result.extend(inner.iter().cloned()),
            other => result.push(other.clone()),
        }
    }
    Ok(Value::from(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, value: Value, args: &[Value]) -> Result<Value, CapabilityError> {
        match Capabilities::builtin().get(name) {
            Some(Capability::Sync(f)) => f(&value, args),
            _ => panic!("no sync builtin {name}"),
        }
    }

    fn numbers(items: &[i64]) -> Value {
        Value::array(items.iter().copied().map(Value::from))
    }

    #[test]
    fn sum_switches_to_float() {
        assert_eq!(call("sum", numbers(&[1, 2, 3]), &[]).unwrap(), Value::Integer(6));
        let mixed = Value::array([Value::from(1), Value::from(0.5)]);
        assert_eq!(call("sum", mixed, &[]).unwrap(), Value::Float(1.5));
    }

    #[test]
    fn min_max_sort() {
        assert_eq!(call("min", numbers(&[3, 1, 2]), &[]).unwrap(), Value::Integer(1));
        assert_eq!(call("max", numbers(&[3, 1, 2]), &[]).unwrap(), Value::Integer(3));
        assert_eq!(call("sort", numbers(&[3, 1, 2]), &[]).unwrap(), numbers(&[1, 2, 3]));
        assert_eq!(call("sort_desc", numbers(&[3, 1, 2]), &[]).unwrap(), numbers(&[3, 2, 1]));
    }

    #[test]
    fn string_capabilities_need_arguments() {
        let err = call("contains", Value::from("honda"), &[]).unwrap_err();
        assert_eq!(
            err,
            CapabilityError::MissingArgument {
                capability: "contains".to_string(),
                argument: "substring"
            }
        );
        assert_eq!(
            call("starts_with", Value::from("honda"), &[Value::from("ho")]).unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn type_mismatch_reports_found_type() {
        let err = call("upper", Value::Integer(1), &[]).unwrap_err();
        assert_eq!(err.to_string(), "upper() requires string, got number");
    }

    #[test]
    fn unique_uses_numeric_equality() {
        let items = Value::array([Value::from(1), Value::from(1.0), Value::from(2)]);
        assert_eq!(call("unique", items, &[]).unwrap(), numbers(&[1, 2]));
    }
}
