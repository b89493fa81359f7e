//! Run path queries against JSON input

use super::CliError;
use crate::{Engine, Query, Value, convert};

/// Options for the find command
#[derive(Debug, Clone)]
pub struct FindOptions {
    /// The path expression to run
    pub path: String,
    /// JSON input string
    pub input: Option<String>,
    /// Maximum number of results; below 1 means unbounded
    pub limit: i64,
    /// Matches to skip before collecting
    pub start: usize,
    /// Variable bindings as `name=JSON`
    pub vars: Vec<String>,
    /// Return only the first match
    pub first: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        FindOptions {
            path: String::new(),
            input: None,
            limit: -1,
            start: 0,
            vars: Vec::new(),
            first: false,
        }
    }
}

/// Split a `name=JSON` binding. A value that is not valid JSON is taken as
/// a plain string.
pub fn parse_binding(binding: &str) -> Result<(String, Value), CliError> {
    let (name, raw) = binding
        .split_once('=')
        .ok_or_else(|| CliError::InvalidBinding(binding.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::InvalidBinding(binding.to_string()));
    }
    let value = convert::parse_json(raw).unwrap_or_else(|_| Value::from(raw));
    Ok((name.to_string(), value))
}

/// Execute a find operation. Returns the matches as a JSON array, or the
/// first match (null when there is none) with `first`.
pub fn execute_find(options: &FindOptions) -> Result<serde_json::Value, CliError> {
    let input = options.input.as_ref().ok_or(CliError::NoInput)?;
    let root = convert::parse_json(input)?;

    let bindings = options
        .vars
        .iter()
        .map(|b| parse_binding(b))
        .collect::<Result<Vec<_>, _>>()?;

    let query = Query::new(options.path.as_str())
        .values(bindings)
        .limit(options.limit)
        .start(options.start);

    let engine = Engine::new();
    if options.first {
        let found = engine.node(&root, query)?;
        return Ok(found.map(serde_json::Value::from).unwrap_or_default());
    }

    let results = engine.collect(&root, query)?;
    Ok(serde_json::Value::Array(
        results.iter().map(convert::to_json).collect(),
    ))
}
