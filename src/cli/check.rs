//! Validate path expressions without running them

use super::CliError;
use crate::{Capabilities, ast::NodeKind};

/// What `pathfind check` found out about a path
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    /// Number of AST nodes compiled
    pub nodes: usize,
    /// Function names the path calls
    pub functions: Vec<String>,
    /// Called functions missing from the builtin set
    pub unknown_functions: Vec<String>,
    /// Trailing text the grammar ignored
    pub remainder: Option<String>,
}

impl CheckReport {
    pub fn is_complete(&self) -> bool {
        self.remainder.is_none()
    }
}

/// Compile `path` and describe the result.
pub fn execute_check(path: &str) -> Result<CheckReport, CliError> {
    let expr = crate::parse(path)?;

    let mut functions: Vec<String> = expr
        .ast()
        .iter()
        .filter_map(|(_, node)| match &node.kind {
            NodeKind::FunctionCall { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect();
    functions.sort();
    functions.dedup();

    let builtin = Capabilities::builtin();
    let unknown_functions = functions
        .iter()
        .filter(|name| !builtin.contains(name))
        .cloned()
        .collect();

    Ok(CheckReport {
        nodes: expr.ast().len(),
        functions,
        unknown_functions,
        remainder: expr.remainder().map(str::to_string),
    })
}
