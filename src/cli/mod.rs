//! CLI support for pathfind
//!
//! The binary is a thin wrapper around these functions, so other tools can
//! embed the same behaviour.

mod check;
mod docs;
mod find;

pub use check::{CheckReport, execute_check};
pub use docs::{DocCategory, get_doc_category, get_docs_overview};
pub use find::{FindOptions, execute_find, parse_binding};

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Parse error: {0}")]
    Parse(#[from] crate::ParseError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] crate::EvalError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No input provided. Use --input or pipe JSON to stdin.")]
    NoInput,

    #[error("Invalid --var '{0}': expected name=JSON")]
    InvalidBinding(String),

    #[error("Unknown category: '{0}'\nRun 'pathfind docs' to see available categories.")]
    UnknownCategory(String),
}
