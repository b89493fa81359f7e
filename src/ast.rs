//! # Path expression syntax tree
//!
//! A compiled query is a flat arena of [`Node`]s addressed by [`NodeId`].
//! Every node carries a non-owning `parent` link and at most one `child`
//! that continues the path; node-specific payload lives in [`NodeKind`].
//!
//! - **[tokens]** - tokens of the three scanner grammars
//! - **[nodes]** - the node family and the arena
//! - **[operators]** - comparison operators, combinators, repeat operators
//!
//! ## Two grammars
//!
//! Paths and conditions nest inside each other. A path segment may open a
//! filter, whose body is a condition group; a condition operand that is not
//! a literal is parsed as a path.
//!
//! ```text
//! *.(maker == "Honda" & year > 2009)
//! │  └──────────── condition group ─┘
//! └ wildcard
//! ```
//!
//! The whole query is itself a condition group, so top-level alternatives
//! work too:
//!
//! ```text
//! nickname | name
//! ```
//!
//! ## Segments
//!
//! | syntax        | node                         |
//! |---------------|------------------------------|
//! | `name`, `0`   | `FieldAccess`                |
//! | `$var`        | `FieldAccess` (variable)     |
//! | `.`           | `ParentAccess`               |
//! | `*`, `^*`     | `Wildcard`                   |
//! | `#`, `^#`     | `RecursiveDescent`           |
//! | `+`           | `ConditionalDescent`         |
//! | `3~5`, `-1`   | `Slice`                      |
//! | `[..]`, `(..)`| `Filter`                     |
//! | `:fn(args)`   | `FunctionCall`               |
pub mod nodes;
pub mod operators;
pub mod tokens;

pub use nodes::{Ast, FieldName, Literal, Node, NodeId, NodeKind, Pattern};
pub use operators::{Combinator, CompareOp, RepeatOp};
pub use tokens::{ConditionToken, FunctionToken, LiteralToken, PathToken};
