use super::operators::{Combinator, CompareOp, RepeatOp};

/// Tokens of the path-segment grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum PathToken {
    /// Parent navigation
    ///
    /// ```text
    /// .
    /// ```
    Parent,

    /// Window over the children of the current value
    ///
    /// # Examples
    /// ```text
    /// 3~5     offset 3, five items
    /// -2~1    one item, two from the end
    /// -1      the last item
    /// ^0~2    the first two, visited back to front
    /// ```
    Slice {
        start: i64,
        limit: Option<usize>,
        reverse: bool,
    },

    /// Member name or array index
    ///
    /// # Examples
    /// ```text
    /// maker
    /// 0
    /// first-name
    /// ```
    Field(String),

    /// Repeat operator: `*`, `#` or `+`, optionally prefixed with `^`
    Repeat { op: RepeatOp, reverse: bool },

    /// Member name taken from a query variable
    ///
    /// ```text
    /// $field
    /// ```
    Variable(String),

    /// `:` - the rest of the path is a function chain
    Function,

    /// `[` or `(` - an embedded filter
    Open,

    /// Nothing placeable at the cursor
    End,
}

/// Literal payloads recognized by the condition grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralToken {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),

    /// `/pattern/flags`
    Regex { pattern: String, flags: String },
}

/// Tokens of the condition grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionToken {
    Operator(CompareOp),

    /// Run of `!`, carrying its length
    Not(usize),

    Combinator(Combinator),

    /// `[` or `(` - a nested condition group
    Open,

    /// `]` or `)` - end of the group
    Close,

    Literal(LiteralToken),

    /// `$name`, resolved when the query runs
    Variable(String),

    /// No condition token here; parse a path instead
    Path,

    /// End of input
    End,
}

/// Tokens of the function-chain grammar that follows `:`.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionToken {
    /// A bare `.`: the default capability
    Default,

    /// `name` or `name(raw, args)`
    Call { name: String, args: Option<String> },

    End,
}
