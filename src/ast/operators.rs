use std::{cmp::Ordering, fmt};

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal (`==`, or a single `=`)
    Equal,
    /// Not equal (`!=`)
    NotEqual,
    /// Less than (`<`)
    LessThan,
    /// Greater than (`>`)
    GreaterThan,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Greater than or equal (`>=`)
    GreaterEqual,
}

impl CompareOp {
    /// Whether an ordering between two operands satisfies this operator.
    pub fn accepts(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Equal => ordering == Ordering::Equal,
            CompareOp::NotEqual => ordering != Ordering::Equal,
            CompareOp::LessThan => ordering == Ordering::Less,
            CompareOp::GreaterThan => ordering == Ordering::Greater,
            CompareOp::LessEqual => ordering != Ordering::Greater,
            CompareOp::GreaterEqual => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompareOp::Equal => "==",
            CompareOp::NotEqual => "!=",
            CompareOp::LessThan => "<",
            CompareOp::GreaterThan => ">",
            CompareOp::LessEqual => "<=",
            CompareOp::GreaterEqual => ">=",
        })
    }
}

/// Short-circuit tag linking a condition to the one after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `&` - stop the group on a falsy probe
    And,
    /// `|` - emit and stop the group on a truthy probe
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatOp {
    /// `*` - every direct child
    Wildcard,
    /// `#` - this node and every descendant, pre-order
    Descend,
    /// `+` - conditional descent
    Conditional,
}
