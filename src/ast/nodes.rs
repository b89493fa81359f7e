use std::{fmt, ops::Index, rc::Rc};

use regex::Regex;

use super::operators::{Combinator, CompareOp};
use crate::value::{Value, Window};

/// Index of a node inside its [`Ast`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Member name of a field-access segment.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldName {
    /// `maker`, `0`
    Literal(String),

    /// `$name`: looked up in the query's values when the query runs.
    /// An unbound name skips the segment and the path continues from the
    /// current value.
    Variable(String),
}

/// Regex literal with the source it was compiled from.
#[derive(Clone)]
pub struct Pattern {
    pub source: String,
    pub regex: Rc<Regex>,
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.source)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.regex.as_str() == other.regex.as_str()
    }
}

/// Constant operand of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Number, boolean or string
    ///
    /// # Examples
    /// ```text
    /// 2009
    /// 1.5
    /// true
    /// "Honda"
    /// 'it\'s'
    /// ```
    Value(Value),

    /// `/pattern/flags`
    Pattern(Pattern),

    /// `$name` inside a condition
    Variable(String),
}

/// Node payload. Links to the rest of the tree live on [`Node`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Literal(Literal),
    FieldAccess(FieldName),
    ParentAccess,
    Wildcard { reverse: bool },
    RecursiveDescent { reverse: bool },
    ConditionalDescent,
    Slice { window: Window },

    /// `[...]` or `(...)` inside a path. `group` gates the branch, the
    /// node's `child` continues the path.
    Filter { group: NodeId },

    /// One operand of a condition group.
    ///
    /// `child` yields the left operand; `value` is the right-hand condition
    /// when `op` is set. `combinator` pairs this condition with the next
    /// listed one.
    Condition {
        reverse: usize,
        op: Option<CompareOp>,
        value: Option<NodeId>,
        combinator: Option<Combinator>,
    },

    /// Conditions in source order. Right-hand operands are not listed.
    ConditionGroup { conditions: Vec<NodeId> },

    FunctionCall { name: String, args: Vec<Value> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub child: Option<NodeId>,
    pub kind: NodeKind,
}

/// Arena holding every node of one compiled expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ast {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            child: None,
            kind,
        });
        id
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub(crate) fn set_child(&mut self, id: NodeId, child: Option<NodeId>) {
        self.nodes[id.0].child = child;
    }

    /// `id` followed by each of its ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |n| self[*n].parent)
    }

    /// The condition group gating a `+` node.
    ///
    /// Resolved from `id` upward: the nearest `+` whose child is a filter
    /// supplies its group. A group is never returned to a node nested inside
    /// that same group.
    pub fn specific_filter(&self, id: NodeId) -> Option<NodeId> {
        let mut walked = Vec::new();
        for ancestor in self.ancestors(id) {
            if matches!(self[ancestor].kind, NodeKind::ConditionalDescent)
                && let Some(NodeKind::Filter { group }) =
                    self[ancestor].child.map(|c| &self[c].kind)
                && !walked.contains(group)
            {
                return Some(*group);
            }
            walked.push(ancestor);
        }
        None
    }
}

impl Index<NodeId> for Ast {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}
