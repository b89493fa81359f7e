use std::{fmt, rc::Rc};

use regex::RegexBuilder;
use thiserror::Error;

use crate::{
    ast::{
        Ast, Combinator, CompareOp, ConditionToken, FieldName, FunctionToken, Literal,
        LiteralToken, NodeId, NodeKind, PathToken, Pattern, RepeatOp,
    },
    convert::from_json,
    lexer::Scanner,
    value::{Value, Window},
};

/// Capability invoked by `:` with no name, or by a bare `.` in a chain.
pub const DEFAULT_CAPABILITY: &str = "to_string";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid arguments for function `{name}`: {source}")]
    InvalidArguments {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid pattern /{pattern}/: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A compiled query.
///
/// Immutable after parsing and cheap to clone, so one expression can be
/// evaluated against any number of documents.
///
/// ```
/// use pathfind::parse;
///
/// let expr = parse("*.(year > 2009)").unwrap();
/// assert!(expr.remainder().is_none());
///
/// // Text the grammar cannot place is dropped and kept for inspection.
/// let expr = parse("name @ignored").unwrap();
/// assert_eq!(expr.remainder(), Some("@ignored"));
/// ```
#[derive(Clone)]
pub struct PathExpression {
    source: Rc<str>,
    ast: Rc<Ast>,
    remainder: Option<Rc<str>>,
}

impl PathExpression {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    /// Top-level condition group.
    pub fn root(&self) -> Option<NodeId> {
        self.ast.root()
    }

    /// Trailing text that was not consumed by the grammar.
    pub fn remainder(&self) -> Option<&str> {
        self.remainder.as_deref()
    }
}

impl fmt::Debug for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathExpression")
            .field("source", &self.source)
            .field("nodes", &self.ast.len())
            .field("remainder", &self.remainder)
            .finish()
    }
}

/// Compile `input` into a [`PathExpression`].
pub fn parse(input: &str) -> Result<PathExpression, ParseError> {
    Parser::new(input).parse()
}

pub struct Parser {
    source: String,
    scanner: Scanner,
    ast: Ast,
}

impl Parser {
    pub fn new(input: &str) -> Self {
        Parser {
            source: input.to_string(),
            scanner: Scanner::new(input),
            ast: Ast::new(),
        }
    }

    pub fn parse(mut self) -> Result<PathExpression, ParseError> {
        let root = self.parse_group(None)?;
        self.ast.set_root(root);

        let remainder = self.scanner.remainder();
        let remainder = if remainder.is_empty() {
            None
        } else {
            tracing::debug!(path = %self.source, remainder = %remainder, "path truncated");
            Some(Rc::from(remainder))
        };

        Ok(PathExpression {
            source: Rc::from(self.source),
            ast: Rc::new(self.ast),
            remainder,
        })
    }

    fn new_condition(&mut self, parent: NodeId) -> NodeId {
        self.ast.push(
            Some(parent),
            NodeKind::Condition {
                reverse: 0,
                op: None,
                value: None,
                combinator: None,
            },
        )
    }

    /// Add a listed condition to `group`.
    fn add_condition(&mut self, group: NodeId) -> NodeId {
        let condition = self.new_condition(group);
        if let NodeKind::ConditionGroup { conditions } = &mut self.ast.node_mut(group).kind {
            conditions.push(condition);
        }
        condition
    }

    fn condition_mut(&mut self, id: NodeId) -> Option<ConditionFields<'_>> {
        match &mut self.ast.node_mut(id).kind {
            NodeKind::Condition {
                reverse,
                op,
                value,
                combinator,
            } => Some(ConditionFields {
                reverse,
                op,
                value,
                combinator,
            }),
            _ => None,
        }
    }

    /// Parse a condition group up to its closing bracket or end of input.
    ///
    /// `listed` is the condition the next combinator attaches to, `current`
    /// is the one receiving operands (a right-hand side after an operator).
    fn parse_group(&mut self, parent: Option<NodeId>) -> Result<NodeId, ParseError> {
        let group = self.ast.push(parent, NodeKind::ConditionGroup { conditions: Vec::new() });
        let mut listed = self.add_condition(group);
        let mut current = listed;

        loop {
            let before = self.scanner.position();
            match self.scanner.next_condition_token() {
                ConditionToken::End | ConditionToken::Close => break,
                ConditionToken::Operator(operator) => {
                    let value = self.new_condition(current);
                    if let Some(fields) = self.condition_mut(current) {
                        *fields.op = Some(operator);
                        *fields.value = Some(value);
                    }
                    current = value;
                }
                ConditionToken::Not(count) => {
                    if let Some(fields) = self.condition_mut(current) {
                        *fields.reverse = count;
                    }
                }
                ConditionToken::Combinator(tag) => {
                    if let Some(fields) = self.condition_mut(listed) {
                        *fields.combinator = Some(tag);
                    }
                    listed = self.add_condition(group);
                    current = listed;
                }
                ConditionToken::Open => {
                    let nested = self.parse_group(Some(current))?;
                    self.ast.set_child(current, Some(nested));
                }
                ConditionToken::Literal(token) => {
                    let literal = Self::literal(token)?;
                    let node = self.ast.push(Some(current), NodeKind::Literal(literal));
                    self.ast.set_child(current, Some(node));
                }
                ConditionToken::Variable(name) => {
                    let node = self
                        .ast
                        .push(Some(current), NodeKind::Literal(Literal::Variable(name)));
                    self.ast.set_child(current, Some(node));
                }
                ConditionToken::Path => match self.parse_path(Some(current))? {
                    Some(path) => self.ast.set_child(current, Some(path)),
                    None => {
                        if self.scanner.position() == before {
                            break;
                        }
                    }
                },
            }
        }

        Ok(group)
    }

    fn literal(token: LiteralToken) -> Result<Literal, ParseError> {
        Ok(match token {
            LiteralToken::Integer(n) => Literal::Value(Value::Integer(n)),
            LiteralToken::Float(n) => Literal::Value(Value::Float(n)),
            LiteralToken::Boolean(b) => Literal::Value(Value::Boolean(b)),
            LiteralToken::String(s) => Literal::Value(Value::String(s)),
            LiteralToken::Regex { pattern, flags } => {
                let regex = RegexBuilder::new(&pattern)
                    .case_insensitive(flags.contains('i'))
                    .multi_line(flags.contains('m'))
                    .build()
                    .map_err(|source| ParseError::InvalidPattern {
                        pattern: pattern.clone(),
                        source,
                    })?;
                Literal::Pattern(Pattern {
                    source: pattern,
                    regex: Rc::new(regex),
                })
            }
        })
    }

    /// Parse one path segment and, recursively, the rest of the path.
    /// Returns `None` when nothing at the cursor is a path segment.
    fn parse_path(&mut self, parent: Option<NodeId>) -> Result<Option<NodeId>, ParseError> {
        let kind = match self.scanner.next_path_token() {
            PathToken::End => return Ok(None),
            PathToken::Function => return self.parse_function_chain(parent, true),
            PathToken::Open => {
                let group = self.parse_group(None)?;
                let filter = self.ast.push(parent, NodeKind::Filter { group });
                self.ast.node_mut(group).parent = Some(filter);
                let child = self.parse_path(Some(filter))?;
                self.ast.set_child(filter, child);
                return Ok(Some(filter));
            }
            PathToken::Parent => NodeKind::ParentAccess,
            PathToken::Field(name) => NodeKind::FieldAccess(FieldName::Literal(name)),
            PathToken::Variable(name) => NodeKind::FieldAccess(FieldName::Variable(name)),
            PathToken::Slice {
                start,
                limit,
                reverse,
            } => NodeKind::Slice {
                window: Window::new(start, limit, reverse),
            },
            PathToken::Repeat { op, reverse } => match op {
                RepeatOp::Wildcard => NodeKind::Wildcard { reverse },
                RepeatOp::Descend => NodeKind::RecursiveDescent { reverse },
                RepeatOp::Conditional => NodeKind::ConditionalDescent,
            },
        };

        let id = self.ast.push(parent, kind);
        let child = self.parse_path(Some(id))?;
        self.ast.set_child(id, child);
        Ok(Some(id))
    }

    fn parse_function_chain(
        &mut self,
        parent: Option<NodeId>,
        first: bool,
    ) -> Result<Option<NodeId>, ParseError> {
        let (name, args) = match self.scanner.next_function_token() {
            FunctionToken::Default => (DEFAULT_CAPABILITY.to_string(), Vec::new()),
            FunctionToken::Call { name, args } => {
                let args = match args {
                    Some(raw) => Self::function_args(&name, &raw)?,
                    None => Vec::new(),
                };
                (name, args)
            }
            FunctionToken::End if first => {
                let id = self.ast.push(
                    parent,
                    NodeKind::FunctionCall {
                        name: DEFAULT_CAPABILITY.to_string(),
                        args: Vec::new(),
                    },
                );
                return Ok(Some(id));
            }
            FunctionToken::End => return Ok(None),
        };

        let id = self.ast.push(parent, NodeKind::FunctionCall { name, args });
        let child = self.parse_function_chain(Some(id), false)?;
        self.ast.set_child(id, child);
        Ok(Some(id))
    }

    /// Decode a raw argument list as the body of a JSON array.
    fn function_args(name: &str, raw: &str) -> Result<Vec<Value>, ParseError> {
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&format!("[{raw}]"))
            .map_err(|source| ParseError::InvalidArguments {
                name: name.to_string(),
                source,
            })?;
        Ok(parsed.into_iter().map(from_json).collect())
    }
}

struct ConditionFields<'a> {
    reverse: &'a mut usize,
    op: &'a mut Option<CompareOp>,
    value: &'a mut Option<NodeId>,
    combinator: &'a mut Option<Combinator>,
}
