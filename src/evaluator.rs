use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt,
    rc::Rc,
};

use thiserror::Error;

use crate::{
    ast::{CompareOp, Combinator, FieldName, Literal, NodeId, NodeKind, Pattern},
    capability::{Capabilities, Capability, CapabilityError, Continuation},
    events::{COMPLETE, ERROR, Event, Events, Hit, SUCCESS},
    parser::{ParseError, PathExpression},
    picker::{Picker, PickerCache},
    value::{Key, Value, Window},
};

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("undefined capability `{0}`")]
    UndefinedCapability(String),

    #[error("capability `{name}` failed: {source}")]
    Capability {
        name: String,
        #[source]
        source: CapabilityError,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Control signal returned by every node.
///
/// `Stop` ends the current traversal: for a probe it means the first value
/// was captured, for the query it means the result limit was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Traversal position: a value plus the edge it was reached by.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub value: Value,
    pub key: Option<Key>,
    pub parent: Option<Rc<Cursor>>,
}

impl Cursor {
    pub fn root(value: Value) -> Rc<Cursor> {
        Rc::new(Cursor {
            value,
            key: None,
            parent: None,
        })
    }

    /// A cursor with no structural position (literals, capability results).
    fn detached(value: Value) -> Rc<Cursor> {
        Self::root(value)
    }

    fn child(self: &Rc<Self>, key: Key, value: Value) -> Rc<Cursor> {
        Rc::new(Cursor {
            value,
            key: Some(key),
            parent: Some(self.clone()),
        })
    }

    /// Same position, different value.
    fn with_value(&self, value: Value) -> Rc<Cursor> {
        Rc::new(Cursor {
            value,
            key: self.key.clone(),
            parent: self.parent.clone(),
        })
    }
}

/// What a probe captured: a plain value, or a regex literal that reached
/// the end of its path untouched.
#[derive(Debug, Clone)]
pub(crate) enum Operand {
    Value(Value),
    Pattern(Pattern),
}

impl Operand {
    fn into_value(self) -> Value {
        match self {
            Operand::Value(value) => value,
            Operand::Pattern(pattern) => Value::String(pattern.source),
        }
    }
}

/// Captures the first value emitted by a sub-evaluation.
#[derive(Debug, Default)]
pub(crate) struct Probe {
    captured: RefCell<Option<Operand>>,
}

impl Probe {
    fn capture(&self, operand: Operand) {
        let mut captured = self.captured.borrow_mut();
        if captured.is_none() {
            *captured = Some(operand);
        }
    }

    fn take(&self) -> Option<Operand> {
        self.captured.borrow_mut().take()
    }
}

/// Where a node without a child sends its value.
pub(crate) enum Sink<'a> {
    Query,
    Probe(&'a Probe),
}

/// State of one query execution.
pub(crate) struct Run {
    expr: PathExpression,
    capabilities: Rc<Capabilities>,
    values: HashMap<String, Value>,
    events: Rc<Events>,
    pickers: PickerCache,
    barrier: Picker,
    start: usize,
    limit: Option<usize>,
    seen: Cell<usize>,
    count: Cell<usize>,
    halted: Rc<Cell<bool>>,
}

impl Run {
    pub(crate) fn new(
        expr: PathExpression,
        capabilities: Rc<Capabilities>,
        values: HashMap<String, Value>,
        events: Rc<Events>,
        start: usize,
        limit: Option<usize>,
    ) -> Rc<Run> {
        let pickers = PickerCache::default();
        let barrier = Picker::acquire(&pickers, &events, COMPLETE, true);
        Rc::new(Run {
            expr,
            capabilities,
            values,
            events,
            pickers,
            barrier,
            start,
            limit,
            seen: Cell::new(0),
            count: Cell::new(0),
            halted: Rc::new(Cell::new(false)),
        })
    }

    pub(crate) fn is_halted(&self) -> bool {
        self.halted.get()
    }

    /// Number of results emitted so far.
    pub(crate) fn count(&self) -> usize {
        self.count.get()
    }

    /// Walk the expression over `root`.
    ///
    /// On success the initiator's barrier unit is released, so `complete`
    /// fires once every deferred continuation has finished too. On failure
    /// the run halts and `complete` never fires.
    pub(crate) fn execute(self: &Rc<Self>, root: &Value) -> Result<(), EvalError> {
        tracing::debug!(path = %self.expr.source(), "run started");

        let Some(root_node) = self.expr.root() else {
            self.barrier.talk();
            return Ok(());
        };

        let evaluator = Evaluator { run: self.clone() };
        match evaluator.exec(root_node, Cursor::root(root.clone()), &Sink::Query) {
            Ok(_) => {
                tracing::debug!(
                    path = %self.expr.source(),
                    results = self.count(),
                    halted = self.is_halted(),
                    "run finished"
                );
                self.barrier.talk();
                Ok(())
            }
            Err(error) => {
                self.halted.set(true);
                Err(error)
            }
        }
    }

    /// Replace a failed run's output with `value` and complete.
    pub(crate) fn substitute(&self, value: Value) {
        self.halted.set(true);
        self.barrier.note(value.clone());
        self.events.emit(
            SUCCESS,
            Event::Success(Hit {
                value,
                origin: None,
            }),
        );
        self.barrier.end();
    }

    /// Report a failure that has no caller to return to.
    pub(crate) fn fail(&self, error: EvalError) {
        tracing::warn!(path = %self.expr.source(), %error, "deferred evaluation failed");
        let reached = self.events.emit(ERROR, Event::Error(Rc::new(error)));
        if reached == 0 {
            tracing::error!(path = %self.expr.source(), "unhandled evaluation error");
        }
    }

    fn emit(&self, cursor: &Cursor) -> Flow {
        if self.is_halted() {
            return Flow::Stop;
        }

        let seen = self.seen.get();
        self.seen.set(seen + 1);
        if seen < self.start {
            return Flow::Continue;
        }

        let count = self.count.get() + 1;
        self.count.set(count);
        self.barrier.note(cursor.value.clone());
        self.events.emit(
            SUCCESS,
            Event::Success(Hit {
                value: cursor.value.clone(),
                origin: cursor.key.clone(),
            }),
        );

        if self.limit.is_some_and(|limit| count >= limit) {
            tracing::debug!(path = %self.expr.source(), limit = count, "result limit reached");
            self.halted.set(true);
            self.barrier.end();
            return Flow::Stop;
        }
        Flow::Continue
    }
}

impl fmt::Debug for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Run")
            .field("path", &self.expr.source())
            .field("start", &self.start)
            .field("limit", &self.limit)
            .field("count", &self.count.get())
            .field("halted", &self.halted.get())
            .finish()
    }
}

/// One barrier unit held for the duration of a fan-out.
struct Join(Option<Picker>);

impl Drop for Join {
    fn drop(&mut self) {
        if let Some(picker) = self.0.take() {
            picker.talk();
        }
    }
}

#[derive(Clone)]
pub(crate) struct Evaluator {
    run: Rc<Run>,
}

impl Evaluator {
    pub(crate) fn exec(
        &self,
        id: NodeId,
        cursor: Rc<Cursor>,
        sink: &Sink<'_>,
    ) -> Result<Flow, EvalError> {
        if matches!(sink, Sink::Query) && self.run.is_halted() {
            return Ok(Flow::Stop);
        }

        let ast = self.run.expr.ast();
        let node = &ast[id];

        match &node.kind {
            NodeKind::Literal(literal) => {
                let value = match literal {
                    Literal::Value(value) => value.clone(),
                    Literal::Pattern(pattern) => {
                        if node.child.is_none()
                            && let Sink::Probe(probe) = sink
                        {
                            probe.capture(Operand::Pattern(pattern.clone()));
                            return Ok(Flow::Stop);
                        }
                        Value::String(pattern.source.clone())
                    }
                    Literal::Variable(name) => match self.run.values.get(name) {
                        Some(value) => value.clone(),
                        None => return Ok(Flow::Continue),
                    },
                };
                self.forward(node.child, Cursor::detached(value), sink)
            }

            NodeKind::FieldAccess(field) => {
                let name = match field {
                    FieldName::Literal(name) => name.clone(),
                    FieldName::Variable(var) => match self.run.values.get(var) {
                        Some(Value::String(s)) => s.clone(),
                        Some(other) => other.to_text(),
                        // Unbound: the segment is transparent.
                        None => return self.forward(node.child, cursor, sink),
                    },
                };
                let key = match (&cursor.value, name.parse::<usize>()) {
                    (Value::Array(_), Ok(index)) => Key::Index(index),
                    _ => Key::Name(name),
                };
                match cursor.value.get(&key) {
                    None | Some(Value::Null) => Ok(Flow::Continue),
                    Some(value) => {
                        let value = value.clone();
                        self.forward(node.child, cursor.child(key, value), sink)
                    }
                }
            }

            NodeKind::ParentAccess => match &cursor.parent {
                Some(parent) => self.forward(node.child, parent.clone(), sink),
                None => Ok(Flow::Continue),
            },

            NodeKind::Wildcard { reverse } => {
                self.fan_out(node.child, &cursor, Window::new(0, None, *reverse), sink)
            }

            NodeKind::Slice { window } => self.fan_out(node.child, &cursor, *window, sink),

            NodeKind::RecursiveDescent { reverse } => {
                let specific = ast.specific_filter(id);
                let _unit = self.join(sink);
                self.descend(node.child, specific, *reverse, cursor, sink)
            }

            NodeKind::ConditionalDescent => {
                let Some(group) = ast.specific_filter(id) else {
                    return Ok(Flow::Continue);
                };
                if !self.test(group, &cursor)? {
                    return Ok(Flow::Continue);
                }
                // The filter that supplied the group has already been applied.
                let next = match node.child {
                    Some(child)
                        if matches!(ast[child].kind, NodeKind::Filter { group: g } if g == group) =>
                    {
                        ast[child].child
                    }
                    other => other,
                };
                self.forward(next, cursor, sink)
            }

            NodeKind::Filter { group } => {
                if self.test(*group, &cursor)? {
                    self.forward(node.child, cursor, sink)
                } else {
                    Ok(Flow::Continue)
                }
            }

            NodeKind::ConditionGroup { conditions } => {
                for &condition in conditions {
                    let combinator = match &ast[condition].kind {
                        NodeKind::Condition { combinator, .. } => *combinator,
                        _ => None,
                    };
                    match combinator {
                        Some(Combinator::And) => {
                            let value = self.probe(condition, &cursor)?;
                            if !value.is_some_and(|v| v.is_truthy()) {
                                return Ok(Flow::Continue);
                            }
                        }
                        Some(Combinator::Or) => {
                            if let Some(value) = self.probe(condition, &cursor)?
                                && value.is_truthy()
                            {
                                return self.emit(&cursor.with_value(value), sink);
                            }
                        }
                        None => {
                            if self.exec(condition, cursor.clone(), sink)? == Flow::Stop {
                                return Ok(Flow::Stop);
                            }
                        }
                    }
                }
                Ok(Flow::Continue)
            }

            NodeKind::Condition {
                reverse, op, value, ..
            } => {
                if *reverse == 0 && op.is_none() {
                    return self.forward(node.child, cursor, sink);
                }

                let mut left = match node.child {
                    Some(child) => self.probe(child, &cursor)?,
                    None => None,
                };
                for _ in 0..*reverse {
                    left = Some(Value::Boolean(negate(left.as_ref())));
                }

                let result = match (op, value) {
                    (Some(op), Some(value)) => {
                        let (left, right) = match self.probe_operand(*value, &cursor)? {
                            Some(Operand::Pattern(pattern)) => {
                                let matched = left
                                    .as_ref()
                                    .is_some_and(|l| pattern.regex.is_match(&l.to_text()));
                                (Some(Value::Boolean(matched)), Some(Value::Boolean(true)))
                            }
                            right => (left, right.map(Operand::into_value)),
                        };
                        Some(Value::Boolean(compare(*op, left.as_ref(), right.as_ref())))
                    }
                    _ => left,
                };

                match result {
                    Some(result) => self.emit(&cursor.with_value(result), sink),
                    None => Ok(Flow::Continue),
                }
            }

            NodeKind::FunctionCall { name, args } => {
                let capability = self
                    .run
                    .capabilities
                    .get(name)
                    .ok_or_else(|| EvalError::UndefinedCapability(name.clone()))?;

                match capability {
                    Capability::Sync(f) => {
                        let result = f(&cursor.value, args).map_err(|source| {
                            EvalError::Capability {
                                name: name.clone(),
                                source,
                            }
                        })?;
                        self.forward(node.child, Cursor::detached(result), sink)
                    }
                    // A probe resolves within its own turn.
                    Capability::Deferred(_) if matches!(sink, Sink::Probe(_)) => {
                        Ok(Flow::Continue)
                    }
                    Capability::Deferred(f) => {
                        f(&cursor.value, args, self.continuation(node.child));
                        Ok(if self.run.is_halted() {
                            Flow::Stop
                        } else {
                            Flow::Continue
                        })
                    }
                }
            }
        }
    }

    /// Continue with `child`, or emit when the path ends here.
    fn forward(
        &self,
        child: Option<NodeId>,
        cursor: Rc<Cursor>,
        sink: &Sink<'_>,
    ) -> Result<Flow, EvalError> {
        match child {
            Some(child) => self.exec(child, cursor, sink),
            None => self.emit(&cursor, sink),
        }
    }

    fn emit(&self, cursor: &Cursor, sink: &Sink<'_>) -> Result<Flow, EvalError> {
        Ok(match sink {
            Sink::Probe(probe) => {
                probe.capture(Operand::Value(cursor.value.clone()));
                Flow::Stop
            }
            Sink::Query => self.run.emit(cursor),
        })
    }

    /// First value `id` produces for `cursor`, if any.
    fn probe(&self, id: NodeId, cursor: &Rc<Cursor>) -> Result<Option<Value>, EvalError> {
        Ok(self.probe_operand(id, cursor)?.map(Operand::into_value))
    }

    /// Like [`Evaluator::probe`], keeping a regex operand intact.
    fn probe_operand(&self, id: NodeId, cursor: &Rc<Cursor>) -> Result<Option<Operand>, EvalError> {
        let probe = Probe::default();
        self.exec(id, cursor.clone(), &Sink::Probe(&probe))?;
        Ok(probe.take())
    }

    fn test(&self, id: NodeId, cursor: &Rc<Cursor>) -> Result<bool, EvalError> {
        Ok(self.probe(id, cursor)?.is_some_and(|v| v.is_truthy()))
    }

    /// Join the query's completion barrier for a fan-out. Probes never do.
    fn join(&self, sink: &Sink<'_>) -> Join {
        match sink {
            Sink::Query => Join(Some(Picker::acquire(
                &self.run.pickers,
                &self.run.events,
                COMPLETE,
                true,
            ))),
            Sink::Probe(_) => Join(None),
        }
    }

    fn fan_out(
        &self,
        child: Option<NodeId>,
        cursor: &Rc<Cursor>,
        window: Window,
        sink: &Sink<'_>,
    ) -> Result<Flow, EvalError> {
        let children = cursor.value.children(window);
        if children.is_empty() {
            return Ok(Flow::Continue);
        }

        let _unit = self.join(sink);
        for (key, value) in children {
            if self.forward(child, cursor.child(key, value), sink)? == Flow::Stop {
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }

    /// Pre-order walk: this value first, then each child's subtree.
    fn descend(
        &self,
        child: Option<NodeId>,
        specific: Option<NodeId>,
        reverse: bool,
        cursor: Rc<Cursor>,
        sink: &Sink<'_>,
    ) -> Result<Flow, EvalError> {
        let passes = match specific {
            Some(group) => self.test(group, &cursor)?,
            None => true,
        };
        if passes && self.forward(child, cursor.clone(), sink)? == Flow::Stop {
            return Ok(Flow::Stop);
        }

        for (key, value) in cursor.value.children(Window::new(0, None, reverse)) {
            let next = cursor.child(key, value);
            if self.descend(child, specific, reverse, next, sink)? == Flow::Stop {
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }

    fn continuation(&self, child: Option<NodeId>) -> Continuation {
        let evaluator = self.clone();
        let resume = Rc::new(move |value: Value| {
            if let Err(error) = evaluator.forward(child, Cursor::detached(value), &Sink::Query) {
                evaluator.run.fail(error);
            }
        });
        Continuation::new(resume, self.run.barrier.clone(), self.run.halted.clone())
    }
}

/// One `!`: `false`, `"false"` and undefined become true, anything else
/// the inverse of its truthiness.
fn negate(value: Option<&Value>) -> bool {
    match value {
        None => true,
        Some(Value::Boolean(false)) => true,
        Some(Value::String(s)) if s == "false" => true,
        Some(other) => !other.is_truthy(),
    }
}

fn compare(op: CompareOp, left: Option<&Value>, right: Option<&Value>) -> bool {
    match op {
        CompareOp::Equal => strict_eq(left, right),
        CompareOp::NotEqual => !strict_eq(left, right),
        _ => match (left, right) {
            (Some(l), Some(r)) => l.compare(r).is_some_and(|ordering| op.accepts(ordering)),
            _ => false,
        },
    }
}

fn strict_eq(left: Option<&Value>, right: Option<&Value>) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(l), Some(r)) => l.strict_eq(r),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negation_treats_false_string_as_false() {
        assert!(negate(Some(&Value::from("false"))));
        assert!(negate(None));
        assert!(!negate(Some(&Value::from("no"))));
        assert!(negate(Some(&Value::Integer(0))));
    }

    #[test]
    fn undefined_operands() {
        assert!(compare(CompareOp::Equal, None, None));
        assert!(compare(CompareOp::NotEqual, Some(&Value::Null), None));
        assert!(!compare(CompareOp::LessThan, None, Some(&Value::Integer(1))));
    }

    #[test]
    fn ordering_operators_on_mixed_types_are_false() {
        let n = Value::Integer(1);
        let s = Value::from("1");
        assert!(!compare(CompareOp::LessThan, Some(&n), Some(&s)));
        assert!(!compare(CompareOp::GreaterEqual, Some(&n), Some(&s)));
        assert!(compare(CompareOp::GreaterEqual, Some(&n), Some(&Value::Float(0.5))));
    }
}
