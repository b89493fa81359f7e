//! Labeled event/listener registry.
//!
//! Every result a query produces travels through here: matches are emitted
//! under [`SUCCESS`], the final barrier payload under [`COMPLETE`] and
//! failures from deferred branches under [`ERROR`].

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use regex::Regex;

use crate::{
    evaluator::EvalError,
    picker::Completion,
    scheduler::Scheduler,
    value::{Key, Value},
};

pub const SUCCESS: &str = "success";
pub const COMPLETE: &str = "complete";
pub const ERROR: &str = "error";

/// A single match: the value plus the key it was reached under, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub value: Value,
    pub origin: Option<Key>,
}

/// Payload carried by an emitted event.
#[derive(Debug, Clone)]
pub enum Event {
    Success(Hit),
    Complete(Rc<Completion>),
    Error(Rc<EvalError>),
}

/// Which labels a listener reacts to.
#[derive(Debug, Clone)]
pub enum Label {
    Any,
    Exact(String),
    Pattern(Regex),
}

impl Label {
    pub fn matches(&self, label: &str) -> bool {
        match self {
            Label::Any => true,
            Label::Exact(name) => name == label,
            Label::Pattern(re) => re.is_match(label),
        }
    }
}

impl From<&str> for Label {
    fn from(label: &str) -> Self {
        Label::Exact(label.to_string())
    }
}

type Callback = Rc<dyn Fn(&Event)>;

/// Listener registration: label filter, callback and dispatch options.
pub struct Listener {
    label: Label,
    callback: Callback,
    limit: Option<usize>,
    deferred: bool,
}

impl Listener {
    pub fn new(label: impl Into<Label>, callback: impl Fn(&Event) + 'static) -> Self {
        Listener {
            label: label.into(),
            callback: Rc::new(callback),
            limit: None,
            deferred: false,
        }
    }

    /// Unregister after `n` dispatches.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Queue dispatch on the scheduler instead of calling inline.
    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Entry {
    id: ListenerId,
    label: Label,
    callback: Callback,
    remaining: Option<usize>,
    deferred: bool,
}

pub struct Events {
    scheduler: Scheduler,
    listeners: RefCell<Vec<Entry>>,
    next_id: Cell<u64>,
}

impl Events {
    pub fn new(scheduler: Scheduler) -> Self {
        Events {
            scheduler,
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    pub fn listen(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push(Entry {
            id,
            label: listener.label,
            callback: listener.callback,
            remaining: listener.limit,
            deferred: listener.deferred,
        });
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|entry| entry.id != id);
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dispatch `event` to every listener whose filter accepts `label`.
    /// Returns the number of listeners reached.
    pub fn emit(&self, label: &str, event: Event) -> usize {
        let targets: Vec<(Callback, bool)> = {
            let mut listeners = self.listeners.borrow_mut();
            let mut targets = Vec::new();
            for entry in listeners.iter_mut().filter(|e| e.label.matches(label)) {
                if let Some(remaining) = entry.remaining.as_mut() {
                    if *remaining == 0 {
                        continue;
                    }
                    *remaining -= 1;
                }
                targets.push((entry.callback.clone(), entry.deferred));
            }
            listeners.retain(|e| e.remaining != Some(0));
            targets
        };

        // Callbacks run with the registry unborrowed; they may listen or emit.
        for (callback, deferred) in &targets {
            if *deferred {
                let callback = callback.clone();
                let event = event.clone();
                self.scheduler.defer(move || callback(&event));
            } else {
                callback(&event);
            }
        }
        targets.len()
    }
}

impl fmt::Debug for Events {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Events")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(n: i64) -> Event {
        Event::Success(Hit {
            value: Value::Integer(n),
            origin: None,
        })
    }

    #[test]
    fn exact_label_filters() {
        let events = Events::new(Scheduler::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        events.listen(Listener::new(SUCCESS, move |e| {
            if let Event::Success(hit) = e {
                sink.borrow_mut().push(hit.value.clone());
            }
        }));

        assert_eq!(events.emit(SUCCESS, hit(1)), 1);
        assert_eq!(events.emit(COMPLETE, hit(2)), 0);
        assert_eq!(*seen.borrow(), vec![Value::Integer(1)]);
    }

    #[test]
    fn limited_listener_unregisters() {
        let events = Events::new(Scheduler::new());
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        events.listen(Listener::new(Label::Any, move |_| c.set(c.get() + 1)).limit(1));

        events.emit(SUCCESS, hit(1));
        events.emit(SUCCESS, hit(2));
        assert_eq!(count.get(), 1);
        assert!(events.is_empty());
    }

    #[test]
    fn deferred_dispatch_waits_for_scheduler() {
        let scheduler = Scheduler::new();
        let events = Events::new(scheduler.clone());
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        events.listen(Listener::new(SUCCESS, move |_| c.set(c.get() + 1)).deferred());

        events.emit(SUCCESS, hit(1));
        assert_eq!(count.get(), 0);
        scheduler.run_until_idle();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn pattern_label_and_removal() {
        let events = Events::new(Scheduler::new());
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let id = events.listen(Listener::new(
            Label::Pattern(Regex::new("^(success|complete)$").unwrap()),
            move |_| c.set(c.get() + 1),
        ));
        events.emit(SUCCESS, hit(1));
        events.emit(ERROR, hit(1));
        assert_eq!(count.get(), 1);
        assert!(events.remove(id));
        events.emit(SUCCESS, hit(1));
        assert_eq!(count.get(), 1);
    }
}
