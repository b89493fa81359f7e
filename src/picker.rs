//! Join barrier ("picker") for fan-out evaluation.
//!
//! A picker counts outstanding units of work for one labeled action. The
//! initiator holds the first unit; every concurrent branch adds one with
//! [`Picker::wait`] and gives it back with [`Picker::talk`]. When the count
//! drops to zero the picker fires its terminal notification exactly once.
//!
//! ```
//! use std::rc::Rc;
//! use pathfind::events::{Events, Listener, COMPLETE};
//! use pathfind::picker::{Picker, PickerCache};
//! use pathfind::{Scheduler, Value};
//!
//! let events = Rc::new(Events::new(Scheduler::new()));
//! let cache = PickerCache::default();
//!
//! let picker = Picker::acquire(&cache, &events, COMPLETE, true);
//! picker.wait();                       // a branch starts
//! picker.note(Value::from("found"));
//! picker.talk();                       // the branch is done
//! assert!(!picker.is_fired());
//! picker.talk();                       // the initiator is done
//! assert!(picker.is_fired());
//! ```

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    fmt,
    rc::{Rc, Weak},
};

use crate::{
    events::{Event, Events},
    value::Value,
};

/// Note list used when a result is recorded without an explicit list name.
pub const DEFAULT_NOTE_LIST: &str = "list";

/// Results recorded on a barrier, grouped by list name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Notes {
    lists: BTreeMap<String, Vec<Value>>,
}

impl Notes {
    pub fn add(&mut self, list: &str, value: Value) {
        self.lists.entry(list.to_string()).or_default().push(value);
    }

    /// The default list.
    pub fn list(&self) -> &[Value] {
        self.get(DEFAULT_NOTE_LIST)
    }

    pub fn get(&self, list: &str) -> &[Value] {
        self.lists.get(list).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of notes across all lists.
    pub fn len(&self) -> usize {
        self.lists.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.lists.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Unit accounting for a barrier: every unit opened (create, join, wait)
/// must be closed (talk, or forced by end).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BarrierStats {
    pub opened: usize,
    pub closed: usize,
}

impl BarrierStats {
    pub fn is_balanced(&self) -> bool {
        self.opened == self.closed
    }
}

/// Terminal payload of a fired barrier.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub label: String,
    pub notes: Notes,
    pub stats: BarrierStats,
}

impl Completion {
    /// Values recorded in the default list.
    pub fn results(&self) -> &[Value] {
        self.notes.list()
    }
}

/// Outstanding barriers of one run, keyed by action label.
pub type PickerCache = Rc<RefCell<HashMap<String, Picker>>>;

struct State {
    wait: usize,
    fired: bool,
    notes: Notes,
    stats: BarrierStats,
}

struct Inner {
    label: String,
    allow_empty: bool,
    state: RefCell<State>,
    cache: Weak<RefCell<HashMap<String, Picker>>>,
    events: Rc<Events>,
}

#[derive(Clone)]
pub struct Picker {
    inner: Rc<Inner>,
}

impl Picker {
    /// Join the pending barrier for `label`, or open a new one with a count
    /// of one.
    ///
    /// `allow_empty` lets the barrier fire without any recorded note.
    pub fn acquire(
        cache: &PickerCache,
        events: &Rc<Events>,
        label: &str,
        allow_empty: bool,
    ) -> Picker {
        let existing = cache.borrow().get(label).cloned();
        if let Some(picker) = existing {
            picker.wait();
            return picker;
        }

        let picker = Picker {
            inner: Rc::new(Inner {
                label: label.to_string(),
                allow_empty,
                state: RefCell::new(State {
                    wait: 1,
                    fired: false,
                    notes: Notes::default(),
                    stats: BarrierStats {
                        opened: 1,
                        closed: 0,
                    },
                }),
                cache: Rc::downgrade(cache),
                events: events.clone(),
            }),
        };
        cache
            .borrow_mut()
            .insert(label.to_string(), picker.clone());
        picker
    }

    pub fn wait(&self) -> &Self {
        let mut state = self.inner.state.borrow_mut();
        if !state.fired {
            state.wait += 1;
            state.stats.opened += 1;
        }
        self
    }

    pub fn talk(&self) -> &Self {
        let ready = {
            let mut state = self.inner.state.borrow_mut();
            if state.fired {
                return self;
            }
            state.wait = state.wait.saturating_sub(1);
            state.stats.closed += 1;
            state.wait == 0 && (self.inner.allow_empty || !state.notes.is_empty())
        };

        if ready {
            self.fire();
        }
        self
    }

    /// Fire now, closing every outstanding unit.
    pub fn end(&self) -> &Self {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.fired {
                return self;
            }
            state.stats.closed += state.wait;
            state.wait = 0;
        }
        self.fire();
        self
    }

    pub fn note(&self, value: Value) -> &Self {
        self.note_in(DEFAULT_NOTE_LIST, value)
    }

    pub fn note_in(&self, list: &str, value: Value) -> &Self {
        let mut state = self.inner.state.borrow_mut();
        if !state.fired {
            state.notes.add(list, value);
        }
        self
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn pending(&self) -> usize {
        self.inner.state.borrow().wait
    }

    pub fn is_fired(&self) -> bool {
        self.inner.state.borrow().fired
    }

    pub fn stats(&self) -> BarrierStats {
        self.inner.state.borrow().stats
    }

    fn fire(&self) {
        let completion = {
            let mut state = self.inner.state.borrow_mut();
            state.fired = true;
            Completion {
                label: self.inner.label.clone(),
                notes: std::mem::take(&mut state.notes),
                stats: state.stats,
            }
        };

        if let Some(cache) = self.inner.cache.upgrade() {
            let mut cache = cache.borrow_mut();
            if cache
                .get(&self.inner.label)
                .is_some_and(|p| Rc::ptr_eq(&p.inner, &self.inner))
            {
                cache.remove(&self.inner.label);
            }
        }

        tracing::trace!(
            label = %completion.label,
            notes = completion.notes.len(),
            opened = completion.stats.opened,
            closed = completion.stats.closed,
            "barrier fired"
        );
        self.inner
            .events
            .emit(&self.inner.label, Event::Complete(Rc::new(completion)));
    }
}

impl fmt::Debug for Picker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Picker")
            .field("label", &self.inner.label)
            .field("wait", &state.wait)
            .field("fired", &state.fired)
            .field("notes", &state.notes.len())
            .finish()
    }
}
