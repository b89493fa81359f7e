//! Cooperative single-threaded task queue.
//!
//! Deferred work (async query starts, deferred listener dispatch, capability
//! continuations resumed later) is queued here and runs when the host drives
//! the queue. Nothing runs in parallel.

use std::{cell::RefCell, collections::VecDeque, fmt, rc::Rc};

type Task = Box<dyn FnOnce()>;

/// Cloneable handle to a shared FIFO of deferred tasks.
#[derive(Clone, Default)]
pub struct Scheduler {
    queue: Rc<RefCell<VecDeque<Task>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` for a later turn.
    pub fn defer(&self, task: impl FnOnce() + 'static) {
        self.queue.borrow_mut().push_back(Box::new(task));
    }

    /// Run the oldest queued task. Returns false when the queue was empty.
    pub fn tick(&self) -> bool {
        // The borrow ends before the task runs so it can queue more work.
        let task = self.queue.borrow_mut().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Drain the queue, including tasks queued while draining.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.tick() {
            ran += 1;
        }
        ran
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.pending())
            .finish()
    }
}
