//! The host event loop interface
//!
//! The scheduler never owns a thread or a clock. Everything that has to
//! happen "later" is handed to a [`Host`]: a single-shot timer, or a task
//! deferred to the next tick of the host loop. [`EventLoop`] is a complete
//! single-threaded implementation; embedders can plug their own loop in.
//!
//! [`EventLoop`]: ../event_loop/struct.EventLoop.html

use std::rc::Rc;
use std::time::Duration;

/// A task the host runs later
pub type Task = Box<dyn FnOnce()>;

/// A cancellable token for a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub(crate) u64);

impl TimerHandle {
    /// build a token from a host specific id
    pub fn from_raw(id: u64) -> Self {
        TimerHandle(id)
    }

    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

/// Primitives a host event loop must provide
pub trait Host {
    /// run `task` once after `delay`
    fn schedule_timer(&self, delay: Duration, task: Task) -> TimerHandle;

    /// cancel a timer, a no-op if it already fired or was cancelled
    fn cancel_timer(&self, handle: TimerHandle);

    /// run `task` on the next tick, before any timer
    fn defer(&self, task: Task);
}

/// Shared reference to a host
pub type HostRef = Rc<dyn Host>;
