use std::cell::RefCell;

use crate::coroutine_impl::{Coroutine, ResumeHandle};
use crate::error::{Error, ErrorKind};

// the coroutine that is inside its `advance` call on this thread
//
// it's only set for the duration of one step, and never holds two handles
thread_local! {
    static ACTIVE: RefCell<Option<ResumeHandle>> = const { RefCell::new(None) };
}

/// clears the active pointer when the step is over, even if it unwinds
pub(crate) struct ActiveGuard {
    _priv: (),
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        ACTIVE.with(|cell| cell.borrow_mut().take());
    }
}

/// mark `handle` as the active coroutine
///
/// the caller must make sure no other coroutine is active
pub(crate) fn enter(handle: &ResumeHandle) -> ActiveGuard {
    ACTIVE.with(|cell| {
        let prev = cell.borrow_mut().replace(handle.clone());
        debug_assert!(prev.is_none(), "two coroutines active at the same time");
    });
    ActiveGuard { _priv: () }
}

#[inline]
pub(crate) fn active() -> Option<ResumeHandle> {
    ACTIVE.with(|cell| cell.borrow().clone())
}

/// the active handle, or a `NotInCoroutine` error naming `op`
#[inline]
pub(crate) fn current_handle(op: &'static str) -> Result<ResumeHandle, Error> {
    active().ok_or_else(|| ErrorKind::NotInCoroutine(op).into())
}

/// if current context is a coroutine body
#[inline]
pub fn is_coroutine() -> bool {
    ACTIVE.with(|cell| cell.borrow().is_some())
}

/// Gets a handle to the coroutine that invokes it
///
/// return `None` outside of a coroutine body
#[inline]
pub fn current() -> Option<Coroutine> {
    active().map(Coroutine::from)
}
