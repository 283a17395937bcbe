//! Futures for fan-out work
//!
//! A coroutine that starts several operations at once gives each of them a
//! [`Future`] instead of a [`Callback`], and later waits for all of them with
//! [`join`]. A future records its outcome without touching the coroutine,
//! unless the coroutine is already waiting on it.
//!
//! [`Callback`]: ../callback/struct.Callback.html
//! [`join`]: ../join/fn.join.html

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::Location;
use std::rc::Rc;
use std::time::Duration;

use crate::coroutine_impl::ResumeHandle;
use crate::error::{Error, TimeoutKind};
use crate::host::TimerHandle;
use crate::local;
use crate::procedure::Input;
use crate::timeout;
use crate::values::Values;

struct Inner {
    name: String,
    handle: ResumeHandle,
    done: Cell<bool>,
    joined: Cell<bool>,
    error: RefCell<Option<Error>>,
    data: RefCell<Option<Values>>,
    timer: Cell<Option<TimerHandle>>,
}

/// A completion cell bound to the coroutine that created it
///
/// Once done it stays done; later completions are dropped.
#[derive(Clone)]
pub struct Future {
    inner: Rc<Inner>,
}

impl Future {
    /// record the outcome, the first call wins
    ///
    /// if the coroutine is joined on this future it is resumed with the
    /// future itself as the single value
    pub fn complete(&self, result: Input) {
        let inner = &self.inner;
        if inner.done.get() {
            debug!(
                "future {:?} of coroutine {:?} is already done, drop the completion",
                inner.name,
                inner.handle.name()
            );
            return;
        }
        inner.done.set(true);
        if let Some(timer) = inner.timer.take() {
            inner.handle.host().cancel_timer(timer);
        }
        match result {
            Ok(values) => *inner.data.borrow_mut() = Some(values),
            Err(err) => *inner.error.borrow_mut() = Some(err),
        }

        if inner.joined.get() {
            inner.handle.advance(Ok(Values::one(self.clone())));
        }
    }

    /// complete with a single value
    pub fn resolve<T: Any>(&self, v: T) {
        self.complete(Ok(Values::one(v)));
    }

    /// complete with an error
    pub fn reject<E: Into<Error>>(&self, err: E) {
        self.complete(Err(err.into()));
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_done(&self) -> bool {
        self.inner.done.get()
    }

    pub fn is_joined(&self) -> bool {
        self.inner.joined.get()
    }

    /// the error the future completed with
    pub fn error(&self) -> Option<Error> {
        self.inner.error.borrow().clone()
    }

    /// move the values out of a successfully completed future
    pub fn take_data(&self) -> Option<Values> {
        self.inner.data.borrow_mut().take()
    }

    // mark the coroutine as waiting on this future
    pub(crate) fn set_joined(&self) {
        self.inner.joined.set(true);
    }
}

impl fmt::Debug for Future {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Future")
            .field("name", &self.inner.name)
            .field("done", &self.inner.done.get())
            .field("joined", &self.inner.joined.get())
            .finish()
    }
}

/// create a future bound to the running coroutine
#[track_caller]
pub fn future() -> Result<Future, Error> {
    future_with(None, "")
}

/// create a future that completes with a `TimedOut` error after `timeout`
#[track_caller]
pub fn future_with(timeout: Option<Duration>, name: &str) -> Result<Future, Error> {
    let location = Location::caller();
    let handle = local::current_handle("future")?;
    handle.leave_breadcrumb(|| format!("future {}", name), location);

    let f = Future {
        inner: Rc::new(Inner {
            name: name.to_owned(),
            handle: handle.clone(),
            done: Cell::new(false),
            joined: Cell::new(false),
            error: RefCell::new(None),
            data: RefCell::new(None),
            timer: Cell::new(None),
        }),
    };

    if let Some(delay) = timeout::effective(timeout) {
        // the future is its own timeout callback
        let target = f.clone();
        let timer = timeout::schedule(
            &**handle.host(),
            TimeoutKind::Future,
            name,
            delay,
            move |err| target.reject(err),
        );
        f.inner.timer.set(Some(timer));
        handle.add_future_timer(timer);
    }
    Ok(f)
}
