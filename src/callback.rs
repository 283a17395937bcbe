//! Callback adapters
//!
//! A [`Callback`] turns a node style completion, `(err, ...values)`, into a
//! resumption of the coroutine that asked for it. A coroutine has at most
//! one adapter outstanding, and each adapter resumes it at most once.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::panic::Location;
use std::rc::Rc;
use std::time::Duration;

use crate::coroutine_impl::ResumeHandle;
use crate::error::{Error, TimeoutKind};
use crate::local;
use crate::procedure::Input;
use crate::timeout;
use crate::values::Values;

/// A single-shot completion handle bound to a coroutine
///
/// Clones share the same shot, whichever clone fires first wins.
#[derive(Clone)]
pub struct Callback {
    handle: ResumeHandle,
    fired: Rc<Cell<bool>>,
    name: Rc<str>,
}

impl Callback {
    /// resume the owning coroutine with `result`
    ///
    /// only the first call has any effect
    pub fn complete(&self, result: Input) {
        if self.fired.replace(true) {
            debug!(
                "callback {:?} of coroutine {:?} already fired, drop the completion",
                self.name,
                self.handle.name()
            );
            return;
        }
        self.handle.advance(result);
    }

    /// resume with a single value
    pub fn resolve<T: Any>(&self, v: T) {
        self.complete(Ok(Values::one(v)));
    }

    /// raise `err` in the owning coroutine
    pub fn reject<E: Into<Error>>(&self, err: E) {
        self.complete(Err(err.into()));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// true once the adapter fired or timed out
    pub fn is_fired(&self) -> bool {
        self.fired.get()
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Callback")
            .field("name", &self.name)
            .field("coroutine", &self.handle.name())
            .field("fired", &self.fired.get())
            .finish()
    }
}

/// create a callback adapter for the running coroutine
///
/// fails with `CallbackAlreadyInProgress` if the coroutine already has one
#[track_caller]
pub fn callback() -> Result<Callback, Error> {
    callback_with(None, "")
}

/// create a callback adapter that times out after `timeout`
#[track_caller]
pub fn callback_with(timeout: Option<Duration>, name: &str) -> Result<Callback, Error> {
    let location = Location::caller();
    let handle = local::current_handle("callback")?;
    handle.begin_callback()?;
    handle.leave_breadcrumb(|| format!("callback {}", name), location);

    let cb = Callback {
        handle: handle.clone(),
        fired: Rc::new(Cell::new(false)),
        name: name.into(),
    };

    if let Some(delay) = timeout::effective(timeout) {
        // the timeout goes through the adapter, a late real completion is dropped
        let target = cb.clone();
        let timer = timeout::schedule(
            &**handle.host(),
            TimeoutKind::Callback,
            name,
            delay,
            move |err| target.reject(err),
        );
        handle.set_pending_timer(timer);
    }
    Ok(cb)
}
