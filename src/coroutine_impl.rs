use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe, Location};
use std::rc::Rc;

use crate::breadcrumbs::Trail;
use crate::config::ErrorHandler;
use crate::error::{Error, ErrorKind};
use crate::host::{HostRef, TimerHandle};
use crate::local;
use crate::procedure::{Input, Resumable, Step};
use crate::values::Values;

/// Lifecycle of a coroutine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    NotStarted,
    Running,
    Suspended,
    Finished,
    Failed,
}

impl State {
    /// true for `Finished` and `Failed`
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Finished | State::Failed)
    }
}

/// /////////////////////////////////////////////////////////////////////////////
/// ResumeHandle
/// /////////////////////////////////////////////////////////////////////////////

/// The internal representation of a coroutine
struct Inner {
    name: String,
    host: HostRef,
    // captured from the error policy when the coroutine was started
    handler: ErrorHandler,
    state: Cell<State>,
    callback_in_progress: Cell<bool>,
    // timeout of the outstanding callback
    pending_timer: Cell<Option<TimerHandle>>,
    // whole-coroutine timeout
    deadline_timer: Cell<Option<TimerHandle>>,
    // timeouts of the futures created by the body
    future_timers: RefCell<Vec<TimerHandle>>,
    breadcrumbs: RefCell<Option<Trail>>,
    // taken out while a step runs, dropped once the coroutine is over
    procedure: RefCell<Option<Box<dyn Resumable>>>,
    // inputs that arrived while a coroutine was running
    backlog: RefCell<VecDeque<Input>>,
}

/// The control object of one coroutine
#[derive(Clone)]
pub(crate) struct ResumeHandle {
    inner: Rc<Inner>,
}

impl ResumeHandle {
    pub fn new(
        name: String,
        host: HostRef,
        handler: ErrorHandler,
        procedure: Box<dyn Resumable>,
        breadcrumbs: bool,
    ) -> Self {
        ResumeHandle {
            inner: Rc::new(Inner {
                name,
                host,
                handler,
                state: Cell::new(State::NotStarted),
                callback_in_progress: Cell::new(false),
                pending_timer: Cell::new(None),
                deadline_timer: Cell::new(None),
                future_timers: RefCell::new(Vec::new()),
                breadcrumbs: RefCell::new(breadcrumbs.then(Trail::new)),
                procedure: RefCell::new(Some(procedure)),
                backlog: RefCell::new(VecDeque::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn host(&self) -> &HostRef {
        &self.inner.host
    }

    pub fn state(&self) -> State {
        self.inner.state.get()
    }

    pub fn ptr_eq(&self, other: &ResumeHandle) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// record a breadcrumb if the trail is enabled
    pub fn leave_breadcrumb(
        &self,
        label: impl FnOnce() -> String,
        location: &'static Location<'static>,
    ) {
        if let Some(trail) = self.inner.breadcrumbs.borrow_mut().as_mut() {
            trail.push(label(), location);
        }
    }

    /// claim the single callback slot of this coroutine
    pub fn begin_callback(&self) -> Result<(), Error> {
        if self.inner.callback_in_progress.get() {
            return Err(ErrorKind::CallbackAlreadyInProgress.into());
        }
        self.inner.callback_in_progress.set(true);
        Ok(())
    }

    #[cfg(test)]
    pub fn callback_in_progress(&self) -> bool {
        self.inner.callback_in_progress.get()
    }

    pub fn set_pending_timer(&self, timer: TimerHandle) {
        if let Some(old) = self.inner.pending_timer.replace(Some(timer)) {
            self.inner.host.cancel_timer(old);
        }
    }

    pub fn set_deadline_timer(&self, timer: TimerHandle) {
        self.inner.deadline_timer.set(Some(timer));
    }

    pub fn take_deadline_timer(&self) -> Option<TimerHandle> {
        self.inner.deadline_timer.take()
    }

    /// a future timeout outliving the coroutine is cancelled at finish
    pub fn add_future_timer(&self, timer: TimerHandle) {
        self.inner.future_timers.borrow_mut().push(timer);
    }

    fn cancel_pending_timer(&self) {
        if let Some(timer) = self.inner.pending_timer.take() {
            self.inner.host.cancel_timer(timer);
        }
    }

    // cause, coroutine name and the breadcrumb trace
    fn annotate(&self, err: &mut Error) {
        err.annotate(&self.inner.name);
        if let Some(trail) = self.inner.breadcrumbs.borrow().as_ref() {
            err.attach_trace(trail.snapshot());
        }
    }

    /// resume the coroutine with a completion
    ///
    /// late completions of a finished coroutine are ignored. If any
    /// coroutine is in the middle of a step the input is queued, the
    /// active pointer never holds two coroutines.
    ///
    /// an input queued for a coroutine other than the active one is
    /// drained from a host `defer`, so a completion delivered straight from
    /// the host before that tick runs first.
    pub fn advance(&self, input: Input) {
        if self.state().is_terminal() {
            trace!("coroutine {:?} is over, ignore the completion", self.name());
            return;
        }

        // whatever resolves us completed the outstanding callback
        self.cancel_pending_timer();
        self.inner.callback_in_progress.set(false);

        let input = input.map_err(|mut err| {
            self.annotate(&mut err);
            err
        });

        match local::active() {
            None => self.run_steps(input),
            Some(active) => {
                self.inner.backlog.borrow_mut().push_back(input);
                // the active coroutine drains its own backlog once it suspends
                if !active.ptr_eq(self) {
                    let me = self.clone();
                    self.inner.host.defer(Box::new(move || me.drain()));
                }
            }
        }
    }

    // run the queued inputs from the host loop
    fn drain(&self) {
        if local::is_coroutine() {
            let me = self.clone();
            self.inner.host.defer(Box::new(move || me.drain()));
            return;
        }
        let next = self.inner.backlog.borrow_mut().pop_front();
        if let Some(input) = next {
            self.run_steps(input);
        }
    }

    // one step, then whatever queued up while it was running
    fn run_steps(&self, input: Input) {
        let mut next = Some(input);
        while let Some(input) = next.take() {
            self.step(input);
            if self.state() != State::Suspended {
                break;
            }
            next = self.inner.backlog.borrow_mut().pop_front();
        }
    }

    fn step(&self, input: Input) {
        let procedure = self.inner.procedure.borrow_mut().take();
        let Some(mut procedure) = procedure else {
            return;
        };

        self.inner.state.set(State::Running);
        let ret = {
            let _active = local::enter(self);
            // a hand written procedure may panic, it must not unwind into the host
            panic::catch_unwind(AssertUnwindSafe(|| procedure.resume(input)))
                .unwrap_or_else(|p| Err(Error::panicked(p.as_ref())))
            // the active pointer is cleared here
        };

        match ret {
            Ok(Step::Suspended) => {
                *self.inner.procedure.borrow_mut() = Some(procedure);
                self.inner.state.set(State::Suspended);
            }
            Ok(Step::Finished) => {
                drop(procedure);
                self.finish(State::Finished);
                debug!("coroutine {:?} finished", self.name());
            }
            Err(mut err) => {
                drop(procedure);
                self.annotate(&mut err);
                err.mark_uncaught();
                self.finish(State::Failed);
                debug!("coroutine {:?} failed: {}", self.name(), err);
                (self.inner.handler)(err);
            }
        }
    }

    // release everything the coroutine holds
    fn finish(&self, state: State) {
        self.inner.state.set(state);
        self.inner.breadcrumbs.borrow_mut().take();
        self.inner.backlog.borrow_mut().clear();
        self.cancel_pending_timer();
        if let Some(timer) = self.take_deadline_timer() {
            self.inner.host.cancel_timer(timer);
        }
        // timers of futures that already completed are gone, cancel is a no-op
        let timers = std::mem::take(&mut *self.inner.future_timers.borrow_mut());
        for timer in timers {
            self.inner.host.cancel_timer(timer);
        }
    }

    /// start the coroutine
    pub fn start(&self) {
        self.advance(Ok(Values::new()));
    }
}

/// /////////////////////////////////////////////////////////////////////////////
/// Coroutine
/// /////////////////////////////////////////////////////////////////////////////

/// A handle to observe a coroutine
#[derive(Clone)]
pub struct Coroutine {
    handle: ResumeHandle,
}

impl Coroutine {
    /// Gets the coroutine name.
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// Gets the lifecycle state
    pub fn state(&self) -> State {
        self.handle.state()
    }

    /// true once the coroutine finished or failed
    pub fn is_done(&self) -> bool {
        self.handle.state().is_terminal()
    }
}

impl From<ResumeHandle> for Coroutine {
    fn from(handle: ResumeHandle) -> Self {
        Coroutine { handle }
    }
}

impl fmt::Debug for Coroutine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Coroutine")
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}
