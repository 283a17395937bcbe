use std::panic::Location;
use std::rc::Rc;
use std::time::Duration;

use crate::config::{config, ErrorHandler};
use crate::coroutine_impl::{Coroutine, ResumeHandle};
use crate::error::{Error, ErrorKind, TimeoutKind};
use crate::host::HostRef;
use crate::local;
use crate::procedure::{Co, Procedure, Resumable};
use crate::timeout;

////////////////////////////////////////////////////////////////////////////////
// Builder
////////////////////////////////////////////////////////////////////////////////

/// Coroutine factory, which can be used in order to configure the properties of
/// a new coroutine.
///
/// Methods can be chained on it in order to configure it.
///
/// The configurations available are:
///
/// - [`name`]: specifies an associated name for the coroutine
/// - [`timeout`]: raise a `TimedOut` error in the coroutine if it is still
///   running after the given duration
/// - [`error_handler`]: where an uncaught failure is reported, instead of
///   the process-wide handler
/// - [`enable_breadcrumbs`]: override the process-wide breadcrumb setting
///
/// Anything left unset is taken from [`config`] when the coroutine starts.
///
/// # Examples
///
/// ```
/// use std::rc::Rc;
/// use std::time::Duration;
/// use corun::{coroutine, EventLoop};
///
/// let ev = Rc::new(EventLoop::new());
/// coroutine::Builder::new()
///     .name("worker")
///     .timeout(Duration::from_secs(1))
///     .spawn(ev.clone(), |co| {
///         co.yield_now()?;
///         Ok(())
///     })
///     .unwrap();
/// ev.run();
/// ```
///
/// [`name`]: struct.Builder.html#method.name
/// [`timeout`]: struct.Builder.html#method.timeout
/// [`error_handler`]: struct.Builder.html#method.error_handler
/// [`enable_breadcrumbs`]: struct.Builder.html#method.enable_breadcrumbs
/// [`config`]: ../fn.config.html
#[derive(Default)]
pub struct Builder {
    // A name for the coroutine-to-be, for identification in error messages
    name: Option<String>,
    timeout: Option<Duration>,
    error_handler: Option<ErrorHandler>,
    breadcrumbs: Option<bool>,
}

impl Builder {
    /// Generates the base configuration for starting a coroutine, from which
    /// configuration methods can be chained.
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Names the coroutine-to-be.
    pub fn name<S: Into<String>>(mut self, name: S) -> Builder {
        self.name = Some(name.into());
        self
    }

    /// Sets the whole-coroutine timeout, zero means no timeout.
    pub fn timeout(mut self, timeout: Duration) -> Builder {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the handler for the coroutine's uncaught failure.
    pub fn error_handler<F>(mut self, f: F) -> Builder
    where
        F: Fn(Error) + 'static,
    {
        self.error_handler = Some(Rc::new(f));
        self
    }

    /// Enables or disables breadcrumb capture for this coroutine.
    pub fn enable_breadcrumbs(mut self, enable: bool) -> Builder {
        self.breadcrumbs = Some(enable);
        self
    }

    /// Starts a resumable procedure as a coroutine on `host`.
    ///
    /// The procedure runs synchronously up to its first suspension point
    /// before this returns.
    ///
    /// # Errors
    ///
    /// - `IllegalNesting` when called from inside a running coroutine body
    /// - `InvalidArgument` when the procedure can't be resumed any more
    #[track_caller]
    pub fn run<P>(self, host: HostRef, procedure: P) -> Result<Coroutine, Error>
    where
        P: Resumable + 'static,
    {
        let location = Location::caller();
        if local::is_coroutine() {
            return Err(ErrorKind::IllegalNesting.into());
        }
        if procedure.is_done() {
            let msg = "the procedure is already finished".to_owned();
            return Err(ErrorKind::InvalidArgument(msg).into());
        }

        let Builder {
            name,
            timeout,
            error_handler,
            breadcrumbs,
        } = self;
        let policy = config();
        let name = name.unwrap_or_default();
        let handler = error_handler.unwrap_or_else(|| policy.get_error_handler());
        let breadcrumbs = breadcrumbs.unwrap_or_else(|| policy.get_breadcrumbs());

        let handle = ResumeHandle::new(name, host, handler, Box::new(procedure), breadcrumbs);
        handle.leave_breadcrumb(|| format!("coroutine {} start", handle.name()), location);

        if let Some(delay) = timeout::effective(timeout) {
            let co = handle.clone();
            let timer = timeout::schedule(
                &**handle.host(),
                TimeoutKind::Coroutine,
                handle.name(),
                delay,
                move |err| {
                    co.take_deadline_timer();
                    co.advance(Err(err))
                },
            );
            handle.set_deadline_timer(timer);
        }

        debug!("coroutine {:?} started", handle.name());
        handle.start();
        Ok(Coroutine::from(handle))
    }

    /// Starts `body` as a coroutine on `host`.
    ///
    /// The body receives the [`Co`] context it suspends through.
    ///
    /// [`Co`]: struct.Co.html
    #[track_caller]
    pub fn spawn<F>(self, host: HostRef, body: F) -> Result<Coroutine, Error>
    where
        F: for<'a, 'b> FnOnce(&'a mut Co<'b>) -> Result<(), Error> + 'static,
    {
        self.run(host, Procedure::new(body))
    }
}

////////////////////////////////////////////////////////////////////////////////
// Free functions
////////////////////////////////////////////////////////////////////////////////

/// Starts a resumable procedure with the default configuration.
///
/// This is `Builder::new().run(host, procedure)`.
#[track_caller]
pub fn run<P>(host: HostRef, procedure: P) -> Result<Coroutine, Error>
where
    P: Resumable + 'static,
{
    Builder::new().run(host, procedure)
}

/// Starts `body` as a coroutine with the default configuration.
///
/// # Examples
///
/// ```
/// use std::rc::Rc;
/// use corun::{coroutine, EventLoop};
///
/// let ev = Rc::new(EventLoop::new());
/// coroutine::spawn(ev.clone(), |co| {
///     let cb = coroutine::callback()?;
///     cb.resolve(42);
///     let v = co.suspend()?;
///     assert_eq!(v.get::<i32>(0), Some(&42));
///     Ok(())
/// })
/// .unwrap();
/// ev.run();
/// ```
#[track_caller]
pub fn spawn<F>(host: HostRef, body: F) -> Result<Coroutine, Error>
where
    F: for<'a, 'b> FnOnce(&'a mut Co<'b>) -> Result<(), Error> + 'static,
{
    Builder::new().run(host, Procedure::new(body))
}
