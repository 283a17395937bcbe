//! `corun` Configuration interface
//!
//! Holds the process-wide error policy: the handler that receives uncaught
//! coroutine failures and whether breadcrumb trails are recorded by default.
//! Every coroutine captures these values when it is started, so changing
//! them later never affects coroutines that are already running.

use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Error;

// default generator stack size, in usize
const DEFAULT_STACK_SIZE: usize = 0x4000;

static BREADCRUMBS: AtomicBool = AtomicBool::new(cfg!(debug_assertions));
static STACK_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_STACK_SIZE);
static ERROR_HANDLER: RwLock<Option<Arc<dyn Fn(Error) + Send + Sync>>> =
    parking_lot::const_rwlock(None);

/// The handler a coroutine reports its uncaught failure to
pub type ErrorHandler = Rc<dyn Fn(Error)>;

// the host must never crash because of a coroutine, so just log it
fn default_error_handler(err: Error) {
    error!("uncaught coroutine error: {:#}", err);
}

/// `corun` Configuration type
pub struct Config;

/// get the corun configuration instance
pub fn config() -> Config {
    Config
}

/// the config is read when a coroutine starts
///
/// changes would not affect coroutines that are already running
impl Config {
    /// enable or disable breadcrumb capture for new coroutines
    pub fn set_breadcrumbs(&self, enable: bool) -> &Self {
        info!("set breadcrumbs={:?}", enable);
        BREADCRUMBS.store(enable, Ordering::Release);
        self
    }

    /// get the default breadcrumb setting
    pub fn get_breadcrumbs(&self) -> bool {
        BREADCRUMBS.load(Ordering::Acquire)
    }

    /// set the handler for uncaught coroutine errors
    ///
    /// the handler is shared by every thread that runs coroutines, so it
    /// must be `Send + Sync`. A handler that needs `Rc` state, or only
    /// applies to one host, goes through [`Builder::error_handler`]
    /// instead, which takes any `Fn(Error) + 'static`.
    ///
    /// [`Builder::error_handler`]: coroutine/struct.Builder.html#method.error_handler
    pub fn set_error_handler<F>(&self, f: F) -> &Self
    where
        F: Fn(Error) + Send + Sync + 'static,
    {
        info!("set error handler");
        *ERROR_HANDLER.write() = Some(Arc::new(f));
        self
    }

    /// restore the default handler, which logs the error
    pub fn reset_error_handler(&self) -> &Self {
        info!("reset error handler");
        *ERROR_HANDLER.write() = None;
        self
    }

    /// get the current error handler
    pub fn get_error_handler(&self) -> ErrorHandler {
        let handler: ErrorHandler = match ERROR_HANDLER.read().clone() {
            Some(f) => Rc::new(move |err| f(err)),
            None => Rc::new(default_error_handler),
        };
        handler
    }

    /// set the coroutine stack size in usize
    ///
    /// if you pass 0 to it, will use internal default
    pub fn set_stack_size(&self, size: usize) -> &Self {
        info!("set stack size={:?}", size);
        STACK_SIZE.store(size, Ordering::Release);
        self
    }

    /// get the coroutine stack size
    pub fn get_stack_size(&self) -> usize {
        match STACK_SIZE.load(Ordering::Acquire) {
            0 => DEFAULT_STACK_SIZE,
            size => size,
        }
    }
}

/// enable or disable breadcrumb capture for coroutines started afterwards
pub fn enable_breadcrumbs(enable: bool) {
    config().set_breadcrumbs(enable);
}

/// set the process-wide handler for uncaught coroutine errors
///
/// same as `config().set_error_handler(f)`, see [`Config::set_error_handler`]
/// for the `Send + Sync` requirement
///
/// [`Config::set_error_handler`]: struct.Config.html#method.set_error_handler
pub fn set_error_handler<F>(f: F)
where
    F: Fn(Error) + Send + Sync + 'static,
{
    config().set_error_handler(f);
}
