//! Coroutine error types
//!
//! Two families of errors flow through this crate. Programming errors
//! (`NotInCoroutine`, `IllegalNesting`, `CallbackAlreadyInProgress`,
//! `InvalidArgument`) are returned directly to the caller of the offending
//! function. Everything else is delivered *into* a coroutine at its
//! suspension point and, if the body lets it escape, handed to the error
//! handler captured when the coroutine was started.

use std::any::Any;
use std::fmt;
use std::io;
use std::time::Duration;

use crate::breadcrumbs::Trace;

/// The label of a timeout source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    /// whole-coroutine timeout armed by `run`
    Coroutine,
    /// timeout of a single callback adapter
    Callback,
    /// timeout of a future
    Future,
}

impl fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            TimeoutKind::Coroutine => "coroutine",
            TimeoutKind::Callback => "callback",
            TimeoutKind::Future => "future",
        })
    }
}

/// Why an error reached a coroutine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cause {
    /// thrown by body logic or reported by an async operation
    Exception,
    /// injected by a timeout
    TimedOut,
}

impl Cause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cause::Exception => "Exception",
            Cause::TimedOut => "TimedOut",
        }
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("can't start a coroutine while another coroutine is running")]
    IllegalNesting,

    #[error("`{0}` called outside of a coroutine")]
    NotInCoroutine(&'static str),

    #[error("a callback is already in progress for this coroutine")]
    CallbackAlreadyInProgress,

    #[error("{kind} {name} did not finish within {} ms", .delay.as_millis())]
    TimedOut {
        kind: TimeoutKind,
        name: String,
        delay: Duration,
    },

    #[error("{0}")]
    Failure(String),

    #[error("panicked: {0}")]
    Panicked(String),
}

/// The error type of every coroutine API
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    cause: Option<Cause>,
    coroutine: Option<String>,
    trace: Option<Trace>,
    // set once the error escaped the top of a coroutine body
    uncaught: bool,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// create a plain failure with the given message
    pub fn new<M: Into<String>>(msg: M) -> Self {
        ErrorKind::Failure(msg.into()).into()
    }

    pub(crate) fn timed_out(kind: TimeoutKind, name: &str, delay: Duration) -> Self {
        let mut err = Error::from(ErrorKind::TimedOut {
            kind,
            name: name.to_owned(),
            delay,
        });
        err.cause = Some(Cause::TimedOut);
        err
    }

    // turn a caught panic payload into a body failure
    pub(crate) fn panicked(payload: &(dyn Any + Send)) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_owned()
        };
        ErrorKind::Panicked(msg).into()
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// the cause annotation, set once the error was delivered to a coroutine
    pub fn cause(&self) -> Option<Cause> {
        self.cause
    }

    /// name of the coroutine this error was delivered to
    pub fn coroutine(&self) -> Option<&str> {
        self.coroutine.as_deref()
    }

    /// the timeout label for `TimedOut` errors
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::TimedOut { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self.kind, ErrorKind::TimedOut { .. })
    }

    /// true once the error escaped a coroutine body and went to the handler
    pub fn is_uncaught(&self) -> bool {
        self.uncaught
    }

    /// the bare message, without the coroutine prefix or trace
    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    pub(crate) fn annotate(&mut self, coroutine: &str) {
        self.cause.get_or_insert(Cause::Exception);
        self.coroutine = Some(coroutine.to_owned());
    }

    // the first trace attached wins, it is the one closest to the failure
    pub(crate) fn attach_trace(&mut self, trace: Trace) {
        if self.trace.is_none() {
            self.trace = Some(trace);
        }
    }

    pub(crate) fn mark_uncaught(&mut self) {
        self.uncaught = true;
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (&self.coroutine, self.uncaught) {
            (Some(name), true) if name.is_empty() => write!(f, "coroutine failed: {}", self.kind)?,
            (Some(name), true) => write!(f, "coroutine {:?} failed: {}", name, self.kind)?,
            _ => write!(f, "{}", self.kind)?,
        }
        if f.alternate() {
            if let Some(trace) = &self.trace {
                write!(f, "\n{}", trace)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error {
            kind,
            cause: None,
            coroutine: None,
            trace: None,
            uncaught: false,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        let mut e = Error::new(err.to_string());
        if err.kind() == io::ErrorKind::TimedOut {
            e.cause = Some(Cause::TimedOut);
        }
        e
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::new(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::new(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message() {
        let err = Error::timed_out(TimeoutKind::Callback, "fetch", Duration::from_millis(50));
        assert_eq!(err.message(), "callback fetch did not finish within 50 ms");
        assert_eq!(err.cause(), Some(Cause::TimedOut));
        assert_eq!(err.name(), Some("fetch"));
    }

    #[test]
    fn annotate_keeps_existing_cause() {
        let mut err = Error::timed_out(TimeoutKind::Future, "f", Duration::from_millis(1));
        err.annotate("worker");
        assert_eq!(err.cause(), Some(Cause::TimedOut));
        assert_eq!(err.coroutine(), Some("worker"));

        let mut err = Error::new("boom");
        err.annotate("worker");
        assert_eq!(err.cause(), Some(Cause::Exception));
    }

    #[test]
    fn panic_payloads() {
        let err = Error::panicked(&"static str");
        assert_eq!(err.kind(), &ErrorKind::Panicked("static str".into()));
        let err = Error::panicked(&String::from("owned"));
        assert_eq!(err.message(), "panicked: owned");
        let err = Error::panicked(&42u8);
        assert_eq!(err.message(), "panicked: unknown panic");
    }

    #[test]
    fn uncaught_display_names_coroutine() {
        let mut err = Error::new("boom");
        err.annotate("worker");
        assert_eq!(err.to_string(), "boom");
        err.mark_uncaught();
        assert_eq!(err.to_string(), "coroutine \"worker\" failed: boom");
    }
}
